//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundary between
//! the application services and persistence.

mod repository;

pub use repository::CaseRepository;
