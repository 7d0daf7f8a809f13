//! # Hemoguard
//!
//! Hybrid anemia-risk assessment for children under five.
//!
//! This crate provides:
//! - Altitude-corrected clinical classification of hemoglobin
//! - Weighted-rule vulnerability scoring from household context
//! - Fusion into a single verdict with intervention suggestions
//! - Follow-up case tracking with idempotent persistence
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Screening types, policy, and the pure assessment pipeline
//! - `ports`: Trait definitions for persistence
//! - `adapters`: Concrete implementations (SQLite, in-memory, CSV export)
//! - `application`: Use cases orchestrating domain and ports
//! - `cli`: Command-line front end

pub mod adapters;
pub mod application;
pub mod cli;
pub mod domain;
pub mod ports;

pub use domain::{assess, AssessmentReport, PatientInput, PolicyConfig, RiskTier};

/// Result type for Hemoguard operations
pub type Result<T> = std::result::Result<T, HemoguardError>;

/// Main error type for Hemoguard
#[derive(Debug, thiserror::Error)]
pub enum HemoguardError {
    #[error("Invalid patient data: {0}")]
    Validation(#[from] domain::ValidationError),

    #[error("Storage operation failed: {0}")]
    Storage(#[from] adapters::StorageError),

    #[error("Invalid policy: {0}")]
    Policy(#[from] domain::PolicyError),

    #[error("Invalid command: {0}")]
    Usage(String),

    #[error("{rejected} of {total} intake records were rejected")]
    BatchRejected { rejected: usize, total: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
