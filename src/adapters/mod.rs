//! Adapters layer: Concrete implementations of ports.
//!
//! - `sqlite`: SQLite case repository
//! - `memory`: in-process case repository
//! - `export`: semicolon-delimited history export
//! - `sanitize`: PII filtering for logs

mod error;
pub mod export;
pub mod memory;
pub mod sanitize;
pub mod sqlite;

pub use error::StorageError;
pub use memory::MemoryCaseRepository;
pub use sqlite::SqliteCaseRepository;
