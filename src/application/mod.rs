//! Application layer: Use cases and services.
//!
//! This module orchestrates the domain pipeline with the case repository to
//! implement screening and follow-up.

mod assessment;
mod monitoring;

pub use assessment::{AssessmentOutcome, AssessmentService, PersistenceOutcome};
pub use monitoring::{CaseSummary, MonitoringService};
