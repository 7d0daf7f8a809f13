//! Domain layer: Core screening types and the assessment pipeline.
//!
//! Everything here is pure and synchronous. Numeric policy lives in
//! [`PolicyConfig`]; persistence is reached only through the ports layer.

mod alert;
mod altitude;
mod assessment;
mod clinical;
mod patient;
pub mod policy;
mod region;
pub mod suggestion;
mod verdict;
mod vulnerability;

pub use alert::{AlertStatus, CaseKey, CaseRecord, CaseSnapshot, UnknownStatus};
pub use altitude::AltitudeCorrector;
pub use assessment::{assess, AssessmentReport};
pub use clinical::{ClinicalAssessment, ClinicalSeverityClassifier, GravityTier};
pub use patient::{
    Area, EducationLevel, HouseholdContext, Location, PatientInput, ProgramEnrollment, Sex,
    SupplementStatus, ValidationError,
};
pub use policy::{PolicyConfig, PolicyError};
pub use region::Region;
pub use suggestion::{Suggestion, SuggestionCategory, SuggestionEngine};
pub use verdict::{HybridRiskResolver, RiskTier, RiskVerdict, VerdictDriver};
pub use vulnerability::{RiskFactor, VulnerabilityAssessment, VulnerabilityScorer, VulnerabilityTier};

#[cfg(test)]
pub(crate) use patient::fixtures;
