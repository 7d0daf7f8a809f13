//! Assessment service: runs the pipeline and registers the case.
//!
//! Invalid input fails closed (no verdict). Storage fails open: the computed
//! report is always returned, with the persistence outcome attached.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::Serialize;

use crate::domain::{assess, AssessmentReport, CaseKey, PatientInput, PolicyConfig};
use crate::ports::CaseRepository;
use crate::HemoguardError;

/// What happened when the case was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PersistenceOutcome {
    Recorded,
    /// A case for the same patient and date already exists; it was kept.
    Duplicate,
    /// The repository failed; the report is still valid.
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct AssessmentOutcome {
    pub report: AssessmentReport,
    pub case_key: CaseKey,
    pub persistence: PersistenceOutcome,
}

/// Service for assessing patients and registering follow-up cases.
pub struct AssessmentService<R>
where
    R: CaseRepository,
{
    repository: Arc<R>,
    policy: Arc<PolicyConfig>,
}

impl<R> AssessmentService<R>
where
    R: CaseRepository,
{
    pub fn new(repository: Arc<R>, policy: Arc<PolicyConfig>) -> Self {
        Self { repository, policy }
    }

    #[must_use]
    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    /// Assess a patient and register the case under today's local date.
    ///
    /// # Errors
    /// Returns [`HemoguardError::Validation`] if the input is invalid.
    pub fn assess_today(&self, input: &PatientInput) -> Result<AssessmentOutcome, HemoguardError> {
        self.assess(input, Local::now().date_naive())
    }

    /// Assess a patient and register the case under `date`.
    ///
    /// # Errors
    /// Returns [`HemoguardError::Validation`] if the input is invalid.
    /// Repository failures never surface here.
    pub fn assess(&self, input: &PatientInput, date: NaiveDate) -> Result<AssessmentOutcome, HemoguardError> {
        let report = assess(input, &self.policy).map_err(|e| {
            tracing::warn!(field = e.field(), "Rejected patient input");
            e
        })?;

        let record = report.to_case(input, date);
        let case_key = record.key.clone();

        tracing::info!(
            case = %case_key,
            gravity = %report.clinical.gravity,
            verdict = %report.verdict.tier,
            score = report.vulnerability.score,
            "Assessment complete"
        );

        let persistence = match self.repository.insert_case(&record) {
            Ok(true) => PersistenceOutcome::Recorded,
            Ok(false) => {
                tracing::info!(case = %case_key, "Case already registered for this date");
                PersistenceOutcome::Duplicate
            }
            Err(e) => {
                tracing::warn!(case = %case_key, "Failed to save case: {}", e);
                PersistenceOutcome::Failed { reason: e.to_string() }
            }
        };

        Ok(AssessmentOutcome {
            report,
            case_key,
            persistence,
        })
    }
}
