//! The end-to-end pipeline: validate, correct, classify, score, resolve,
//! suggest.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::alert::{AlertStatus, CaseKey, CaseRecord, CaseSnapshot};
use super::clinical::{ClinicalAssessment, ClinicalSeverityClassifier};
use super::altitude::AltitudeCorrector;
use super::patient::{PatientInput, ValidationError};
use super::policy::PolicyConfig;
use super::suggestion::{Suggestion, SuggestionEngine};
use super::verdict::{HybridRiskResolver, RiskVerdict};
use super::vulnerability::{VulnerabilityAssessment, VulnerabilityScorer};

/// Everything computed for one patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentReport {
    pub clinical: ClinicalAssessment,
    pub vulnerability: VulnerabilityAssessment,
    pub verdict: RiskVerdict,
    pub suggestions: Vec<Suggestion>,
    pub alert_initial_status: AlertStatus,
}

impl AssessmentReport {
    /// Case record for this report, keyed on the patient and `date`.
    #[must_use]
    pub fn to_case(&self, input: &PatientInput, date: NaiveDate) -> CaseRecord {
        CaseRecord {
            id: None,
            key: CaseKey::new(input.dni.clone(), date),
            snapshot: CaseSnapshot {
                name: input.name.trim().to_string(),
                hemoglobin_g_dl: input.hemoglobin_g_dl,
                corrected_hb_g_dl: self.clinical.corrected_hb_g_dl,
                age_months: input.age_months,
                location: input.location.label(),
                gravity: self.clinical.gravity,
                verdict: self.verdict.tier,
                qualifier: self.verdict.qualifier.clone(),
                suggestions: self.suggestions.clone(),
            },
            status: self.alert_initial_status,
            created_at: Utc::now(),
        }
    }
}

/// Run the pure pipeline. Invalid input produces no verdict.
///
/// # Errors
/// Returns the first `ValidationError` found in `input`.
pub fn assess(input: &PatientInput, policy: &PolicyConfig) -> Result<AssessmentReport, ValidationError> {
    input.validate(&policy.intake)?;

    let altitude = AltitudeCorrector::new(&policy.altitude).altitude_for(&input.location);
    let clinical =
        ClinicalSeverityClassifier::new(policy).classify(input.hemoglobin_g_dl, input.age_months, altitude);
    let vulnerability = VulnerabilityScorer::new(&policy.vulnerability).score(input, &clinical);
    let verdict = HybridRiskResolver::resolve(&clinical, &vulnerability);
    let suggestions = SuggestionEngine::new(policy).generate(&verdict, &clinical, input);
    let alert_initial_status = AlertStatus::initial(&verdict);

    Ok(AssessmentReport {
        clinical,
        vulnerability,
        verdict,
        suggestions,
        alert_initial_status,
    })
}
