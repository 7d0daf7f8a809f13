//! Fusion of clinical gravity and vulnerability into one verdict.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::clinical::{ClinicalAssessment, GravityTier};
use super::vulnerability::{VulnerabilityAssessment, VulnerabilityTier};

/// Final risk classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which precedence rule produced the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictDriver {
    /// SEVERE or MODERATE gravity.
    ClinicalAlert,
    /// HIGH vulnerability.
    ModelDriven,
    /// MEDIUM vulnerability with MILD gravity.
    ModelVulnerability,
    /// Plain vulnerability tier.
    Model,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskVerdict {
    pub tier: RiskTier,
    pub driver: VerdictDriver,
    /// Gravity tier as classified, before OUT_OF_RANGE is folded into NORMAL.
    pub gravity: GravityTier,
    /// Human-readable label, e.g. `HIGH RISK (clinical alert - SEVERE)`.
    pub qualifier: String,
    pub vulnerability_score: f64,
}

/// Stateless precedence policy. First matching rule wins:
///
/// 1. SEVERE or MODERATE gravity gives HIGH.
/// 2. HIGH vulnerability gives HIGH.
/// 3. MEDIUM vulnerability with MILD gravity gives MEDIUM.
/// 4. Otherwise the vulnerability tier stands.
#[derive(Debug, Clone, Copy, Default)]
pub struct HybridRiskResolver;

impl HybridRiskResolver {
    #[must_use]
    pub fn resolve(clinical: &ClinicalAssessment, vulnerability: &VulnerabilityAssessment) -> RiskVerdict {
        let gravity = clinical.gravity;
        let effective = gravity.effective();

        let (tier, driver, qualifier) = if effective.is_clinical_alert() {
            (
                RiskTier::High,
                VerdictDriver::ClinicalAlert,
                format!("HIGH RISK (clinical alert - {effective})"),
            )
        } else {
            match (vulnerability.tier, effective) {
                (VulnerabilityTier::High, _) => (
                    RiskTier::High,
                    VerdictDriver::ModelDriven,
                    format!("HIGH RISK (model-driven - anemia {gravity})"),
                ),
                (VulnerabilityTier::Medium, GravityTier::Mild) => (
                    RiskTier::Medium,
                    VerdictDriver::ModelVulnerability,
                    format!("MEDIUM RISK (model-driven vulnerability - anemia {gravity})"),
                ),
                (VulnerabilityTier::Medium, _) => (
                    RiskTier::Medium,
                    VerdictDriver::Model,
                    "MEDIUM RISK (moderate vulnerability)".to_string(),
                ),
                (VulnerabilityTier::Low, _) => (
                    RiskTier::Low,
                    VerdictDriver::Model,
                    "LOW RISK (routine monitoring recommended)".to_string(),
                ),
            }
        };

        RiskVerdict {
            tier,
            driver,
            gravity,
            qualifier,
            vulnerability_score: vulnerability.score,
        }
    }
}
