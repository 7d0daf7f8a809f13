//! Clinical gravity of anemia from altitude-corrected hemoglobin.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::altitude::AltitudeCorrector;
use super::policy::{CorrectionSign, PolicyConfig};

/// Clinical severity bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GravityTier {
    Severe,
    Moderate,
    Mild,
    Normal,
    /// Age outside the supported band; no pediatric threshold applies.
    OutOfRange,
}

impl GravityTier {
    /// SEVERE and MODERATE override any model signal.
    #[must_use]
    pub fn is_clinical_alert(self) -> bool {
        matches!(self, Self::Severe | Self::Moderate)
    }

    /// Tier used for precedence and gating decisions.
    ///
    /// OUT_OF_RANGE counts as NORMAL: without a validated threshold the
    /// clinical signal cannot raise the verdict, so the vulnerability score
    /// alone decides.
    #[must_use]
    pub fn effective(self) -> Self {
        match self {
            Self::OutOfRange => Self::Normal,
            tier => tier,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Severe => "SEVERE",
            Self::Moderate => "MODERATE",
            Self::Mild => "MILD",
            Self::Normal => "NORMAL",
            Self::OutOfRange => "OUT_OF_RANGE",
        }
    }
}

impl fmt::Display for GravityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of the clinical classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalAssessment {
    pub measured_hb_g_dl: f64,
    /// Altitude the correction was computed for.
    pub altitude_m: f64,
    /// Magnitude of the altitude correction (always non-negative).
    pub correction_g_dl: f64,
    pub corrected_hb_g_dl: f64,
    pub gravity: GravityTier,
    /// Normal floor the corrected value was compared against.
    pub threshold_g_dl: f64,
}

/// Applies age-conditioned thresholds to corrected hemoglobin.
#[derive(Debug, Clone, Copy)]
pub struct ClinicalSeverityClassifier<'a> {
    policy: &'a PolicyConfig,
}

impl<'a> ClinicalSeverityClassifier<'a> {
    #[must_use]
    pub fn new(policy: &'a PolicyConfig) -> Self {
        Self { policy }
    }

    /// Classify a measurement.
    ///
    /// A corrected value exactly on a cut point belongs to the more severe
    /// bucket: 7.0 is SEVERE, 10.0 MODERATE, and the normal floor itself MILD.
    #[must_use]
    pub fn classify(&self, measured_hb: f64, age_months: u32, altitude_m: f64) -> ClinicalAssessment {
        let altitude_m = altitude_m.max(0.0);
        let correction = AltitudeCorrector::new(&self.policy.altitude).correct(altitude_m);
        let corrected = match self.policy.altitude.sign {
            CorrectionSign::Add => measured_hb + correction,
            CorrectionSign::Subtract => measured_hb - correction,
        };

        let rules = &self.policy.clinical;
        let in_band = (rules.band_min_months..=rules.band_max_months).contains(&age_months);

        let (gravity, threshold) = if in_band {
            let threshold = rules.normal_floor_g_dl;
            let gravity = if corrected <= rules.severe_max_g_dl {
                GravityTier::Severe
            } else if corrected <= rules.moderate_max_g_dl {
                GravityTier::Moderate
            } else if corrected <= threshold {
                GravityTier::Mild
            } else {
                GravityTier::Normal
            };
            (gravity, threshold)
        } else {
            (GravityTier::OutOfRange, rules.fallback_floor_g_dl)
        };

        ClinicalAssessment {
            measured_hb_g_dl: measured_hb,
            altitude_m,
            correction_g_dl: correction,
            corrected_hb_g_dl: corrected,
            gravity,
            threshold_g_dl: threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(hb: f64, age: u32, altitude: f64) -> ClinicalAssessment {
        let policy = PolicyConfig::default();
        ClinicalSeverityClassifier::new(&policy).classify(hb, age, altitude)
    }

    #[test]
    fn test_tiers_at_sea_level() {
        assert_eq!(classify(6.5, 36, 150.0).gravity, GravityTier::Severe);
        assert_eq!(classify(8.5, 36, 150.0).gravity, GravityTier::Moderate);
        assert_eq!(classify(10.5, 36, 150.0).gravity, GravityTier::Mild);
        assert_eq!(classify(12.0, 36, 150.0).gravity, GravityTier::Normal);
    }

    #[test]
    fn test_boundaries_take_more_severe_tier() {
        for age in 6..=59 {
            assert_eq!(classify(7.0, age, 0.0).gravity, GravityTier::Severe);
            assert_eq!(classify(10.0, age, 0.0).gravity, GravityTier::Moderate);
            assert_eq!(classify(11.0, age, 0.0).gravity, GravityTier::Mild);
        }
        assert_eq!(classify(7.01, 36, 0.0).gravity, GravityTier::Moderate);
        assert_eq!(classify(10.01, 36, 0.0).gravity, GravityTier::Mild);
        assert_eq!(classify(11.01, 36, 0.0).gravity, GravityTier::Normal);
    }

    #[test]
    fn test_correction_is_added() {
        let result = classify(12.0, 40, 3800.0);
        assert!((result.correction_g_dl - 1.94).abs() < 1e-9);
        assert!((result.corrected_hb_g_dl - 13.94).abs() < 1e-9);
        assert_eq!(result.gravity, GravityTier::Normal);
        assert!((result.threshold_g_dl - 11.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_subtract_convention() {
        let mut policy = PolicyConfig::default();
        policy.altitude.sign = CorrectionSign::Subtract;
        let result = ClinicalSeverityClassifier::new(&policy).classify(12.0, 40, 3800.0);
        assert!((result.corrected_hb_g_dl - 10.06).abs() < 1e-9);
        assert_eq!(result.gravity, GravityTier::Mild);
    }

    #[test]
    fn test_age_outside_band_is_out_of_range() {
        for age in [0, 5, 60] {
            let result = classify(6.0, age, 150.0);
            assert_eq!(result.gravity, GravityTier::OutOfRange);
            assert_eq!(result.gravity.effective(), GravityTier::Normal);
            assert!(!result.gravity.is_clinical_alert());
        }
    }
}
