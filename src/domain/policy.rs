//! Screening policy: every numeric constant the pipeline uses.
//!
//! Breakpoints, thresholds and weights are data, not literals scattered
//! through the control flow. The defaults reproduce the field deployment;
//! a JSON file named by `HEMOGUARD_POLICY_FILE` overrides any subset of them.
//!
//! A policy file that fails to parse or validate is an error. Falling back to
//! defaults silently would hide a miscalibrated deployment.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Environment variable naming a JSON policy file.
pub const POLICY_FILE_ENV: &str = "HEMOGUARD_POLICY_FILE";

/// Errors raised while loading or validating a policy.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("failed to read policy file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse policy: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid policy: {0}")]
    Invalid(String),
}

/// Whether the altitude correction is added to or subtracted from measured Hb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionSign {
    Add,
    Subtract,
}

/// A point of the altitude correction table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub altitude_m: f64,
    pub delta_g_dl: f64,
}

/// Altitude correction table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AltitudePolicy {
    /// Strictly increasing in altitude, non-decreasing in delta. Below the
    /// first breakpoint the correction is zero.
    pub breakpoints: Vec<Breakpoint>,

    /// Extra correction per 1000 m above the last breakpoint.
    pub per_1000m_above_last: f64,

    /// Altitude used when the region is unknown.
    pub default_altitude_m: f64,

    pub sign: CorrectionSign,
}

impl Default for AltitudePolicy {
    fn default() -> Self {
        Self {
            breakpoints: vec![
                Breakpoint { altitude_m: 1000.0, delta_g_dl: 0.2 },
                Breakpoint { altitude_m: 2000.0, delta_g_dl: 0.7 },
                Breakpoint { altitude_m: 3000.0, delta_g_dl: 1.3 },
                Breakpoint { altitude_m: 4000.0, delta_g_dl: 2.1 },
            ],
            per_1000m_above_last: 0.2,
            default_altitude_m: 500.0,
            sign: CorrectionSign::Add,
        }
    }
}

/// Age band and hemoglobin cut points for clinical gravity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClinicalPolicy {
    pub band_min_months: u32,
    pub band_max_months: u32,
    /// Normal floor inside the supported band.
    pub normal_floor_g_dl: f64,
    /// Floor reported for ages outside the band.
    pub fallback_floor_g_dl: f64,
    /// Corrected Hb at or below this is SEVERE.
    pub severe_max_g_dl: f64,
    /// Corrected Hb at or below this (and above severe) is MODERATE.
    pub moderate_max_g_dl: f64,
}

impl Default for ClinicalPolicy {
    fn default() -> Self {
        Self {
            band_min_months: 6,
            band_max_months: 59,
            normal_floor_g_dl: 11.0,
            fallback_floor_g_dl: 11.0,
            severe_max_g_dl: 7.0,
            moderate_max_g_dl: 10.0,
        }
    }
}

/// Increments added per risk factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactorWeights {
    pub low_hemoglobin: f64,
    pub borderline_hemoglobin: f64,
    pub young_age: f64,
    pub low_income: f64,
    pub rural_residence: f64,
    pub low_maternal_education: f64,
    pub large_household: f64,
    pub no_iron_supplement: f64,
    pub no_conditional_transfer: f64,
    pub high_altitude: f64,
}

impl FactorWeights {
    fn named(&self) -> [(&'static str, f64); 10] {
        [
            ("low_hemoglobin", self.low_hemoglobin),
            ("borderline_hemoglobin", self.borderline_hemoglobin),
            ("young_age", self.young_age),
            ("low_income", self.low_income),
            ("rural_residence", self.rural_residence),
            ("low_maternal_education", self.low_maternal_education),
            ("large_household", self.large_household),
            ("no_iron_supplement", self.no_iron_supplement),
            ("no_conditional_transfer", self.no_conditional_transfer),
            ("high_altitude", self.high_altitude),
        ]
    }
}

impl Default for FactorWeights {
    fn default() -> Self {
        Self {
            low_hemoglobin: 0.40,
            borderline_hemoglobin: 0.15,
            young_age: 0.20,
            low_income: 0.15,
            rural_residence: 0.10,
            low_maternal_education: 0.10,
            large_household: 0.05,
            no_iron_supplement: 0.15,
            no_conditional_transfer: 0.05,
            high_altitude: 0.10,
        }
    }
}

/// Weighted-rule vulnerability scorer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VulnerabilityPolicy {
    pub base_score: f64,
    pub weights: FactorWeights,

    pub low_hemoglobin_below_g_dl: f64,
    pub borderline_hemoglobin_below_g_dl: f64,
    pub young_age_max_months: u32,
    /// Monthly household income (soles) below which income is a risk factor.
    pub income_floor: f64,
    /// Households with more children than this count as large.
    pub large_household_above: u8,
    pub high_altitude_above_m: f64,

    /// Score floor forced by SEVERE or MODERATE clinical gravity.
    pub clinical_floor: f64,
    pub min_score: f64,
    pub max_score: f64,

    pub high_cut: f64,
    pub medium_cut: f64,
}

impl Default for VulnerabilityPolicy {
    fn default() -> Self {
        Self {
            base_score: 0.0,
            weights: FactorWeights::default(),
            low_hemoglobin_below_g_dl: 10.0,
            borderline_hemoglobin_below_g_dl: 11.5,
            young_age_max_months: 24,
            income_floor: 1500.0,
            large_household_above: 3,
            high_altitude_above_m: 3000.0,
            clinical_floor: 0.85,
            min_score: 0.01,
            max_score: 0.99,
            high_cut: 0.50,
            medium_cut: 0.25,
        }
    }
}

/// Follow-up intervals used in suggestion text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionPolicy {
    pub recheck_days: u32,
    pub moderate_recheck_days: u32,
    /// Children younger than this get the complementary-feeding counseling.
    pub infant_below_months: u32,
}

impl Default for SuggestionPolicy {
    fn default() -> Self {
        Self {
            recheck_days: 30,
            moderate_recheck_days: 7,
            infant_below_months: 24,
        }
    }
}

/// Plausibility limits applied to intake records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeLimits {
    pub hemoglobin_min_g_dl: f64,
    pub hemoglobin_max_g_dl: f64,
    pub age_min_months: u32,
    pub age_max_months: u32,
    pub children_min: u8,
    pub children_max: u8,
}

impl Default for IntakeLimits {
    fn default() -> Self {
        Self {
            hemoglobin_min_g_dl: 5.0,
            hemoglobin_max_g_dl: 18.0,
            age_min_months: 0,
            age_max_months: 60,
            children_min: 1,
            children_max: 15,
        }
    }
}

/// Complete screening policy.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub altitude: AltitudePolicy,
    pub clinical: ClinicalPolicy,
    pub vulnerability: VulnerabilityPolicy,
    pub suggestions: SuggestionPolicy,
    pub intake: IntakeLimits,
}

impl PolicyConfig {
    /// Load the policy named by `HEMOGUARD_POLICY_FILE`, or the defaults when
    /// the variable is unset.
    ///
    /// # Errors
    /// Returns error if the file cannot be read, parsed or validated.
    pub fn load() -> Result<Self, PolicyError> {
        match std::env::var(POLICY_FILE_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_json_file(path.trim()),
            _ => Ok(Self::default()),
        }
    }

    /// Load a policy from a JSON file. Missing sections keep their defaults.
    ///
    /// # Errors
    /// Returns error if the file cannot be read, parsed or validated.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, PolicyError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let policy = Self::from_json_str(&raw)?;
        tracing::info!("Loaded screening policy from {:?}", path.as_ref());
        Ok(policy)
    }

    /// Parse and validate a JSON policy.
    ///
    /// # Errors
    /// Returns error if the JSON is malformed or the policy is inconsistent.
    pub fn from_json_str(raw: &str) -> Result<Self, PolicyError> {
        let policy: Self = serde_json::from_str(raw)?;
        policy.validate()?;
        Ok(policy)
    }

    /// Check internal consistency.
    ///
    /// # Errors
    /// Returns `PolicyError::Invalid` describing the first violation found.
    pub fn validate(&self) -> Result<(), PolicyError> {
        let alt = &self.altitude;
        let mut previous = Breakpoint { altitude_m: 0.0, delta_g_dl: 0.0 };
        for (i, bp) in alt.breakpoints.iter().enumerate() {
            if !bp.altitude_m.is_finite() || !bp.delta_g_dl.is_finite() {
                return Err(invalid(format!("altitude breakpoint {i} is not finite")));
            }
            if i > 0 && bp.altitude_m <= previous.altitude_m {
                return Err(invalid(format!(
                    "altitude breakpoints must strictly increase (breakpoint {i} at {} m)",
                    bp.altitude_m
                )));
            }
            if bp.altitude_m < 0.0 || bp.delta_g_dl < previous.delta_g_dl {
                return Err(invalid(format!(
                    "altitude corrections must be non-negative and non-decreasing (breakpoint {i})"
                )));
            }
            previous = *bp;
        }
        if !(alt.per_1000m_above_last >= 0.0) {
            return Err(invalid("per_1000m_above_last must be non-negative".into()));
        }
        if !(alt.default_altitude_m >= 0.0) {
            return Err(invalid("default_altitude_m must be non-negative".into()));
        }

        let clin = &self.clinical;
        if clin.band_min_months > clin.band_max_months {
            return Err(invalid("clinical age band is empty".into()));
        }
        if !(clin.severe_max_g_dl < clin.moderate_max_g_dl
            && clin.moderate_max_g_dl < clin.normal_floor_g_dl)
        {
            return Err(invalid(
                "clinical cut points must satisfy severe < moderate < normal floor".into(),
            ));
        }

        let vul = &self.vulnerability;
        if !(0.0 <= vul.min_score && vul.min_score < vul.max_score && vul.max_score <= 1.0) {
            return Err(invalid("score clamp must satisfy 0 <= min < max <= 1".into()));
        }
        if !(vul.base_score >= 0.0) {
            return Err(invalid("base_score must be non-negative".into()));
        }
        if let Some((name, _)) = vul.weights.named().into_iter().find(|(_, w)| !(*w >= 0.0)) {
            return Err(invalid(format!("weight {name} must be non-negative")));
        }
        if !(vul.min_score <= vul.clinical_floor && vul.clinical_floor <= vul.max_score) {
            return Err(invalid("clinical_floor must lie within the score clamp".into()));
        }
        if !(vul.medium_cut < vul.high_cut) {
            return Err(invalid("medium_cut must be below high_cut".into()));
        }
        if !(vul.low_hemoglobin_below_g_dl <= vul.borderline_hemoglobin_below_g_dl) {
            return Err(invalid(
                "low hemoglobin cut must not exceed the borderline cut".into(),
            ));
        }

        let intake = &self.intake;
        if !(intake.hemoglobin_min_g_dl < intake.hemoglobin_max_g_dl)
            || intake.age_min_months > intake.age_max_months
            || intake.children_min > intake.children_max
        {
            return Err(invalid("intake limits must form non-empty ranges".into()));
        }

        Ok(())
    }
}

fn invalid(message: String) -> PolicyError {
    PolicyError::Invalid(message)
}
