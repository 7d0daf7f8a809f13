//! Vulnerability scoring from socioeconomic and contextual factors.
//!
//! A deterministic weighted-rule score that stands in for a trained
//! classifier's probability: each present risk factor adds its weight to the
//! base score, serious clinical gravity lifts the score to a floor, and the
//! result is clamped to the policy bounds before tiering.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::clinical::ClinicalAssessment;
use super::patient::{Area, PatientInput, SupplementStatus};
use super::policy::{FactorWeights, VulnerabilityPolicy};

/// Scores are kept to six decimals so weight sums land exactly on cut points.
const SCORE_SCALE: f64 = 1e6;

fn round_score(value: f64) -> f64 {
    (value * SCORE_SCALE).round() / SCORE_SCALE
}

/// Discretized vulnerability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VulnerabilityTier {
    Low,
    Medium,
    High,
}

impl fmt::Display for VulnerabilityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
        }
    }
}

/// A risk factor that contributed to the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactor {
    LowHemoglobin,
    BorderlineHemoglobin,
    YoungAge,
    LowIncome,
    RuralResidence,
    LowMaternalEducation,
    LargeHousehold,
    NoIronSupplement,
    NoConditionalTransfer,
    HighAltitude,
}

impl RiskFactor {
    /// Increment this factor adds to the score.
    #[must_use]
    pub fn weight(self, weights: &FactorWeights) -> f64 {
        match self {
            Self::LowHemoglobin => weights.low_hemoglobin,
            Self::BorderlineHemoglobin => weights.borderline_hemoglobin,
            Self::YoungAge => weights.young_age,
            Self::LowIncome => weights.low_income,
            Self::RuralResidence => weights.rural_residence,
            Self::LowMaternalEducation => weights.low_maternal_education,
            Self::LargeHousehold => weights.large_household,
            Self::NoIronSupplement => weights.no_iron_supplement,
            Self::NoConditionalTransfer => weights.no_conditional_transfer,
            Self::HighAltitude => weights.high_altitude,
        }
    }
}

/// Output of the vulnerability scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VulnerabilityAssessment {
    /// Probability-like score within the policy clamp.
    pub score: f64,
    pub tier: VulnerabilityTier,
    /// Factors present, in evaluation order.
    pub factors: Vec<RiskFactor>,
    /// Whether clinical gravity lifted the score to the floor.
    pub clinical_floor_applied: bool,
}

/// Weighted-rule scorer.
#[derive(Debug, Clone, Copy)]
pub struct VulnerabilityScorer<'a> {
    policy: &'a VulnerabilityPolicy,
}

impl<'a> VulnerabilityScorer<'a> {
    #[must_use]
    pub fn new(policy: &'a VulnerabilityPolicy) -> Self {
        Self { policy }
    }

    /// Score a validated intake record.
    ///
    /// The hemoglobin band uses the altitude-corrected value and the altitude
    /// factor uses the altitude the correction was computed for.
    #[must_use]
    pub fn score(&self, input: &PatientInput, clinical: &ClinicalAssessment) -> VulnerabilityAssessment {
        let factors = self.risk_factors(input, clinical);
        let p = self.policy;

        let weighted = round_score(
            factors
                .iter()
                .fold(p.base_score, |acc, factor| acc + factor.weight(&p.weights)),
        );

        let clinical_floor_applied =
            clinical.gravity.is_clinical_alert() && weighted < p.clinical_floor;
        let raw = if clinical.gravity.is_clinical_alert() {
            weighted.max(p.clinical_floor)
        } else {
            weighted
        };
        let score = raw.clamp(p.min_score, p.max_score);

        VulnerabilityAssessment {
            score,
            tier: self.tier_for(score),
            factors,
            clinical_floor_applied,
        }
    }

    /// Tier for a score under the policy's cut points.
    #[must_use]
    pub fn tier_for(&self, score: f64) -> VulnerabilityTier {
        if score >= self.policy.high_cut {
            VulnerabilityTier::High
        } else if score >= self.policy.medium_cut {
            VulnerabilityTier::Medium
        } else {
            VulnerabilityTier::Low
        }
    }

    fn risk_factors(&self, input: &PatientInput, clinical: &ClinicalAssessment) -> Vec<RiskFactor> {
        let p = self.policy;
        let ctx = &input.context;
        let hb = clinical.corrected_hb_g_dl;
        let mut factors = Vec::new();

        if hb < p.low_hemoglobin_below_g_dl {
            factors.push(RiskFactor::LowHemoglobin);
        } else if hb < p.borderline_hemoglobin_below_g_dl {
            factors.push(RiskFactor::BorderlineHemoglobin);
        }
        if input.age_months <= p.young_age_max_months {
            factors.push(RiskFactor::YoungAge);
        }
        if ctx.household_income < p.income_floor {
            factors.push(RiskFactor::LowIncome);
        }
        if ctx.area == Area::Rural {
            factors.push(RiskFactor::RuralResidence);
        }
        if ctx.mother_education.is_low() {
            factors.push(RiskFactor::LowMaternalEducation);
        }
        if ctx.children > p.large_household_above {
            factors.push(RiskFactor::LargeHousehold);
        }
        if ctx.iron_supplement == SupplementStatus::Absent {
            factors.push(RiskFactor::NoIronSupplement);
        }
        if !ctx.programs.conditional_transfer {
            factors.push(RiskFactor::NoConditionalTransfer);
        }
        if clinical.altitude_m > p.high_altitude_above_m {
            factors.push(RiskFactor::HighAltitude);
        }

        factors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clinical::ClinicalSeverityClassifier;
    use crate::domain::patient::fixtures::patient;
    use crate::domain::patient::{EducationLevel, Location};
    use crate::domain::policy::PolicyConfig;

    fn run(input: &PatientInput, policy: &PolicyConfig) -> VulnerabilityAssessment {
        let altitude = input.location.altitude_m(policy.altitude.default_altitude_m);
        let clinical = ClinicalSeverityClassifier::new(policy).classify(
            input.hemoglobin_g_dl,
            input.age_months,
            altitude,
        );
        VulnerabilityScorer::new(&policy.vulnerability).score(input, &clinical)
    }

    #[test]
    fn test_protected_household_scores_low() {
        let policy = PolicyConfig::default();
        let result = run(&patient(12.5, 36), &policy);

        assert!(result.factors.is_empty());
        assert!((result.score - 0.01).abs() < 1e-9, "clamped to min score");
        assert_eq!(result.tier, VulnerabilityTier::Low);
    }

    #[test]
    fn test_high_altitude_rural_household() {
        let policy = PolicyConfig::default();
        let mut input = patient(12.0, 40);
        input.location = Location::AltitudeM(3800.0);
        input.context.household_income = 800.0;
        input.context.area = Area::Rural;
        input.context.iron_supplement = SupplementStatus::Absent;
        input.context.programs.conditional_transfer = false;

        let result = run(&input, &policy);
        assert_eq!(
            result.factors,
            vec![
                RiskFactor::LowIncome,
                RiskFactor::RuralResidence,
                RiskFactor::NoIronSupplement,
                RiskFactor::NoConditionalTransfer,
                RiskFactor::HighAltitude,
            ]
        );
        assert!((result.score - 0.55).abs() < 1e-9);
        assert_eq!(result.tier, VulnerabilityTier::High);
    }

    #[test]
    fn test_every_factor_clamps_to_max() {
        let policy = PolicyConfig::default();
        let mut input = patient(9.5, 12);
        input.location = Location::AltitudeM(3500.0);
        input.context.household_income = 300.0;
        input.context.area = Area::Rural;
        input.context.mother_education = EducationLevel::NoSchooling;
        input.context.children = 6;
        input.context.iron_supplement = SupplementStatus::Absent;
        input.context.programs.conditional_transfer = false;

        let result = run(&input, &policy);
        assert_eq!(result.factors.len(), 9);
        assert!((result.score - 0.99).abs() < 1e-9);
    }

    #[test]
    fn test_clinical_alert_forces_floor() {
        let policy = PolicyConfig::default();
        let input = patient(6.5, 36);
        let result = run(&input, &policy);

        assert_eq!(result.factors, vec![RiskFactor::LowHemoglobin]);
        assert!(result.clinical_floor_applied);
        assert!((result.score - 0.85).abs() < 1e-9);
        assert_eq!(result.tier, VulnerabilityTier::High);
    }

    #[test]
    fn test_out_of_range_age_gets_no_floor() {
        let policy = PolicyConfig::default();
        let input = patient(6.5, 60);
        let result = run(&input, &policy);
        assert!(!result.clinical_floor_applied);
        assert!((result.score - 0.40).abs() < 1e-9);
    }

    #[test]
    fn test_tier_cut_points_are_configuration() {
        let mut policy = PolicyConfig::default();
        policy.vulnerability.high_cut = 0.70;
        policy.vulnerability.medium_cut = 0.40;
        let scorer = VulnerabilityScorer::new(&policy.vulnerability);

        assert_eq!(scorer.tier_for(0.69), VulnerabilityTier::Medium);
        assert_eq!(scorer.tier_for(0.70), VulnerabilityTier::High);
        assert_eq!(scorer.tier_for(0.39), VulnerabilityTier::Low);
    }

    #[test]
    fn test_sum_on_high_cut_is_high() {
        let policy = PolicyConfig::default();
        let mut input = patient(12.5, 18);
        input.context.household_income = 1000.0;
        input.context.mother_education = EducationLevel::Initial;
        input.context.programs.conditional_transfer = false;

        let result = run(&input, &policy);
        assert_eq!(
            result.factors,
            vec![
                RiskFactor::YoungAge,
                RiskFactor::LowIncome,
                RiskFactor::LowMaternalEducation,
                RiskFactor::NoConditionalTransfer,
            ]
        );
        assert_eq!(result.score, policy.vulnerability.high_cut);
        assert_eq!(result.tier, VulnerabilityTier::High);
    }

    #[test]
    fn test_sum_on_medium_cut_is_medium() {
        let policy = PolicyConfig::default();
        let mut input = patient(12.5, 18);
        input.context.programs.conditional_transfer = false;

        let result = run(&input, &policy);
        assert_eq!(
            result.factors,
            vec![RiskFactor::YoungAge, RiskFactor::NoConditionalTransfer]
        );
        assert_eq!(result.score, policy.vulnerability.medium_cut);
        assert_eq!(result.tier, VulnerabilityTier::Medium);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let policy = PolicyConfig::default();
        let mut input = patient(10.2, 18);
        input.context.area = Area::Rural;
        let first = run(&input, &policy);
        for _ in 0..10 {
            assert_eq!(run(&input, &policy), first);
        }
    }
}
