//! Intervention suggestions derived from an assessment.
//!
//! Suggestions are structured `(category, message)` pairs emitted in priority
//! order and deduplicated on normalized message text. Messages never contain
//! the export delimiter, so a flattened list splits back into the same items.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::clinical::{ClinicalAssessment, GravityTier};
use super::patient::{Area, PatientInput, SupplementStatus};
use super::policy::PolicyConfig;
use super::verdict::{RiskTier, RiskVerdict};

/// Separator used when a suggestion list is flattened into a single field.
pub const EXPORT_DELIMITER: &str = " | ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionCategory {
    Clinical,
    Supplementation,
    Diet,
    Age,
    Social,
    Education,
    General,
}

impl SuggestionCategory {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Clinical => "clinical",
            Self::Supplementation => "supplementation",
            Self::Diet => "diet",
            Self::Age => "age",
            Self::Social => "social",
            Self::Education => "education",
            Self::General => "general",
        }
    }
}

impl FromStr for SuggestionCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clinical" => Ok(Self::Clinical),
            "supplementation" => Ok(Self::Supplementation),
            "diet" => Ok(Self::Diet),
            "age" => Ok(Self::Age),
            "social" => Ok(Self::Social),
            "education" => Ok(Self::Education),
            "general" => Ok(Self::General),
            other => Err(format!("unknown suggestion category: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub category: SuggestionCategory,
    pub message: String,
}

impl Suggestion {
    /// Build a suggestion with whitespace collapsed and `|` replaced, keeping
    /// the message safe for the flattened export field.
    #[must_use]
    pub fn new(category: SuggestionCategory, message: impl AsRef<str>) -> Self {
        let message = message
            .as_ref()
            .replace('|', "/")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        Self { category, message }
    }

    fn dedup_key(&self) -> String {
        self.message.to_lowercase()
    }
}

impl fmt::Display for Suggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category.as_str(), self.message)
    }
}

impl FromStr for Suggestion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (category, message) = s
            .split_once(": ")
            .ok_or_else(|| format!("malformed suggestion: {s}"))?;
        Ok(Self::new(category.parse()?, message))
    }
}

/// Flatten a list for a single CSV field.
#[must_use]
pub fn join_suggestions(suggestions: &[Suggestion]) -> String {
    suggestions
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(EXPORT_DELIMITER)
}

/// Inverse of [`join_suggestions`].
///
/// # Errors
/// Returns an error for an item without a known category prefix.
pub fn split_suggestions(field: &str) -> Result<Vec<Suggestion>, String> {
    if field.is_empty() {
        return Ok(Vec::new());
    }
    field.split(EXPORT_DELIMITER).map(str::parse).collect()
}

/// Ordered list that drops repeated messages.
#[derive(Default)]
struct SuggestionList {
    seen: HashSet<String>,
    items: Vec<Suggestion>,
}

impl SuggestionList {
    fn push(&mut self, category: SuggestionCategory, message: impl AsRef<str>) {
        let suggestion = Suggestion::new(category, message);
        if self.seen.insert(suggestion.dedup_key()) {
            self.items.push(suggestion);
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SuggestionEngine<'a> {
    policy: &'a PolicyConfig,
}

impl<'a> SuggestionEngine<'a> {
    #[must_use]
    pub fn new(policy: &'a PolicyConfig) -> Self {
        Self { policy }
    }

    /// Suggestions for an assessed patient, highest priority first.
    #[must_use]
    pub fn generate(
        &self,
        verdict: &RiskVerdict,
        clinical: &ClinicalAssessment,
        input: &PatientInput,
    ) -> Vec<Suggestion> {
        use SuggestionCategory as C;

        let rules = &self.policy.suggestions;
        let ctx = &input.context;
        let effective = clinical.gravity.effective();
        let mut list = SuggestionList::default();

        match clinical.gravity {
            GravityTier::Severe => list.push(
                C::Clinical,
                "Maximum alert: immediate referral to a health facility for urgent management, \
                 including transfusion if required.",
            ),
            GravityTier::Moderate => list.push(
                C::Clinical,
                format!(
                    "Start iron treatment now (ferrous sulfate drops or syrup, or an iron \
                     multivitamin complex). Strict follow-up in {} days.",
                    rules.moderate_recheck_days
                ),
            ),
            GravityTier::Mild => list.push(
                C::Clinical,
                "Preventive supplementation: reinforce iron supplement intake \
                 (micronutrients or drops) and adjust the diet.",
            ),
            GravityTier::Normal if verdict.tier == RiskTier::Low => list.push(
                C::Clinical,
                "Hemoglobin within the normal range and low risk: continue monthly monitoring \
                 and preventive micronutrient supplementation.",
            ),
            GravityTier::Normal => list.push(
                C::Clinical,
                "Hemoglobin within the normal range: maintain an iron-rich diet and keep the \
                 household under follow-up for its vulnerability factors.",
            ),
            GravityTier::OutOfRange => list.push(
                C::Clinical,
                format!(
                    "No pediatric threshold applies at {} months: refer for an age-appropriate \
                     clinical evaluation of the hemoglobin result.",
                    input.age_months
                ),
            ),
        }

        if ctx.iron_supplement == SupplementStatus::Absent && effective != GravityTier::Normal {
            list.push(
                C::Supplementation,
                "Iron supplementation is essential: start age-appropriate iron \
                 (micronutrients or drops) and coordinate with the local health post.",
            );
            if effective != GravityTier::Severe {
                list.push(
                    C::Diet,
                    "Promote daily heme-iron foods (blood sausage, chicken or beef liver, dark \
                     fish) together with vitamin C to improve absorption.",
                );
                list.push(
                    C::Diet,
                    "Avoid dairy and tannin-rich drinks (tea, coffee) close to iron-rich meals.",
                );
            }
        }

        if input.age_months < rules.infant_below_months {
            list.push(
                C::Age,
                "Prioritize nutritional counseling for children under 2 years, with emphasis on \
                 iron-rich complementary feeding.",
            );
        }

        let low_income = ctx.household_income < self.policy.vulnerability.income_floor;
        if low_income || ctx.mother_education.is_low() {
            let programs = &ctx.programs;
            let missing: Vec<&str> = [
                (!programs.conditional_transfer, "Juntos"),
                (!programs.milk_program, "Vaso de Leche"),
                (!programs.school_feeding, "Qali Warma"),
            ]
            .into_iter()
            .filter_map(|(missing, name)| missing.then_some(name))
            .collect();

            if missing.is_empty() {
                list.push(
                    C::Social,
                    "Review food security with the social programs the household is already \
                     enrolled in.",
                );
            } else {
                list.push(
                    C::Social,
                    format!(
                        "Coordinate enrollment in social programs ({}) to secure household food \
                         security.",
                        missing.join(", ")
                    ),
                );
            }
        }

        if ctx.area == Area::Rural {
            list.push(
                C::Education,
                "Health education adapted to the rural context on hygiene and parasite \
                 prevention, which affect iron absorption. Confirm access to the nearest \
                 health post.",
            );
        }

        list.push(
            C::General,
            format!(
                "Recheck hemoglobin within {} days to evaluate the response to the intervention.",
                rules.recheck_days
            ),
        );

        list.items
    }
}
