//! Patient intake record for anemia screening.
//!
//! Collected by the intake form (children 0-60 months, Peruvian DNI).
//! Every categorical attribute is a closed enumeration; unknown values are
//! rejected when the record is deserialized instead of being coerced.

use serde::{Deserialize, Serialize};

use super::policy::IntakeLimits;
use super::region::Region;

/// Intake record refused at the boundary. Each variant names its field.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("dni: expected exactly 8 numeric characters")]
    Dni,

    #[error("name: must not be empty")]
    Name,

    #[error("hemoglobin_g_dl: {value} outside [{min}, {max}]")]
    Hemoglobin { value: f64, min: f64, max: f64 },

    #[error("age_months: {value} outside [{min}, {max}]")]
    AgeMonths { value: u32, min: u32, max: u32 },

    #[error("location: altitude must be a finite number of meters")]
    Altitude,

    #[error("household_income: {0} must be a finite, non-negative amount")]
    HouseholdIncome(f64),

    #[error("children: {value} outside [{min}, {max}]")]
    Children { value: u8, min: u8, max: u8 },
}

impl ValidationError {
    /// Name of the offending input field.
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            Self::Dni => "dni",
            Self::Name => "name",
            Self::Hemoglobin { .. } => "hemoglobin_g_dl",
            Self::AgeMonths { .. } => "age_months",
            Self::Altitude => "location",
            Self::HouseholdIncome(_) => "household_income",
            Self::Children { .. } => "children",
        }
    }
}

/// Where the patient lives: a known region or a measured altitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    Region(Region),
    AltitudeM(f64),
}

impl Location {
    /// Altitude used for the correction, with unknown regions mapped to
    /// `default_altitude_m`. Negative altitudes are clamped to sea level.
    #[must_use]
    pub fn altitude_m(&self, default_altitude_m: f64) -> f64 {
        let meters = match self {
            Self::Region(region) => region.altitude_m().unwrap_or(default_altitude_m),
            Self::AltitudeM(meters) => *meters,
        };
        meters.max(0.0)
    }

    /// Label stored with the case record.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Region(region) => region.label().to_string(),
            Self::AltitudeM(meters) => format!("{meters:.0} m"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Female,
    Male,
}

/// Area of residence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Area {
    Urban,
    Rural,
}

/// Highest education level reached by the mother.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EducationLevel {
    NoSchooling,
    Initial,
    Primary,
    Secondary,
    TechnicalHigher,
    University,
}

impl EducationLevel {
    /// Initial education or none at all.
    #[must_use]
    pub fn is_low(self) -> bool {
        matches!(self, Self::NoSchooling | Self::Initial)
    }
}

/// Whether the child currently receives an iron supplement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupplementStatus {
    Receiving,
    Absent,
}

/// Enrollment in social programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramEnrollment {
    /// School feeding (Qali Warma).
    pub school_feeding: bool,
    /// Conditional cash transfer (Juntos).
    pub conditional_transfer: bool,
    /// Milk program (Vaso de Leche).
    pub milk_program: bool,
}

/// Socioeconomic and contextual attributes of the household.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseholdContext {
    pub area: Area,
    /// Monthly household income in soles.
    pub household_income: f64,
    /// Number of children living in the household.
    pub children: u8,
    pub mother_education: EducationLevel,
    #[serde(default)]
    pub programs: ProgramEnrollment,
    pub iron_supplement: SupplementStatus,
}

/// One screening request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientInput {
    /// National identity document, 8 digits.
    pub dni: String,
    pub name: String,
    pub sex: Sex,
    /// Measured (uncorrected) hemoglobin in g/dL.
    pub hemoglobin_g_dl: f64,
    pub age_months: u32,
    pub location: Location,
    pub context: HouseholdContext,
}

impl PatientInput {
    /// Check identity and numeric fields against the intake limits.
    ///
    /// # Errors
    /// Returns the first `ValidationError` found, naming the field.
    pub fn validate(&self, limits: &IntakeLimits) -> Result<(), ValidationError> {
        if self.dni.len() != 8 || !self.dni.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::Dni);
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::Name);
        }
        if !(limits.hemoglobin_min_g_dl..=limits.hemoglobin_max_g_dl)
            .contains(&self.hemoglobin_g_dl)
        {
            return Err(ValidationError::Hemoglobin {
                value: self.hemoglobin_g_dl,
                min: limits.hemoglobin_min_g_dl,
                max: limits.hemoglobin_max_g_dl,
            });
        }
        if !(limits.age_min_months..=limits.age_max_months).contains(&self.age_months) {
            return Err(ValidationError::AgeMonths {
                value: self.age_months,
                min: limits.age_min_months,
                max: limits.age_max_months,
            });
        }
        if let Location::AltitudeM(meters) = self.location {
            if !meters.is_finite() {
                return Err(ValidationError::Altitude);
            }
        }
        let income = self.context.household_income;
        if !income.is_finite() || income < 0.0 {
            return Err(ValidationError::HouseholdIncome(income));
        }
        if !(limits.children_min..=limits.children_max).contains(&self.context.children) {
            return Err(ValidationError::Children {
                value: self.context.children,
                min: limits.children_min,
                max: limits.children_max,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A valid urban, supplemented household at sea level.
    pub fn patient(hemoglobin_g_dl: f64, age_months: u32) -> PatientInput {
        PatientInput {
            dni: "45678912".to_string(),
            name: "Ana Torres".to_string(),
            sex: Sex::Female,
            hemoglobin_g_dl,
            age_months,
            location: Location::AltitudeM(150.0),
            context: HouseholdContext {
                area: Area::Urban,
                household_income: 1800.0,
                children: 2,
                mother_education: EducationLevel::Secondary,
                programs: ProgramEnrollment {
                    conditional_transfer: true,
                    ..ProgramEnrollment::default()
                },
                iron_supplement: SupplementStatus::Receiving,
            },
        }
    }
}
