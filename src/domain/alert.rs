//! Follow-up case lifecycle.
//!
//! A case is created once per `(dni, date)` with an initial status chosen
//! from the assessment; every later transition is an operator action.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::clinical::GravityTier;
use super::suggestion::Suggestion;
use super::verdict::{RiskTier, RiskVerdict};

/// Unknown status text. Stored values never default silently.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown alert status: {0}")]
pub struct UnknownStatus(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    Registered,
    PendingClinical,
    PendingVulnerability,
    InFollowup,
    Resolved,
    ClosedNotApplicable,
}

impl AlertStatus {
    pub const ALL: [AlertStatus; 6] = [
        Self::Registered,
        Self::PendingClinical,
        Self::PendingVulnerability,
        Self::InFollowup,
        Self::Resolved,
        Self::ClosedNotApplicable,
    ];

    /// Statuses shown in the monitoring view.
    pub const ACTIVE: [AlertStatus; 3] = [
        Self::PendingClinical,
        Self::PendingVulnerability,
        Self::InFollowup,
    ];

    #[must_use]
    pub fn is_active(self) -> bool {
        Self::ACTIVE.contains(&self)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Registered => "REGISTERED",
            Self::PendingClinical => "PENDING_CLINICAL",
            Self::PendingVulnerability => "PENDING_VULNERABILITY",
            Self::InFollowup => "IN_FOLLOWUP",
            Self::Resolved => "RESOLVED",
            Self::ClosedNotApplicable => "CLOSED_NOT_APPLICABLE",
        }
    }

    /// Status a new case starts in.
    #[must_use]
    pub fn initial(verdict: &RiskVerdict) -> Self {
        if verdict.gravity.effective().is_clinical_alert() {
            Self::PendingClinical
        } else if verdict.tier == RiskTier::High {
            Self::PendingVulnerability
        } else {
            Self::Registered
        }
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Identity of a case: one per patient per assessment date.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaseKey {
    pub dni: String,
    pub date: NaiveDate,
}

impl CaseKey {
    #[must_use]
    pub fn new(dni: impl Into<String>, date: NaiveDate) -> Self {
        Self { dni: dni.into(), date }
    }
}

impl fmt::Display for CaseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.dni, self.date.format("%Y-%m-%d"))
    }
}

/// Immutable view of the assessment at case creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseSnapshot {
    pub name: String,
    pub hemoglobin_g_dl: f64,
    pub corrected_hb_g_dl: f64,
    pub age_months: u32,
    pub location: String,
    pub gravity: GravityTier,
    pub verdict: RiskTier,
    pub qualifier: String,
    pub suggestions: Vec<Suggestion>,
}

/// Persisted case. `status` is the only mutable field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    /// Assigned by the repository on insert.
    pub id: Option<i64>,
    pub key: CaseKey,
    pub snapshot: CaseSnapshot,
    pub status: AlertStatus,
    pub created_at: DateTime<Utc>,
}
