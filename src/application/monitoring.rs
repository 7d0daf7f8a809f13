//! Monitoring service: follow-up views and operator actions over cases.

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;

use serde::Serialize;

use crate::adapters::{export, StorageError};
use crate::domain::{AlertStatus, CaseKey, CaseRecord, RiskTier};
use crate::ports::CaseRepository;
use crate::HemoguardError;

/// Aggregate counts over the case history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CaseSummary {
    pub total: usize,
    pub by_risk: BTreeMap<String, usize>,
    pub by_status: BTreeMap<String, usize>,
    /// HIGH-verdict cases per location label.
    pub high_risk_by_region: BTreeMap<String, usize>,
    /// Cases per alert month (`YYYY-MM`).
    pub by_month: BTreeMap<String, usize>,
}

impl CaseSummary {
    fn from_cases(cases: &[CaseRecord]) -> Self {
        let mut summary = Self {
            total: cases.len(),
            ..Self::default()
        };
        for case in cases {
            *summary
                .by_risk
                .entry(case.snapshot.verdict.as_str().to_string())
                .or_default() += 1;
            *summary
                .by_status
                .entry(case.status.as_str().to_string())
                .or_default() += 1;
            if case.snapshot.verdict == RiskTier::High {
                *summary
                    .high_risk_by_region
                    .entry(case.snapshot.location.clone())
                    .or_default() += 1;
            }
            *summary
                .by_month
                .entry(case.key.date.format("%Y-%m").to_string())
                .or_default() += 1;
        }
        summary
    }
}

/// Service for case follow-up.
pub struct MonitoringService<R>
where
    R: CaseRepository,
{
    repository: Arc<R>,
}

impl<R> MonitoringService<R>
where
    R: CaseRepository,
    R::Error: Into<StorageError>,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Cases needing action: pending clinical, pending vulnerability, or in
    /// follow-up. Newest first.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    pub fn active_cases(&self) -> Result<Vec<CaseRecord>, HemoguardError> {
        self.cases_with_status(&AlertStatus::ACTIVE)
    }

    /// Cases in any of `statuses`, newest first.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    pub fn cases_with_status(&self, statuses: &[AlertStatus]) -> Result<Vec<CaseRecord>, HemoguardError> {
        self.repository
            .find_by_status(statuses)
            .map_err(|e| HemoguardError::Storage(e.into()))
    }

    /// Every case, newest first.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    pub fn history(&self) -> Result<Vec<CaseRecord>, HemoguardError> {
        self.repository
            .find_all()
            .map_err(|e| HemoguardError::Storage(e.into()))
    }

    /// Operator status change.
    ///
    /// # Returns
    /// `false` if no case exists for `key`.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    pub fn update_status(&self, key: &CaseKey, status: AlertStatus) -> Result<bool, HemoguardError> {
        let updated = self
            .repository
            .update_status(key, status)
            .map_err(|e| HemoguardError::Storage(e.into()))?;

        if updated {
            tracing::info!(case = %key, status = %status, "Case status updated");
        } else {
            tracing::warn!(case = %key, "No case to update");
        }
        Ok(updated)
    }

    /// Counts by verdict, status, region and month.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    pub fn summary(&self) -> Result<CaseSummary, HemoguardError> {
        Ok(CaseSummary::from_cases(&self.history()?))
    }

    /// Write the full history as semicolon-delimited CSV. Returns the number
    /// of rows written.
    ///
    /// # Errors
    /// Returns error if storage or the writer fails.
    pub fn export_csv<W: Write>(&self, out: W) -> Result<usize, HemoguardError> {
        let cases = self.history()?;
        let rows = export::write_cases(&cases, out)?;
        tracing::info!(rows, "Exported case history");
        Ok(rows)
    }
}
