//! Case repository port: Trait for persisting follow-up cases.
//!
//! Abstracts the storage backend (SQLite or in-process) from the services.

use crate::domain::{AlertStatus, CaseKey, CaseRecord};

/// Trait for case persistence.
///
/// Implementations must make `insert_case` idempotent on [`CaseKey`]:
/// concurrent submissions for the same `(dni, date)` persist exactly one case.
pub trait CaseRepository: Send + Sync {
    /// Error type for repository operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Insert a new case.
    ///
    /// # Returns
    /// `false` if a case with the same key already exists.
    ///
    /// # Errors
    /// Returns error if the backend fails.
    fn insert_case(&self, record: &CaseRecord) -> Result<bool, Self::Error>;

    /// Change the status of an existing case.
    ///
    /// # Returns
    /// `false` if no case has this key.
    ///
    /// # Errors
    /// Returns error if the backend fails.
    fn update_status(&self, key: &CaseKey, status: AlertStatus) -> Result<bool, Self::Error>;

    /// Cases whose status is one of `statuses`, newest first.
    ///
    /// # Errors
    /// Returns error if the backend fails or a stored value is unreadable.
    fn find_by_status(&self, statuses: &[AlertStatus]) -> Result<Vec<CaseRecord>, Self::Error>;

    /// All cases, newest first.
    ///
    /// # Errors
    /// Returns error if the backend fails or a stored value is unreadable.
    fn find_all(&self) -> Result<Vec<CaseRecord>, Self::Error>;

    /// Look up one case.
    ///
    /// # Errors
    /// Returns error if the backend fails or a stored value is unreadable.
    fn find_case(&self, key: &CaseKey) -> Result<Option<CaseRecord>, Self::Error>;

    /// Total number of cases.
    ///
    /// # Errors
    /// Returns error if the backend fails.
    fn count_cases(&self) -> Result<usize, Self::Error>;
}
