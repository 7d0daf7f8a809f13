//! SQLite adapter: Implementation of CaseRepository.
//!
//! One row per case, unique on `(dni, alert_date)`. The assessment snapshot is
//! stored as a JSON column since it is never queried field by field.
//!
//! # Mutex Behavior
//!
//! The connection is protected by a `Mutex`. A poisoned mutex is reported as
//! [`StorageError::Unavailable`] so the assessment path can fail open.
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, params_from_iter, Connection};

use crate::adapters::StorageError;
use crate::domain::{AlertStatus, CaseKey, CaseRecord, CaseSnapshot};
use crate::ports::CaseRepository;

/// Environment variable naming the database file.
pub const DB_PATH_ENV: &str = "HEMOGUARD_DB_PATH";
/// Database file used when [`DB_PATH_ENV`] is unset.
pub const DEFAULT_DB_PATH: &str = "hemoguard.db";

const DATE_FORMAT: &str = "%Y-%m-%d";

const SELECT_COLUMNS: &str = "SELECT id, dni, alert_date, status, snapshot, created_at FROM cases";
const NEWEST_FIRST: &str = "ORDER BY created_at DESC, id DESC";

/// Row as stored, before domain decoding.
type RawCase = (i64, String, String, String, String, String);

/// SQLite case repository.
pub struct SqliteCaseRepository {
    conn: Mutex<Connection>,
}

impl SqliteCaseRepository {
    /// Open (or create) the database at `path`.
    ///
    /// # Errors
    /// Returns error if database cannot be opened or initialized.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        let repo = Self {
            conn: Mutex::new(conn),
        };
        repo.init_schema()?;
        Ok(repo)
    }

    /// Create an in-memory SQLite database.
    ///
    /// # Errors
    /// Returns error if database cannot be created.
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let repo = Self {
            conn: Mutex::new(conn),
        };
        repo.init_schema()?;
        Ok(repo)
    }

    /// Open the database named by `HEMOGUARD_DB_PATH` (`:memory:` for an
    /// in-process database), defaulting to `hemoguard.db`.
    ///
    /// # Errors
    /// Returns error if database cannot be opened or initialized.
    pub fn from_env() -> Result<Self, StorageError> {
        let path = std::env::var(DB_PATH_ENV).unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());
        if path.trim() == ":memory:" {
            tracing::info!("Using in-memory case database");
            Self::in_memory()
        } else {
            tracing::info!(path = %path, "Opening case database");
            Self::new(path.trim())
        }
    }

    fn init_schema(&self) -> Result<(), StorageError> {
        let conn = self.lock()?;

        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS cases (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                dni TEXT NOT NULL,
                alert_date TEXT NOT NULL,
                status TEXT NOT NULL,
                snapshot TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE (dni, alert_date)
            );

            CREATE INDEX IF NOT EXISTS idx_cases_status
                ON cases(status);
            CREATE INDEX IF NOT EXISTS idx_cases_created
                ON cases(created_at DESC);
            ",
        )?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Unavailable("connection lock poisoned".to_string()))
    }

    fn query_cases<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<CaseRecord>, StorageError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;

        let rows = stmt
            .query_map(params, |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            })?
            .collect::<Result<Vec<RawCase>, _>>()?;

        rows.into_iter().map(decode_case).collect()
    }
}

/// Decode a stored row, rejecting any value outside its domain.
fn decode_case(raw: RawCase) -> Result<CaseRecord, StorageError> {
    let (id, dni, alert_date, status, snapshot, created_at) = raw;

    let date = NaiveDate::parse_from_str(&alert_date, DATE_FORMAT)
        .map_err(|e| StorageError::Corrupt(format!("case {id}: alert_date {alert_date:?}: {e}")))?;
    let status: AlertStatus = status
        .parse()
        .map_err(|e| StorageError::Corrupt(format!("case {id}: {e}")))?;
    let snapshot: CaseSnapshot = serde_json::from_str(&snapshot)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Corrupt(format!("case {id}: created_at {created_at:?}: {e}")))?;

    Ok(CaseRecord {
        id: Some(id),
        key: CaseKey::new(dni, date),
        snapshot,
        status,
        created_at,
    })
}

impl CaseRepository for SqliteCaseRepository {
    type Error = StorageError;

    fn insert_case(&self, record: &CaseRecord) -> Result<bool, Self::Error> {
        let snapshot = serde_json::to_string(&record.snapshot)?;
        let conn = self.lock()?;

        let inserted = conn.execute(
            r"
            INSERT INTO cases (dni, alert_date, status, snapshot, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (dni, alert_date) DO NOTHING
            ",
            params![
                record.key.dni,
                record.key.date.format(DATE_FORMAT).to_string(),
                record.status.as_str(),
                snapshot,
                record.created_at.to_rfc3339(),
            ],
        )?;

        if inserted == 0 {
            tracing::debug!(case = %record.key, "Case already registered");
        } else {
            tracing::debug!(case = %record.key, status = %record.status, "Saved case");
        }
        Ok(inserted > 0)
    }

    fn update_status(&self, key: &CaseKey, status: AlertStatus) -> Result<bool, Self::Error> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE cases SET status = ?1 WHERE dni = ?2 AND alert_date = ?3",
            params![status.as_str(), key.dni, key.date.format(DATE_FORMAT).to_string()],
        )?;
        Ok(changed > 0)
    }

    fn find_by_status(&self, statuses: &[AlertStatus]) -> Result<Vec<CaseRecord>, Self::Error> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; statuses.len()].join(", ");
        let sql = format!("{SELECT_COLUMNS} WHERE status IN ({placeholders}) {NEWEST_FIRST}");
        self.query_cases(&sql, params_from_iter(statuses.iter().map(|s| s.as_str())))
    }

    fn find_all(&self) -> Result<Vec<CaseRecord>, Self::Error> {
        self.query_cases(&format!("{SELECT_COLUMNS} {NEWEST_FIRST}"), [])
    }

    fn find_case(&self, key: &CaseKey) -> Result<Option<CaseRecord>, Self::Error> {
        let sql = format!("{SELECT_COLUMNS} WHERE dni = ?1 AND alert_date = ?2");
        let mut found = self.query_cases(&sql, params![key.dni, key.date.format(DATE_FORMAT).to_string()])?;
        Ok(found.pop())
    }

    fn count_cases(&self) -> Result<usize, Self::Error> {
        let conn = self.lock()?;

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM cases", [], |row| row.get(0))?;

        usize::try_from(count).map_err(|_| StorageError::Corrupt(format!("negative case count {count}")))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use chrono::Duration;

    use super::*;
    use crate::domain::{assess, fixtures::patient, PolicyConfig};

    fn case(dni: &str, day: u32, hb: f64) -> CaseRecord {
        let mut input = patient(hb, 36);
        input.dni = dni.to_string();
        let date = NaiveDate::from_ymd_opt(2024, 6, day).expect("valid date");
        let mut record = assess(&input, &PolicyConfig::default())
            .expect("Should assess")
            .to_case(&input, date);
        record.created_at += Duration::seconds(i64::from(day));
        record
    }

    #[test]
    fn test_case_crud() {
        let repo = SqliteCaseRepository::in_memory().expect("Should create db");
        assert_eq!(repo.count_cases().expect("Should count"), 0);

        let record = case("45678912", 1, 6.5);
        assert!(repo.insert_case(&record).expect("Should insert"));
        assert_eq!(repo.count_cases().expect("Should count"), 1);

        let loaded = repo
            .find_case(&record.key)
            .expect("Should load")
            .expect("Should exist");
        assert!(loaded.id.is_some());
        assert_eq!(loaded.key, record.key);
        assert_eq!(loaded.snapshot, record.snapshot);
        assert_eq!(loaded.status, AlertStatus::PendingClinical);

        assert!(repo
            .update_status(&record.key, AlertStatus::InFollowup)
            .expect("Should update"));
        let loaded = repo.find_case(&record.key).expect("Should load").expect("Should exist");
        assert_eq!(loaded.status, AlertStatus::InFollowup);
        assert_eq!(loaded.snapshot, record.snapshot);
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let repo = SqliteCaseRepository::in_memory().expect("Should create db");
        let record = case("45678912", 1, 6.5);

        assert!(repo.insert_case(&record).expect("Should insert"));
        assert!(!repo.insert_case(&case("45678912", 1, 12.0)).expect("Should not fail"));
        assert_eq!(repo.count_cases().expect("Should count"), 1);

        let kept = repo.find_case(&record.key).expect("Should load").expect("Should exist");
        assert!((kept.snapshot.hemoglobin_g_dl - 6.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_update_unknown_key() {
        let repo = SqliteCaseRepository::in_memory().expect("Should create db");
        let key = CaseKey::new("11111111", NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date"));
        assert!(!repo.update_status(&key, AlertStatus::Resolved).expect("Should not fail"));
    }

    #[test]
    fn test_find_by_status_newest_first() {
        let repo = SqliteCaseRepository::in_memory().expect("Should create db");
        repo.insert_case(&case("10000001", 1, 6.5)).expect("Should insert");
        repo.insert_case(&case("10000002", 2, 12.5)).expect("Should insert");
        repo.insert_case(&case("10000003", 3, 8.5)).expect("Should insert");

        let active = repo.find_by_status(&AlertStatus::ACTIVE).expect("Should query");
        let dnis: Vec<_> = active.iter().map(|c| c.key.dni.as_str()).collect();
        assert_eq!(dnis, vec!["10000003", "10000001"]);

        assert_eq!(repo.find_all().expect("Should query").len(), 3);
        assert!(repo.find_by_status(&[]).expect("Should query").is_empty());
    }

    #[test]
    fn test_unknown_stored_status_fails_loudly() {
        let repo = SqliteCaseRepository::in_memory().expect("Should create db");
        let record = case("45678912", 1, 6.5);
        repo.insert_case(&record).expect("Should insert");

        repo.lock()
            .expect("Should lock")
            .execute("UPDATE cases SET status = 'ARCHIVED'", [])
            .expect("Should tamper");

        let err = repo.find_all().expect_err("Should reject unknown status");
        assert!(matches!(err, StorageError::Corrupt(_)));
    }

    #[test]
    fn test_concurrent_duplicates_persist_once() {
        let repo = Arc::new(SqliteCaseRepository::in_memory().expect("Should create db"));
        let record = case("45678912", 1, 6.5);

        let inserted: usize = thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let repo = Arc::clone(&repo);
                    let record = record.clone();
                    s.spawn(move || repo.insert_case(&record).expect("Should insert"))
                })
                .collect();
            handles
                .into_iter()
                .map(|h| usize::from(h.join().expect("thread")))
                .sum()
        });

        assert_eq!(inserted, 1);
        assert_eq!(repo.count_cases().expect("Should count"), 1);
    }

    #[test]
    fn test_file_database_persists() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let path = dir.path().join("cases.db");
        let record = case("45678912", 1, 10.5);

        {
            let repo = SqliteCaseRepository::new(&path).expect("Should open");
            repo.insert_case(&record).expect("Should insert");
        }
        let repo = SqliteCaseRepository::new(&path).expect("Should reopen");
        assert_eq!(repo.count_cases().expect("Should count"), 1);
    }
}
