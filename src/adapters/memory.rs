//! In-process adapter: CaseRepository backed by a locked vector.
//!
//! Useful for tests and one-shot runs where nothing should touch disk.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::adapters::StorageError;
use crate::domain::{AlertStatus, CaseKey, CaseRecord};
use crate::ports::CaseRepository;

#[derive(Default)]
pub struct MemoryCaseRepository {
    cases: RwLock<Vec<CaseRecord>>,
}

impl MemoryCaseRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<CaseRecord>>, StorageError> {
        self.cases
            .read()
            .map_err(|_| StorageError::Unavailable("case store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<CaseRecord>>, StorageError> {
        self.cases
            .write()
            .map_err(|_| StorageError::Unavailable("case store lock poisoned".to_string()))
    }

    fn newest_first<'a>(cases: impl Iterator<Item = &'a CaseRecord>) -> Vec<CaseRecord> {
        let mut found: Vec<CaseRecord> = cases.cloned().collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        found
    }
}

impl CaseRepository for MemoryCaseRepository {
    type Error = StorageError;

    fn insert_case(&self, record: &CaseRecord) -> Result<bool, Self::Error> {
        // Check and insert under one write guard.
        let mut cases = self.write()?;
        if cases.iter().any(|c| c.key == record.key) {
            return Ok(false);
        }
        let id = i64::try_from(cases.len())
            .map_err(|_| StorageError::Unavailable("case store full".to_string()))?
            + 1;
        cases.push(CaseRecord {
            id: Some(id),
            ..record.clone()
        });
        Ok(true)
    }

    fn update_status(&self, key: &CaseKey, status: AlertStatus) -> Result<bool, Self::Error> {
        let mut cases = self.write()?;
        match cases.iter_mut().find(|c| &c.key == key) {
            Some(case) => {
                case.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn find_by_status(&self, statuses: &[AlertStatus]) -> Result<Vec<CaseRecord>, Self::Error> {
        let cases = self.read()?;
        Ok(Self::newest_first(cases.iter().filter(|c| statuses.contains(&c.status))))
    }

    fn find_all(&self) -> Result<Vec<CaseRecord>, Self::Error> {
        let cases = self.read()?;
        Ok(Self::newest_first(cases.iter()))
    }

    fn find_case(&self, key: &CaseKey) -> Result<Option<CaseRecord>, Self::Error> {
        Ok(self.read()?.iter().find(|c| &c.key == key).cloned())
    }

    fn count_cases(&self) -> Result<usize, Self::Error> {
        Ok(self.read()?.len())
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use chrono::NaiveDate;

    use super::*;
    use crate::domain::{assess, fixtures::patient, PolicyConfig};

    fn case(dni: &str, hb: f64) -> CaseRecord {
        let mut input = patient(hb, 36);
        input.dni = dni.to_string();
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).expect("valid date");
        assess(&input, &PolicyConfig::default())
            .expect("Should assess")
            .to_case(&input, date)
    }

    #[test]
    fn test_insert_update_find() {
        let repo = MemoryCaseRepository::new();
        let record = case("45678912", 8.5);

        assert!(repo.insert_case(&record).expect("Should insert"));
        assert!(!repo.insert_case(&record).expect("Should not fail"));
        assert_eq!(repo.count_cases().expect("Should count"), 1);

        assert!(repo
            .update_status(&record.key, AlertStatus::Resolved)
            .expect("Should update"));
        assert!(repo.find_by_status(&AlertStatus::ACTIVE).expect("Should query").is_empty());

        let stored = repo.find_case(&record.key).expect("Should find").expect("Should exist");
        assert_eq!(stored.id, Some(1));
        assert_eq!(stored.status, AlertStatus::Resolved);
    }

    #[test]
    fn test_update_unknown_key() {
        let repo = MemoryCaseRepository::new();
        assert!(!repo
            .update_status(&case("45678912", 8.5).key, AlertStatus::Resolved)
            .expect("Should not fail"));
    }

    #[test]
    fn test_concurrent_duplicates_persist_once() {
        let repo = MemoryCaseRepository::new();
        let record = case("45678912", 6.5);

        let inserted: usize = thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| repo.insert_case(&record).expect("Should insert")))
                .collect();
            handles
                .into_iter()
                .map(|h| usize::from(h.join().expect("thread")))
                .sum()
        });

        assert_eq!(inserted, 1);
        assert_eq!(repo.count_cases().expect("Should count"), 1);
    }
}
