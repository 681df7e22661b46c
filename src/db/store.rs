//! Shared handle on the report database: one connection behind a mutex.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;

use super::repository;
use super::sqlite::{open_database, open_memory_database};
use super::DatabaseError;
use crate::models::{Fingerprint, StoredReport};

pub struct ReportStore {
    conn: Mutex<Connection>,
}

impl ReportStore {
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        let conn = open_database(path)?;
        tracing::info!(path = %path.display(), "Report database opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self, DatabaseError> {
        Ok(Self {
            conn: Mutex::new(open_memory_database()?),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)
    }

    pub fn save(&self, report: &StoredReport) -> Result<bool, DatabaseError> {
        repository::insert_report(&*self.conn()?, report)
    }

    pub fn get(&self, fingerprint: &Fingerprint) -> Result<Option<StoredReport>, DatabaseError> {
        repository::get_report(&*self.conn()?, fingerprint)
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> Result<bool, DatabaseError> {
        repository::report_exists(&*self.conn()?, fingerprint)
    }

    pub fn recent(&self, limit: usize) -> Result<Vec<StoredReport>, DatabaseError> {
        repository::list_recent_reports(&*self.conn()?, limit)
    }

    pub fn count(&self) -> Result<usize, DatabaseError> {
        repository::count_reports(&*self.conn()?)
    }
}
