//! Lifecycle-scoped service state.
//!
//! `CoreState` owns the job scheduler and the report store for the life of
//! the process. It is built once at startup, wrapped in `Arc`, and shared by
//! every HTTP handler.

use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::db::{DatabaseError, ReportStore};
use crate::models::document::{Document, Fingerprint};
use crate::models::job::{JobId, JobLookup, ProcessingJob};
use crate::models::report::StoredReport;
use crate::pipeline::extraction::ocr::build_ocr_engine;
use crate::pipeline::jobs::{JobScheduler, ScanOutcome, SchedulerError};
use crate::pipeline::processor::DocumentProcessor;

pub struct CoreState {
    pub config: ServiceConfig,
    scheduler: Arc<JobScheduler>,
    store: Arc<ReportStore>,
}

impl CoreState {
    /// Open the report database and build the pipeline from `config`.
    pub fn new(config: ServiceConfig) -> Result<Self, CoreError> {
        let store = Arc::new(ReportStore::open(&config.database_path)?);
        let engine = build_ocr_engine(config.tessdata_dir.as_deref(), &config.ocr_language);
        let processor = DocumentProcessor::new(engine, config.ocr_language.clone());
        Ok(Self::with_parts(config, processor, store))
    }

    /// Assemble from pre-built parts. Tests use this to inject a mock OCR engine
    /// and an in-memory store.
    pub fn with_parts(
        config: ServiceConfig,
        processor: DocumentProcessor,
        store: Arc<ReportStore>,
    ) -> Self {
        let scheduler = JobScheduler::new(
            processor,
            Arc::clone(&store),
            config.max_concurrent_jobs,
            config.max_retained_jobs,
        );
        tracing::info!(
            workers = config.max_concurrent_jobs,
            retained_jobs = config.max_retained_jobs,
            "Job scheduler ready"
        );
        Self {
            config,
            scheduler,
            store,
        }
    }

    // ── Jobs ────────────────────────────────────────────────

    /// Must be called from within a Tokio runtime.
    pub fn submit(&self, document: Document) -> Result<ProcessingJob, CoreError> {
        Ok(self.scheduler.submit(document)?)
    }

    pub fn job_status(&self, id: &JobId) -> Result<JobLookup, CoreError> {
        Ok(self.scheduler.status(id)?)
    }

    /// Submit every document in the uploads directory.
    pub async fn scan_uploads(&self) -> Result<ScanOutcome, CoreError> {
        Ok(self
            .scheduler
            .scan_directory(&self.config.uploads_dir, self.config.max_upload_bytes)
            .await?)
    }

    // ── Reports ─────────────────────────────────────────────

    pub fn recent_reports(&self) -> Result<Vec<StoredReport>, CoreError> {
        Ok(self.store.recent(self.config.recent_reports_limit)?)
    }

    pub fn report(&self, fingerprint: &Fingerprint) -> Result<Option<StoredReport>, CoreError> {
        Ok(self.store.get(fingerprint)?)
    }

    pub fn report_count(&self) -> Result<usize, CoreError> {
        Ok(self.store.count()?)
    }
}

/// Errors from CoreState operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Internal lock poisoned")]
    LockPoisoned,
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Scheduler error: {0}")]
    Scheduler(SchedulerError),
}

impl From<SchedulerError> for CoreError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::LockPoisoned => CoreError::LockPoisoned,
            SchedulerError::Database(e) => CoreError::Database(e),
            other => CoreError::Scheduler(other),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::enums::JobState;
    use crate::pipeline::extraction::ocr::MockOcrEngine;

    /// State over an in-memory store, a mock OCR engine returning `ocr_text`,
    /// and uploads under `data_dir`.
    pub(crate) fn test_core_state(ocr_text: &str, data_dir: &std::path::Path) -> Arc<CoreState> {
        let config = ServiceConfig::rooted_at(data_dir.to_path_buf());
        let processor = DocumentProcessor::new(Box::new(MockOcrEngine::new(ocr_text, 0.9)), "eng");
        let store = Arc::new(ReportStore::in_memory().unwrap());
        Arc::new(CoreState::with_parts(config, processor, store))
    }

    #[tokio::test]
    async fn submitted_report_becomes_listed() {
        let dir = tempfile::tempdir().unwrap();
        let core = test_core_state("Glucose 110 mg/dL 70-100", dir.path());
        let jpeg = crate::pipeline::extraction::pdf_renderer::fixtures::make_jpeg(120, 160);

        let job = core.submit(Document::new("cbc.jpg", None, jpeg)).unwrap();
        let mut state = job.state;
        for _ in 0..200 {
            if let JobLookup::Found(current) = core.job_status(&job.id).unwrap() {
                state = current.state;
                if state.is_terminal() {
                    break;
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        assert_eq!(state, JobState::Completed);
        assert_eq!(core.report_count().unwrap(), 1);
        let recent = core.recent_reports().unwrap();
        assert_eq!(recent[0].filename, "cbc.jpg");
        assert!(core.report(&job.fingerprint).unwrap().is_some());
    }

    #[test]
    fn new_opens_database_under_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServiceConfig::rooted_at(dir.path().to_path_buf());
        let db_path = config.database_path.clone();

        let core = CoreState::new(config).unwrap();
        assert!(db_path.exists());
        assert_eq!(core.report_count().unwrap(), 0);
    }

    #[test]
    fn scheduler_lock_poisoning_maps_to_core() {
        let err: CoreError = SchedulerError::LockPoisoned.into();
        assert!(matches!(err, CoreError::LockPoisoned));
        let err: CoreError = SchedulerError::Internal("boom".into()).into();
        assert!(matches!(err, CoreError::Scheduler(_)));
    }
}
