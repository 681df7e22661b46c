//! Processing job cache and scheduler.
//!
//! Submitting a document either answers from an existing report, joins the
//! run already in flight for the same bytes, or queues a new run. Runs
//! execute on the blocking pool, at most `max_concurrent` at a time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::Semaphore;

use super::table::JobTable;
use super::SchedulerError;
use crate::db::ReportStore;
use crate::models::document::{Document, Fingerprint};
use crate::models::enums::{ErrorKind, JobState};
use crate::models::job::{JobFailure, JobId, JobLookup, ProcessingJob};
use crate::models::report::StoredReport;
use crate::pipeline::processor::DocumentProcessor;

pub struct JobScheduler {
    processor: Arc<DocumentProcessor>,
    store: Arc<ReportStore>,
    jobs: RwLock<JobTable>,
    /// Fingerprint → the job currently extracting it.
    inflight: Mutex<HashMap<Fingerprint, JobId>>,
    permits: Arc<Semaphore>,
}

impl JobScheduler {
    pub fn new(
        processor: DocumentProcessor,
        store: Arc<ReportStore>,
        max_concurrent: usize,
        max_retained: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            processor: Arc::new(processor),
            store,
            jobs: RwLock::new(JobTable::new(max_retained)),
            inflight: Mutex::new(HashMap::new()),
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        })
    }

    pub fn store(&self) -> &ReportStore {
        &self.store
    }

    // ── Submission ──────────────────────────────────────────

    /// Register a document for processing and return a snapshot of its job.
    ///
    /// - bytes already being extracted: the in-flight job is returned
    /// - report already stored: a new job, completed and `from_cache`
    /// - otherwise: a new queued job, run in the background
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit(self: &Arc<Self>, document: Document) -> Result<ProcessingJob, SchedulerError> {
        let fingerprint = document.fingerprint().clone();
        let mut inflight = self.lock_inflight()?;

        if let Some(leader) = inflight.get(&fingerprint) {
            if let Some(job) = self.read_jobs()?.get(leader).cloned() {
                tracing::debug!(job_id = %job.id, fingerprint = %fingerprint, "Joined in-flight job");
                return Ok(job);
            }
        }

        if self.store.contains(&fingerprint)? {
            let job = ProcessingJob::cached(fingerprint, document.filename());
            self.write_jobs()?.insert(job.clone());
            tracing::info!(job_id = %job.id, fingerprint = %job.fingerprint, "Served from cache");
            return Ok(job);
        }

        let job = ProcessingJob::queued(fingerprint.clone(), document.filename());
        self.write_jobs()?.insert(job.clone());
        inflight.insert(fingerprint, job.id);
        drop(inflight);

        tracing::info!(
            job_id = %job.id,
            fingerprint = %job.fingerprint,
            filename = %job.filename,
            size = document.size_bytes(),
            "Job queued"
        );

        let scheduler = Arc::clone(self);
        let id = job.id;
        tokio::spawn(async move { scheduler.run(id, document).await });

        Ok(job)
    }

    // ── Status ──────────────────────────────────────────────

    pub fn status(&self, id: &JobId) -> Result<JobLookup, SchedulerError> {
        Ok(match self.read_jobs()?.get(id) {
            Some(job) => JobLookup::Found(job.clone()),
            None => JobLookup::NotFound,
        })
    }

    // ── Execution ───────────────────────────────────────────

    async fn run(self: Arc<Self>, id: JobId, document: Document) {
        let _permit = match Arc::clone(&self.permits).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                self.finish(
                    id,
                    document.fingerprint(),
                    Err(JobFailure {
                        kind: ErrorKind::Internal,
                        detail: "scheduler is shutting down".into(),
                    }),
                );
                return;
            }
        };

        self.update_job(&id, |job| job.state = JobState::Running);
        tracing::info!(job_id = %id, "Job running");

        let processor = Arc::clone(&self.processor);
        let store = Arc::clone(&self.store);
        let doc = document.clone();
        let outcome = tokio::task::spawn_blocking(move || process_and_store(&processor, &store, &doc)).await;

        let result = outcome.unwrap_or_else(|e| {
            Err(JobFailure {
                kind: ErrorKind::Internal,
                detail: format!("pipeline task failed: {e}"),
            })
        });
        self.finish(id, document.fingerprint(), result);
    }

    /// Record the terminal state and release the fingerprint.
    ///
    /// The report is already stored when this runs, and the in-flight
    /// entry is removed under the same lock `submit` holds, so a racing
    /// submission sees either the finished job or the stored report.
    fn finish(&self, id: JobId, fingerprint: &Fingerprint, result: Result<(), JobFailure>) {
        let inflight = self.inflight.lock();

        match result {
            Ok(()) => {
                self.update_job(&id, |job| {
                    job.state = JobState::Completed;
                    job.report = Some(job.fingerprint.clone());
                });
                tracing::info!(job_id = %id, fingerprint = %fingerprint, "Job completed");
            }
            Err(failure) => {
                tracing::error!(
                    job_id = %id,
                    fingerprint = %fingerprint,
                    kind = %failure.kind,
                    detail = %failure.detail,
                    "Job failed"
                );
                self.update_job(&id, |job| {
                    job.state = JobState::Error;
                    job.error = Some(failure);
                });
            }
        }

        match inflight {
            Ok(mut inflight) => {
                inflight.remove(fingerprint);
            }
            Err(_) => tracing::error!(job_id = %id, "In-flight table lock poisoned"),
        }
    }

    fn update_job(&self, id: &JobId, f: impl FnOnce(&mut ProcessingJob)) {
        match self.jobs.write() {
            Ok(mut jobs) => {
                if !jobs.update(id, f) {
                    tracing::warn!(job_id = %id, "Job vanished before update");
                }
            }
            Err(_) => tracing::error!(job_id = %id, "Job table lock poisoned"),
        }
    }

    // ── Lock helpers ────────────────────────────────────────

    fn read_jobs(&self) -> Result<RwLockReadGuard<'_, JobTable>, SchedulerError> {
        self.jobs.read().map_err(|_| SchedulerError::LockPoisoned)
    }

    fn write_jobs(&self) -> Result<RwLockWriteGuard<'_, JobTable>, SchedulerError> {
        self.jobs.write().map_err(|_| SchedulerError::LockPoisoned)
    }

    fn lock_inflight(&self) -> Result<MutexGuard<'_, HashMap<Fingerprint, JobId>>, SchedulerError> {
        self.inflight.lock().map_err(|_| SchedulerError::LockPoisoned)
    }
}

/// Blocking part of a job: the pipeline, then persistence of its report.
fn process_and_store(
    processor: &DocumentProcessor,
    store: &ReportStore,
    document: &Document,
) -> Result<(), JobFailure> {
    let processed = processor.process(document).map_err(|e| JobFailure {
        kind: e.kind(),
        detail: e.to_string(),
    })?;

    let report = StoredReport {
        filename: document.filename().to_string(),
        mime_type: processed.mime_type,
        size_bytes: document.size_bytes(),
        page_count: processed.page_count,
        uploaded_at: document.uploaded_at(),
        summary: processed.summary,
    };
    store.save(&report).map_err(|e| JobFailure {
        kind: ErrorKind::Internal,
        detail: format!("failed to store report: {e}"),
    })?;
    Ok(())
}
