use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::document::Fingerprint;
use super::enums::{ErrorKind, JobState};

/// Opaque job token handed to polling clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Why a job ended in `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
    pub kind: ErrorKind,
    pub detail: String,
}

/// One run of the extraction pipeline for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingJob {
    pub id: JobId,
    pub fingerprint: Fingerprint,
    pub filename: String,
    pub state: JobState,
    pub error: Option<JobFailure>,
    /// Fingerprint of the ReportSummary, set once the job completed.
    pub report: Option<Fingerprint>,
    pub from_cache: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl ProcessingJob {
    pub fn queued(fingerprint: Fingerprint, filename: impl Into<String>) -> Self {
        let now = chrono::Local::now().naive_local();
        Self {
            id: JobId::new(),
            fingerprint,
            filename: filename.into(),
            state: JobState::Queued,
            error: None,
            report: None,
            from_cache: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// A job answered from an existing report, without running the pipeline.
    pub fn cached(fingerprint: Fingerprint, filename: impl Into<String>) -> Self {
        let mut job = Self::queued(fingerprint, filename);
        job.state = JobState::Completed;
        job.report = Some(job.fingerprint.clone());
        job.from_cache = true;
        job
    }
}

/// Result of a status lookup. An unknown id is a normal answer, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum JobLookup {
    Found(ProcessingJob),
    NotFound,
}
