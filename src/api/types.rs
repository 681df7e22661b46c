//! Shared types for the HTTP layer: handler context and response bodies.

use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::core_state::CoreState;
use crate::models::document::Fingerprint;
use crate::models::enums::JobState;
use crate::models::job::{JobFailure, JobId, JobLookup, ProcessingJob};
use crate::models::report::{ReportSummary, StoredReport};

/// Shared context for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }
}

// ═══════════════════════════════════════════════════════════
// Response bodies
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub job_id: JobId,
    pub status: JobState,
    pub from_cache: bool,
    pub fingerprint: Fingerprint,
    pub filename: String,
}

impl From<ProcessingJob> for UploadResponse {
    fn from(job: ProcessingJob) -> Self {
        Self {
            job_id: job.id,
            status: job.state,
            from_cache: job.from_cache,
            fingerprint: job.fingerprint,
            filename: job.filename,
        }
    }
}

/// Job status as polled by clients. `not_found` is a status, not an error.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_cache: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<Fingerprint>,
}

impl From<JobLookup> for StatusResponse {
    fn from(lookup: JobLookup) -> Self {
        match lookup {
            JobLookup::Found(job) => Self {
                status: job.state.as_str(),
                error: job.error,
                from_cache: Some(job.from_cache),
                fingerprint: Some(job.fingerprint),
            },
            JobLookup::NotFound => Self {
                status: "not_found",
                error: None,
                from_cache: None,
                fingerprint: None,
            },
        }
    }
}

/// One listed report with its extracted data.
#[derive(Debug, Serialize)]
pub struct ReportEntry {
    pub fingerprint: Fingerprint,
    pub filename: String,
    pub mime_type: String,
    pub uploaded_at: NaiveDateTime,
    pub size: u64,
    pub page_count: usize,
    pub ocr_data: ReportSummary,
}

impl From<StoredReport> for ReportEntry {
    fn from(report: StoredReport) -> Self {
        Self {
            fingerprint: report.summary.fingerprint.clone(),
            filename: report.filename,
            mime_type: report.mime_type,
            uploaded_at: report.uploaded_at,
            size: report.size_bytes,
            page_count: report.page_count,
            ocr_data: report.summary,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecentReportsResponse {
    pub reports: Vec<ReportEntry>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}
