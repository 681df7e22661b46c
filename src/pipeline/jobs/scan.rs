use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use super::scheduler::JobScheduler;
use super::SchedulerError;
use crate::models::document::Document;
use crate::models::job::JobId;
use crate::pipeline::import::{detect_format, list_files};

/// Result of scanning a collection directory.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScanOutcome {
    /// No documents found; no jobs were created.
    Empty { message: String },
    /// One job per distinct document found, in directory listing order.
    Ok { process_ids: Vec<JobId> },
}

impl JobScheduler {
    /// Submit every document in `dir` as a job.
    ///
    /// Files that are not PDFs or images, or are larger than `max_bytes`,
    /// are skipped with a warning. Unreadable files are skipped as well.
    /// Files with identical content are submitted once.
    pub async fn scan_directory(
        self: &Arc<Self>,
        dir: &Path,
        max_bytes: u64,
    ) -> Result<ScanOutcome, SchedulerError> {
        let owned = dir.to_path_buf();
        let documents = tokio::task::spawn_blocking(move || collect_documents(&owned, max_bytes))
            .await
            .map_err(|e| SchedulerError::Internal(format!("directory scan task failed: {e}")))??;

        if documents.is_empty() {
            tracing::info!(dir = %dir.display(), "Scan found no documents");
            return Ok(ScanOutcome::Empty {
                message: format!("No documents found in {}", dir.display()),
            });
        }

        let mut process_ids = Vec::with_capacity(documents.len());
        for document in documents {
            process_ids.push(self.submit(document)?.id);
        }

        tracing::info!(dir = %dir.display(), jobs = process_ids.len(), "Scan submitted documents");
        Ok(ScanOutcome::Ok { process_ids })
    }
}

fn collect_documents(dir: &Path, max_bytes: u64) -> Result<Vec<Document>, SchedulerError> {
    let mut documents = Vec::new();
    let mut seen = HashSet::new();
    for path in list_files(dir)? {
        match read_document(&path, max_bytes) {
            Ok(Some(document)) => {
                if seen.insert(document.fingerprint().clone()) {
                    documents.push(document);
                } else {
                    tracing::debug!(path = %path.display(), "Skipping duplicate content");
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable file"),
        }
    }
    Ok(documents)
}

fn read_document(path: &Path, max_bytes: u64) -> std::io::Result<Option<Document>> {
    let size = std::fs::metadata(path)?.len();
    if size > max_bytes {
        tracing::warn!(path = %path.display(), size, max_bytes, "Skipping oversized file");
        return Ok(None);
    }

    let bytes = std::fs::read(path)?;
    let format = detect_format(&bytes);
    if !format.category.is_supported() {
        tracing::warn!(path = %path.display(), "Skipping file that is not a PDF or image");
        return Ok(None);
    }

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".into());
    Ok(Some(Document::new(filename, Some(format.mime_type), bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::JobState;
    use crate::pipeline::extraction::pdf_renderer::fixtures::make_jpeg;
    use crate::pipeline::jobs::scheduler::tests::{counting_scheduler, wait_until_done};

    #[tokio::test]
    async fn empty_directory_creates_no_jobs() {
        let (scheduler, calls) = counting_scheduler("unused");
        let dir = tempfile::tempdir().unwrap();

        let outcome = scheduler.scan_directory(dir.path(), 1 << 20).await.unwrap();
        assert!(matches!(outcome, ScanOutcome::Empty { .. }));
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_directory_is_empty() {
        let (scheduler, _) = counting_scheduler("unused");
        let dir = tempfile::tempdir().unwrap();
        let outcome = scheduler
            .scan_directory(&dir.path().join("absent"), 1 << 20)
            .await
            .unwrap();
        assert!(matches!(outcome, ScanOutcome::Empty { .. }));
    }

    #[tokio::test]
    async fn documents_submitted_others_skipped() {
        let (scheduler, _) = counting_scheduler("Glucose 110 mg/dL 70-100");
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.jpg"), make_jpeg(120, 160)).unwrap();
        std::fs::write(dir.path().join("b.jpg"), make_jpeg(160, 120)).unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"not a report").unwrap();

        let outcome = scheduler.scan_directory(dir.path(), 1 << 20).await.unwrap();
        let process_ids = match outcome {
            ScanOutcome::Ok { process_ids } => process_ids,
            other => panic!("expected jobs, got {other:?}"),
        };
        assert_eq!(process_ids.len(), 2);

        for id in &process_ids {
            assert_eq!(wait_until_done(&scheduler, id).await.state, JobState::Completed);
        }
    }

    #[tokio::test]
    async fn identical_files_share_one_job() {
        let (scheduler, calls) = counting_scheduler("Glucose 110 mg/dL 70-100");
        let dir = tempfile::tempdir().unwrap();
        let jpeg = make_jpeg(120, 160);
        std::fs::write(dir.path().join("a.jpg"), &jpeg).unwrap();
        std::fs::write(dir.path().join("a copy.jpg"), &jpeg).unwrap();
        std::fs::write(dir.path().join("b.jpg"), make_jpeg(160, 120)).unwrap();

        let process_ids = match scheduler.scan_directory(dir.path(), 1 << 20).await.unwrap() {
            ScanOutcome::Ok { process_ids } => process_ids,
            other => panic!("expected jobs, got {other:?}"),
        };
        assert_eq!(process_ids.len(), 2);
        assert_ne!(process_ids[0], process_ids[1]);

        for id in &process_ids {
            wait_until_done(&scheduler, id).await;
        }
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn oversized_files_skipped() {
        let (scheduler, _) = counting_scheduler("unused");
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("big.jpg"), make_jpeg(120, 160)).unwrap();

        let outcome = scheduler.scan_directory(dir.path(), 10).await.unwrap();
        assert!(matches!(outcome, ScanOutcome::Empty { .. }));
    }

    #[test]
    fn outcome_serializes_with_status() {
        let empty = ScanOutcome::Empty {
            message: "none".into(),
        };
        let json = serde_json::to_value(&empty).unwrap();
        assert_eq!(json["status"], "empty");
        assert_eq!(json["message"], "none");

        let ok = serde_json::to_value(ScanOutcome::Ok {
            process_ids: vec![JobId::new()],
        })
        .unwrap();
        assert_eq!(ok["status"], "ok");
        assert_eq!(ok["process_ids"].as_array().unwrap().len(), 1);
    }
}
