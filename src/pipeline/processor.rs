//! Document processing: the stage sequence run once per job.
//!
//! rasterize → OCR → clean → parse → classify → aggregate
//!
//! Each stage completes for the whole document before the next begins.
//! The OCR engine is injected so the sequence runs against a mock in tests.

use crate::models::document::Document;
use crate::models::enums::ErrorKind;
use crate::models::report::ReportSummary;
use crate::pipeline::aggregate::aggregate;
use crate::pipeline::classify::classify_records;
use crate::pipeline::extraction::{
    recognize_page, sanitize_extracted_text, ExtractionError, OcrEngine, PageText, Rasterizer,
};
use crate::pipeline::import::{check_declared_mime, detect_format};
use crate::pipeline::parsing::parse_pages;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that end a processing run.
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("No extractable content: {0}")]
    NoExtractableContent(String),
}

impl ProcessingError {
    /// Kind recorded on the failed job.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Extraction(ExtractionError::UnsupportedFormat(_)) => ErrorKind::UnsupportedFormat,
            Self::Extraction(ExtractionError::CorruptDocument(_)) => ErrorKind::CorruptDocument,
            Self::Extraction(ExtractionError::OcrEngine(_)) => ErrorKind::OcrEngineError,
            Self::Extraction(ExtractionError::ImageProcessing(_)) => ErrorKind::Internal,
            Self::NoExtractableContent(_) => ErrorKind::NoExtractableContent,
        }
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Output of one successful run.
#[derive(Debug, Clone)]
pub struct ProcessedReport {
    pub summary: ReportSummary,
    pub mime_type: String,
    pub page_count: usize,
}

// ---------------------------------------------------------------------------
// Processor
// ---------------------------------------------------------------------------

/// Runs the extraction pipeline for one document at a time.
///
/// Blocking and CPU-heavy; callers run it off the async executor.
pub struct DocumentProcessor {
    rasterizer: Rasterizer,
    engine: Box<dyn OcrEngine + Send + Sync>,
    lang: String,
}

impl DocumentProcessor {
    pub fn new(engine: Box<dyn OcrEngine + Send + Sync>, lang: impl Into<String>) -> Self {
        Self {
            rasterizer: Rasterizer,
            engine,
            lang: lang.into(),
        }
    }

    pub fn process(&self, document: &Document) -> Result<ProcessedReport, ProcessingError> {
        let format = detect_format(document.bytes());
        check_declared_mime(document.filename(), document.declared_mime(), &format);

        let pages = self.extract_pages(document)?;
        let page_count = pages.len();
        if page_count == 0 {
            return Err(ProcessingError::NoExtractableContent(
                "document has no pages".into(),
            ));
        }
        if pages.iter().all(|p| p.text.trim().is_empty()) {
            return Err(ProcessingError::NoExtractableContent(format!(
                "no text found on {page_count} page(s)"
            )));
        }

        let parsed = parse_pages(&pages);
        let mut records = parsed.records;
        classify_records(&mut records);

        let summary = aggregate(
            document.fingerprint().clone(),
            records,
            parsed.patient_info,
            page_count,
        );

        tracing::info!(
            fingerprint = %document.fingerprint(),
            pages = page_count,
            tests = summary.total_tests(),
            abnormal = summary.abnormal_count(),
            "Document processed"
        );

        Ok(ProcessedReport {
            summary,
            mime_type: format.mime_type,
            page_count,
        })
    }

    /// Rasterize every page, then recognize them in order. A page that
    /// fails to rasterize fails the document before any OCR runs.
    fn extract_pages(&self, document: &Document) -> Result<Vec<PageText>, ProcessingError> {
        let pages = self
            .rasterizer
            .rasterize(document.shared_bytes())?
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(pages = pages.len(), "Document rasterized");

        let mut texts = Vec::with_capacity(pages.len());
        for page in pages {
            let raw = recognize_page(self.engine.as_ref(), page, &self.lang)?;
            texts.push(PageText {
                page_number: raw.page_number,
                text: sanitize_extracted_text(&raw.text),
            });
        }
        Ok(texts)
    }
}
