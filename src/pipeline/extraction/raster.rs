use std::sync::Arc;

use crate::models::enums::FileCategory;
use crate::pipeline::import::detect_format;

use super::pdf_renderer::PdfPages;
use super::preprocess::prepare_page_image;
use super::types::Page;
use super::ExtractionError;

/// Lazy page sequence. Each item is decoded only when pulled.
pub type PageStream = Box<dyn Iterator<Item = Result<Page, ExtractionError>> + Send>;

/// Turns document bytes into OCR-ready pages.
///
/// The format is taken from the bytes themselves; the declared MIME type
/// plays no part in routing.
#[derive(Debug, Default, Clone, Copy)]
pub struct Rasterizer;

impl Rasterizer {
    /// Fails up front on unknown formats and on PDFs whose structure cannot
    /// be read; per-page decode failures surface while iterating.
    pub fn rasterize(&self, bytes: Arc<[u8]>) -> Result<PageStream, ExtractionError> {
        let format = detect_format(&bytes);

        match format.category {
            FileCategory::Pdf => {
                let pages = PdfPages::open(bytes)?;
                tracing::debug!(pages = pages.page_count(), "PDF opened");
                Ok(Box::new(pages))
            }
            FileCategory::Image => {
                let page = std::iter::once_with(move || {
                    prepare_page_image(&bytes).map(|png| Page::bitmap(1, png))
                });
                Ok(Box::new(page))
            }
            FileCategory::Unsupported => Err(ExtractionError::UnsupportedFormat(
                "content is not a PDF, PNG, JPEG or TIFF".into(),
            )),
        }
    }

    /// Only the first page, for previews. `None` for an empty sequence.
    pub fn first_page(&self, bytes: Arc<[u8]>) -> Result<Option<Page>, ExtractionError> {
        self.rasterize(bytes)?.next().transpose()
    }
}
