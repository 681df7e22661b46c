pub mod types;
pub mod sanitize;
pub mod lab_correction;
pub mod preprocess;
pub mod pdf_renderer;
pub mod raster;
pub mod ocr;

pub use types::*;
pub use sanitize::*;
pub use raster::*;
pub use ocr::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Corrupt document: {0}")]
    CorruptDocument(String),

    #[error("OCR engine error: {0}")]
    OcrEngine(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),
}
