use serde::{Deserialize, Serialize};

use super::ExtractionError;

/// What a rasterized page carries into the OCR stage.
#[derive(Debug, Clone, PartialEq)]
pub enum PageContent {
    /// Normalized 8-bit grayscale PNG, ready for recognition.
    Bitmap(Vec<u8>),
    /// Text read straight from a PDF text layer; OCR is skipped.
    TextLayer(String),
}

/// One page of a document, numbered from 1 in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub number: usize,
    pub content: PageContent,
}

impl Page {
    pub fn bitmap(number: usize, png: Vec<u8>) -> Self {
        Self {
            number,
            content: PageContent::Bitmap(png),
        }
    }

    pub fn text_layer(number: usize, text: impl Into<String>) -> Self {
        Self {
            number,
            content: PageContent::TextLayer(text.into()),
        }
    }
}

/// Recognized text of one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageText {
    pub page_number: usize,
    pub text: String,
}

/// Pixel box of a recognized word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// A recognized word with its position on the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrWord {
    pub text: String,
    pub confidence: f32,
    /// Line index within its text block, as reported by the engine.
    pub line: u32,
    pub bounding_box: Option<BoundingBox>,
}

/// Raw OCR result from the engine
#[derive(Debug, Clone)]
pub struct OcrPageResult {
    pub text: String,
    pub confidence: f32,
    pub words: Vec<OcrWord>,
}

/// OCR engine abstraction (allows mocking for tests)
pub trait OcrEngine {
    fn ocr_image_with_lang(
        &self,
        image_bytes: &[u8],
        lang: &str,
    ) -> Result<OcrPageResult, ExtractionError>;
}
