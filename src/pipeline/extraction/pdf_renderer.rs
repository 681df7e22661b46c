//! PDF page access using lopdf.
//!
//! Scanned lab reports are PDFs whose pages each wrap one image XObject.
//! Digitally generated reports carry a text layer instead, which is read
//! directly and never goes through OCR.

use std::sync::Arc;

use image::{DynamicImage, GrayImage, RgbImage};
use lopdf::{Document, Object, ObjectId};

use super::preprocess::{encode_png, normalize_gray, prepare_page_image};
use super::types::Page;
use super::ExtractionError;

/// Lazily yields the pages of one PDF, in document order.
pub struct PdfPages {
    doc: Document,
    pages: Vec<(u32, ObjectId)>,
    next: usize,
}

impl PdfPages {
    /// Parse the PDF structure. Pages are only decoded when iterated.
    pub fn open(pdf_bytes: Arc<[u8]>) -> Result<Self, ExtractionError> {
        let doc = Document::load_mem(&pdf_bytes)
            .map_err(|e| ExtractionError::CorruptDocument(format!("Failed to parse PDF: {e}")))?;

        if doc.is_encrypted() {
            return Err(ExtractionError::CorruptDocument(
                "PDF is password-protected".into(),
            ));
        }

        let pages: Vec<(u32, ObjectId)> = doc.get_pages().into_iter().collect();
        if pages.is_empty() {
            return Err(ExtractionError::CorruptDocument("PDF has no pages".into()));
        }

        Ok(Self {
            doc,
            pages,
            next: 0,
        })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn render(&self, page_number: u32, page_id: ObjectId) -> Result<Page, ExtractionError> {
        let number = page_number as usize;

        if let Some(image) = extract_largest_page_image(&self.doc, page_id)? {
            let png = match image {
                PageImage::Encoded(bytes) => prepare_page_image(&bytes)?,
                PageImage::Decoded(gray) => encode_png(normalize_gray(gray))?,
            };
            tracing::debug!(page = number, png_size = png.len(), "Rasterized PDF page image");
            return Ok(Page::bitmap(number, png));
        }

        // No scan on this page: fall back to the text layer (possibly empty).
        let text = match self.doc.extract_text(&[page_number]) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(page = number, error = %e, "PDF text layer unreadable");
                String::new()
            }
        };
        tracing::debug!(page = number, chars = text.len(), "Read PDF text layer");
        Ok(Page::text_layer(number, text))
    }
}

impl Iterator for PdfPages {
    type Item = Result<Page, ExtractionError>;

    fn next(&mut self) -> Option<Self::Item> {
        let &(page_number, page_id) = self.pages.get(self.next)?;
        self.next += 1;
        Some(self.render(page_number, page_id))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.pages.len() - self.next;
        (remaining, Some(remaining))
    }
}

/// An image XObject either as a self-describing file (JPEG, PNG, TIFF) or
/// as raw pixels already turned into a grayscale buffer.
enum PageImage {
    Encoded(Vec<u8>),
    Decoded(GrayImage),
}

impl PageImage {
    fn pixel_area(&self, dict: &lopdf::Dictionary) -> i64 {
        match self {
            Self::Decoded(img) => img.width() as i64 * img.height() as i64,
            Self::Encoded(_) => {
                let width = get_int(dict, b"Width").unwrap_or(0);
                width.saturating_mul(get_int(dict, b"Height").unwrap_or(0))
            }
        }
    }
}

/// Find the largest image XObject on a page.
///
/// Walks: page dict → /Resources → /XObject → /Subtype /Image entries.
/// A page without resources or images yields `None`.
fn extract_largest_page_image(
    doc: &Document,
    page_id: ObjectId,
) -> Result<Option<PageImage>, ExtractionError> {
    let page_dict = doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|e| ExtractionError::CorruptDocument(format!("Page object error: {e}")))?;

    let Some(resources) = resolve_dict_entry(doc, page_dict, b"Resources") else {
        return Ok(None);
    };
    let Some(xobjects) = resolve_dict_entry(doc, resources, b"XObject") else {
        return Ok(None);
    };

    let mut largest: Option<(i64, PageImage)> = None;

    for (_name, obj_ref) in xobjects.iter() {
        let stream = match resolve_object(doc, obj_ref) {
            Object::Stream(s) => s,
            _ => continue,
        };
        if !is_image_subtype(&stream.dict) {
            continue;
        }

        let image = extract_image(doc, stream)?;
        let area = image.pixel_area(&stream.dict);
        if largest.as_ref().map_or(true, |(prev, _)| area > *prev) {
            largest = Some((area, image));
        }
    }

    Ok(largest.map(|(_, image)| image))
}

fn is_image_subtype(dict: &lopdf::Dictionary) -> bool {
    dict.get(b"Subtype")
        .map(|obj| matches!(obj, Object::Name(n) if n == b"Image"))
        .unwrap_or(false)
}

fn has_filter(dict: &lopdf::Dictionary, name: &[u8]) -> bool {
    match dict.get(b"Filter") {
        Ok(Object::Name(n)) => n == name,
        Ok(Object::Array(arr)) => arr
            .iter()
            .any(|o| matches!(o, Object::Name(n) if n == name)),
        _ => false,
    }
}

fn extract_image(doc: &Document, stream: &lopdf::Stream) -> Result<PageImage, ExtractionError> {
    if has_filter(&stream.dict, b"DCTDecode") {
        // DCTDecode content is a complete JPEG file.
        return Ok(PageImage::Encoded(stream.content.clone()));
    }

    let content = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());

    // Some producers embed whole PNG/TIFF files
    if image::guess_format(&content).is_ok() {
        return Ok(PageImage::Encoded(content));
    }

    decode_raw_pixels(doc, &stream.dict, content).map(PageImage::Decoded)
}

/// Rebuild 8-bit Gray or RGB raw samples using the image dictionary.
fn decode_raw_pixels(
    doc: &Document,
    dict: &lopdf::Dictionary,
    raw: Vec<u8>,
) -> Result<GrayImage, ExtractionError> {
    let width = get_int(dict, b"Width")?;
    let height = get_int(dict, b"Height")?;
    let bpc = get_int(dict, b"BitsPerComponent").unwrap_or(8);

    if width <= 0 || height <= 0 {
        return Err(ExtractionError::CorruptDocument(format!(
            "Invalid image size {width}x{height}"
        )));
    }
    if bpc != 8 {
        return Err(ExtractionError::CorruptDocument(format!(
            "Unsupported bits per component: {bpc}"
        )));
    }
    let (Ok(width), Ok(height)) = (u32::try_from(width), u32::try_from(height)) else {
        return Err(ExtractionError::CorruptDocument(format!(
            "Image size {width}x{height} out of range"
        )));
    };
    let channels = color_channels(doc, dict)?;
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|area| area.checked_mul(channels))
        .ok_or_else(|| {
            ExtractionError::CorruptDocument(format!("Image size {width}x{height} out of range"))
        })?;

    if raw.len() < expected {
        return Err(ExtractionError::CorruptDocument(format!(
            "Raw pixel buffer too small: {} bytes, expected {expected}",
            raw.len()
        )));
    }

    let mut raw = raw;
    raw.truncate(expected);

    let gray = match channels {
        1 => GrayImage::from_raw(width, height, raw),
        _ => RgbImage::from_raw(width, height, raw)
            .map(|rgb| DynamicImage::ImageRgb8(rgb).to_luma8()),
    };
    gray.ok_or_else(|| ExtractionError::CorruptDocument("Pixel buffer mismatch".into()))
}

/// 1 for DeviceGray, 3 for DeviceRGB (and ICC profiles with N = 1 or 3).
fn color_channels(doc: &Document, dict: &lopdf::Dictionary) -> Result<usize, ExtractionError> {
    let cs = match dict.get(b"ColorSpace") {
        Ok(obj) => resolve_object(doc, obj),
        Err(_) => return Ok(3),
    };

    let channels = match cs {
        Object::Name(n) => match n.as_slice() {
            b"DeviceGray" | b"CalGray" => 1,
            b"DeviceRGB" | b"CalRGB" => 3,
            _ => 0,
        },
        Object::Array(arr) => match (arr.first(), arr.get(1)) {
            (Some(Object::Name(n)), Some(profile)) if n == b"ICCBased" => {
                match resolve_object(doc, profile) {
                    Object::Stream(s) => get_int(&s.dict, b"N").unwrap_or(3) as usize,
                    _ => 3,
                }
            }
            _ => 0,
        },
        _ => 0,
    };

    match channels {
        1 | 3 => Ok(channels),
        _ => Err(ExtractionError::CorruptDocument(
            "Unsupported image color space".into(),
        )),
    }
}

/// Resolve a PDF object reference to its target, or return the object as-is.
fn resolve_object<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

fn resolve_dict_entry<'a>(
    doc: &'a Document,
    dict: &'a lopdf::Dictionary,
    key: &[u8],
) -> Option<&'a lopdf::Dictionary> {
    let obj = dict.get(key).ok()?;
    resolve_object(doc, obj).as_dict().ok()
}

fn get_int(dict: &lopdf::Dictionary, key: &[u8]) -> Result<i64, ExtractionError> {
    dict.get(key).and_then(Object::as_i64).map_err(|_| {
        ExtractionError::CorruptDocument(format!(
            "Missing or invalid /{} in image dictionary",
            String::from_utf8_lossy(key)
        ))
    })
}

// ── Test fixtures ────────────────────────────────────────────────────────
