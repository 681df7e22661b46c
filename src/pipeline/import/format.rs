use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::models::enums::FileCategory;

/// Result of format detection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormatDetection {
    pub mime_type: String,
    pub category: FileCategory,
}

impl FormatDetection {
    fn new(mime_type: &str, category: FileCategory) -> Self {
        Self {
            mime_type: mime_type.to_string(),
            category,
        }
    }
}

/// Detect document format from magic bytes. The declared MIME type and the
/// filename extension are never trusted for routing.
pub fn detect_format(bytes: &[u8]) -> FormatDetection {
    match bytes {
        [0x25, 0x50, 0x44, 0x46, ..] => FormatDetection::new("application/pdf", FileCategory::Pdf),
        [0xFF, 0xD8, 0xFF, ..] => FormatDetection::new("image/jpeg", FileCategory::Image),
        [0x89, 0x50, 0x4E, 0x47, ..] => FormatDetection::new("image/png", FileCategory::Image),
        // TIFF: little-endian (49 49 2A 00) or big-endian (4D 4D 00 2A)
        [0x49, 0x49, 0x2A, 0x00, ..] | [0x4D, 0x4D, 0x00, 0x2A, ..] => {
            FormatDetection::new("image/tiff", FileCategory::Image)
        }
        _ => FormatDetection::new("application/octet-stream", FileCategory::Unsupported),
    }
}

/// Compare the sniffed format with what the client claimed: the declared
/// MIME type, or the one implied by the filename extension when nothing
/// useful was declared. Mismatches are logged only; the sniffed format wins.
pub fn check_declared_mime(filename: &str, declared: Option<&str>, detected: &FormatDetection) {
    if let Some(claimed) = mismatched_claim(filename, declared, detected) {
        tracing::warn!(
            file = %filename,
            claimed = %claimed,
            detected = %detected.mime_type,
            "Declared MIME type does not match content"
        );
    }
}

fn mismatched_claim(
    filename: &str,
    declared: Option<&str>,
    detected: &FormatDetection,
) -> Option<String> {
    let claimed = match declared {
        Some(d) if !d.eq_ignore_ascii_case("application/octet-stream") => d.to_string(),
        _ => mime_guess::from_path(filename).first_raw()?.to_string(),
    };
    (!claimed.eq_ignore_ascii_case(&detected.mime_type)).then_some(claimed)
}

/// Sanitize a filename: strip path components, limit length
pub fn sanitize_filename(original: &str) -> String {
    let normalized = original.replace('\\', "/");
    let name = Path::new(&normalized)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document");

    let clean: String = name
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, '/' | '\\'))
        .take(255)
        .collect();

    let clean = clean.trim();
    if clean.is_empty() || clean == "." || clean == ".." {
        "document".to_string()
    } else {
        clean.to_string()
    }
}
