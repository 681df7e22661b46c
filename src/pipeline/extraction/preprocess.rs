//! Page image normalization ahead of OCR.
//!
//! Every bitmap page goes through the same fixed sequence:
//! EXIF orientation → grayscale → resize → deskew → Otsu binarization → PNG.
//! Recognition quality on phone photos and low-dpi scans depends mostly on
//! the resize and binarization steps.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageOutputFormat, Luma};
use tracing::debug;

use super::ExtractionError;

// ═══════════════════════════════════════════════════════════
// Constants
// ═══════════════════════════════════════════════════════════

/// Maximum input image size (in bytes) before rejecting.
const MAX_IMAGE_BYTES: usize = 50 * 1024 * 1024;

/// Minimum valid image size in bytes (smallest valid PNG is ~67 bytes).
const MIN_IMAGE_BYTES: usize = 67;

/// Text on smaller pages is too few pixels high for reliable recognition.
pub const MIN_SHORT_SIDE: u32 = 1000;

/// Cap on the longest side; beyond this OCR time grows with no accuracy gain.
pub const MAX_LONG_SIDE: u32 = 4000;

/// Skew search window in degrees, both directions.
const SKEW_SEARCH_DEG: f32 = 5.0;

const SKEW_STEP_DEG: f32 = 0.25;

/// Angles below this are left alone.
const MIN_SKEW_DEG: f32 = 0.5;

const WHITE: Luma<u8> = Luma([255]);

// ═══════════════════════════════════════════════════════════
// Entry point
// ═══════════════════════════════════════════════════════════

/// Decode an encoded page image and normalize it into OCR-ready PNG bytes.
///
/// Undecodable input is a corrupt document, not an engine failure.
pub fn prepare_page_image(bytes: &[u8]) -> Result<Vec<u8>, ExtractionError> {
    validate_image_bytes(bytes)?;

    let img = image::load_from_memory(bytes)
        .map_err(|e| ExtractionError::CorruptDocument(format!("Image decode failed: {e}")))?;
    let img = apply_orientation(img, read_exif_orientation(bytes));

    let gray = normalize_gray(img.to_luma8());
    encode_png(gray)
}

/// Normalize an already decoded grayscale page (resize, deskew, binarize).
pub fn normalize_gray(gray: GrayImage) -> GrayImage {
    let gray = resize_for_ocr(gray);

    let gray = match detect_skew_angle(&gray) {
        Some(angle) => {
            debug!(angle, "Correcting page skew");
            deskew(&gray, angle)
        }
        None => gray,
    };

    let threshold = otsu_threshold(&gray);
    binarize(&gray, threshold)
}

// ═══════════════════════════════════════════════════════════
// Validation & orientation
// ═══════════════════════════════════════════════════════════

/// Validate image bytes before decoding.
pub fn validate_image_bytes(bytes: &[u8]) -> Result<(), ExtractionError> {
    if bytes.len() < MIN_IMAGE_BYTES {
        return Err(ExtractionError::CorruptDocument(
            "Image data too small to be valid".into(),
        ));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(ExtractionError::ImageProcessing(format!(
            "Image data exceeds {}MB limit",
            MAX_IMAGE_BYTES / (1024 * 1024)
        )));
    }
    Ok(())
}

/// Read EXIF orientation tag from raw image bytes.
/// Returns 1 (normal) if no EXIF data or tag not present.
pub fn read_exif_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    let reader = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(r) => r,
        Err(_) => return 1,
    };

    reader
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .unwrap_or(1)
}

/// EXIF orientation values:
/// 1 = Normal, 2 = Mirrored, 3 = 180deg, 4 = Flipped V,
/// 5 = Mirrored + 90deg CW, 6 = 90deg CW, 7 = Mirrored + 270deg CW, 8 = 270deg CW
pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

// ═══════════════════════════════════════════════════════════
// Geometry
// ═══════════════════════════════════════════════════════════

/// Target dimensions: shorter side at least `MIN_SHORT_SIDE`, longer side at
/// most `MAX_LONG_SIDE`. The cap wins when both cannot hold.
pub fn ocr_dimensions(width: u32, height: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (width.max(1), height.max(1));
    }

    let short = width.min(height) as f32;
    let long = width.max(height) as f32;

    let mut scale = 1.0f32;
    if short < MIN_SHORT_SIDE as f32 {
        scale = MIN_SHORT_SIDE as f32 / short;
    }
    if long * scale > MAX_LONG_SIDE as f32 {
        scale = MAX_LONG_SIDE as f32 / long;
    }

    let w = ((width as f32 * scale).round() as u32).max(1);
    let h = ((height as f32 * scale).round() as u32).max(1);
    (w, h)
}

fn resize_for_ocr(gray: GrayImage) -> GrayImage {
    let (w, h) = gray.dimensions();
    let (new_w, new_h) = ocr_dimensions(w, h);
    if (new_w, new_h) == (w, h) {
        return gray;
    }

    debug!(
        from = format!("{w}x{h}"),
        to = format!("{new_w}x{new_h}"),
        "Resizing page for OCR"
    );
    let filter = if new_w > w {
        FilterType::CatmullRom
    } else {
        FilterType::Triangle
    };
    image::imageops::resize(&gray, new_w, new_h, filter)
}

/// Detect document skew angle via projection profile.
///
/// Tests candidate angles within ±5 degrees. Each dark pixel is binned by
/// the row it would land on once the page is rotated back by the candidate
/// angle; the angle producing the crispest row transitions (highest
/// projection variance) is the estimate. Returns `None` for tiny or
/// near-blank pages, or when the best angle is negligible.
pub fn detect_skew_angle(img: &GrayImage) -> Option<f32> {
    let (w, h) = img.dimensions();
    if w < 50 || h < 50 {
        return None;
    }

    let ink_threshold = 128u8;
    let dark_count = img.pixels().filter(|p| p.0[0] < ink_threshold).count();
    if (dark_count as f32 / (w as f32 * h as f32)) < 0.02 {
        return None;
    }

    let mut best_angle = 0.0f32;
    let mut best_score = f64::NEG_INFINITY;

    let steps = (2.0 * SKEW_SEARCH_DEG / SKEW_STEP_DEG).round() as i32;
    for i in 0..=steps {
        let angle = -SKEW_SEARCH_DEG + i as f32 * SKEW_STEP_DEG;
        let score = projection_variance(img, ink_threshold, angle);
        if score > best_score {
            best_score = score;
            best_angle = angle;
        }
    }

    (best_angle.abs() >= MIN_SKEW_DEG).then_some(best_angle)
}

/// Sum of squared differences between adjacent bins of the ink projection
/// taken along lines of slope `tan(angle)`.
fn projection_variance(img: &GrayImage, threshold: u8, angle_deg: f32) -> f64 {
    let (w, h) = img.dimensions();
    let tan_a = (angle_deg.to_radians()).tan() as f64;
    let mut projection = vec![0u32; h as usize];

    // Subsample every 2nd column
    for x in (0..w).step_by(2) {
        let shift = (x as f64 * tan_a).round() as i64;
        for y in 0..h {
            if img.get_pixel(x, y).0[0] >= threshold {
                continue;
            }
            let bin = y as i64 - shift;
            if bin >= 0 && bin < h as i64 {
                projection[bin as usize] += 1;
            }
        }
    }

    projection
        .windows(2)
        .map(|pair| {
            let diff = pair[1] as f64 - pair[0] as f64;
            diff * diff
        })
        .sum()
}

/// Undo a skew found by `detect_skew_angle` with a vertical shear: column
/// `x` moves up by `x * tan(angle)`. Pixels sheared in from outside the
/// page are white.
pub fn deskew(img: &GrayImage, angle_deg: f32) -> GrayImage {
    let (w, h) = img.dimensions();
    let tan_a = (angle_deg.to_radians()).tan() as f64;
    let mut out = GrayImage::from_pixel(w, h, WHITE);

    for x in 0..w {
        let shift = (x as f64 * tan_a).round() as i64;
        for y in 0..h {
            let sy = y as i64 + shift;
            if sy >= 0 && sy < h as i64 {
                out.put_pixel(x, y, *img.get_pixel(x, sy as u32));
            }
        }
    }
    out
}

// ═══════════════════════════════════════════════════════════
// Binarization
// ═══════════════════════════════════════════════════════════

/// Otsu's global threshold: maximizes between-class variance of the
/// intensity histogram.
pub fn otsu_threshold(img: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for p in img.pixels() {
        histogram[p.0[0] as usize] += 1;
    }

    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return 128;
    }
    let weighted_total: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &c)| i as f64 * c as f64)
        .sum();

    let mut background = 0u64;
    let mut weighted_background = 0.0f64;
    let mut best_threshold = 0u8;
    let mut best_variance = -1.0f64;

    for (t, &count) in histogram.iter().enumerate() {
        background += count;
        if background == 0 {
            continue;
        }
        let foreground = total - background;
        if foreground == 0 {
            break;
        }

        weighted_background += t as f64 * count as f64;
        let mean_bg = weighted_background / background as f64;
        let mean_fg = (weighted_total - weighted_background) / foreground as f64;
        let variance =
            background as f64 * foreground as f64 * (mean_bg - mean_fg) * (mean_bg - mean_fg);

        if variance > best_variance {
            best_variance = variance;
            best_threshold = t as u8;
        }
    }

    best_threshold
}

/// Pixels at or below `threshold` become black, everything else white.
pub fn binarize(img: &GrayImage, threshold: u8) -> GrayImage {
    let mut out = img.clone();
    for p in out.pixels_mut() {
        p.0[0] = if p.0[0] <= threshold { 0 } else { 255 };
    }
    out
}

/// Encode a grayscale page as PNG bytes.
pub fn encode_png(img: GrayImage) -> Result<Vec<u8>, ExtractionError> {
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(img)
        .write_to(&mut cursor, ImageOutputFormat::Png)
        .map_err(|e| ExtractionError::ImageProcessing(format!("PNG encoding failed: {e}")))?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    /// White page with dark horizontal "text lines".
    fn lined_page(w: u32, h: u32) -> GrayImage {
        let mut img = GrayImage::from_pixel(w, h, WHITE);
        for y in 0..h {
            if (y / 10) % 3 == 0 {
                for x in w / 10..w - w / 10 {
                    img.put_pixel(x, y, Luma([20]));
                }
            }
        }
        img
    }

    fn encode_jpeg(img: &GrayImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageLuma8(img.clone())
            .write_to(&mut buf, ImageOutputFormat::Jpeg(90))
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn small_pages_are_upscaled() {
        assert_eq!(ocr_dimensions(500, 800), (1000, 1600));
        assert_eq!(ocr_dimensions(1200, 1600), (1200, 1600));
    }

    #[test]
    fn huge_pages_are_capped() {
        assert_eq!(ocr_dimensions(2000, 8000), (1000, 4000));
        // Very thin strip: the long-side cap wins over the short-side floor
        let (w, h) = ocr_dimensions(100, 2000);
        assert_eq!(h, 4000);
        assert_eq!(w, 200);
    }

    #[test]
    fn otsu_separates_two_levels() {
        let mut img = GrayImage::from_pixel(20, 20, Luma([200]));
        for x in 0..10 {
            for y in 0..20 {
                img.put_pixel(x, y, Luma([40]));
            }
        }
        let t = otsu_threshold(&img);
        assert!((40..200).contains(&t), "threshold {t} not between levels");

        let bin = binarize(&img, t);
        assert_eq!(bin.get_pixel(0, 0).0[0], 0);
        assert_eq!(bin.get_pixel(19, 0).0[0], 255);
    }

    #[test]
    fn straight_page_has_no_skew() {
        assert_eq!(detect_skew_angle(&lined_page(400, 300)), None);
    }

    #[test]
    fn blank_page_has_no_skew() {
        let img = GrayImage::from_pixel(400, 300, WHITE);
        assert_eq!(detect_skew_angle(&img), None);
    }

    #[test]
    fn sheared_page_is_detected_and_restored() {
        let straight = lined_page(400, 300);
        // Skew by the inverse of the correction shear for 3 degrees
        let skewed = deskew(&straight, -3.0);
        let angle = detect_skew_angle(&skewed).expect("skew should be detected");
        assert!((angle - 3.0).abs() <= 0.5, "detected {angle}");

        let restored = deskew(&skewed, angle);
        assert_eq!(detect_skew_angle(&restored), None);
    }

    #[test]
    fn prepare_page_outputs_binary_png() {
        let jpeg = encode_jpeg(&lined_page(300, 200));
        let png = prepare_page_image(&jpeg).unwrap();
        assert_eq!(&png[0..4], b"\x89PNG");

        let out = image::load_from_memory(&png).unwrap();
        assert_eq!(out.dimensions(), (1500, 1000));
        let gray = out.to_luma8();
        assert!(gray.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn garbage_bytes_are_corrupt() {
        let mut bytes = vec![0x89, 0x50, 0x4E, 0x47];
        bytes.extend(std::iter::repeat(0xAB).take(200));
        assert!(matches!(
            prepare_page_image(&bytes),
            Err(ExtractionError::CorruptDocument(_))
        ));
    }

    #[test]
    fn orientation_six_rotates_clockwise() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(40, 10));
        let rotated = apply_orientation(img, 6);
        assert_eq!(rotated.dimensions(), (10, 40));
    }

    #[test]
    fn no_exif_means_normal_orientation() {
        assert_eq!(read_exif_orientation(b"not an image"), 1);
    }
}
