use std::path::{Path, PathBuf};

use super::types::{BoundingBox, OcrEngine, OcrPageResult, OcrWord, Page, PageContent, PageText};
use super::ExtractionError;

/// Common tessdata install locations, probed when no directory is configured.
const TESSDATA_CANDIDATES: &[&str] = &[
    "/usr/share/tesseract-ocr/5/tessdata",
    "/usr/share/tesseract-ocr/4.00/tessdata",
    "/usr/share/tessdata",
    "/usr/local/share/tessdata",
    "/opt/homebrew/share/tessdata",
];

/// Run the OCR stage for one page. Text-layer pages pass through untouched.
pub fn recognize_page(
    engine: &dyn OcrEngine,
    page: Page,
    lang: &str,
) -> Result<PageText, ExtractionError> {
    let text = match page.content {
        PageContent::TextLayer(text) => text,
        PageContent::Bitmap(png) => {
            let result = engine.ocr_image_with_lang(&png, lang)?;
            tracing::debug!(
                page = page.number,
                confidence = result.confidence,
                words = result.words.len(),
                "Page recognized"
            );
            result.text
        }
    };
    Ok(PageText {
        page_number: page.number,
        text,
    })
}

/// Locate a tessdata directory holding `{lang}.traineddata` for the first
/// language of `lang` (`"eng+fra"` → `eng`).
pub fn find_tessdata_dir(configured: Option<&Path>, lang: &str) -> Option<PathBuf> {
    let primary = lang.split('+').next().unwrap_or("eng");
    let model = format!("{primary}.traineddata");

    configured
        .map(Path::to_path_buf)
        .into_iter()
        .chain(TESSDATA_CANDIDATES.iter().map(PathBuf::from))
        .find(|dir| dir.join(&model).exists())
}

/// Pick the recognizer for this build and host.
///
/// Without the `ocr` feature or without tessdata, an engine that fails every
/// page is returned: PDF text layers still work, scanned pages end the job
/// with an OCR engine error.
pub fn build_ocr_engine(
    tessdata_dir: Option<&Path>,
    lang: &str,
) -> Box<dyn OcrEngine + Send + Sync> {
    #[cfg(feature = "ocr")]
    let reason = match find_tessdata_dir(tessdata_dir, lang) {
        Some(dir) => {
            tracing::info!(tessdata = %dir.display(), lang, "Tesseract OCR initialized");
            return Box::new(BundledTesseract::new(dir));
        }
        None => "Tesseract language data not found",
    };

    #[cfg(not(feature = "ocr"))]
    let reason = {
        let _ = (tessdata_dir, lang);
        "OCR support not compiled in (enable the `ocr` feature)"
    };

    tracing::warn!(reason, "Scanned pages cannot be read");
    Box::new(UnavailableOcrEngine::new(reason))
}

/// Tesseract through its C API.
/// Only available when compiled with the `ocr` feature flag.
#[cfg(feature = "ocr")]
pub struct BundledTesseract {
    tessdata_dir: PathBuf,
}

#[cfg(feature = "ocr")]
impl BundledTesseract {
    pub fn new(tessdata_dir: PathBuf) -> Self {
        Self { tessdata_dir }
    }
}

#[cfg(feature = "ocr")]
impl OcrEngine for BundledTesseract {
    fn ocr_image_with_lang(
        &self,
        image_bytes: &[u8],
        lang: &str,
    ) -> Result<OcrPageResult, ExtractionError> {
        let tessdata = self
            .tessdata_dir
            .to_str()
            .ok_or_else(|| ExtractionError::OcrEngine("Invalid tessdata path".into()))?;

        // LSTM engine, single uniform block of text: lab tables read row by row.
        let mut tess = tesseract::Tesseract::new(Some(tessdata), Some(lang))
            .map_err(|e| ExtractionError::OcrEngine(format!("init: {e:?}")))?
            .set_variable("tessedit_pageseg_mode", "6")
            .map_err(|e| ExtractionError::OcrEngine(format!("config: {e:?}")))?
            .set_image_from_mem(image_bytes)
            .map_err(|e| ExtractionError::OcrEngine(format!("image: {e:?}")))?;

        let text = tess
            .get_text()
            .map_err(|e| ExtractionError::OcrEngine(format!("recognition: {e:?}")))?;
        let confidence = tess.mean_text_conf().max(0) as f32 / 100.0;
        let words = tess
            .get_tsv_text(0)
            .map(|tsv| parse_tsv_words(&tsv))
            .unwrap_or_default();

        Ok(OcrPageResult {
            text,
            confidence,
            words,
        })
    }
}

/// Stand-in used when no recognizer can run. Every call fails.
pub struct UnavailableOcrEngine {
    reason: String,
}

impl UnavailableOcrEngine {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl OcrEngine for UnavailableOcrEngine {
    fn ocr_image_with_lang(
        &self,
        _image_bytes: &[u8],
        _lang: &str,
    ) -> Result<OcrPageResult, ExtractionError> {
        Err(ExtractionError::OcrEngine(self.reason.clone()))
    }
}

/// Mock OCR engine for unit testing without Tesseract.
pub struct MockOcrEngine {
    pub text: String,
    pub confidence: f32,
}

impl MockOcrEngine {
    pub fn new(text: &str, confidence: f32) -> Self {
        Self {
            text: text.to_string(),
            confidence,
        }
    }
}

impl OcrEngine for MockOcrEngine {
    fn ocr_image_with_lang(
        &self,
        _image_bytes: &[u8],
        _lang: &str,
    ) -> Result<OcrPageResult, ExtractionError> {
        let words = self
            .text
            .lines()
            .enumerate()
            .flat_map(|(line, l)| {
                l.split_whitespace().map(move |w| OcrWord {
                    text: w.to_string(),
                    confidence: self.confidence,
                    line: line as u32 + 1,
                    bounding_box: None,
                })
            })
            .collect();

        Ok(OcrPageResult {
            text: self.text.clone(),
            confidence: self.confidence,
            words,
        })
    }
}

/// Parse Tesseract TSV output into positioned words.
/// TSV columns: level page_num block_num par_num line_num word_num left top width height conf text
/// Level 5 = individual word entries. Confidence is 0-100, scaled to 0.0-1.0.
pub fn parse_tsv_words(tsv: &str) -> Vec<OcrWord> {
    tsv.lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 12 || fields[0].parse::<i32>().ok()? != 5 {
                return None;
            }

            let word = fields[11].trim();
            if word.is_empty() {
                return None;
            }

            let conf: i32 = fields[10].parse().ok()?;
            // Tesseract returns -1 for words it can't assign confidence to
            let confidence = conf.max(0) as f32 / 100.0;

            Some(OcrWord {
                text: word.to_string(),
                confidence,
                line: fields[4].parse().unwrap_or(0),
                bounding_box: parse_bounding_box(fields[6], fields[7], fields[8], fields[9]),
            })
        })
        .collect()
}

fn parse_bounding_box(left: &str, top: &str, width: &str, height: &str) -> Option<BoundingBox> {
    Some(BoundingBox {
        x: left.parse().ok()?,
        y: top.parse().ok()?,
        width: width.parse().ok()?,
        height: height.parse().ok()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TSV_HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    #[test]
    fn text_layer_skips_engine() {
        let engine = UnavailableOcrEngine::new("no engine");
        let page = Page::text_layer(2, "Glucose 90 mg/dL");
        let text = recognize_page(&engine, page, "eng").unwrap();
        assert_eq!(text.page_number, 2);
        assert_eq!(text.text, "Glucose 90 mg/dL");
    }

    #[test]
    fn bitmap_goes_through_engine() {
        let engine = MockOcrEngine::new("Urea 30 mg/dL 15-40", 0.9);
        let page = Page::bitmap(1, vec![0x89, b'P', b'N', b'G']);
        let text = recognize_page(&engine, page, "eng").unwrap();
        assert_eq!(text.text, "Urea 30 mg/dL 15-40");
    }

    #[test]
    fn unavailable_engine_is_an_engine_error() {
        let engine = UnavailableOcrEngine::new("missing");
        let result = recognize_page(&engine, Page::bitmap(1, vec![1, 2, 3]), "eng");
        assert!(matches!(result, Err(ExtractionError::OcrEngine(msg)) if msg == "missing"));
    }

    #[test]
    fn mock_words_carry_line_numbers() {
        let engine = MockOcrEngine::new("Blood Sugar\nHbA1c 5.4 %", 0.85);
        let result = engine.ocr_image_with_lang(b"fake", "eng").unwrap();
        assert_eq!(result.words.len(), 5);
        assert_eq!(result.words[0].line, 1);
        assert_eq!(result.words[2].text, "HbA1c");
        assert_eq!(result.words[2].line, 2);
    }

    #[test]
    fn tsv_parser_keeps_words_only() {
        let tsv = format!(
            "{TSV_HEADER}\n\
             1\t1\t0\t0\t0\t0\t0\t0\t600\t800\t-1\t\n\
             4\t1\t1\t1\t1\t0\t10\t20\t200\t30\t-1\t\n\
             5\t1\t1\t1\t1\t1\t10\t20\t80\t30\t95\tGlucose\n\
             5\t1\t1\t1\t1\t2\t100\t25\t40\t28\t88\t110\n\
             5\t1\t1\t1\t2\t1\t10\t60\t120\t30\t-1\tgarbled"
        );
        let words = parse_tsv_words(&tsv);
        assert_eq!(words.len(), 3);
        assert_eq!(words[0].text, "Glucose");
        assert!((words[0].confidence - 0.95).abs() < f32::EPSILON);
        assert_eq!(words[1].line, 1);
        assert_eq!(words[2].line, 2);
        assert_eq!(words[2].confidence, 0.0);

        let bb = words[1].bounding_box.as_ref().unwrap();
        assert_eq!((bb.x, bb.y, bb.width, bb.height), (100, 25, 40, 28));
    }

    #[test]
    fn tsv_parser_skips_malformed_lines() {
        let tsv = format!(
            "{TSV_HEADER}\n\
             too\tfew\tfields\n\
             5\t1\t1\t1\t1\t1\t10\t20\t80\t30\t92\tOK\n\
             notanumber\t1\t1\t1\t1\t1\t10\t20\t80\t30\t50\tbad\n\
             5\t1\t1\t1\t1\t2\t10\t20\t80\t30\t90\t"
        );
        let words = parse_tsv_words(&tsv);
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].text, "OK");
        assert!(parse_tsv_words("").is_empty());
    }

    #[test]
    fn tessdata_lookup_prefers_configured_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("eng.traineddata"), b"model").unwrap();
        assert_eq!(
            find_tessdata_dir(Some(dir.path()), "eng+fra"),
            Some(dir.path().to_path_buf())
        );
    }

    #[test]
    fn tessdata_lookup_needs_the_language_file() {
        let dir = tempfile::tempdir().unwrap();
        let found = find_tessdata_dir(Some(dir.path()), "xyz");
        assert_ne!(found, Some(dir.path().to_path_buf()));
    }
}
