pub mod line;
pub mod patient;
pub mod range;
pub mod value;

pub use line::{classify_line, LineKind, ResultLine};
pub use range::parse_reference_range;

use crate::models::lab::TestRecord;
use crate::models::report::PatientInfo;
use crate::pipeline::extraction::PageText;

/// Category for records that appear before any section header.
pub const DEFAULT_CATEGORY: &str = "General";

/// Parser output: unclassified records in source order plus header fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedReport {
    pub records: Vec<TestRecord>,
    pub patient_info: PatientInfo,
}

/// Turn cleaned page texts into candidate test records.
///
/// The current category carries over page breaks, since panels often
/// continue onto the next page. A header key seen twice keeps its first
/// value. Lines that match nothing are dropped without error.
pub fn parse_pages(pages: &[PageText]) -> ParsedReport {
    let mut report = ParsedReport::default();
    let mut category = DEFAULT_CATEGORY.to_string();

    for page in pages {
        let mut block_start = true;
        let mut discarded = 0usize;

        for raw in page.text.lines() {
            let kind = classify_line(raw, block_start);
            block_start = matches!(kind, LineKind::Blank);

            match kind {
                LineKind::Blank | LineKind::Skipped => {}
                LineKind::Patient(pairs) => {
                    for (key, value) in pairs {
                        report.patient_info.entry(key).or_insert(value);
                    }
                }
                LineKind::Section(title) => category = title,
                LineKind::Result(line) => report.records.push(TestRecord {
                    test_name: line.name,
                    value: line.value,
                    comparator: line.comparator,
                    unit: line.unit,
                    reference_range: line.range,
                    reference_range_text: line.range_text,
                    category: category.clone(),
                    page_number: page.page_number,
                    is_abnormal: false,
                }),
                LineKind::Unrecognized => discarded += 1,
            }
        }

        tracing::debug!(
            page = page.page_number,
            records = report.records.len(),
            discarded,
            "Page parsed"
        );
    }

    report
}
