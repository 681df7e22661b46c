use crate::models::lab::{ReferenceRange, TestRecord, TestValue};

/// Decide whether a value falls outside its reference range.
///
/// Bounds are compared as printed; units are never converted, so a value
/// and range in different units are compared as if they matched. Without
/// a range of the same kind as the value there is no baseline and the
/// answer is `false`.
pub fn is_abnormal(value: &TestValue, range: Option<&ReferenceRange>) -> bool {
    match (value, range) {
        (TestValue::Numeric(v), Some(ReferenceRange::Interval { low, high })) => {
            low.is_some_and(|low| *v < low) || high.is_some_and(|high| *v > high)
        }
        (TestValue::Text(text), Some(ReferenceRange::Categorical { normal })) => {
            let observed = label_key(text);
            !normal.iter().any(|label| label_key(label) == observed)
        }
        _ => false,
    }
}

/// Set the abnormal flag on every record.
pub fn classify_records(records: &mut [TestRecord]) {
    for record in records.iter_mut() {
        record.is_abnormal = is_abnormal(&record.value, record.reference_range.as_ref());
    }
}

/// `Non-Reactive`, `non reactive` and `NONREACTIVE` compare equal.
fn label_key(label: &str) -> String {
    label
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}
