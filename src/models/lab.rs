use serde::{Deserialize, Serialize};

/// Parsed result value. Numeric and textual values are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TestValue {
    Numeric(f64),
    Text(String),
}

impl TestValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Numeric(v) => Some(*v),
            Self::Text(_) => None,
        }
    }
}

/// Comparator printed in front of a numeric value (`<0.5`, `>90`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    LessThan,
    GreaterThan,
}

/// Normal range a value is judged against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReferenceRange {
    /// Open-ended when one bound is missing (`< 200`, `> 40`).
    Interval { low: Option<f64>, high: Option<f64> },
    /// Labels that count as normal (`Negative`, `Non-Reactive`).
    Categorical { normal: Vec<String> },
    /// Trailing text that looked like a range but did not parse.
    Opaque { text: String },
}

impl ReferenceRange {
    pub fn closed(low: f64, high: f64) -> Self {
        Self::Interval {
            low: Some(low),
            high: Some(high),
        }
    }
}

/// One lab test result as read off a report page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRecord {
    pub test_name: String,
    pub value: TestValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparator: Option<Comparator>,
    pub unit: Option<String>,
    pub reference_range: Option<ReferenceRange>,
    /// Range exactly as printed, for display next to the parsed form.
    pub reference_range_text: Option<String>,
    pub category: String,
    pub page_number: usize,
    pub is_abnormal: bool,
}
