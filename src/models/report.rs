use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::document::Fingerprint;
use super::lab::TestRecord;

/// Header fields read from the report (name, age, gender, dates...).
pub type PatientInfo = BTreeMap<String, String>;

/// Records of one category, in parser order.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryGroup {
    pub category: String,
    pub records: Vec<TestRecord>,
}

/// Category → records, kept in first-seen category order.
///
/// Serialized as a JSON object whose keys appear in that order, which a
/// plain map type would not guarantee.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultsByCategory(Vec<CategoryGroup>);

impl ResultsByCategory {
    pub fn new(groups: Vec<CategoryGroup>) -> Self {
        Self(groups)
    }

    pub fn groups(&self) -> &[CategoryGroup] {
        &self.0
    }

    pub fn get(&self, category: &str) -> Option<&[TestRecord]> {
        self.0
            .iter()
            .find(|g| g.category == category)
            .map(|g| g.records.as_slice())
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|g| g.category.as_str())
    }

    pub fn records(&self) -> impl Iterator<Item = &TestRecord> {
        self.0.iter().flat_map(|g| g.records.iter())
    }
}

impl Serialize for ResultsByCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for group in &self.0 {
            map.serialize_entry(&group.category, &group.records)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ResultsByCategory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedGroups;

        impl<'de> Visitor<'de> for OrderedGroups {
            type Value = ResultsByCategory;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of category to test records")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut groups = Vec::new();
                while let Some((category, records)) =
                    access.next_entry::<String, Vec<TestRecord>>()?
                {
                    groups.push(CategoryGroup { category, records });
                }
                Ok(ResultsByCategory(groups))
            }
        }

        deserializer.deserialize_map(OrderedGroups)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestResults {
    pub by_category: ResultsByCategory,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub total_tests: usize,
    pub abnormal_count: usize,
    pub has_abnormal_results: bool,
    pub categories_found: Vec<String>,
    pub page_count: usize,
}

/// Structured outcome of one processed document. One per fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub fingerprint: Fingerprint,
    pub patient_info: PatientInfo,
    pub test_results: TestResults,
    pub report_summary: SummaryStats,
}

impl ReportSummary {
    pub fn total_tests(&self) -> usize {
        self.report_summary.total_tests
    }

    pub fn abnormal_count(&self) -> usize {
        self.report_summary.abnormal_count
    }

    pub fn by_category(&self) -> &ResultsByCategory {
        &self.test_results.by_category
    }
}

/// A report as persisted, with the upload metadata listed next to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReport {
    pub filename: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub page_count: usize,
    pub uploaded_at: NaiveDateTime,
    pub summary: ReportSummary,
}

impl StoredReport {
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.summary.fingerprint
    }
}
