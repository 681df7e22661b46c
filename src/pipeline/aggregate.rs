use crate::models::document::Fingerprint;
use crate::models::lab::TestRecord;
use crate::models::report::{
    CategoryGroup, PatientInfo, ReportSummary, ResultsByCategory, SummaryStats, TestResults,
};

/// Build the report for one document from classified records.
///
/// Categories appear in the order they were first seen and records keep
/// parser order inside each category. Repeated test names stay separate.
pub fn aggregate(
    fingerprint: Fingerprint,
    records: Vec<TestRecord>,
    patient_info: PatientInfo,
    page_count: usize,
) -> ReportSummary {
    let total_tests = records.len();
    let abnormal_count = records.iter().filter(|r| r.is_abnormal).count();

    let mut groups: Vec<CategoryGroup> = Vec::new();
    for record in records {
        match groups.iter_mut().find(|g| g.category == record.category) {
            Some(group) => group.records.push(record),
            None => groups.push(CategoryGroup {
                category: record.category.clone(),
                records: vec![record],
            }),
        }
    }

    let categories_found = groups.iter().map(|g| g.category.clone()).collect();

    ReportSummary {
        fingerprint,
        patient_info,
        test_results: TestResults {
            by_category: ResultsByCategory::new(groups),
        },
        report_summary: SummaryStats {
            total_tests,
            abnormal_count,
            has_abnormal_results: abnormal_count > 0,
            categories_found,
            page_count,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::lab::TestValue;

    fn record(name: &str, category: &str, abnormal: bool) -> TestRecord {
        TestRecord {
            test_name: name.into(),
            value: TestValue::Numeric(1.0),
            comparator: None,
            unit: None,
            reference_range: None,
            reference_range_text: None,
            category: category.into(),
            page_number: 1,
            is_abnormal: abnormal,
        }
    }

    #[test]
    fn groups_in_first_seen_order() {
        let summary = aggregate(
            Fingerprint::from_raw("fp"),
            vec![
                record("Glucose", "General", true),
                record("HDL", "Lipid Profile", false),
                record("Urea", "General", false),
                record("LDL", "Lipid Profile", true),
            ],
            PatientInfo::new(),
            2,
        );

        let categories: Vec<_> = summary.by_category().categories().collect();
        assert_eq!(categories, ["General", "Lipid Profile"]);
        let general: Vec<_> = summary.by_category().get("General").unwrap().iter().map(|r| r.test_name.as_str()).collect();
        assert_eq!(general, ["Glucose", "Urea"]);
        assert_eq!(summary.report_summary.categories_found, ["General", "Lipid Profile"]);
        assert_eq!(summary.report_summary.page_count, 2);
    }

    #[test]
    fn counts_match_records() {
        let summary = aggregate(
            Fingerprint::from_raw("fp"),
            vec![
                record("Glucose", "General", true),
                record("Glucose", "General", true),
                record("Sodium", "Serum Electrolytes", false),
            ],
            PatientInfo::new(),
            1,
        );

        let grouped: usize = summary.by_category().groups().iter().map(|g| g.records.len()).sum();
        assert_eq!(summary.total_tests(), 3);
        assert_eq!(grouped, 3);
        assert_eq!(summary.abnormal_count(), 2);
        assert!(summary.report_summary.has_abnormal_results);
    }

    #[test]
    fn empty_report() {
        let mut info = PatientInfo::new();
        info.insert("name".into(), "Jane Doe".into());
        let summary = aggregate(Fingerprint::from_raw("fp"), vec![], info, 1);
        assert_eq!(summary.total_tests(), 0);
        assert!(!summary.report_summary.has_abnormal_results);
        assert!(summary.report_summary.categories_found.is_empty());
        assert_eq!(summary.patient_info["name"], "Jane Doe");
    }
}
