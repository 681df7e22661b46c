use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Row};

use crate::db::DatabaseError;
use crate::models::*;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Store a processed report. A fingerprint already present is left as
/// it is; returns whether a new row was written.
pub fn insert_report(conn: &Connection, report: &StoredReport) -> Result<bool, DatabaseError> {
    let summary_json = serde_json::to_string(&report.summary).map_err(|e| {
        DatabaseError::CorruptRow {
            fingerprint: report.fingerprint().to_string(),
            reason: e.to_string(),
        }
    })?;

    let changed = conn.execute(
        "INSERT INTO reports (fingerprint, filename, mime_type, size_bytes, page_count,
         uploaded_at, summary_json)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(fingerprint) DO NOTHING",
        params![
            report.fingerprint().as_str(),
            report.filename,
            report.mime_type,
            report.size_bytes as i64,
            report.page_count as i64,
            report.uploaded_at.format(DATETIME_FORMAT).to_string(),
            summary_json,
        ],
    )?;
    Ok(changed > 0)
}

pub fn get_report(
    conn: &Connection,
    fingerprint: &Fingerprint,
) -> Result<Option<StoredReport>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT fingerprint, filename, mime_type, size_bytes, page_count, uploaded_at, summary_json
         FROM reports WHERE fingerprint = ?1",
    )?;

    let result = stmt.query_row(params![fingerprint.as_str()], report_row_from_rusqlite);

    match result {
        Ok(row) => Ok(Some(report_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn report_exists(conn: &Connection, fingerprint: &Fingerprint) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM reports WHERE fingerprint = ?1",
        params![fingerprint.as_str()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Most recently uploaded reports first.
pub fn list_recent_reports(
    conn: &Connection,
    limit: usize,
) -> Result<Vec<StoredReport>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT fingerprint, filename, mime_type, size_bytes, page_count, uploaded_at, summary_json
         FROM reports ORDER BY uploaded_at DESC, rowid DESC LIMIT ?1",
    )?;

    let rows = stmt.query_map(params![limit as i64], report_row_from_rusqlite)?;

    let mut reports = Vec::new();
    for row in rows {
        reports.push(report_from_row(row?)?);
    }
    Ok(reports)
}

pub fn count_reports(conn: &Connection) -> Result<usize, DatabaseError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM reports", [], |row| row.get(0))?;
    Ok(count as usize)
}

struct ReportRow {
    fingerprint: String,
    filename: String,
    mime_type: String,
    size_bytes: i64,
    page_count: i64,
    uploaded_at: String,
    summary_json: String,
}

fn report_row_from_rusqlite(row: &Row<'_>) -> rusqlite::Result<ReportRow> {
    Ok(ReportRow {
        fingerprint: row.get(0)?,
        filename: row.get(1)?,
        mime_type: row.get(2)?,
        size_bytes: row.get(3)?,
        page_count: row.get(4)?,
        uploaded_at: row.get(5)?,
        summary_json: row.get(6)?,
    })
}

fn report_from_row(row: ReportRow) -> Result<StoredReport, DatabaseError> {
    let corrupt = |reason: String| DatabaseError::CorruptRow {
        fingerprint: row.fingerprint.clone(),
        reason,
    };

    let summary: ReportSummary =
        serde_json::from_str(&row.summary_json).map_err(|e| corrupt(e.to_string()))?;
    let uploaded_at = NaiveDateTime::parse_from_str(&row.uploaded_at, DATETIME_FORMAT)
        .map_err(|e| corrupt(format!("uploaded_at: {e}")))?;

    Ok(StoredReport {
        filename: row.filename,
        mime_type: row.mime_type,
        size_bytes: row.size_bytes.max(0) as u64,
        page_count: row.page_count.max(0) as usize,
        uploaded_at,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::pipeline::aggregate::aggregate;

    fn test_db() -> Connection {
        open_memory_database().unwrap()
    }

    fn make_report(fp: &str, uploaded_at: &str) -> StoredReport {
        let record = TestRecord {
            test_name: "Glucose".into(),
            value: TestValue::Numeric(110.0),
            comparator: None,
            unit: Some("mg/dL".into()),
            reference_range: Some(ReferenceRange::closed(70.0, 100.0)),
            reference_range_text: Some("70-100".into()),
            category: "General".into(),
            page_number: 1,
            is_abnormal: true,
        };
        StoredReport {
            filename: format!("{fp}.pdf"),
            mime_type: "application/pdf".into(),
            size_bytes: 2048,
            page_count: 1,
            uploaded_at: NaiveDateTime::parse_from_str(uploaded_at, "%Y-%m-%d %H:%M:%S").unwrap(),
            summary: aggregate(Fingerprint::from_raw(fp), vec![record], PatientInfo::new(), 1),
        }
    }

    #[test]
    fn insert_and_get_round_trip() {
        let conn = test_db();
        let report = make_report("abc", "2024-03-12 09:30:00");
        assert!(insert_report(&conn, &report).unwrap());

        let loaded = get_report(&conn, &Fingerprint::from_raw("abc")).unwrap().unwrap();
        assert_eq!(loaded, report);
        assert!(report_exists(&conn, &Fingerprint::from_raw("abc")).unwrap());
    }

    #[test]
    fn missing_report_is_none() {
        let conn = test_db();
        assert!(get_report(&conn, &Fingerprint::from_raw("nope")).unwrap().is_none());
        assert!(!report_exists(&conn, &Fingerprint::from_raw("nope")).unwrap());
    }

    #[test]
    fn duplicate_fingerprint_keeps_first() {
        let conn = test_db();
        let first = make_report("abc", "2024-03-12 09:30:00");
        let mut second = make_report("abc", "2024-03-13 09:30:00");
        second.filename = "renamed.pdf".into();

        assert!(insert_report(&conn, &first).unwrap());
        assert!(!insert_report(&conn, &second).unwrap());
        assert_eq!(count_reports(&conn).unwrap(), 1);

        let loaded = get_report(&conn, &Fingerprint::from_raw("abc")).unwrap().unwrap();
        assert_eq!(loaded.filename, "abc.pdf");
    }

    #[test]
    fn recent_reports_newest_first_and_limited() {
        let conn = test_db();
        insert_report(&conn, &make_report("old", "2024-01-01 08:00:00")).unwrap();
        insert_report(&conn, &make_report("new", "2024-03-01 08:00:00")).unwrap();
        insert_report(&conn, &make_report("mid", "2024-02-01 08:00:00")).unwrap();

        let recent = list_recent_reports(&conn, 2).unwrap();
        let fps: Vec<_> = recent.iter().map(|r| r.fingerprint().as_str()).collect();
        assert_eq!(fps, ["new", "mid"]);
    }

    #[test]
    fn corrupt_summary_is_reported() {
        let conn = test_db();
        conn.execute(
            "INSERT INTO reports VALUES ('bad', 'x.pdf', 'application/pdf', 1, 1, '2024-01-01 00:00:00', '{not json')",
            [],
        )
        .unwrap();
        let err = get_report(&conn, &Fingerprint::from_raw("bad")).unwrap_err();
        assert!(matches!(err, DatabaseError::CorruptRow { .. }));
    }
}
