//! Stored report listing and lookup.

use axum::extract::{Path, State};
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, RecentReportsResponse, ReportEntry};
use crate::models::document::Fingerprint;

/// `GET /api/reports/recent`: newest reports first.
pub async fn recent(State(ctx): State<ApiContext>) -> Result<Json<RecentReportsResponse>, ApiError> {
    let reports = ctx.core.recent_reports()?;
    Ok(Json(RecentReportsResponse {
        reports: reports.into_iter().map(ReportEntry::from).collect(),
    }))
}

/// `GET /api/reports/:fingerprint`: one report by content fingerprint.
pub async fn by_fingerprint(
    State(ctx): State<ApiContext>,
    Path(fingerprint): Path<String>,
) -> Result<Json<ReportEntry>, ApiError> {
    let fingerprint = Fingerprint::from_raw(fingerprint);
    ctx.core
        .report(&fingerprint)?
        .map(|report| Json(ReportEntry::from(report)))
        .ok_or_else(|| ApiError::NotFound(format!("No report for {fingerprint}")))
}
