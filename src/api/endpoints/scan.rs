//! Directory rescan.

use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline::jobs::ScanOutcome;

/// `POST /api/scan`: submit every document in the uploads directory.
pub async fn scan_uploads(State(ctx): State<ApiContext>) -> Result<Json<ScanOutcome>, ApiError> {
    Ok(Json(ctx.core.scan_uploads().await?))
}
