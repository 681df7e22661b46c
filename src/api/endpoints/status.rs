//! Job status polling.

use axum::extract::{Path, State};
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, StatusResponse};
use crate::models::job::{JobId, JobLookup};

/// `GET /api/status/:job_id`: current state of a job.
///
/// Ids that are unknown, evicted, or not even UUIDs all answer
/// `not_found` with 200: a client may poll before it learns otherwise.
pub async fn job_status(
    State(ctx): State<ApiContext>,
    Path(job_id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let lookup = match job_id.parse::<JobId>() {
        Ok(id) => ctx.core.job_status(&id)?,
        Err(_) => JobLookup::NotFound,
    };
    Ok(Json(StatusResponse::from(lookup)))
}
