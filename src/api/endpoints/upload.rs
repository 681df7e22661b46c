//! Document upload: multipart form → stored copy → job.

use axum::extract::{Multipart, State};
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, UploadResponse};
use crate::models::document::Document;
use crate::pipeline::import::{check_upload_size, sanitize_filename, store_upload};

/// `POST /api/upload`: accept one document in the multipart field `file`.
///
/// The bytes are kept in the uploads directory, then submitted. The reply
/// carries the job to poll, or a completed `from_cache` job when the same
/// bytes were read before.
pub async fn upload(
    State(ctx): State<ApiContext>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut file: Option<(String, Option<String>, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("document").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;
        file = Some((filename, content_type, bytes.to_vec()));
    }

    let (filename, content_type, bytes) =
        file.ok_or_else(|| ApiError::BadRequest("No file provided in field 'file'".into()))?;
    check_upload_size(&bytes, ctx.core.config.max_upload_bytes)?;

    let filename = sanitize_filename(&filename);
    let uploads_dir = ctx.core.config.uploads_dir.clone();
    let stored = {
        let (name, data) = (filename.clone(), bytes.clone());
        tokio::task::spawn_blocking(move || store_upload(&uploads_dir, &name, &data))
            .await
            .map_err(|e| ApiError::Internal(format!("upload task failed: {e}")))??
    };
    tracing::info!(path = %stored.display(), size = bytes.len(), "Upload received");

    let job = ctx.core.submit(Document::new(filename, content_type, bytes))?;
    Ok(Json(UploadResponse::from(job)))
}
