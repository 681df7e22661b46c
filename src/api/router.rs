//! HTTP router.
//!
//! Returns a composable `Router`: browser pages at the root, JSON endpoints
//! under `/api/`, request tracing and permissive CORS on everything.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::pages;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Build the service router.
///
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
pub fn api_router(core: Arc<CoreState>) -> Router {
    let body_limit = usize::try_from(core.config.max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);
    let ctx = ApiContext::new(core);

    let api = Router::new()
        .route("/upload", post(endpoints::upload::upload))
        .route("/status/:job_id", get(endpoints::status::job_status))
        .route("/reports/recent", get(endpoints::reports::recent))
        .route("/reports/:fingerprint", get(endpoints::reports::by_fingerprint))
        .route("/scan", post(endpoints::scan::scan_uploads))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(ctx);

    Router::new()
        .route("/", get(pages::upload_page))
        .route("/dashboard", get(pages::dashboard_page))
        .route("/health", get(endpoints::health::check))
        .nest("/api", api)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::core_state::tests::test_core_state;
    use crate::pipeline::extraction::pdf_renderer::fixtures::{make_jpeg, make_pdf, FixturePage};

    const BOUNDARY: &str = "labsight-test-boundary";
    const REPORT_TEXT: &str = "COMPLETE BLOOD COUNT\nHemoglobin 11.2 g/dL 13.0-17.0\nWBC 7.5 10^3/uL 4.0-11.0";

    async fn response_json(response: axum::http::Response<Body>) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn multipart_request(field: &str, filename: &str, bytes: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    /// Poll the status endpoint until the job leaves queued/running.
    async fn wait_for_status(app: &Router, job_id: &str) -> serde_json::Value {
        for _ in 0..300 {
            let response = app
                .clone()
                .oneshot(get_request(&format!("/api/status/{job_id}")))
                .await
                .unwrap();
            let json = response_json(response).await;
            if json["status"] == "completed" || json["status"] == "error" {
                return json;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("job {job_id} did not finish");
    }

    #[tokio::test]
    async fn health_reports_version() {
        let dir = tempfile::tempdir().unwrap();
        let app = api_router(test_core_state("", dir.path()));

        let response = app.oneshot(get_request("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], crate::config::APP_VERSION);
    }

    #[tokio::test]
    async fn pages_are_served() {
        let dir = tempfile::tempdir().unwrap();
        let app = api_router(test_core_state("", dir.path()));

        for uri in ["/", "/dashboard"] {
            let response = app.clone().oneshot(get_request(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
            assert!(content_type.starts_with("text/html"));
        }
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let app = api_router(test_core_state("", dir.path()));
        let response = app.oneshot(get_request("/api/nothing")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn upload_then_poll_then_list() {
        let dir = tempfile::tempdir().unwrap();
        let core = test_core_state(REPORT_TEXT, dir.path());
        let app = api_router(core.clone());

        let response = app
            .clone()
            .oneshot(multipart_request("file", "cbc.jpg", &make_jpeg(120, 160)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let upload = response_json(response).await;
        assert_eq!(upload["filename"], "cbc.jpg");
        assert_eq!(upload["from_cache"], false);
        let job_id = upload["job_id"].as_str().unwrap().to_string();
        let fingerprint = upload["fingerprint"].as_str().unwrap().to_string();

        let status = wait_for_status(&app, &job_id).await;
        assert_eq!(status["status"], "completed");
        assert_eq!(status["fingerprint"], fingerprint.as_str());

        // The upload is kept for later rescans
        assert!(core.config.uploads_dir.join("cbc.jpg").exists());

        let response = app
            .clone()
            .oneshot(get_request("/api/reports/recent"))
            .await
            .unwrap();
        let listing = response_json(response).await;
        let reports = listing["reports"].as_array().unwrap();
        assert_eq!(reports.len(), 1);
        let report = &reports[0];
        assert_eq!(report["filename"], "cbc.jpg");
        assert_eq!(report["page_count"], 1);
        assert!(report["size"].as_u64().unwrap() > 0);
        let hemoglobin = &report["ocr_data"]["test_results"]["by_category"]["Complete Blood Count"][0];
        assert_eq!(hemoglobin["test_name"], "Hemoglobin");
        assert_eq!(hemoglobin["is_abnormal"], true);
        assert_eq!(report["ocr_data"]["report_summary"]["total_tests"], 2);
        assert_eq!(report["ocr_data"]["report_summary"]["abnormal_count"], 1);

        let response = app
            .oneshot(get_request(&format!("/api/reports/{fingerprint}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response_json(response).await["fingerprint"], fingerprint.as_str());
    }

    #[tokio::test]
    async fn second_upload_served_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let app = api_router(test_core_state(REPORT_TEXT, dir.path()));
        let jpeg = make_jpeg(120, 160);

        let first = response_json(
            app.clone()
                .oneshot(multipart_request("file", "cbc.jpg", &jpeg))
                .await
                .unwrap(),
        )
        .await;
        wait_for_status(&app, first["job_id"].as_str().unwrap()).await;

        let second = response_json(
            app.clone()
                .oneshot(multipart_request("file", "cbc-again.jpg", &jpeg))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(second["status"], "completed");
        assert_eq!(second["from_cache"], true);
        assert_eq!(second["fingerprint"], first["fingerprint"]);
        assert_ne!(second["job_id"], first["job_id"]);
    }

    #[tokio::test]
    async fn unsupported_upload_ends_in_error_status() {
        let dir = tempfile::tempdir().unwrap();
        let app = api_router(test_core_state(REPORT_TEXT, dir.path()));

        let upload = response_json(
            app.clone()
                .oneshot(multipart_request("file", "notes.txt", b"plain text, not a report"))
                .await
                .unwrap(),
        )
        .await;
        let status = wait_for_status(&app, upload["job_id"].as_str().unwrap()).await;
        assert_eq!(status["status"], "error");
        assert_eq!(status["error"]["kind"], "unsupported_format");
    }

    #[tokio::test]
    async fn zero_page_pdf_ends_in_corrupt_document() {
        let dir = tempfile::tempdir().unwrap();
        let app = api_router(test_core_state(REPORT_TEXT, dir.path()));

        let upload = response_json(
            app.clone()
                .oneshot(multipart_request("file", "empty.pdf", &make_pdf(Vec::<FixturePage>::new())))
                .await
                .unwrap(),
        )
        .await;
        let status = wait_for_status(&app, upload["job_id"].as_str().unwrap()).await;
        assert_eq!(status["status"], "error");
        assert_eq!(status["error"]["kind"], "corrupt_document");
    }

    #[tokio::test]
    async fn upload_without_file_field_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let app = api_router(test_core_state("", dir.path()));

        let response = app
            .oneshot(multipart_request("attachment", "cbc.jpg", b"data"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response_json(response).await["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn empty_upload_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let app = api_router(test_core_state("", dir.path()));

        let response = app
            .oneshot(multipart_request("file", "cbc.jpg", b""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_job_is_not_found_status() {
        let dir = tempfile::tempdir().unwrap();
        let app = api_router(test_core_state("", dir.path()));

        for id in [crate::models::job::JobId::new().to_string(), "garbage".to_string()] {
            let response = app
                .clone()
                .oneshot(get_request(&format!("/api/status/{id}")))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response_json(response).await["status"], "not_found");
        }
    }

    #[tokio::test]
    async fn missing_report_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let app = api_router(test_core_state("", dir.path()));

        let response = app
            .oneshot(get_request("/api/reports/does-not-exist"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn recent_is_empty_at_start() {
        let dir = tempfile::tempdir().unwrap();
        let app = api_router(test_core_state("", dir.path()));

        let response = app.oneshot(get_request("/api/reports/recent")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response_json(response).await, serde_json::json!({ "reports": [] }));
    }

    #[tokio::test]
    async fn scan_empty_then_with_documents() {
        let dir = tempfile::tempdir().unwrap();
        let core = test_core_state(REPORT_TEXT, dir.path());
        let app = api_router(core.clone());

        let scan = || {
            Request::builder()
                .method("POST")
                .uri("/api/scan")
                .body(Body::empty())
                .unwrap()
        };

        let response = app.clone().oneshot(scan()).await.unwrap();
        let json = response_json(response).await;
        assert_eq!(json["status"], "empty");
        assert!(json["message"].is_string());

        std::fs::create_dir_all(&core.config.uploads_dir).unwrap();
        std::fs::write(core.config.uploads_dir.join("a.jpg"), make_jpeg(120, 160)).unwrap();
        std::fs::write(core.config.uploads_dir.join("b.jpg"), make_jpeg(160, 120)).unwrap();

        let json = response_json(app.clone().oneshot(scan()).await.unwrap()).await;
        assert_eq!(json["status"], "ok");
        let ids = json["process_ids"].as_array().unwrap();
        assert_eq!(ids.len(), 2);
        for id in ids {
            let status = wait_for_status(&app, id.as_str().unwrap()).await;
            assert_eq!(status["status"], "completed");
        }
    }

    #[tokio::test]
    async fn cors_preflight_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let app = api_router(test_core_state("", dir.path()));

        let request = Request::builder()
            .method("OPTIONS")
            .uri("/api/reports/recent")
            .header(header::ORIGIN, "http://localhost:3000")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert!(response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }
}
