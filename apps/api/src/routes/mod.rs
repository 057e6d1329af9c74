pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::annotation::handlers as annotation;
use crate::documents::handlers as documents;
use crate::ingest::handlers as ingest;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes();

    Router::new()
        .route("/health", get(health::health_handler))
        // Documents
        .route("/upload", post(ingest::handle_upload))
        .route("/save", post(documents::handle_save))
        .route("/export", post(documents::handle_export))
        .route("/download/:filename", get(documents::handle_download))
        // Annotation bridge
        .route("/export-to-label-studio", post(annotation::handle_export))
        .route("/import-from-label-studio", post(annotation::handle_import))
        .route("/batch-annotation", post(annotation::handle_batch))
        .route("/label-studio-projects", get(annotation::handle_projects))
        .route("/label-studio-status", get(annotation::handle_status))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::document::FieldStore;
    use crate::extraction::{ExtractedFields, FieldExtractor};
    use crate::llm_client::LlmError;

    /// Returns the same two fields for any document.
    struct FixedExtractor;

    #[async_trait]
    impl FieldExtractor for FixedExtractor {
        async fn extract(&self, _raw_text: &str) -> Result<ExtractedFields, LlmError> {
            let mut fields = FieldStore::new();
            fields.set("Name", Some("Jane Doe".into()));
            fields.set("Email", Some("jane@example.com".into()));
            Ok(ExtractedFields {
                fields,
                order: vec!["Name".into(), "Email".into()],
            })
        }
    }

    fn test_state(downloads: &std::path::Path) -> AppState {
        let config = Config {
            gemini_api_key: "test".into(),
            port: 0,
            rust_log: "info".into(),
            label_studio_url: "http://localhost:8080".into(),
            label_studio_api_key: None,
            downloads_dir: downloads.to_string_lossy().into_owned(),
            max_upload_mb: 1,
        };
        AppState::new(config, Arc::new(FixedExtractor))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn multipart_request(field: &str, filename: &str, mime: &str, content: &str) -> Request<Body> {
        let boundary = "X-BOUNDARY";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
             Content-Type: {mime}\r\n\r\n{content}\r\n--{boundary}--\r\n"
        );
        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_upload_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()));

        let response = app
            .oneshot(multipart_request("file", "cv.txt", "text/plain", "Jane Doe\njane@example.com"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(
            body["quill_content_delta"],
            json!([{"insert": "Jane Doe\njane@example.com"}])
        );
        assert_eq!(body["parsed_data"]["Name"], "Jane Doe");
        assert_eq!(body["parsed_data_order"], json!(["Name", "Email"]));
        assert_eq!(body["raw_text_content"], "Jane Doe\njane@example.com");
    }

    #[tokio::test]
    async fn test_upload_without_file_part() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()));

        let response = app
            .oneshot(multipart_request("other", "cv.txt", "text/plain", "x"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["message"], "No file provided");
    }

    #[tokio::test]
    async fn test_upload_empty_filename() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()));

        let response = app
            .oneshot(multipart_request("file", "", "text/plain", "x"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["message"], "No file selected");
    }

    #[tokio::test]
    async fn test_upload_unsupported_type() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()));

        let response = app
            .oneshot(multipart_request("file", "photo.png", "image/png", "x"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let message = body_json(response).await["error"]["message"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(message.contains("photo.png"), "{message}");
    }

    #[tokio::test]
    async fn test_save_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()));

        let response = app
            .oneshot(json_request(
                "POST",
                "/save",
                json!({
                    "edited_data": {"Name": "Jane"},
                    "quill_content_delta": [{"insert": "NAME\n", "attributes": {"bold": true}}]
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names.len(), 2);
        assert!(names[0].starts_with("saved_document_quill_delta_"));
        assert!(names[1].starts_with("saved_document_structured_"));
    }

    #[tokio::test]
    async fn test_export_then_download() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()));

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/export",
                json!({"quill_content_delta": [{"insert": "Hello PDF\n"}]}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let url = body["pdf_download_url"].as_str().unwrap().to_string();
        assert!(url.starts_with("/download/exported_document_"));

        let response = app
            .oneshot(Request::get(url).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_export_empty_delta() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()));

        let response = app
            .oneshot(json_request("POST", "/export", json!({"quill_content_delta": []})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["error"]["message"],
            "No content to export"
        );
    }

    #[tokio::test]
    async fn test_download_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()));

        for uri in ["/download/missing.pdf", "/download/..%2Fsecret.json"] {
            let response = app
                .clone()
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_annotation_status_not_configured() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()));

        let response = app
            .oneshot(Request::get("/label-studio-status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["status"], "not_configured");
        assert_eq!(body["setup_instructions"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_annotation_endpoints_unavailable_without_key() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()));

        let response = app
            .oneshot(json_request(
                "POST",
                "/import-from-label-studio",
                json!({"project_id": 1}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "LABEL_STUDIO_UNAVAILABLE");
        assert!(body["setup_instructions"].is_array());
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()));

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    /// Serves the router on an ephemeral port for the HTTP client.
    async fn serve(state: AppState) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, build_router(state)).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_editor_against_live_server() {
        use bytes::Bytes;

        use crate::client::{BackendClient, ClientError};
        use crate::editor::{EditorError, EditorSession};
        use crate::models::annotation::ConnectionState;

        let dir = tempfile::tempdir().unwrap();
        let base_url = serve(test_state(dir.path())).await;
        let mut session = EditorSession::new(BackendClient::new(base_url));

        session.select_file("photo.png", Some("image/png".into()), Bytes::from_static(b"\x89PNG"));
        let err = session.upload().await.unwrap_err();
        assert!(matches!(
            err,
            EditorError::Request(ClientError::Api { status: 400, .. })
        ));
        let banner = session.state().error.clone().unwrap();
        assert!(banner.starts_with("Unsupported file type"), "{banner}");
        assert!(banner.contains("photo.png"), "{banner}");
        assert!(session.state().fields.is_empty());
        assert!(!session.state().loading);

        session.dismiss_error();
        session.select_file(
            "cv.txt",
            Some("text/plain".into()),
            Bytes::from_static(b"Jane Doe\njane@example.com"),
        );
        assert!(session.upload().await.unwrap());
        assert_eq!(session.state().fields.get("Name"), Some("Jane Doe"));
        assert!(session.state().error.is_none());

        assert_eq!(
            session.refresh_annotation_status().await,
            ConnectionState::NotConfigured
        );
    }
}
