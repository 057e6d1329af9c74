//! HTTP client the editor uses to reach the document service.
//!
//! `EditorBackend` is the seam the editor session is generic over; `BackendClient` is the
//! reqwest implementation, tests provide in-memory fakes.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{multipart, Client, Response};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::models::annotation::{
    AnnotationExportRequest, AnnotationExportResponse, AnnotationImportRequest,
    AnnotationImportResponse, AnnotationStatus, ProjectListResponse,
};
use crate::models::document::{
    ExportRequest, ExportResponse, SaveRequest, SaveResponse, UploadResponse,
};

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response; `message` is what the banner shows.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Human-readable message from an error body: `error.message`, a string `error`, or
/// `message`, falling back to the status code.
pub fn extract_error_message(body: &[u8], status: u16) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| {
            let error = v.get("error");
            error
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .or_else(|| error.and_then(Value::as_str))
                .or_else(|| v.get("message").and_then(Value::as_str))
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("Request failed with status {status}"))
}

#[async_trait]
pub trait EditorBackend: Send + Sync {
    async fn upload(
        &self,
        filename: &str,
        content_type: Option<&str>,
        bytes: Bytes,
    ) -> Result<UploadResponse, ClientError>;

    async fn save(&self, req: &SaveRequest) -> Result<SaveResponse, ClientError>;

    async fn export(&self, req: &ExportRequest) -> Result<ExportResponse, ClientError>;

    async fn export_annotations(
        &self,
        req: &AnnotationExportRequest,
    ) -> Result<AnnotationExportResponse, ClientError>;

    async fn import_annotations(
        &self,
        req: &AnnotationImportRequest,
    ) -> Result<AnnotationImportResponse, ClientError>;

    /// Status body is returned for every connectivity state, including the 503/500 ones.
    async fn annotation_status(&self) -> Result<AnnotationStatus, ClientError>;

    async fn annotation_projects(&self) -> Result<ProjectListResponse, ClientError>;
}

#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl Default for BackendClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a locator such as `/download/x.pdf`.
    pub fn resolve(&self, locator: &str) -> String {
        if locator.starts_with("http://") || locator.starts_with("https://") {
            locator.to_string()
        } else {
            format!("{}{locator}", self.base_url)
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: extract_error_message(&body, status.as_u16()),
            });
        }
        Ok(serde_json::from_slice(&body)?)
    }

    async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        debug!("POST {path}");
        let response = self
            .client
            .post(self.resolve(path))
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        debug!("GET {path}");
        let response = self.client.get(self.resolve(path)).send().await?;
        Self::decode(response).await
    }
}

#[async_trait]
impl EditorBackend for BackendClient {
    async fn upload(
        &self,
        filename: &str,
        content_type: Option<&str>,
        bytes: Bytes,
    ) -> Result<UploadResponse, ClientError> {
        let mut part = multipart::Part::bytes(bytes.to_vec()).file_name(filename.to_string());
        if let Some(ct) = content_type {
            part = part.mime_str(ct)?;
        }
        let form = multipart::Form::new().part("file", part);

        debug!("POST /upload ({filename})");
        let response = self
            .client
            .post(self.resolve("/upload"))
            .multipart(form)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn save(&self, req: &SaveRequest) -> Result<SaveResponse, ClientError> {
        self.post_json("/save", req).await
    }

    async fn export(&self, req: &ExportRequest) -> Result<ExportResponse, ClientError> {
        self.post_json("/export", req).await
    }

    async fn export_annotations(
        &self,
        req: &AnnotationExportRequest,
    ) -> Result<AnnotationExportResponse, ClientError> {
        self.post_json("/export-to-label-studio", req).await
    }

    async fn import_annotations(
        &self,
        req: &AnnotationImportRequest,
    ) -> Result<AnnotationImportResponse, ClientError> {
        self.post_json("/import-from-label-studio", req).await
    }

    async fn annotation_status(&self) -> Result<AnnotationStatus, ClientError> {
        let response = self
            .client
            .get(self.resolve("/label-studio-status"))
            .send()
            .await?;
        let status = response.status();
        let body = response.bytes().await?;
        match serde_json::from_slice::<AnnotationStatus>(&body) {
            Ok(parsed) => Ok(parsed),
            Err(_) if !status.is_success() => Err(ClientError::Api {
                status: status.as_u16(),
                message: extract_error_message(&body, status.as_u16()),
            }),
            Err(e) => Err(ClientError::Decode(e)),
        }
    }

    async fn annotation_projects(&self) -> Result<ProjectListResponse, ClientError> {
        self.get_json("/label-studio-projects").await
    }
}
