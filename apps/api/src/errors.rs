use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::annotation::LabelStudioError;
use crate::export::ExportError;
use crate::ingest::IngestError;
use crate::models::annotation::setup_instructions;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// No API key configured for the annotation service.
    #[error("Label Studio is not available")]
    LabelStudioUnavailable { url: String },

    #[error("Label Studio error: {0}")]
    LabelStudio(#[from] LabelStudioError),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut instructions = Vec::new();

        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Ingest(e) => {
                tracing::warn!("Upload rejected: {e}");
                (StatusCode::BAD_REQUEST, "INGEST_ERROR", e.to_string())
            }
            AppError::Export(e) => {
                tracing::error!("PDF export failed: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "EXPORT_ERROR",
                    "Failed to generate PDF on server".to_string(),
                )
            }
            AppError::LabelStudioUnavailable { url } => {
                instructions = setup_instructions(url);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "LABEL_STUDIO_UNAVAILABLE",
                    "Label Studio is not available. Please set up Label Studio and API key."
                        .to_string(),
                )
            }
            AppError::LabelStudio(e) => {
                tracing::error!("Label Studio error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "LABEL_STUDIO_ERROR",
                    format!("Label Studio request failed: {e}"),
                )
            }
            AppError::Storage(e) => {
                tracing::error!("Storage error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "Failed to write to the downloads folder".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let mut body = json!({
            "error": {
                "code": code,
                "message": message
            }
        });
        if !instructions.is_empty() {
            body["setup_instructions"] = json!(instructions);
        }

        (status, Json(body)).into_response()
    }
}
