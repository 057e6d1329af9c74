use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use tracing::{error, info};

use crate::errors::AppError;
use crate::extraction::extract_or_empty;
use crate::ingest::{ingest, DocumentKind, IngestError};
use crate::models::document::UploadResponse;
use crate::state::AppState;

/// The `file` part of an upload form.
struct UploadedFile {
    filename: String,
    content_type: Option<String>,
    bytes: Bytes,
}

async fn read_file_part(multipart: &mut Multipart) -> Result<UploadedFile, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?;
        return Ok(UploadedFile {
            filename,
            content_type,
            bytes,
        });
    }
    Err(AppError::Validation("No file provided".into()))
}

/// POST /upload
/// Multipart `file` → initial delta, extracted fields and their discovery order.
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let file = read_file_part(&mut multipart).await?;
    if file.filename.trim().is_empty() {
        return Err(AppError::Validation("No file selected".into()));
    }

    let kind = DocumentKind::detect(&file.filename, file.content_type.as_deref())?;
    info!(
        "Processing upload '{}' ({:?}, {} bytes)",
        file.filename,
        kind,
        file.bytes.len()
    );

    let bytes = file.bytes;
    let doc = tokio::task::spawn_blocking(move || ingest(kind, &bytes))
        .await
        .map_err(|e| {
            error!("Ingestion task failed: {e}");
            IngestError::Crashed
        })??;

    let extracted = extract_or_empty(state.extractor.as_ref(), &doc.raw_text).await;

    Ok(Json(UploadResponse {
        quill_content_delta: doc.delta,
        parsed_data: extracted.fields,
        parsed_data_order: extracted.order,
        raw_text_content: Some(doc.raw_text),
    }))
}
