use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use tracing::{error, info};

use crate::downloads::{content_type_for, download_url, timestamp};
use crate::errors::AppError;
use crate::export::{render_pdf, PageSetup};
use crate::models::document::{ExportRequest, ExportResponse, SaveRequest, SaveResponse};
use crate::state::AppState;

/// POST /save
/// Writes the edited fields and the current delta as two timestamped JSON files.
pub async fn handle_save(
    State(state): State<AppState>,
    Json(req): Json<SaveRequest>,
) -> Result<Json<SaveResponse>, AppError> {
    let ts = timestamp();
    let structured = format!("saved_document_structured_{ts}.json");
    let delta = format!("saved_document_quill_delta_{ts}.json");

    state.downloads.write_json(&structured, &req.edited_data).await?;
    state
        .downloads
        .write_json(&delta, &req.quill_content_delta)
        .await?;

    info!(
        "Saved document: {} fields, {} runs",
        req.edited_data.len(),
        req.quill_content_delta.len()
    );

    Ok(Json(SaveResponse {
        message: format!("Document saved successfully as {structured} and {delta}"),
    }))
}

/// POST /export
/// Renders the delta to PDF and returns where to download it.
pub async fn handle_export(
    State(state): State<AppState>,
    Json(req): Json<ExportRequest>,
) -> Result<Json<ExportResponse>, AppError> {
    if req.quill_content_delta.text().trim().is_empty() {
        return Err(AppError::Validation("No content to export".into()));
    }

    let delta = req.quill_content_delta;
    let pdf = tokio::task::spawn_blocking(move || render_pdf(&delta, &PageSetup::default()))
        .await
        .map_err(|e| {
            error!("PDF render task failed: {e}");
            AppError::Internal(anyhow::anyhow!("PDF render task failed: {e}"))
        })??;

    let filename = format!("exported_document_{}.pdf", timestamp());
    state.downloads.write_bytes(&filename, pdf).await?;

    Ok(Json(ExportResponse {
        message: "PDF exported successfully".into(),
        pdf_download_url: download_url(&filename),
        filename,
    }))
}

/// GET /download/:filename
pub async fn handle_download(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let path = state
        .downloads
        .resolve(&filename)
        .ok_or_else(|| AppError::NotFound(format!("File '{filename}' not found")))?;
    let bytes = tokio::fs::read(&path).await?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type_for(&filename).to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    ))
}
