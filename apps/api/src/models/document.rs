use serde::{Deserialize, Serialize};

use crate::document::{Delta, FieldStore};

/// Result of `POST /upload`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadResponse {
    pub quill_content_delta: Delta,
    pub parsed_data: FieldStore,
    #[serde(default)]
    pub parsed_data_order: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_text_content: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaveRequest {
    #[serde(default)]
    pub edited_data: FieldStore,
    #[serde(default)]
    pub quill_content_delta: Delta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveResponse {
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportRequest {
    #[serde(default)]
    pub quill_content_delta: Delta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportResponse {
    pub message: String,
    pub filename: String,
    pub pdf_download_url: String,
}
