//! Field extraction: asks the LLM for the document's key fields and turns the answer into a
//! Field Store plus the order the fields were discovered in.
//!
//! `AppState` holds an `Arc<dyn FieldExtractor>`; the Gemini-backed implementation is the
//! default, tests swap in fixed extractors.

pub mod prompts;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::document::fields::normalize_value;
use crate::document::FieldStore;
use crate::extraction::prompts::{extraction_system, EXTRACTION_PROMPT};
use crate::llm_client::{LlmClient, LlmError};

/// One field as returned by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedField {
    #[serde(default)]
    pub field_name: String,
    #[serde(default)]
    pub field_value: Value,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub confidence: Option<String>,
}

/// Extraction output: values plus discovery order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedFields {
    pub fields: FieldStore,
    pub order: Vec<String>,
}

impl ExtractedFields {
    /// Keeps the first position of each name; a repeated name overwrites the value only.
    pub fn from_items(items: Vec<ExtractedField>) -> Self {
        let mut out = Self::default();
        for item in items {
            let name = item.field_name.trim();
            if name.is_empty() {
                continue;
            }
            if !out.fields.contains(name) {
                out.order.push(name.to_string());
            }
            out.fields.set(name, normalize_value(&item.field_value));
        }
        out
    }
}

#[async_trait]
pub trait FieldExtractor: Send + Sync {
    async fn extract(&self, raw_text: &str) -> Result<ExtractedFields, LlmError>;
}

/// Gemini-backed extractor.
pub struct LlmFieldExtractor {
    llm: LlmClient,
}

impl LlmFieldExtractor {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl FieldExtractor for LlmFieldExtractor {
    async fn extract(&self, raw_text: &str) -> Result<ExtractedFields, LlmError> {
        let prompt = EXTRACTION_PROMPT.replace("{raw_text}", raw_text);
        let items: Vec<ExtractedField> = self.llm.call_json(&prompt, &extraction_system()).await?;
        let extracted = ExtractedFields::from_items(items);
        info!("Extracted {} fields", extracted.order.len());
        Ok(extracted)
    }
}

/// Runs extraction, degrading to an empty result on failure so the upload still succeeds.
pub async fn extract_or_empty(extractor: &dyn FieldExtractor, raw_text: &str) -> ExtractedFields {
    match extractor.extract(raw_text).await {
        Ok(fields) => fields,
        Err(e) => {
            warn!("AI field extraction failed, continuing with no fields: {e}");
            ExtractedFields::default()
        }
    }
}
