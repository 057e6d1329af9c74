use std::sync::Arc;

use crate::annotation::LabelStudioClient;
use crate::config::Config;
use crate::downloads::DownloadStore;
use crate::errors::AppError;
use crate::extraction::FieldExtractor;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Pluggable field extractor. Default: Gemini-backed `LlmFieldExtractor`.
    pub extractor: Arc<dyn FieldExtractor>,
    /// `None` when no API key is configured.
    pub label_studio: Option<LabelStudioClient>,
    pub downloads: DownloadStore,
}

impl AppState {
    pub fn new(config: Config, extractor: Arc<dyn FieldExtractor>) -> Self {
        let label_studio = config
            .label_studio_api_key
            .clone()
            .map(|key| LabelStudioClient::new(config.label_studio_url.clone(), key));
        let downloads = DownloadStore::new(&config.downloads_dir);
        Self {
            config,
            extractor,
            label_studio,
            downloads,
        }
    }

    /// The annotation client, or the 503 every annotation endpoint answers without one.
    pub fn label_studio(&self) -> Result<&LabelStudioClient, AppError> {
        self.label_studio
            .as_ref()
            .ok_or_else(|| AppError::LabelStudioUnavailable {
                url: self.config.label_studio_url.clone(),
            })
    }
}
