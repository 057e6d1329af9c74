//! Downloads folder: the only state the service persists (saved documents, exported PDFs,
//! annotation insight reports). Files are written atomically and served back by basename.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone)]
pub struct DownloadStore {
    root: PathBuf,
}

impl DownloadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    /// Writes `value` as pretty JSON under `filename`.
    pub async fn write_json<T: Serialize>(
        &self,
        filename: &str,
        value: &T,
    ) -> anyhow::Result<PathBuf> {
        let bytes = serde_json::to_vec_pretty(value).context("serializing download")?;
        self.write_bytes(filename, bytes).await
    }

    pub async fn write_bytes(&self, filename: &str, bytes: Vec<u8>) -> anyhow::Result<PathBuf> {
        let name = safe_filename(filename)
            .with_context(|| format!("refusing to write unsafe filename '{filename}'"))?;
        self.ensure_dir().await?;

        let root = self.root.clone();
        let target = root.join(name);
        let path = tokio::task::spawn_blocking(move || -> anyhow::Result<PathBuf> {
            let mut tmp = tempfile::NamedTempFile::new_in(&root)?;
            tmp.write_all(&bytes)?;
            tmp.flush()?;
            tmp.persist(&target).map_err(|e| e.error)?;
            Ok(target)
        })
        .await
        .context("download writer task panicked")??;

        info!("Wrote {}", path.display());
        Ok(path)
    }

    /// Path of an existing download, or `None` for unknown or unsafe names.
    pub fn resolve(&self, requested: &str) -> Option<PathBuf> {
        let name = safe_filename(requested)?;
        let path = self.root.join(name);
        path.is_file().then_some(path)
    }
}

/// Locator handed back to the editor for a file in the downloads folder.
pub fn download_url(filename: &str) -> String {
    format!("/download/{filename}")
}

/// `20261017_093000`: the suffix used for every generated filename.
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Accepts bare file names only: no separators, no parent references, no hidden files.
fn safe_filename(requested: &str) -> Option<&str> {
    let name = Path::new(requested).file_name()?.to_str()?;
    if name != requested || name.starts_with('.') || name.contains('\\') {
        return None;
    }
    Some(name)
}

pub fn content_type_for(filename: &str) -> &'static str {
    match Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}
