use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub label_studio_url: String,
    /// Unset means the annotation bridge reports `not_configured`.
    pub label_studio_api_key: Option<String>,
    pub downloads_dir: String,
    pub max_upload_mb: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            port: env_or("PORT", "5000")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
            label_studio_url: env_or("LABEL_STUDIO_URL", "http://localhost:8080"),
            label_studio_api_key: std::env::var("LABEL_STUDIO_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            downloads_dir: env_or("DOWNLOADS_DIR", "downloads"),
            max_upload_mb: env_or("MAX_UPLOAD_MB", "16")
                .parse::<usize>()
                .context("MAX_UPLOAD_MB must be a whole number of megabytes")?,
        })
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
