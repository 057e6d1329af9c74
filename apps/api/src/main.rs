use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use docedit_api::config::Config;
use docedit_api::extraction::LlmFieldExtractor;
use docedit_api::llm_client::{self, LlmClient};
use docedit_api::routes::build_router;
use docedit_api::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting docedit API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client and the extractor built on it
    let llm = LlmClient::new(config.gemini_api_key.clone());
    info!("LLM client initialized (model: {})", llm_client::MODEL);
    let extractor = Arc::new(LlmFieldExtractor::new(llm));

    let state = AppState::new(config.clone(), extractor);

    state.downloads.ensure_dir().await?;
    info!("Downloads folder: {}", state.downloads.root().display());

    match &state.label_studio {
        Some(ls) => info!("Label Studio integration enabled ({})", ls.base_url()),
        None => warn!("LABEL_STUDIO_API_KEY not set; annotation endpoints will answer 503"),
    }

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
