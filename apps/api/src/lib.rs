//! Document editor backend and editor core.
//!
//! The binary in `main.rs` serves the HTTP endpoints; `editor` and `client` are the
//! editing session and the HTTP client it drives them with.

pub mod annotation;
pub mod client;
pub mod config;
pub mod document;
pub mod documents;
pub mod downloads;
pub mod editor;
pub mod errors;
pub mod export;
pub mod extraction;
pub mod ingest;
pub mod llm_client;
pub mod models;
pub mod routes;
pub mod state;
