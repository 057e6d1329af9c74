// PDF export of the current delta.
// Layout is CPU-bound: handlers must run it inside tokio::task::spawn_blocking.

pub mod pdf;

use thiserror::Error;

pub use pdf::{render_pdf, PageSetup};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No content to export")]
    Empty,

    #[error("PDF encoding failed: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("PDF write failed: {0}")]
    Io(#[from] std::io::Error),
}
