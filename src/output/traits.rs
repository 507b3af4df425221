//! Output traits and error types
//!
//! This module defines the renderer interface used for PDF artifacts and
//! the error type shared by every exporter.

use std::path::Path;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Failed to format output: {0}")]
    Format(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("PDF rendering failed: {0}")]
    Render(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Converts a rendered HTML document into a paginated PDF
///
/// Implementations are black boxes; the exporter only cares whether the
/// PDF file exists afterwards.
pub trait PdfRenderer {
    /// Renders `html` into `pdf`
    fn render(&self, html: &Path, pdf: &Path) -> OutputResult<()>;
}
