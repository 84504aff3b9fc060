//! Error types for the document analysis pipeline
//!
//! Failures are isolated to the owning document: the orchestrator converts
//! these into per-document `AnalysisResult.error` strings and never aborts a
//! batch for them.

use thiserror::Error;

/// Result type alias for the analysis pipeline
pub type Result<T> = std::result::Result<T, AnalysisError>;

#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The external model has no credential configured. Degraded mode, not a
    /// processing failure; surfaced per document so the UI can say so.
    #[error("document analysis is not configured: set TAXINTAKE_API_KEY to enable it")]
    NotConfigured,

    /// Locator is neither a supported URL nor a safe relative path
    #[error("invalid document locator: {locator}")]
    InvalidLocator { locator: String },

    /// Local file read failed
    #[error("failed to read document: {0}")]
    Io(#[from] std::io::Error),

    /// Object-storage fetch failed
    #[error("object storage fetch failed: {0}")]
    Storage(#[from] object_store::Error),

    /// Plain HTTP fetch failed
    #[error("HTTP fetch failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Image exceeds the configured size bound; checked before any model call
    #[error("image too large: {size} bytes (max {limit})")]
    TooLarge { size: usize, limit: usize },

    /// The model call failed. The body is preserved so operators can tell
    /// quota exhaustion from misconfiguration.
    #[error("model call failed ({status}): {message}")]
    Model { status: u16, message: String },

    /// The model returned no usable content
    #[error("model returned no response content")]
    EmptyResponse,
}
