//! Error types for engine operations.
//!
//! Absence of a joint, angle or ball is never an error: it travels through
//! the pipeline as an explicit missing value. Only configuration problems
//! are fatal, and backend failures are recovered by tier fallback.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while configuring or running the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown backend: {0}")]
    UnknownBackend(String),

    #[error("Missing schema table for backend: {0}")]
    MissingSchema(String),

    #[error("Backend {backend} failed: {message}")]
    BackendFailed { backend: String, message: String },

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Invalid detection: {0}")]
    InvalidDetection(String),

    #[error("Analysis task failed: {0}")]
    TaskFailed(String),

    #[error("Font error: {0}")]
    Font(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl EngineError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a backend failure error.
    pub fn backend_failed(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BackendFailed {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Create an invalid detection error.
    pub fn invalid_detection(message: impl Into<String>) -> Self {
        Self::InvalidDetection(message.into())
    }

    /// Whether this error must stop the job at startup.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::UnknownBackend(_) | Self::MissingSchema(_) | Self::Font(_)
        )
    }
}
