//! # Error Module
//!
//! Error types shared by every component of the crawler.
//!
//! - [`SpiderError`] is what the crawler, builder and spiders return.
//! - [`PipelineError`] is what item pipeline stages return. An unhandled
//!   pipeline error halts the crawl.
//! - [`FetchError`] is what a [`Fetcher`](crate::Fetcher) returns when a
//!   request could not be completed at the transport level. These never halt
//!   a crawl; they are reported and the task is dropped.

use std::time::Duration;

/// Errors raised while configuring or running a crawl.
#[derive(Debug, thiserror::Error)]
pub enum SpiderError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Fetch error: {0}")]
    FetchError(#[from] FetchError),

    #[error("Pipeline error: {0}")]
    PipelineError(#[from] PipelineError),

    #[error("Extraction error: {0}")]
    ExtractionError(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Errors raised by item pipeline stages.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Stage '{stage}' failed: {message}")]
    StageError { stage: String, message: String },
}

impl PipelineError {
    /// Creates a stage failure carrying the stage's name.
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        PipelineError::StageError {
            stage: stage.into(),
            message: message.into(),
        }
    }
}

/// Errors raised when a fetch could not complete.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("fetcher is not open")]
    NotOpen,

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl FetchError {
    /// Returns `true` if this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout(_))
    }
}
