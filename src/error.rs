//! Failure taxonomy for the ingestion and analysis pipelines.
//!
//! Construction-time [`PipelineError::Configuration`] errors are fatal and
//! abort the whole run. Everything else is caught at the batch boundary,
//! logged with the offending document, and the batch moves on.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Missing credential or invalid required setting. Fatal — nothing will work.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An input file (PDF, manifest) does not exist on disk.
    #[error("file not found: {0}")]
    NotFound(String),

    /// The model response does not parse as the expected structure.
    #[error("malformed model output: {0}")]
    MalformedOutput(String),

    /// A remote call failed in a way that is worth retrying.
    #[error("transient error: {0}")]
    Transient(String),

    /// A remote call exceeded its deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Storage layer failure. Upserts are idempotent, so these are retried.
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    /// Catch-all. Reported per item; the batch continues.
    #[error("{0}")]
    Unexpected(String),
}

impl PipelineError {
    /// Fatal errors abort the whole batch instead of being skipped per item.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PipelineError::Configuration(_))
    }

    /// Errors worth a bounded retry with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PipelineError::Transient(_) | PipelineError::Timeout(_) | PipelineError::Store(_)
        )
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            PipelineError::NotFound(err.to_string())
        } else {
            PipelineError::Unexpected(err.to_string())
        }
    }
}
