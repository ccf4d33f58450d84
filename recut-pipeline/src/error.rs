//! Pipeline error types.

use recut_core::error::{CodecError, Error as CoreError};
use thiserror::Error;

/// Pipeline error type.
///
/// None of these are retried: any error during a run is fatal to that run.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Core error.
    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    /// Codec collaborator failure surfaced from a stage step.
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A stage could not be configured (bad or unsupported format, or
    /// configured twice).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No track produced a route from source to sink.
    #[error("Unresolved pipeline: {0}")]
    Unresolved(String),

    /// The run was cancelled by the caller.
    #[error("Pipeline cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        PipelineError::Configuration(msg.into())
    }

    /// Create an unresolved-pipeline error.
    pub fn unresolved(msg: impl Into<String>) -> Self {
        PipelineError::Unresolved(msg.into())
    }
}

/// Pipeline result type.
pub type Result<T> = std::result::Result<T, PipelineError>;
