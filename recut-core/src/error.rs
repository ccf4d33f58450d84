//! Error types for the recut engine.

use thiserror::Error;

/// Main error type shared across recut components.
#[derive(Error, Debug)]
pub enum Error {
    /// A stage or collaborator could not be configured.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Codec collaborator failure.
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// I/O errors (source unreadable, sink unwritable).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid parameter provided by the caller.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Unsupported feature or format.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Operation was cancelled.
    #[error("Operation cancelled")]
    Cancelled,

    /// End of stream reached.
    #[error("End of stream")]
    EndOfStream,
}

/// Errors surfaced by a codec collaborator.
#[derive(Error, Debug)]
pub enum CodecError {
    /// Codec was used before being configured and started.
    #[error("Codec not initialized")]
    NotInitialized,

    /// Encoder configuration rejected.
    #[error("Encoder configuration error: {0}")]
    EncoderConfig(String),

    /// Decoder configuration rejected.
    #[error("Decoder configuration error: {0}")]
    DecoderConfig(String),

    /// Buffer index out of range or already released.
    #[error("Invalid buffer index: {0}")]
    InvalidBuffer(usize),

    /// Underlying device failed mid-stream.
    #[error("Codec device failure: {0}")]
    Device(String),

    /// Generic codec error message.
    #[error("{0}")]
    Other(String),
}

impl From<String> for CodecError {
    fn from(s: String) -> Self {
        CodecError::Other(s)
    }
}

impl From<&str> for CodecError {
    fn from(s: &str) -> Self {
        CodecError::Other(s.to_string())
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    /// Create an invalid parameter error.
    pub fn invalid_param(msg: impl Into<String>) -> Self {
        Error::InvalidParameter(msg.into())
    }

    /// Check if this is an end-of-stream error.
    #[must_use]
    pub fn is_eof(&self) -> bool {
        matches!(self, Error::EndOfStream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Configuration("bad mime".into());
        assert_eq!(err.to_string(), "Configuration error: bad mime");
    }

    #[test]
    fn test_codec_error_conversion() {
        let codec_err = CodecError::NotInitialized;
        let err: Error = codec_err.into();
        assert!(matches!(err, Error::Codec(CodecError::NotInitialized)));
    }

    #[test]
    fn test_is_eof() {
        assert!(Error::EndOfStream.is_eof());
        assert!(!Error::Cancelled.is_eof());
    }
}
