//! Error types for flashpack

use std::fmt;
use std::path::PathBuf;

/// Main error type for flashpack operations
#[derive(Debug)]
pub enum FlashError {
    /// Malformed or truncated binary/text input, bad offsets, bad item identifiers
    Format(String),

    /// IO error without path context
    IoError(std::io::Error),

    /// IO error on a specific path
    IoAt {
        /// Path the operation failed on
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Key parsing or signing failure
    Crypto(String),

    /// A checksum did not match where a match was required
    ChecksumMismatch(String),

    /// JSON serialization error
    JsonError(serde_json::Error),

    /// Generic error with message
    Generic(String),
}

impl FlashError {
    /// Shorthand for a format error
    pub fn format(msg: impl Into<String>) -> Self {
        FlashError::Format(msg.into())
    }

    /// Wrap an IO error with the path it happened on
    pub fn io_at(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FlashError::IoAt {
            path: path.into(),
            source,
        }
    }
}

impl fmt::Display for FlashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlashError::Format(msg) => write!(f, "Format error: {msg}"),
            FlashError::IoError(err) => write!(f, "IO error: {err}"),
            FlashError::IoAt { path, source } => {
                write!(f, "IO error: {}: {source}", path.display())
            }
            FlashError::Crypto(msg) => write!(f, "Crypto error: {msg}"),
            FlashError::ChecksumMismatch(msg) => write!(f, "Checksum mismatch: {msg}"),
            FlashError::JsonError(err) => write!(f, "JSON error: {err}"),
            FlashError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for FlashError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FlashError::IoError(err) => Some(err),
            FlashError::IoAt { source, .. } => Some(source),
            FlashError::JsonError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FlashError {
    fn from(err: std::io::Error) -> Self {
        FlashError::IoError(err)
    }
}

impl From<serde_json::Error> for FlashError {
    fn from(err: serde_json::Error) -> Self {
        FlashError::JsonError(err)
    }
}

impl From<anyhow::Error> for FlashError {
    fn from(err: anyhow::Error) -> Self {
        FlashError::Generic(err.to_string())
    }
}

/// Result type for flashpack operations
pub type Result<T> = std::result::Result<T, FlashError>;
