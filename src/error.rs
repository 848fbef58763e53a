//! Error types for uploads, transport, configuration and storage.

use thiserror::Error;

/// Errors reported by an [`HttpClient`](crate::services::HttpClient) request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HttpError {
    /// Connection dropped, DNS failure, timeout and the like
    #[error("Network error: {0}")]
    Network(String),

    /// Server answered with a non-success status
    #[error("Server responded with status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// Request was aborted through its cancel token
    #[error("Request canceled")]
    Canceled,

    /// No valid access token could be obtained
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl HttpError {
    /// Whether the failure counts against the retry budget.
    ///
    /// Every error a sent request comes back with does. An abort or a missing
    /// token means nothing reached the server.
    pub fn is_retryable(&self) -> bool {
        match self {
            HttpError::Network(_) | HttpError::Status { .. } => true,
            HttpError::Canceled | HttpError::Unauthorized(_) => false,
        }
    }
}

/// Errors that end an upload session.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UploadError {
    /// The file has no bytes to send
    #[error("Cannot upload an empty file")]
    EmptyFile,

    /// Chunked mode was configured with a zero chunk size
    #[error("Chunk size must be greater than zero")]
    InvalidChunkSize,

    /// The session was canceled by the caller
    #[error("Upload canceled")]
    Canceled,

    /// The retry budget ran out
    #[error("Upload failed after {errors} errors: {last}")]
    RetriesExhausted {
        /// Number of recorded errors
        errors: u32,
        /// The error that exhausted the budget
        last: HttpError,
    },

    /// Access token could not be obtained or refreshed
    #[error("Upload not authorized: {0}")]
    Unauthorized(String),
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// A configured value is out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// Underlying key-value store failed
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Errors raised by a [`KeyValueStore`](crate::services::KeyValueStore).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    /// Empty path or empty path segment
    #[error("Invalid key path '{0}'")]
    InvalidPath(String),

    /// A path segment walks through a non-object value
    #[error("Value at '{0}' is not an object")]
    NotAnObject(String),

    /// Backend failure (localStorage quota, file I/O, ...)
    #[error("Storage backend error: {0}")]
    Backend(String),
}
