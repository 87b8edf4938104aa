//! Error types for media-dl
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error variants (request validation, engine, storage)
//! - HTTP status code mapping for API integration
//! - Structured error bodies with machine-readable error codes

use crate::types::JobId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for media-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for media-dl
///
/// Engine errors carry the engine's message verbatim; there is no finer
/// classification of extraction failures.
#[derive(Debug, Error)]
pub enum Error {
    /// Client supplied an invalid request (missing URL, unparsable quality)
    #[error("{0}")]
    InvalidRequest(String),

    /// Client supplied a filename that cannot be resolved inside the storage area
    #[error("invalid filename {name:?}: {reason}")]
    InvalidFilename {
        /// The rejected filename
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "PORT")
        key: Option<String>,
    },

    /// Requested resource does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// The fetch engine reported a failure (bad URL, unsupported site, network, transcoding)
    #[error("{0}")]
    Engine(String),

    /// The engine reported success but no output file exists for the job
    #[error("output file for download {id} not found")]
    OutputMissing {
        /// The job whose output is missing
        id: JobId,
    },

    /// yt-dlp could not be executed (binary missing, spawn failure)
    ///
    /// Answered like any other engine failure: 500 with the message as is.
    #[error("{0}")]
    ExternalTool(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Service is shutting down and not accepting new downloads
    #[error("shutting down, not accepting new downloads")]
    ShuttingDown,

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),
}

/// Error body returned by the REST API
///
/// `error` holds the human-readable message, `code` a stable machine-readable
/// identifier.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": "output file for download 1b4e28ba-2fa1-11d2-883f-0016d3cca427 not found",
///   "code": "output_missing",
///   "details": { "download_id": "1b4e28ba-2fa1-11d2-883f-0016d3cca427" }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Human-readable error message
    pub error: String,

    /// Machine-readable error code (e.g., "invalid_request", "engine_error")
    pub code: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::InvalidRequest(_) => 400,
            Error::InvalidFilename { .. } => 400,
            Error::Config { .. } => 400,

            // 404 Not Found
            Error::NotFound(_) => 404,

            // 500 Internal Server Error - engine and storage failures
            Error::Engine(_) => 500,
            Error::ExternalTool(_) => 500,
            Error::OutputMissing { .. } => 500,
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,

            // 503 Service Unavailable - service stopping
            Error::ShuttingDown => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::InvalidRequest(_) => "invalid_request",
            Error::InvalidFilename { .. } => "invalid_filename",
            Error::Config { .. } => "config_error",
            Error::NotFound(_) => "not_found",
            Error::Engine(_) => "engine_error",
            Error::OutputMissing { .. } => "output_missing",
            Error::ExternalTool(_) => "external_tool_error",
            Error::ShuttingDown => "shutting_down",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::OutputMissing { id } => Some(serde_json::json!({
                "download_id": id,
            })),
            Error::InvalidFilename { name, .. } => Some(serde_json::json!({
                "filename": name,
            })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            _ => None,
        };

        ApiError {
            error: message,
            code,
            details,
        }
    }
}
