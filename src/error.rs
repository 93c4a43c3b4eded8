//! Error types for taskboard
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, unknown task, bad config)
//! - 4: Operation failed (I/O, tracker, lock contention)
//!
//! The HTTP layer maps the same variants onto status codes via
//! [`Error::status_code`].

use std::path::PathBuf;

use axum::http::StatusCode;
use thiserror::Error;

/// Exit codes for the taskboard CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for taskboard operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Task not found: {0}")]
    TaskNotFound(u64),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // Operation failures (exit code 4)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("Tracker authentication failed: {0}")]
    RemoteAuth(String),

    #[error("Tracker fetch failed: {0}")]
    RemoteFetch(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Bug counters have not been fetched yet")]
    CountersUnavailable,

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::TaskNotFound(_) | Error::InvalidConfig(_) | Error::InvalidArgument(_) => {
                exit_codes::USER_ERROR
            }

            Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::LockFailed(_)
            | Error::RemoteAuth(_)
            | Error::RemoteFetch(_)
            | Error::Http(_)
            | Error::CountersUnavailable
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// HTTP status reported when this error reaches the request surface
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::TaskNotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidArgument(_) | Error::InvalidConfig(_) => StatusCode::BAD_REQUEST,
            Error::RemoteAuth(_) | Error::RemoteFetch(_) | Error::Http(_) => {
                StatusCode::BAD_GATEWAY
            }
            Error::CountersUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::LockFailed(_)
            | Error::OperationFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Error::TaskNotFound(_) => "task_not_found",
            Error::InvalidConfig(_) => "invalid_config",
            Error::InvalidArgument(_) => "invalid_argument",
            Error::Io(_) => "io",
            Error::Json(_) => "json",
            Error::TomlParse(_) | Error::TomlSerialize(_) => "toml",
            Error::LockFailed(_) => "lock_failed",
            Error::RemoteAuth(_) => "remote_auth",
            Error::RemoteFetch(_) | Error::Http(_) => "remote_fetch",
            Error::CountersUnavailable => "counters_unavailable",
            Error::OperationFailed(_) => "operation_failed",
        }
    }

    /// Structured details for errors that carry more than a message
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::TaskNotFound(id) => Some(serde_json::json!({ "id": id })),
            Error::LockFailed(path) => {
                Some(serde_json::json!({ "path": path.display().to_string() }))
            }
            Error::InvalidConfig(message) | Error::InvalidArgument(message) => {
                Some(serde_json::json!({ "message": message }))
            }
            _ => None,
        }
    }
}

/// Result type alias for taskboard operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            kind: err.kind(),
            details: err.details(),
        }
    }
}
