//! Error types for docdrop-import
//!
//! `ImportError` is what the dispatcher returns; `ApiError` is its HTTP face.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Dispatcher error type
#[derive(Debug, Error)]
pub enum ImportError {
    /// The registry returned no option to import with
    #[error("No import option available")]
    NoImportOption,

    /// Selection of an id that is not among the loaded options
    #[error("Unknown import option: {0}")]
    UnknownOption(String),

    /// Any failure while materializing input or running the target.
    /// The original cause is kept as `source`.
    #[error("Import through '{target}' failed: {source}")]
    Execution {
        target: String,
        #[source]
        source: anyhow::Error,
    },

    /// Staging a file into a batch failed
    #[error("Batch upload failed: {0}")]
    Upload(#[source] anyhow::Error),

    /// Navigation or permission lookup failed (propagated as-is)
    #[error(transparent)]
    Navigation(anyhow::Error),

    /// Import options could not be loaded
    #[error("Action registry failed: {0}")]
    Registry(#[source] anyhow::Error),
}

impl ImportError {
    pub fn execution(target: impl ToString, source: impl Into<anyhow::Error>) -> Self {
        ImportError::Execution {
            target: target.to_string(),
            source: source.into(),
        }
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Dispatcher error
    #[error(transparent)]
    Import(#[from] ImportError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Import(ref err) => {
                let (status, code) = match err {
                    ImportError::NoImportOption => (StatusCode::CONFLICT, "NO_IMPORT_OPTION"),
                    ImportError::UnknownOption(_) => (StatusCode::BAD_REQUEST, "UNKNOWN_OPTION"),
                    ImportError::Execution { .. } => (StatusCode::BAD_GATEWAY, "EXECUTION_FAILED"),
                    ImportError::Upload(_) => (StatusCode::INTERNAL_SERVER_ERROR, "UPLOAD_FAILED"),
                    ImportError::Navigation(_) => (StatusCode::BAD_GATEWAY, "NAVIGATION_FAILED"),
                    ImportError::Registry(_) => (StatusCode::BAD_GATEWAY, "REGISTRY_FAILED"),
                };
                (status, code, err.to_string())
            }
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
