//! HTTP boundary error for aliasproxy.
//!
//! Every request-time failure is normalised to the Matrix `M_NOT_FOUND` shape;
//! the service never answers a federation query with a 5xx.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Matrix error code for a missing resource.
pub const M_NOT_FOUND: &str = "M_NOT_FOUND";

/// Error returned by route handlers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProxyError {
    #[error("Room alias {0} not found")]
    AliasNotFound(String),

    #[error("Failed to resolve {0}")]
    ResolutionFailed(String),

    #[error("No server keys found")]
    NoServerKeys,

    #[error("No well-known server configured")]
    NoWellKnown,

    #[error(
        "This is an aliasproxy instance that doesn't handle anything other than federation alias queries"
    )]
    UnknownEndpoint,
}

/// JSON error body in the Matrix `{errcode, error}` format.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub errcode: &'static str,
    pub error: String,
}

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::NOT_FOUND
    }

    pub fn error_code(&self) -> &'static str {
        M_NOT_FOUND
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            errcode: self.error_code(),
            error: self.to_string(),
        };
        (self.status_code(), axum::Json(body)).into_response()
    }
}

/// Convenience type alias for handler results.
pub type ProxyResult<T> = Result<T, ProxyError>;
