//! Helper types and traits for cleaner route handlers.
//!
//! Provides extension traits for converting `Result` types into
//! HTTP-appropriate error responses, reducing boilerplate in routes.

use axum::http::StatusCode;
use pdf_reflow_core::Error;
use tracing::{error, warn};

/// Standard result type for route handlers.
pub type RouteResult<T> = Result<T, (StatusCode, String)>;

/// Extension trait for converting `Result<T, E>` to `RouteResult<T>`.
pub trait ResultExt<T, E: std::fmt::Display> {
    /// Converts the error to 500 Internal Server Error.
    fn or_internal_error(self) -> RouteResult<T>;

    /// Converts the error to 400 Bad Request.
    fn or_bad_request(self) -> RouteResult<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T, E> for Result<T, E> {
    fn or_internal_error(self) -> RouteResult<T> {
        self.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
    }

    fn or_bad_request(self) -> RouteResult<T> {
        self.map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
    }
}

/// Extension trait mapping library errors to the status they deserve.
pub trait CoreResultExt<T> {
    fn or_status(self) -> RouteResult<T>;
}

impl<T> CoreResultExt<T> for pdf_reflow_core::Result<T> {
    fn or_status(self) -> RouteResult<T> {
        self.map_err(|e| {
            let status = status_for(&e);
            if status.is_server_error() {
                error!("Request failed: {}", e);
            } else {
                warn!("Request rejected: {}", e);
            }
            (status, e.to_string())
        })
    }
}

/// HTTP status for a library error.
pub const fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::Extraction(_) | Error::UnsupportedLanguage { .. } => StatusCode::BAD_REQUEST,
        Error::ModelNotFound { .. } => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
