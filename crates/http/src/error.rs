//! Error handling for the bookshelf HTTP layer
//!
//! Handlers return [`AppError`]; the single [`IntoResponse`] impl below is the
//! only place an error envelope is built.

use axum::{
    extract::rejection::PathRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message used for the explicit internal-server-error condition.
pub const INTERNAL_SERVER_ERROR_MESSAGE: &str =
    "Something went wrong on our end. Please try again later.";

/// Message used for any failure that is not otherwise classified.
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred. Please contact support.";

/// Message used when no route matches the requested URL.
pub const URL_NOT_FOUND_MESSAGE: &str = "The requested URL was not found on the server. \
     If you entered the URL manually please check your spelling and try again.";

/// Standard error envelope returned for every failed request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl ErrorBody {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            error: status
                .canonical_reason()
                .unwrap_or("Unknown Error")
                .to_string(),
            message: message.into(),
            status_code: status.as_u16(),
        }
    }
}

/// Application error types that map to HTTP responses
#[derive(Error, Debug)]
pub enum AppError {
    #[error("not found: {message}")]
    NotFound { message: String },

    #[error("bad request: {message}")]
    BadRequest { message: String },

    /// A handler explicitly signalling a server-side fault.
    #[error("internal server error")]
    InternalServerError,

    /// Anything else, including panics caught by middleware.
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl AppError {
    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::InternalServerError | AppError::Unexpected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Render the envelope for this error without logging.
    pub fn body(&self) -> ErrorBody {
        let status = self.status();
        match self {
            AppError::NotFound { message } | AppError::BadRequest { message } => {
                ErrorBody::new(status, message.as_str())
            }
            AppError::InternalServerError => ErrorBody::new(status, INTERNAL_SERVER_ERROR_MESSAGE),
            AppError::Unexpected(_) => ErrorBody::new(status, UNEXPECTED_ERROR_MESSAGE),
        }
    }
}

/// A `{id}` segment that does not parse means the route itself did not match.
impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!(%rejection, "path parameters rejected");
        AppError::not_found(URL_NOT_FOUND_MESSAGE)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = self.body();

        if status.is_server_error() {
            tracing::error!(
                status_code = %status.as_u16(),
                error = %format!("{:#}", self),
                "request failed"
            );
        } else {
            tracing::warn!(
                status_code = %status.as_u16(),
                message = %body.message,
                "request rejected"
            );
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn envelope(error: AppError) -> (StatusCode, ErrorBody) {
        let response = error.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_not_found_keeps_message() {
        let (status, body) = envelope(AppError::not_found("Book with ID 9 not found.")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            body,
            ErrorBody {
                error: "Not Found".to_string(),
                message: "Book with ID 9 not found.".to_string(),
                status_code: 404,
            }
        );
    }

    #[tokio::test]
    async fn test_bad_request_keeps_message() {
        let (status, body) = envelope(AppError::bad_request("nope")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Bad Request");
        assert_eq!(body.message, "nope");
        assert_eq!(body.status_code, 400);
    }

    #[tokio::test]
    async fn test_internal_server_error_uses_fixed_message() {
        let (status, body) = envelope(AppError::InternalServerError).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "Internal Server Error");
        assert_eq!(body.message, INTERNAL_SERVER_ERROR_MESSAGE);
        assert_eq!(body.status_code, 500);
    }

    #[tokio::test]
    async fn test_unclassified_error_hides_details() {
        let error: AppError = anyhow::anyhow!("Database connection failed").into();
        let (status, body) = envelope(error).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            ErrorBody {
                error: "Internal Server Error".to_string(),
                message: UNEXPECTED_ERROR_MESSAGE.to_string(),
                status_code: 500,
            }
        );
    }

    #[test]
    fn test_envelope_serializes_flat() {
        let value = serde_json::to_value(AppError::not_found("gone").body()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "error": "Not Found",
                "message": "gone",
                "status_code": 404
            })
        );
    }
}
