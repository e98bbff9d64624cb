//! Error handling for the shelf HTTP layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Body written for every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Application error types that map to HTTP responses
#[derive(Error, Debug)]
pub enum AppError {
    /// The caller sent missing or malformed input.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The targeted record does not exist.
    #[error("not found: {message}")]
    NotFound { message: String },

    /// Storage or other unexpected failure. Only `message` reaches the client;
    /// `operation` names the failed step in the log.
    #[error("internal error: {message}")]
    Internal {
        message: String,
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create an internal error carrying a client-safe message
    pub fn internal(
        operation: &'static str,
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            operation,
            source: source.into(),
        }
    }

    /// HTTP status this error maps to
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(source: anyhow::Error) -> Self {
        Self::internal("unknown", "an internal server error occurred", source)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match self {
            AppError::Validation { message } | AppError::NotFound { message } => {
                tracing::debug!(status_code = %status.as_u16(), %message, "request rejected");
                message
            }
            AppError::Internal {
                message,
                operation,
                source,
            } => {
                let error_id = Uuid::new_v4();
                tracing::error!(
                    error_id = %error_id,
                    status_code = %status.as_u16(),
                    operation,
                    error = ?source,
                    "{message}"
                );
                message
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_validation_error() {
        match AppError::validation("missing attributes in request") {
            AppError::Validation { message } => {
                assert_eq!(message, "missing attributes in request");
            }
            _ => panic!("Expected Validation error"),
        }
    }

    #[tokio::test]
    async fn test_validation_maps_to_bad_request() {
        let response = AppError::validation("missing id").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "missing id"})
        );
    }

    #[tokio::test]
    async fn test_not_found_mapping() {
        let response = AppError::not_found("no book found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "no book found"})
        );
    }

    #[tokio::test]
    async fn test_internal_error_hides_source() {
        let error = AppError::internal(
            "list books",
            "failed to fetch books",
            anyhow::anyhow!("database connection failed"),
        );
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body, serde_json::json!({"error": "failed to fetch books"}));
        assert!(!body.to_string().contains("database connection"));
    }

    #[test]
    fn test_anyhow_conversion_is_internal() {
        let error: AppError = anyhow::anyhow!("boom").into();
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(matches!(error, AppError::Internal { operation: "unknown", .. }));
    }
}
