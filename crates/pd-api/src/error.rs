use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pd_core::{StoreError, ValidationError};
use serde_json::json;
use thiserror::Error;

/// Application-level error type for HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed to render page: {0}")]
    Render(#[from] askama::Error),

    #[error("failed to encode metrics")]
    Metrics(#[from] std::fmt::Error),
}

/// Convenience type alias for handler return values.
pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::Store(StoreError::Unavailable(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "STORE_UNAVAILABLE")
            }
            ApiError::Store(StoreError::WriteRejected(_)) => {
                (StatusCode::FORBIDDEN, "WRITE_REJECTED")
            }
            ApiError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            ApiError::Render(_) | ApiError::Metrics(_) => {
                tracing::error!(error = %self, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        let body = json!({
            "error": self.to_string(),
            "code": code,
        });
        (status, Json(body)).into_response()
    }
}
