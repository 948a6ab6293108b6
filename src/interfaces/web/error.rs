use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use crate::core::generation::ValidationError;
use crate::core::store::StoreError;

/// Failures a handler reports before (or instead of) producing a body.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("LLM provider is not configured")]
    NotConfigured,
    #[error("Insufficient credits (balance {0})")]
    InsufficientCredits(i64),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => ApiError::NotFound(what),
            StoreError::InsufficientCredits { balance, .. } => ApiError::InsufficientCredits(balance),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl ApiError {
    pub(crate) fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotConfigured | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::InsufficientCredits(_) => StatusCode::PAYMENT_REQUIRED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    /// JSON body shared by HTTP responses and WebSocket `error` messages.
    pub(crate) fn body(&self) -> serde_json::Value {
        match self {
            ApiError::Validation(v) => json!({ "error": v.to_string(), "details": v.details }),
            other => json!({ "error": other.to_string() }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(msg) = &self {
            error!("Request failed: {}", msg);
        }
        (self.status(), Json(self.body())).into_response()
    }
}
