use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::weather::weatherstack::UpstreamError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Upstream(UpstreamError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::Upstream(UpstreamError::Timeout(_)) => "upstream_timeout",
            AppError::Upstream(UpstreamError::InvalidResponse(_)) => "upstream_invalid_response",
            AppError::Upstream(_) => "upstream_error",
        }
    }

    /// Message shown to callers. Upstream details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Validation(reason) => reason.clone(),
            AppError::Upstream(UpstreamError::Timeout(_)) => "weather provider timed out".to_string(),
            AppError::Upstream(UpstreamError::InvalidResponse(_)) => {
                "unexpected response from weather provider".to_string()
            }
            AppError::Upstream(_) => "weather provider request failed".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Upstream(err) = &self {
            tracing::error!(error = %err, "weather lookup failed");
        }

        let body = json!({
            "error": self.kind(),
            "message": self.public_message(),
        });
        (self.status(), Json(body)).into_response()
    }
}
