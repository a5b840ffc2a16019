use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::generation::GenerationError;

/// Request-level failures surfaced by the service layer.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("generation service returned malformed output for {0}")]
    DownstreamFormat(String),

    #[error("generation service unavailable during {0}")]
    DownstreamUnavailable(String),

    #[error("generation service timed out during {0}")]
    Timeout(String),

    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl AppError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Tag a generation failure with the operation it happened in.
    pub fn from_generation(op: &str, err: GenerationError) -> Self {
        match err {
            GenerationError::Format(_) => Self::DownstreamFormat(op.to_string()),
            GenerationError::Unavailable(_) => Self::DownstreamUnavailable(op.to_string()),
            GenerationError::Timeout => Self::Timeout(op.to_string()),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::DownstreamFormat(_) => StatusCode::BAD_GATEWAY,
            Self::DownstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Validation(_) => "validation_error",
            Self::DownstreamFormat(_) => "downstream_format_error",
            Self::DownstreamUnavailable(_) => "downstream_unavailable",
            Self::Timeout(_) => "timeout",
            Self::Storage(_) => "storage_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            error: self.kind(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
