//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use vfetch_models::ModelError;
use vfetch_worker::WorkerError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Transcode failed: {message}")]
    TranscodeFailed {
        message: String,
        exit_code: Option<i32>,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::TranscodeFailed { .. } | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "not_found",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Conflict(_) => "conflict",
            ApiError::TranscodeFailed { .. } => "transcode_failed",
            ApiError::Internal(_) => "internal",
        }
    }
}

impl From<WorkerError> for ApiError {
    fn from(err: WorkerError) -> Self {
        match err {
            WorkerError::NotFound(_) | WorkerError::ArtifactMissing(_) => {
                ApiError::NotFound(err.to_string())
            }
            WorkerError::InvalidAngle(_)
            | WorkerError::InvalidUrl(_)
            | WorkerError::InvalidFileName(_) => ApiError::BadRequest(err.to_string()),
            WorkerError::NotReady { .. } | WorkerError::Model(ModelError::InvalidTransition { .. }) => {
                ApiError::Conflict(err.to_string())
            }
            WorkerError::TranscodeFailure { exit_code, .. } => ApiError::TranscodeFailed {
                message: err.detail(),
                exit_code,
            },
            other => {
                error!(error = %other, "Unhandled pipeline error");
                ApiError::Internal(other.to_string())
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    exit_code: Option<i32>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let detail = match &self {
            ApiError::Internal(_)
                if std::env::var("ENVIRONMENT").unwrap_or_default() == "production" =>
            {
                "An internal error occurred".to_string()
            }
            _ => self.to_string(),
        };

        let exit_code = match &self {
            ApiError::TranscodeFailed { exit_code, .. } => *exit_code,
            _ => None,
        };

        let body = ErrorResponse {
            detail,
            code: self.code(),
            exit_code,
        };

        (status, Json(body)).into_response()
    }
}
