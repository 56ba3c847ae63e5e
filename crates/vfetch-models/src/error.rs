//! Model error types.

use thiserror::Error;

use crate::job::JobStatus;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    #[error("Invalid rotation angle: {0} (expected 90, 180 or 270)")]
    InvalidAngle(String),

    #[error("Invalid source URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid file name: {0}")]
    InvalidFileName(String),
}
