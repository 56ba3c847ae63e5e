//! Pipeline error types.

use thiserror::Error;
use vfetch_media::MediaError;
use vfetch_models::{JobId, JobStatus, ModelError};
use vfetch_store::StoreError;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Retrieval failed: {0}")]
    RetrievalFailure(String),

    #[error("Transcode failed: {message}")]
    TranscodeFailure {
        message: String,
        exit_code: Option<i32>,
        stderr: Option<String>,
    },

    #[error("Job not found: {0}")]
    NotFound(JobId),

    #[error("Invalid rotation angle: {0}")]
    InvalidAngle(String),

    #[error("Job {id} is {status}, not ready")]
    NotReady { id: JobId, status: JobStatus },

    #[error("Artifact missing for job {0}")]
    ArtifactMissing(JobId),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    #[error(transparent)]
    Model(ModelError),

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    /// Wrap a failed transcode, keeping its exit code and stderr.
    pub fn transcode(err: MediaError) -> Self {
        Self::TranscodeFailure {
            message: err.to_string(),
            exit_code: err.exit_code(),
            stderr: err.stderr().map(str::to_string),
        }
    }

    /// Description stored on the job record.
    pub fn detail(&self) -> String {
        match self {
            WorkerError::TranscodeFailure {
                message,
                stderr: Some(stderr),
                ..
            } => match stderr.lines().rev().find(|l| !l.trim().is_empty()) {
                Some(last) => format!("{message}: {}", last.trim()),
                None => message.clone(),
            },
            other => other.to_string(),
        }
    }
}

impl From<StoreError> for WorkerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => WorkerError::NotFound(id),
            StoreError::Model(e) => e.into(),
            other => WorkerError::Store(other),
        }
    }
}

impl From<ModelError> for WorkerError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::InvalidAngle(raw) => WorkerError::InvalidAngle(raw),
            ModelError::InvalidUrl(raw) => WorkerError::InvalidUrl(raw),
            ModelError::InvalidFileName(raw) => WorkerError::InvalidFileName(raw),
            other => WorkerError::Model(other),
        }
    }
}
