//! Job records and their status state machine.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ModelError, ModelResult};
use crate::serde_utils::{empty_path_as_none, lenient_timestamp};

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self(String::new())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Job lifecycle status.
///
/// `Processing` may move to `Ready` or `Failed`. Both of those are terminal:
/// the only way out of them is deletion by the retention sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Retrieval (and possibly packaging) in progress
    #[default]
    Processing,
    /// Primary artifact fully retrieved
    Ready,
    /// A stage failed; see `error_detail`
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Processing => "processing",
            JobStatus::Ready => "ready",
            JobStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Ready | JobStatus::Failed)
    }

    /// Whether moving from `self` to `next` is allowed.
    ///
    /// Re-asserting the current status is always allowed.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        *self == next || *self == JobStatus::Processing
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of the HLS packaging subprocess for a job.
///
/// Recorded for readers only; never drives [`JobStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum PackagingStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

impl PackagingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackagingStatus::Pending => "pending",
            PackagingStatus::Running => "running",
            PackagingStatus::Completed => "completed",
            PackagingStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for PackagingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single fetch-and-package request.
///
/// Field aliases keep snapshots written by the older single-file service
/// readable (`url`, `created`, `file`, `error`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    /// Unique job ID
    #[serde(default)]
    pub id: JobId,

    /// Requested origin URL
    #[serde(default, alias = "url")]
    pub source_url: String,

    /// Lifecycle status
    #[serde(default)]
    pub status: JobStatus,

    /// Creation timestamp, used only for retention
    #[serde(default = "epoch", alias = "created", deserialize_with = "lenient_timestamp")]
    pub created_at: DateTime<Utc>,

    /// Path of the single-file container (mp4)
    #[serde(default, alias = "file", deserialize_with = "empty_path_as_none")]
    pub primary_artifact_path: Option<PathBuf>,

    /// Directory holding the HLS playlist and segments
    #[serde(default, alias = "hls_dir", deserialize_with = "empty_path_as_none")]
    pub streaming_dir_path: Option<PathBuf>,

    /// Failure description, only set when `status == Failed`
    #[serde(default, alias = "error", skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,

    /// Packaging subprocess state
    #[serde(default)]
    pub packaging_status: PackagingStatus,

    /// Packaging failure description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packaging_error: Option<String>,

    /// Last rotation transcode failure, cleared by the next successful rotation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation_error: Option<String>,
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

impl Job {
    /// Create a new job in `Processing` with its artifact locations assigned.
    pub fn new(
        source_url: impl Into<String>,
        primary_artifact_path: impl Into<PathBuf>,
        streaming_dir_path: impl Into<PathBuf>,
    ) -> Self {
        Self::with_id(
            JobId::new(),
            source_url,
            primary_artifact_path,
            streaming_dir_path,
        )
    }

    /// Create a job with a caller-chosen ID.
    pub fn with_id(
        id: JobId,
        source_url: impl Into<String>,
        primary_artifact_path: impl Into<PathBuf>,
        streaming_dir_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id,
            source_url: source_url.into(),
            status: JobStatus::Processing,
            created_at: Utc::now(),
            primary_artifact_path: Some(primary_artifact_path.into()),
            streaming_dir_path: Some(streaming_dir_path.into()),
            error_detail: None,
            packaging_status: PackagingStatus::Pending,
            packaging_error: None,
            rotation_error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move to `next`, rejecting any transition out of a terminal status.
    pub fn transition(&mut self, next: JobStatus) -> ModelResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(ModelError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Mark the job ready.
    pub fn mark_ready(&mut self) -> ModelResult<()> {
        self.transition(JobStatus::Ready)?;
        self.error_detail = None;
        Ok(())
    }

    /// Mark the job failed with an error description.
    ///
    /// The first recorded failure detail is kept.
    pub fn mark_failed(&mut self, error: impl Into<String>) -> ModelResult<()> {
        self.transition(JobStatus::Failed)?;
        if self.error_detail.is_none() {
            self.error_detail = Some(error.into());
        }
        Ok(())
    }

    /// Age of the job relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.created_at
    }

    /// Whether the job is strictly older than `horizon` at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>, horizon: chrono::Duration) -> bool {
        self.age(now) > horizon
    }

    pub fn artifact_path(&self) -> Option<&Path> {
        self.primary_artifact_path.as_deref()
    }

    pub fn streaming_dir(&self) -> Option<&Path> {
        self.streaming_dir_path.as_deref()
    }
}
