//! Per-job structured logging.

use std::fmt;

use tracing::{error, info, warn, Span};
use vfetch_models::JobId;

/// Pipeline stage a log line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Packaging,
    Rotation,
    Retention,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Fetch => "fetch",
            Stage::Packaging => "packaging",
            Stage::Rotation => "rotation",
            Stage::Retention => "retention",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logger that stamps every line with the job id and stage.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: JobId,
    stage: Stage,
}

impl JobLogger {
    pub fn new(job_id: &JobId, stage: Stage) -> Self {
        Self {
            job_id: job_id.clone(),
            stage,
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(job_id = %self.job_id, stage = %self.stage, "Stage started: {}", message);
    }

    pub fn log_progress(&self, message: &str) {
        info!(job_id = %self.job_id, stage = %self.stage, "Stage progress: {}", message);
    }

    pub fn log_warning(&self, message: &str) {
        warn!(job_id = %self.job_id, stage = %self.stage, "Stage warning: {}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(job_id = %self.job_id, stage = %self.stage, "Stage failed: {}", message);
    }

    pub fn log_completion(&self, message: &str) {
        info!(job_id = %self.job_id, stage = %self.stage, "Stage completed: {}", message);
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Span to attach to the stage's task.
    pub fn span(&self) -> Span {
        tracing::info_span!("job", job_id = %self.job_id, stage = %self.stage)
    }
}
