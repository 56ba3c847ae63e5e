//! Retention sweeper.
//!
//! Periodically drops every job older than the retention horizon, whatever
//! its status, and deletes its files.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::interval;
use tracing::{error, info};
use vfetch_media::remove_job_files;
use vfetch_models::JobId;
use vfetch_store::StoreHandle;

use crate::logging::{JobLogger, Stage};
use crate::metrics;

/// Result of one sweep cycle.
#[derive(Debug, Default, Clone)]
pub struct SweepReport {
    /// Jobs removed from the snapshot
    pub removed: Vec<JobId>,
    /// Files and directories deleted
    pub files_deleted: usize,
    /// Deletions that failed and were skipped
    pub file_failures: usize,
}

pub struct RetentionSweeper {
    store: StoreHandle,
    retention: Duration,
    interval: Duration,
    enabled: bool,
}

impl RetentionSweeper {
    pub fn new(store: StoreHandle, retention: Duration, interval: Duration, enabled: bool) -> Self {
        Self {
            store,
            retention,
            interval,
            enabled,
        }
    }

    /// Run sweeps forever. The first sweep happens immediately.
    pub async fn run(&self) {
        if !self.enabled {
            info!("Retention sweep is disabled");
            return;
        }

        info!(
            "Starting retention sweeper (retention: {:?}, interval: {:?})",
            self.retention, self.interval
        );

        let mut ticker = interval(self.interval);

        loop {
            ticker.tick().await;

            if let Err(e) = self.sweep_once(Utc::now()).await {
                error!("Retention sweep error: {:#}", e);
            }
        }
    }

    /// Run a single sweep as of `now`.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> anyhow::Result<SweepReport> {
        let horizon = chrono::Duration::from_std(self.retention)?;
        let expired = self.store.remove_expired(now - horizon).await?;

        let mut report = SweepReport::default();
        for job in expired {
            let logger = JobLogger::new(&job.id, Stage::Retention);
            let cleanup = remove_job_files(job.artifact_path(), job.streaming_dir()).await;
            if !cleanup.failures.is_empty() {
                logger.log_warning(&format!("{} paths could not be deleted", cleanup.failures.len()));
            }
            logger.log_completion(&format!("expired, {} paths deleted", cleanup.files_removed()));

            report.files_deleted += cleanup.files_removed();
            report.file_failures += cleanup.failures.len();
            report.removed.push(job.id);
        }

        if !report.removed.is_empty() {
            metrics::record_jobs_swept(report.removed.len());
            info!(
                "Retention sweep complete: {} jobs removed, {} paths deleted",
                report.removed.len(),
                report.files_deleted
            );
        }

        Ok(report)
    }
}
