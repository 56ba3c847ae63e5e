//! HLS packaging stage.
//!
//! Launched once per job by the fetch worker and never awaited by it. The
//! supervising task records the outcome in `packaging_status` and
//! `packaging_error`; the job's own status is left alone.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::Instrument;
use vfetch_media::Transcoder;
use vfetch_models::{JobId, PackagingStatus};
use vfetch_store::StoreHandle;

use crate::logging::{JobLogger, Stage};
use crate::metrics;

#[derive(Clone)]
pub struct PackagingStage {
    store: StoreHandle,
    transcoder: Arc<dyn Transcoder>,
}

impl PackagingStage {
    pub fn new(store: StoreHandle, transcoder: Arc<dyn Transcoder>) -> Self {
        Self { store, transcoder }
    }

    /// Start packaging in the background.
    pub fn launch(&self, id: JobId, artifact: PathBuf, out_dir: PathBuf) -> JoinHandle<PackagingStatus> {
        let stage = self.clone();
        let span = JobLogger::new(&id, Stage::Packaging).span();
        tokio::spawn(async move { stage.supervise(id, artifact, out_dir).await }.instrument(span))
    }

    /// Run packaging to completion and record the outcome.
    pub async fn supervise(&self, id: JobId, artifact: PathBuf, out_dir: PathBuf) -> PackagingStatus {
        let logger = JobLogger::new(&id, Stage::Packaging);
        logger.log_start(&format!("{} -> {}", artifact.display(), out_dir.display()));

        self.record(&logger, &id, PackagingStatus::Running, None).await;

        let (status, error) = match self.transcoder.package(&artifact, &out_dir).await {
            Ok(outcome) => {
                logger.log_completion(&format!("packaged in {:.1}s", outcome.elapsed.as_secs_f64()));
                metrics::record_packaging("completed");
                (PackagingStatus::Completed, None)
            }
            Err(e) => {
                let detail = e.detail();
                logger.log_error(&detail);
                metrics::record_packaging("failed");
                (PackagingStatus::Failed, Some(detail))
            }
        };

        self.record(&logger, &id, status, error).await;
        status
    }

    async fn record(
        &self,
        logger: &JobLogger,
        id: &JobId,
        status: PackagingStatus,
        error: Option<String>,
    ) {
        let result = self
            .store
            .update(id, move |job| {
                job.packaging_status = status;
                job.packaging_error = error;
                Ok(())
            })
            .await;

        if let Err(e) = result {
            logger.log_warning(&format!("could not record packaging status {status}: {e}"));
        }
    }
}
