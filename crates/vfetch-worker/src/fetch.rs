//! Fetch worker: retrieval, artifact watch and packaging hand-off.
//!
//! The retrieval runs in its own task and applies the job's terminal status
//! itself, then signals completion over a oneshot channel. Until the artifact
//! appears the worker waits on that signal, a poll of the artifact path and a
//! deadline. Once it appears packaging is launched, so streaming can start
//! while the retrieval is still writing, and the retrieval runs to completion.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, Instrument};
use vfetch_media::{MediaError, Retriever};
use vfetch_models::{JobId, JobStatus};
use vfetch_store::StoreHandle;

use crate::logging::{JobLogger, Stage};
use crate::metrics;
use crate::packaging::PackagingStage;

/// Everything the worker needs to process one job.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub job_id: JobId,
    pub source_url: String,
    pub artifact_path: PathBuf,
    pub streaming_dir: PathBuf,
}

/// How a fetch ended, from the worker's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Retrieval finished and the job is Ready
    Ready,
    /// Retrieval failed and the job is Failed
    Failed(String),
    /// No artifact appeared before the wait deadline; retrieval was aborted
    TimedOut,
}

/// Message sent by the retrieval task once the job status is settled.
#[derive(Debug)]
enum RetrievalSignal {
    Ready,
    Failed(String),
}

#[derive(Clone)]
pub struct FetchWorker {
    store: StoreHandle,
    retriever: Arc<dyn Retriever>,
    packaging: PackagingStage,
    poll_interval: Duration,
    wait_timeout: Duration,
}

impl FetchWorker {
    pub fn new(
        store: StoreHandle,
        retriever: Arc<dyn Retriever>,
        packaging: PackagingStage,
        poll_interval: Duration,
        wait_timeout: Duration,
    ) -> Self {
        Self {
            store,
            retriever,
            packaging,
            poll_interval,
            wait_timeout,
        }
    }

    /// Run the worker for `req` in the background.
    pub fn spawn(&self, req: FetchRequest) -> JoinHandle<FetchOutcome> {
        let worker = self.clone();
        let span = JobLogger::new(&req.job_id, Stage::Fetch).span();
        tokio::spawn(async move { worker.run(req).await }.instrument(span))
    }

    /// Process one job until retrieval settles, or until the deadline passes
    /// with no artifact on disk.
    pub async fn run(&self, req: FetchRequest) -> FetchOutcome {
        let logger = JobLogger::new(&req.job_id, Stage::Fetch);
        logger.log_start(&req.source_url);

        if let Some(parent) = req.artifact_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                let detail = format!("cannot create {}: {}", parent.display(), e);
                self.fail(&logger, &req.job_id, detail.clone(), "setup").await;
                return FetchOutcome::Failed(detail);
            }
        }

        let deadline = tokio::time::sleep(self.wait_timeout);
        tokio::pin!(deadline);

        let (done_tx, mut done_rx) = oneshot::channel();
        let retrieval = tokio::spawn(
            retrieve_and_settle(
                self.store.clone(),
                self.retriever.clone(),
                req.clone(),
                done_tx,
            )
            .in_current_span(),
        );

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // Wait for the artifact to appear, or for retrieval to settle first.
        let mut settled: Option<RetrievalSignal> = None;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if artifact_exists(&req.artifact_path).await {
                        break;
                    }
                }
                signal = &mut done_rx => {
                    settled = Some(match signal {
                        Ok(signal) => signal,
                        Err(_) => self.unsettled(&logger, &req.job_id).await,
                    });
                    break;
                }
                _ = &mut deadline => {
                    return self.time_out(&logger, &req, retrieval).await;
                }
            }
        }

        let artifact_present = match &settled {
            Some(RetrievalSignal::Failed(_)) => false,
            _ => artifact_exists(&req.artifact_path).await,
        };

        if artifact_present {
            logger.log_progress("artifact observed, launching packaging");
            self.packaging.launch(
                req.job_id.clone(),
                req.artifact_path.clone(),
                req.streaming_dir.clone(),
            );
            self.reassert_processing(&logger, &req).await;
        }

        // The deadline only bounds the wait for the first bytes.
        let signal = match settled {
            Some(signal) => signal,
            None => match done_rx.await {
                Ok(signal) => signal,
                Err(_) => self.unsettled(&logger, &req.job_id).await,
            },
        };

        match signal {
            RetrievalSignal::Ready => {
                logger.log_completion("artifact ready");
                FetchOutcome::Ready
            }
            RetrievalSignal::Failed(detail) => FetchOutcome::Failed(detail),
        }
    }

    /// Re-state the Processing status along with the path assignments.
    ///
    /// A job that already reached a terminal status is left as it is.
    async fn reassert_processing(&self, logger: &JobLogger, req: &FetchRequest) {
        let artifact = req.artifact_path.clone();
        let streaming_dir = req.streaming_dir.clone();
        let result = self
            .store
            .update(&req.job_id, move |job| {
                if job.status == JobStatus::Processing {
                    job.transition(JobStatus::Processing)?;
                    job.primary_artifact_path = Some(artifact);
                    job.streaming_dir_path = Some(streaming_dir);
                }
                Ok(())
            })
            .await;

        if let Err(e) = result {
            logger.log_warning(&format!("could not re-assert processing: {e}"));
        }
    }

    async fn time_out(
        &self,
        logger: &JobLogger,
        req: &FetchRequest,
        retrieval: JoinHandle<()>,
    ) -> FetchOutcome {
        retrieval.abort();
        let detail = format!(
            "artifact did not appear within {:?}",
            self.wait_timeout
        );
        self.fail(logger, &req.job_id, detail, "timeout").await;
        FetchOutcome::TimedOut
    }

    /// The retrieval task ended without a signal, e.g. the retriever panicked.
    async fn unsettled(&self, logger: &JobLogger, id: &JobId) -> RetrievalSignal {
        let detail = "retrieval task ended without settling".to_string();
        self.fail(logger, id, detail.clone(), "retrieval").await;
        RetrievalSignal::Failed(detail)
    }

    async fn fail(&self, logger: &JobLogger, id: &JobId, detail: String, reason: &'static str) {
        logger.log_error(&detail);
        match self.store.update(id, move |job| job.mark_failed(detail)).await {
            Ok(_) => metrics::record_job_failed(reason),
            Err(e) => debug!(job_id = %id, error = %e, "Failure not recorded"),
        }
    }
}

async fn artifact_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Retrieval unit: fetch, settle the job status, then signal.
async fn retrieve_and_settle(
    store: StoreHandle,
    retriever: Arc<dyn Retriever>,
    req: FetchRequest,
    done: oneshot::Sender<RetrievalSignal>,
) {
    let logger = JobLogger::new(&req.job_id, Stage::Fetch);
    let started = Instant::now();

    let mut result = retriever.retrieve(&req.source_url, &req.artifact_path).await;
    if result.is_ok() && !artifact_exists(&req.artifact_path).await {
        result = Err(MediaError::download_failed("Output file not created"));
    }
    metrics::record_download_duration(started.elapsed().as_secs_f64());

    let signal = match result {
        Ok(()) => match store.update(&req.job_id, |job| job.mark_ready()).await {
            Ok(_) => {
                metrics::record_job_ready();
                RetrievalSignal::Ready
            }
            Err(e) => {
                logger.log_warning(&format!("could not mark ready: {e}"));
                RetrievalSignal::Failed(e.to_string())
            }
        },
        Err(e) => {
            let detail = e.detail();
            logger.log_error(&detail);
            let stored = detail.clone();
            match store.update(&req.job_id, move |job| job.mark_failed(stored)).await {
                Ok(_) => metrics::record_job_failed("retrieval"),
                Err(e) => logger.log_warning(&format!("could not mark failed: {e}")),
            }
            RetrievalSignal::Failed(detail)
        }
    };

    let _ = done.send(signal);
}
