//! Core facade over the pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinHandle;
use vfetch_media::{FfmpegTranscoder, Retriever, Transcoder, YtDlpRetriever};
use vfetch_models::{validate_file_name, validate_source_url, Job, JobId, RotationAngle};
use vfetch_store::{JsonFileStore, StoreHandle};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::fetch::{FetchRequest, FetchWorker};
use crate::layout::JobLayout;
use crate::metrics;
use crate::packaging::PackagingStage;
use crate::retention::RetentionSweeper;
use crate::rotation::RotationOperator;

/// Entry point for creating, inspecting and rotating jobs.
#[derive(Clone)]
pub struct JobService {
    store: StoreHandle,
    layout: JobLayout,
    fetch: FetchWorker,
    rotation: RotationOperator,
    sweeper: Arc<RetentionSweeper>,
}

impl JobService {
    /// Wire the pipeline from explicit collaborators.
    pub fn new(
        config: &WorkerConfig,
        store: StoreHandle,
        retriever: Arc<dyn Retriever>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        let packaging = PackagingStage::new(store.clone(), transcoder.clone());
        let fetch = FetchWorker::new(
            store.clone(),
            retriever,
            packaging,
            config.artifact_poll_interval,
            config.artifact_wait_timeout,
        );
        let rotation = RotationOperator::new(store.clone(), transcoder);
        let sweeper = Arc::new(RetentionSweeper::new(
            store.clone(),
            config.retention,
            config.sweep_interval,
            config.retention_sweep_enabled,
        ));

        Self {
            store,
            layout: JobLayout::new(&config.data_dir),
            fetch,
            rotation,
            sweeper,
        }
    }

    /// Wire the pipeline with the JSON snapshot, yt-dlp and FFmpeg.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn from_config(config: &WorkerConfig) -> Self {
        let store = StoreHandle::spawn(Arc::new(JsonFileStore::new(config.snapshot_path())));
        let transcoder = FfmpegTranscoder::new(config.hls_options())
            .with_transform_timeout(config.rotate_timeout.map(|d| d.as_secs()));
        Self::new(
            config,
            store,
            Arc::new(YtDlpRetriever::new()),
            Arc::new(transcoder),
        )
    }

    /// Register a job for `url` and start fetching it in the background.
    pub async fn create_job(&self, url: &str) -> WorkerResult<JobId> {
        let url = url.trim();
        validate_source_url(url)?;

        let id = JobId::new();
        let artifact_path = self.layout.artifact_path(&id);
        let streaming_dir = self.layout.streaming_dir(&id);
        let job = Job::with_id(
            id.clone(),
            url,
            artifact_path.clone(),
            streaming_dir.clone(),
        );

        self.store.insert(job).await?;
        metrics::record_job_created();

        self.fetch.spawn(FetchRequest {
            job_id: id.clone(),
            source_url: url.to_string(),
            artifact_path,
            streaming_dir,
        });

        Ok(id)
    }

    pub async fn get_job(&self, id: &JobId) -> WorkerResult<Job> {
        Ok(self.store.get(id).await?)
    }

    /// All jobs, most recently created first.
    pub async fn list_jobs(&self) -> WorkerResult<Vec<Job>> {
        Ok(self.store.list().await?)
    }

    /// Rotate by an angle given as text (`"90"`, `"180"`, `"270"`).
    ///
    /// The angle is checked before the job is looked up.
    pub async fn rotate(&self, id: &JobId, angle: &str) -> WorkerResult<Job> {
        let angle: RotationAngle = angle.parse()?;
        self.rotate_angle(id, angle).await
    }

    pub async fn rotate_angle(&self, id: &JobId, angle: RotationAngle) -> WorkerResult<Job> {
        self.rotation.rotate(id, angle).await
    }

    /// Path of the job's primary artifact, if it exists on disk.
    pub async fn artifact_file(&self, id: &JobId) -> WorkerResult<PathBuf> {
        let job = self.get_job(id).await?;
        match job.artifact_path() {
            Some(path) if tokio::fs::try_exists(path).await.unwrap_or(false) => {
                Ok(path.to_path_buf())
            }
            _ => Err(WorkerError::ArtifactMissing(id.clone())),
        }
    }

    /// Path of `name` inside the job's streaming directory.
    pub async fn streaming_file(&self, id: &JobId, name: &str) -> WorkerResult<PathBuf> {
        let name = validate_file_name(name)?;
        let job = self.get_job(id).await?;
        let path = job
            .streaming_dir()
            .map(|dir| dir.join(name))
            .ok_or_else(|| WorkerError::ArtifactMissing(id.clone()))?;

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            _ => Err(WorkerError::ArtifactMissing(id.clone())),
        }
    }

    /// Start the retention sweeper on its own task.
    pub fn spawn_retention_sweeper(&self) -> JoinHandle<()> {
        let sweeper = self.sweeper.clone();
        tokio::spawn(async move { sweeper.run().await })
    }

    pub fn sweeper(&self) -> &RetentionSweeper {
        &self.sweeper
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    pub fn layout(&self) -> &JobLayout {
        &self.layout
    }
}
