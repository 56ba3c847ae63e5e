//! Application state.

use std::path::PathBuf;

use vfetch_worker::{JobService, WorkerConfig};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub jobs: JobService,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Create state backed by the JSON snapshot and the real media tools.
    pub async fn new(config: ApiConfig, worker: &WorkerConfig) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(&worker.data_dir).await?;
        Ok(Self::with_service(config, JobService::from_config(worker), &worker.data_dir))
    }

    /// Create state around an already-wired service.
    pub fn with_service(config: ApiConfig, jobs: JobService, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            jobs,
            data_dir: data_dir.into(),
        }
    }
}
