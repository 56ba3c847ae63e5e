//! Snapshot backends: load and save the whole job mapping at once.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};
use vfetch_models::{Job, JobId, JobMap};

use crate::error::{StoreError, StoreResult};

/// Whole-mapping persistence.
///
/// `save` always overwrites the previous snapshot in full.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Load the full mapping. A store that was never saved loads as empty.
    async fn load(&self) -> StoreResult<JobMap>;

    /// Replace the persisted mapping with `jobs`.
    async fn save(&self, jobs: &JobMap) -> StoreResult<()>;
}

/// Decode a snapshot document.
///
/// Records that fail to decode are skipped with a warning. Only a document
/// that is not a JSON object is an error.
pub fn decode_snapshot(source: &Path, bytes: &[u8]) -> StoreResult<JobMap> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(JobMap::new());
    }

    let root: Value = serde_json::from_slice(bytes)
        .map_err(|e| StoreError::corrupt(source, e.to_string()))?;
    let Value::Object(records) = root else {
        return Err(StoreError::corrupt(source, "top level is not an object"));
    };

    let mut jobs = JobMap::with_capacity(records.len());
    for (key, record) in records {
        match serde_json::from_value::<Job>(record) {
            Ok(mut job) => {
                if job.id.is_empty() {
                    job.id = JobId::from(key);
                }
                jobs.insert(job.id.clone(), job);
            }
            Err(e) => {
                warn!(job_id = %key, error = %e, "Skipping undecodable job record");
            }
        }
    }
    Ok(jobs)
}

/// Encode a mapping as a pretty JSON object with keys in id order.
pub fn encode_snapshot(jobs: &JobMap) -> StoreResult<Vec<u8>> {
    let ordered: BTreeMap<&JobId, &Job> = jobs.iter().collect();
    Ok(serde_json::to_vec_pretty(&ordered)?)
}

/// Snapshot kept in a single JSON file.
///
/// Saves go to a sibling temp file that is then renamed over the snapshot,
/// so readers never see a half-written document.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "snapshot".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl SnapshotStore for JsonFileStore {
    async fn load(&self) -> StoreResult<JobMap> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => decode_snapshot(&self.path, &bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(JobMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, jobs: &JobMap) -> StoreResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes = encode_snapshot(jobs)?;
        let tmp = self.temp_path();
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!(path = %self.path.display(), jobs = jobs.len(), "Saved job snapshot");
        Ok(())
    }
}

/// In-process snapshot, for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    jobs: Mutex<JobMap>,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing mapping.
    pub fn with_jobs(jobs: JobMap) -> Self {
        Self {
            jobs: Mutex::new(jobs),
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of completed saves.
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn load(&self) -> StoreResult<JobMap> {
        let guard = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        Ok(guard.clone())
    }

    async fn save(&self, jobs: &JobMap) -> StoreResult<()> {
        *self.jobs.lock().unwrap_or_else(|e| e.into_inner()) = jobs.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
