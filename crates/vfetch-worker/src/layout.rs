//! On-disk locations for job artifacts.

use std::path::{Path, PathBuf};

use vfetch_models::JobId;

/// Maps job ids to their artifact paths under the data directory.
#[derive(Debug, Clone)]
pub struct JobLayout {
    data_dir: PathBuf,
}

impl JobLayout {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// `<data_dir>/<id>.mp4`
    pub fn artifact_path(&self, id: &JobId) -> PathBuf {
        self.data_dir.join(format!("{id}.mp4"))
    }

    /// `<data_dir>/<id>_hls`
    pub fn streaming_dir(&self, id: &JobId) -> PathBuf {
        self.data_dir.join(format!("{id}_hls"))
    }
}
