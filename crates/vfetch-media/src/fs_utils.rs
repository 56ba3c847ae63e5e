//! Filesystem helpers for job artifacts.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::warn;

/// Files removed while cleaning up one job.
#[derive(Debug, Default, Clone)]
pub struct CleanupReport {
    /// Files and directories that were deleted
    pub removed: Vec<PathBuf>,
    /// Paths that could not be deleted, with the reason
    pub failures: Vec<(PathBuf, String)>,
}

impl CleanupReport {
    pub fn files_removed(&self) -> usize {
        self.removed.len()
    }
}

/// Whether `path` is an existing regular file with at least one byte.
pub async fn file_has_content(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

/// Delete a job's primary artifact and streaming directory.
///
/// Missing paths are skipped. Individual failures are logged and recorded;
/// they never stop the rest of the cleanup.
pub async fn remove_job_files(artifact: Option<&Path>, streaming_dir: Option<&Path>) -> CleanupReport {
    let mut report = CleanupReport::default();

    if let Some(artifact) = artifact {
        remove_file_into(artifact, &mut report).await;
    }

    if let Some(dir) = streaming_dir {
        match fs::read_dir(dir).await {
            Ok(mut entries) => {
                loop {
                    match entries.next_entry().await {
                        Ok(Some(entry)) => remove_file_into(&entry.path(), &mut report).await,
                        Ok(None) => break,
                        Err(e) => {
                            record_failure(dir, e, &mut report);
                            break;
                        }
                    }
                }
                match fs::remove_dir(dir).await {
                    Ok(()) => report.removed.push(dir.to_path_buf()),
                    Err(e) => record_failure(dir, e, &mut report),
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => record_failure(dir, e, &mut report),
        }
    }

    report
}

async fn remove_file_into(path: &Path, report: &mut CleanupReport) {
    match fs::remove_file(path).await {
        Ok(()) => report.removed.push(path.to_path_buf()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => record_failure(path, e, report),
    }
}

fn record_failure(path: &Path, e: std::io::Error, report: &mut CleanupReport) {
    warn!(path = %path.display(), error = %e, "Failed to remove job file");
    report.failures.push((path.to_path_buf(), e.to_string()));
}
