//! In-place rotation of a Ready job's primary artifact.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use vfetch_media::{rotate_in_place, MediaError, Transcoder};
use vfetch_models::{Job, JobId, JobStatus, RotationAngle};
use vfetch_store::StoreHandle;

use crate::error::{WorkerError, WorkerResult};
use crate::logging::{JobLogger, Stage};
use crate::metrics;

type JobLocks = Arc<Mutex<HashMap<JobId, Arc<tokio::sync::Mutex<()>>>>>;

/// Rotates artifacts, one rotation at a time per job.
#[derive(Clone)]
pub struct RotationOperator {
    store: StoreHandle,
    transcoder: Arc<dyn Transcoder>,
    locks: JobLocks,
}

impl RotationOperator {
    pub fn new(store: StoreHandle, transcoder: Arc<dyn Transcoder>) -> Self {
        Self {
            store,
            transcoder,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Rotate the job's artifact by `angle` and return the updated record.
    ///
    /// The artifact keeps its path. A failed transcode leaves the original
    /// file in place and is recorded in `rotation_error`.
    pub async fn rotate(&self, id: &JobId, angle: RotationAngle) -> WorkerResult<Job> {
        let lock = self.lock_for(id);
        let result = {
            let _guard = lock.lock().await;
            self.rotate_locked(id, angle).await
        };
        self.release(id, lock);

        let outcome = match &result {
            Ok(_) => "success",
            Err(WorkerError::TranscodeFailure { .. }) => "transcode_failure",
            Err(_) => "rejected",
        };
        metrics::record_rotation(angle.degrees(), outcome);
        result
    }

    async fn rotate_locked(&self, id: &JobId, angle: RotationAngle) -> WorkerResult<Job> {
        let logger = JobLogger::new(id, Stage::Rotation);
        let job = self.store.get(id).await?;

        if job.status != JobStatus::Ready {
            return Err(WorkerError::NotReady {
                id: id.clone(),
                status: job.status,
            });
        }

        let artifact = match job.artifact_path() {
            Some(path) if tokio::fs::try_exists(path).await.unwrap_or(false) => path.to_path_buf(),
            _ => return Err(WorkerError::ArtifactMissing(id.clone())),
        };

        logger.log_start(&format!("{}° on {}", angle.degrees(), artifact.display()));

        match rotate_in_place(self.transcoder.as_ref(), &artifact, angle).await {
            Ok(outcome) => {
                logger.log_completion(&format!(
                    "rotated {}° in {:.1}s",
                    angle.degrees(),
                    outcome.elapsed.as_secs_f64()
                ));
                let updated = self
                    .store
                    .update(id, |job| {
                        job.rotation_error = None;
                        Ok(())
                    })
                    .await?;
                Ok(updated)
            }
            Err(MediaError::FileNotFound(_)) => Err(WorkerError::ArtifactMissing(id.clone())),
            Err(e) => {
                let err = WorkerError::transcode(e);
                let detail = err.detail();
                logger.log_error(&detail);
                if let Err(store_err) = self
                    .store
                    .update(id, move |job| {
                        job.rotation_error = Some(detail);
                        Ok(())
                    })
                    .await
                {
                    logger.log_warning(&format!("could not record rotation error: {store_err}"));
                }
                Err(err)
            }
        }
    }

    fn lock_for(&self, id: &JobId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(id.clone()).or_default().clone()
    }

    /// Drop the job's lock entry once no other rotation holds it.
    fn release(&self, id: &JobId, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // One reference in the map plus ours.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(id);
        }
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks.lock().map(|l| l.len()).unwrap_or(0)
    }
}
