//! Single-owner access to a snapshot store.
//!
//! Every read and mutation is sent as a command to one task that owns the
//! backend. Each command still loads the whole mapping, applies its change and
//! saves the whole mapping, but commands run strictly one after another, so
//! concurrent writers can no longer overwrite each other's updates.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use vfetch_models::{Job, JobId, ModelResult};

use crate::error::{StoreError, StoreResult};
use crate::snapshot::SnapshotStore;

/// Default command queue depth.
const DEFAULT_MAILBOX_CAPACITY: usize = 256;

/// Mutation applied to one job inside the owner task.
pub type JobMutation = Box<dyn FnOnce(&mut Job) -> ModelResult<()> + Send>;

/// Commands understood by the store owner.
pub enum StoreCommand {
    Get {
        id: JobId,
        reply: oneshot::Sender<StoreResult<Job>>,
    },
    List {
        reply: oneshot::Sender<StoreResult<Vec<Job>>>,
    },
    Insert {
        job: Job,
        reply: oneshot::Sender<StoreResult<()>>,
    },
    Update {
        id: JobId,
        apply: JobMutation,
        reply: oneshot::Sender<StoreResult<Job>>,
    },
    /// Remove every job created strictly before `cutoff`.
    RemoveExpired {
        cutoff: DateTime<Utc>,
        reply: oneshot::Sender<StoreResult<Vec<Job>>>,
    },
}

impl fmt::Debug for StoreCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreCommand::Get { id, .. } => f.debug_struct("Get").field("id", id).finish(),
            StoreCommand::List { .. } => f.write_str("List"),
            StoreCommand::Insert { job, .. } => {
                f.debug_struct("Insert").field("id", &job.id).finish()
            }
            StoreCommand::Update { id, .. } => f.debug_struct("Update").field("id", id).finish(),
            StoreCommand::RemoveExpired { cutoff, .. } => f
                .debug_struct("RemoveExpired")
                .field("cutoff", cutoff)
                .finish(),
        }
    }
}

/// Cloneable client of the store owner task.
#[derive(Clone)]
pub struct StoreHandle {
    tx: mpsc::Sender<StoreCommand>,
}

impl fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreHandle")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl StoreHandle {
    /// Spawn the owner task for `backend`.
    ///
    /// The task stops once every handle has been dropped.
    pub fn spawn(backend: Arc<dyn SnapshotStore>) -> Self {
        let (tx, rx) = mpsc::channel(DEFAULT_MAILBOX_CAPACITY);
        tokio::spawn(StoreOwner { backend, rx }.run());
        Self { tx }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<StoreResult<T>>) -> StoreCommand,
    ) -> StoreResult<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| StoreError::Closed)?;
        rx.await.map_err(|_| StoreError::Closed)?
    }

    /// Fetch one job.
    pub async fn get(&self, id: &JobId) -> StoreResult<Job> {
        let id = id.clone();
        self.request(|reply| StoreCommand::Get { id, reply }).await
    }

    /// All jobs, most recently created first.
    pub async fn list(&self) -> StoreResult<Vec<Job>> {
        self.request(|reply| StoreCommand::List { reply }).await
    }

    /// Add a new job. Fails if the id is already present.
    pub async fn insert(&self, job: Job) -> StoreResult<()> {
        self.request(|reply| StoreCommand::Insert { job, reply }).await
    }

    /// Apply `apply` to the job and persist the result.
    ///
    /// Nothing is saved when the job is unknown or `apply` returns an error.
    pub async fn update<F>(&self, id: &JobId, apply: F) -> StoreResult<Job>
    where
        F: FnOnce(&mut Job) -> ModelResult<()> + Send + 'static,
    {
        let id = id.clone();
        let apply: JobMutation = Box::new(apply);
        self.request(|reply| StoreCommand::Update { id, apply, reply })
            .await
    }

    /// Remove every job created before `cutoff` and return the removed records.
    pub async fn remove_expired(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<Job>> {
        self.request(|reply| StoreCommand::RemoveExpired { cutoff, reply })
            .await
    }
}

struct StoreOwner {
    backend: Arc<dyn SnapshotStore>,
    rx: mpsc::Receiver<StoreCommand>,
}

impl StoreOwner {
    async fn run(mut self) {
        debug!("Store owner started");
        while let Some(cmd) = self.rx.recv().await {
            self.handle(cmd).await;
        }
        debug!("Store owner stopped");
    }

    async fn handle(&self, cmd: StoreCommand) {
        match cmd {
            StoreCommand::Get { id, reply } => {
                let _ = reply.send(self.get(id).await);
            }
            StoreCommand::List { reply } => {
                let _ = reply.send(self.list().await);
            }
            StoreCommand::Insert { job, reply } => {
                let _ = reply.send(self.insert(job).await);
            }
            StoreCommand::Update { id, apply, reply } => {
                let _ = reply.send(self.update(id, apply).await);
            }
            StoreCommand::RemoveExpired { cutoff, reply } => {
                let _ = reply.send(self.remove_expired(cutoff).await);
            }
        }
    }

    async fn get(&self, id: JobId) -> StoreResult<Job> {
        let mut jobs = self.backend.load().await?;
        jobs.remove(&id).ok_or(StoreError::NotFound(id))
    }

    async fn list(&self) -> StoreResult<Vec<Job>> {
        let mut jobs: Vec<Job> = self.backend.load().await?.into_values().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(jobs)
    }

    async fn insert(&self, job: Job) -> StoreResult<()> {
        let mut jobs = self.backend.load().await?;
        if jobs.contains_key(&job.id) {
            return Err(StoreError::Duplicate(job.id));
        }
        jobs.insert(job.id.clone(), job);
        self.backend.save(&jobs).await
    }

    async fn update(&self, id: JobId, apply: JobMutation) -> StoreResult<Job> {
        let mut jobs = self.backend.load().await?;
        let Some(job) = jobs.get_mut(&id) else {
            return Err(StoreError::NotFound(id));
        };

        let mut draft = job.clone();
        apply(&mut draft)?;
        if draft == *job {
            return Ok(draft);
        }
        *job = draft.clone();
        self.backend.save(&jobs).await?;
        Ok(draft)
    }

    async fn remove_expired(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<Job>> {
        let mut jobs = self.backend.load().await?;
        let expired: Vec<JobId> = jobs
            .values()
            .filter(|job| job.created_at < cutoff)
            .map(|job| job.id.clone())
            .collect();

        if expired.is_empty() {
            return Ok(Vec::new());
        }

        let removed: Vec<Job> = expired.iter().filter_map(|id| jobs.remove(id)).collect();
        if let Err(e) = self.backend.save(&jobs).await {
            warn!(error = %e, "Failed to save snapshot after expiring jobs");
            return Err(e);
        }

        info!(count = removed.len(), "Removed expired jobs from snapshot");
        Ok(removed)
    }
}
