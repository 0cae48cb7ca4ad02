//! Tracks map-generation jobs that outlive the upload request.
//!
//! Uploads are parsed inside the request, but geocoding can take one network
//! round-trip per row, so enrichment and saving run as a background job. The
//! upload page polls `/api/maps/upload/status/{job_id}` until it sees
//! `Completed(map_id)` or `Failed(message)`.
//!
//! - `JobsState`: clonable handle injected as `web::Data` in `main.rs`.
//! - `JobUpdate`: message a worker sends when its job changes state.
//! - `start_job_updater`: long-running task applying `JobUpdate`s to the map.
//! - `prune_jobs_periodically`: drops finished jobs once nobody can still be
//!   polling for them.

use common::jobs::JobStatus;
use log::info;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::{mpsc, RwLock};
use tokio::time::Instant;

/// How long a completed or failed job stays visible to the status endpoint.
pub const FINISHED_JOB_RETENTION: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone)]
pub struct TrackedJob {
    pub status: JobStatus,
    /// Set when the job reaches `Completed` or `Failed`.
    pub finished_at: Option<Instant>,
}

#[derive(Clone)]
pub struct JobsState {
    /// Job id → latest status. Read by the status endpoint, written by
    /// `start_job_updater` and by `register`.
    pub jobs: Arc<RwLock<HashMap<String, TrackedJob>>>,

    /// Workers report through this channel instead of locking `jobs`.
    pub tx: mpsc::Sender<JobUpdate>,
}

#[derive(Debug)]
pub struct JobUpdate {
    pub(crate) job_id: String,
    pub(crate) status: JobStatus,
}

impl JobsState {
    /// Creates the shared state and the receiver to hand to `start_job_updater`.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<JobUpdate>) {
        let (tx, rx) = mpsc::channel(capacity);
        let state = JobsState {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            tx,
        };
        (state, rx)
    }

    /// Registers a new job as `Pending` and returns its id.
    pub async fn register(&self) -> String {
        let job_id = uuid::Uuid::new_v4().to_string();
        self.jobs
            .write()
            .await
            .insert(
                job_id.clone(),
                TrackedJob {
                    status: JobStatus::Pending,
                    finished_at: None,
                },
            );
        job_id
    }

    pub async fn status(&self, job_id: &str) -> Option<JobStatus> {
        self.jobs.read().await.get(job_id).map(|job| job.status.clone())
    }

    /// Removes jobs that finished more than `retention` ago. Returns how many
    /// were removed.
    pub async fn prune_finished(&self, retention: Duration) -> usize {
        let now = Instant::now();
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| {
            job.finished_at
                .map_or(true, |finished| now.duration_since(finished) < retention)
        });
        before - jobs.len()
    }

    /// Queues a status change. A closed channel only means shutdown.
    pub async fn report(&self, job_id: &str, status: JobStatus) {
        let _ = self
            .tx
            .send(JobUpdate {
                job_id: job_id.to_string(),
                status,
            })
            .await;
    }

    /// Non-async variant for progress callbacks; drops the update when full.
    pub fn try_report(&self, job_id: &str, status: JobStatus) {
        let _ = self.tx.try_send(JobUpdate {
            job_id: job_id.to_string(),
            status,
        });
    }
}

/// Applies queued updates; runs for the lifetime of the server.
pub async fn start_job_updater(state: JobsState, mut rx: mpsc::Receiver<JobUpdate>) {
    while let Some(update) = rx.recv().await {
        let finished_at = match update.status {
            JobStatus::Completed(_) | JobStatus::Failed(_) => Some(Instant::now()),
            JobStatus::Pending | JobStatus::InProgress(_) => None,
        };
        let mut jobs = state.jobs.write().await;
        jobs.insert(
            update.job_id,
            TrackedJob {
                status: update.status,
                finished_at,
            },
        );
    }
}

/// Evicts finished jobs every `FINISHED_JOB_RETENTION`; runs for the lifetime
/// of the server.
pub async fn prune_jobs_periodically(state: JobsState) {
    let mut ticker = tokio::time::interval(FINISHED_JOB_RETENTION);
    loop {
        ticker.tick().await;
        let pruned = state.prune_finished(FINISHED_JOB_RETENTION).await;
        if pruned > 0 {
            info!("Pruned {} finished jobs", pruned);
        }
    }
}
