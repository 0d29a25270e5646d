//! Job submission and the polling loop.

use super::handle::JobHandle;
use super::status::{JobSnapshot, JobStatus};
use crate::api::{
    BackendError, JobId, JobKind, JobStatusReport, RemoteJobStatus, SyncBackend,
};
use crate::config::PollingConfig;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Errors from job controller operations.
#[derive(Debug, Error)]
pub enum JobError {
    /// A non-terminal job of the same kind already exists. No network call
    /// was made.
    #[error("A {kind} job is already active ({job_id})")]
    AlreadyActive { kind: JobKind, job_id: JobId },

    /// The submission request failed.
    #[error("Job submission failed: {0}")]
    Submit(#[from] BackendError),

    /// No job with this ID exists in the session.
    #[error("Unknown job: {0}")]
    UnknownJob(JobId),

    /// The job has not completed; its result is not available.
    #[error("Job {0} has not completed")]
    NotCompleted(JobId),
}

/// Submits jobs and tracks them to a terminal state.
///
/// One controller exists per project session. Each submitted job gets its
/// own polling task, stopped deterministically on a terminal status or via
/// [`JobHandle::cancel`]; records of finished jobs remain queryable until
/// replaced by a new submission of the same kind.
pub struct JobController {
    backend: Arc<dyn SyncBackend>,
    config: PollingConfig,

    /// Every job submitted this session, keyed by server ID.
    jobs: Mutex<HashMap<JobId, JobHandle>>,

    /// The most recent job per kind. Guards the one-active-job-per-kind
    /// rule; held across the submission request so two racing submits of
    /// the same kind cannot both pass the check.
    active: tokio::sync::Mutex<HashMap<JobKind, JobId>>,
}

impl JobController {
    /// Creates a controller over the given backend.
    pub fn new(backend: Arc<dyn SyncBackend>, config: PollingConfig) -> Self {
        Self {
            backend,
            config,
            jobs: Mutex::new(HashMap::new()),
            active: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Submits a job of `kind` and starts polling it.
    ///
    /// # Errors
    ///
    /// - [`JobError::AlreadyActive`] if a non-terminal job of the same kind
    ///   exists; the rejection happens before any network traffic.
    /// - [`JobError::Submit`] if the backend rejects the submission or the
    ///   request fails.
    pub async fn submit(&self, kind: JobKind, params: Value) -> Result<JobHandle, JobError> {
        let mut active = self.active.lock().await;

        if let Some(existing_id) = active.get(&kind).cloned() {
            match self.handle(&existing_id) {
                Some(handle) if !handle.snapshot().status.is_terminal() => {
                    debug!(job_kind = %kind, job_id = %existing_id, "Rejecting duplicate submission");
                    return Err(JobError::AlreadyActive {
                        kind,
                        job_id: existing_id,
                    });
                }
                _ => {
                    // Finished or vanished; the slot is free.
                    active.remove(&kind);
                }
            }
        }

        let job_id = self.backend.submit_job(kind, &params).await?;
        info!(job_kind = %kind, job_id = %job_id, "Job submitted");

        let (snapshot_tx, snapshot_rx) = watch::channel(JobSnapshot::submitted());
        let cancel = CancellationToken::new();
        let handle = JobHandle::new(job_id.clone(), kind, snapshot_rx, cancel.clone());

        self.jobs
            .lock()
            .expect("job registry poisoned")
            .insert(job_id.clone(), handle.clone());
        active.insert(kind, job_id.clone());
        drop(active);

        let backend = Arc::clone(&self.backend);
        let config = self.config;
        tokio::spawn(async move {
            poll_until_terminal(backend, kind, job_id, config, snapshot_tx, cancel).await;
        });

        Ok(handle)
    }

    /// Returns the current snapshot for `id`, or `None` if unknown.
    pub fn job_state(&self, id: &JobId) -> Option<JobSnapshot> {
        self.handle(id).map(|handle| handle.snapshot())
    }

    /// Returns the handle for `id`, or `None` if unknown.
    pub fn handle(&self, id: &JobId) -> Option<JobHandle> {
        self.jobs
            .lock()
            .expect("job registry poisoned")
            .get(id)
            .cloned()
    }

    /// Returns the snapshot of the most recent job of `kind`, or the idle
    /// snapshot if none was ever submitted.
    pub async fn kind_state(&self, kind: JobKind) -> JobSnapshot {
        let active = self.active.lock().await;
        active
            .get(&kind)
            .and_then(|id| self.job_state(id))
            .unwrap_or_else(JobSnapshot::idle)
    }

    /// Stops polling `id`.
    ///
    /// The job transitions to `Cancelled` once its loop observes the
    /// signal. Cancelling an already-terminal job is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::UnknownJob`] if no such job exists.
    pub fn cancel(&self, id: &JobId) -> Result<(), JobError> {
        let handle = self.handle(id).ok_or_else(|| JobError::UnknownJob(id.clone()))?;
        if !handle.snapshot().status.is_terminal() {
            info!(job_id = %id, "Cancelling job polling");
            handle.cancel();
        }
        Ok(())
    }

    /// Downloads the artifact of a completed job.
    ///
    /// # Errors
    ///
    /// - [`JobError::UnknownJob`] if no such job exists.
    /// - [`JobError::NotCompleted`] if the job is not in `Completed` state.
    /// - [`JobError::Submit`] wrapping the transport error if the download
    ///   request fails.
    pub async fn fetch_result(&self, id: &JobId) -> Result<Vec<u8>, JobError> {
        let handle = self.handle(id).ok_or_else(|| JobError::UnknownJob(id.clone()))?;
        if handle.snapshot().status != JobStatus::Completed {
            return Err(JobError::NotCompleted(id.clone()));
        }
        let bytes = self.backend.download_result(handle.kind(), id).await?;
        Ok(bytes)
    }
}

impl std::fmt::Debug for JobController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobController")
            .field("config", &self.config)
            .finish()
    }
}

/// Polls one job at a fixed interval until it reaches a terminal state.
///
/// This task is the only writer of the job's snapshot channel, so updates
/// are applied in request order by construction. Cancellation is checked
/// via `select!`, which also drops any in-flight status request so a stale
/// response can never be applied after the job was cancelled.
async fn poll_until_terminal(
    backend: Arc<dyn SyncBackend>,
    kind: JobKind,
    job_id: JobId,
    config: PollingConfig,
    snapshot_tx: watch::Sender<JobSnapshot>,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(config.interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // The immediate first tick would poll right after submission; skip it
    // so the first status request happens one interval later.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                snapshot_tx.send_modify(|snapshot| {
                    snapshot.status = JobStatus::Cancelled;
                    snapshot.message = "Cancelled locally; polling stopped".to_string();
                });
                info!(job_kind = %kind, job_id = %job_id, "Job polling cancelled");
                return;
            }
            _ = interval.tick() => {}
        }

        let report = tokio::select! {
            _ = cancel.cancelled() => {
                snapshot_tx.send_modify(|snapshot| {
                    snapshot.status = JobStatus::Cancelled;
                    snapshot.message = "Cancelled locally; polling stopped".to_string();
                });
                info!(job_kind = %kind, job_id = %job_id, "Job polling cancelled");
                return;
            }
            result = backend.job_status(kind, &job_id) => result,
        };

        match report {
            Ok(report) => {
                let terminal = apply_report(&snapshot_tx, &report);
                if terminal {
                    info!(
                        job_kind = %kind,
                        job_id = %job_id,
                        status = ?snapshot_tx.borrow().status,
                        "Job reached terminal state"
                    );
                    return;
                }
            }
            Err(error) if error.is_transient() => {
                let failures = {
                    let mut failures = 0;
                    snapshot_tx.send_modify(|snapshot| {
                        snapshot.poll_failures += 1;
                        failures = snapshot.poll_failures;
                    });
                    failures
                };
                warn!(
                    job_kind = %kind,
                    job_id = %job_id,
                    poll_failures = failures,
                    error = %error,
                    "Status poll failed"
                );

                if failures >= config.max_poll_failures {
                    // Client-side circuit breaker, distinct from a
                    // server-reported failure.
                    snapshot_tx.send_modify(|snapshot| {
                        snapshot.status = JobStatus::Failed;
                        snapshot.message = format!(
                            "Status polling failed after {} attempts: {}",
                            failures, error
                        );
                    });
                    warn!(job_kind = %kind, job_id = %job_id, "Poll failure budget exhausted");
                    return;
                }
            }
            Err(error) => {
                // Business rejection from the status endpoint; retrying
                // cannot help.
                snapshot_tx.send_modify(|snapshot| {
                    snapshot.status = JobStatus::Failed;
                    snapshot.message = error.to_string();
                });
                warn!(job_kind = %kind, job_id = %job_id, error = %error, "Status poll rejected");
                return;
            }
        }
    }
}

/// Applies one status report to the snapshot channel.
///
/// Returns true when the job reached a terminal state.
fn apply_report(snapshot_tx: &watch::Sender<JobSnapshot>, report: &JobStatusReport) -> bool {
    let mut terminal = false;
    snapshot_tx.send_modify(|snapshot| {
        snapshot.poll_failures = 0;
        snapshot.message = report.message.clone();
        // Clamp: the displayed value never regresses below the observed
        // maximum, whatever the server reports.
        snapshot.progress_percent = snapshot.progress_percent.max(report.progress.min(100));

        snapshot.status = match report.status {
            // Any successful poll of a live job counts as in-progress.
            RemoteJobStatus::Queued | RemoteJobStatus::InProgress => JobStatus::InProgress,
            RemoteJobStatus::Completed => {
                snapshot.progress_percent = 100;
                snapshot.result_ref = report.result.clone();
                JobStatus::Completed
            }
            RemoteJobStatus::Failed => JobStatus::Failed,
        };
        terminal = snapshot.status.is_terminal();
    });
    terminal
}
