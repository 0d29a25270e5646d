//! Observer handle for a submitted job.

use super::status::JobSnapshot;
use crate::api::{JobId, JobKind};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Handle to a submitted job for status observation and cancellation.
///
/// Returned by [`JobController::submit`](super::JobController::submit).
/// Cloneable; all clones refer to the same underlying job.
///
/// # Example
///
/// ```ignore
/// let mut handle = controller.submit(JobKind::Export, params).await?;
///
/// // Check status without waiting
/// let snapshot = handle.snapshot();
///
/// // Wait for completion
/// let final_snapshot = handle.wait().await;
///
/// // Or stop polling
/// handle.cancel();
/// ```
#[derive(Clone)]
pub struct JobHandle {
    id: JobId,
    kind: JobKind,
    snapshot_rx: watch::Receiver<JobSnapshot>,
    cancel: CancellationToken,
}

impl JobHandle {
    pub(crate) fn new(
        id: JobId,
        kind: JobKind,
        snapshot_rx: watch::Receiver<JobSnapshot>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            kind,
            snapshot_rx,
            cancel,
        }
    }

    /// Returns the server-assigned job identifier.
    pub fn id(&self) -> &JobId {
        &self.id
    }

    /// Returns the job kind.
    pub fn kind(&self) -> JobKind {
        self.kind
    }

    /// Returns the most recently published snapshot without waiting.
    pub fn snapshot(&self) -> JobSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Waits for the next published snapshot.
    ///
    /// Returns `None` once the polling loop has shut down and no further
    /// change will arrive.
    pub async fn changed(&mut self) -> Option<JobSnapshot> {
        self.snapshot_rx.changed().await.ok()?;
        Some(self.snapshot_rx.borrow_and_update().clone())
    }

    /// Waits until the job reaches a terminal state and returns the final
    /// snapshot.
    pub async fn wait(&mut self) -> JobSnapshot {
        loop {
            let current = self.snapshot_rx.borrow_and_update().clone();
            if current.status.is_terminal() {
                return current;
            }
            if self.snapshot_rx.changed().await.is_err() {
                // Sender dropped; the last published snapshot is final.
                return self.snapshot_rx.borrow().clone();
            }
        }
    }

    /// Stops the polling loop for this job.
    ///
    /// Non-blocking. The job transitions to `Cancelled` once the loop
    /// observes the signal; no further network calls are made for it.
    /// Cancellation is local only - the server's job may run to completion
    /// regardless.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobHandle")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("status", &self.snapshot_rx.borrow().status)
            .finish()
    }
}
