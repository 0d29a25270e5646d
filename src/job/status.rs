//! Shared status model for all job kinds.
//!
//! Export, publish, and audit flows all render the same
//! `{status, progress, message}` shape; kind-specific behavior is limited
//! to the submission endpoint and the interpretation of the result
//! reference.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Client-side job status.
///
/// ```text
/// idle --submit--> submitted --first successful poll--> in_progress
/// in_progress --poll: completed--> completed   (terminal)
/// in_progress --poll: failed-->    failed      (terminal)
/// {submitted, in_progress} --failure budget exhausted--> failed (terminal)
/// {submitted, in_progress} --cancel--> cancelled (terminal, local only)
/// ```
///
/// Terminal states are never left; a new operation requires a new job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// No job exists yet.
    Idle,
    /// Submission acknowledged; no status observed yet.
    Submitted,
    /// The server reported the job alive at least once.
    InProgress,
    /// Finished successfully; the result reference is populated.
    Completed,
    /// Finished with a failure, server-reported or client-declared.
    Failed,
    /// Polling stopped locally. The server's job may still be running;
    /// cancellation asserts nothing about backend state.
    Cancelled,
}

impl JobStatus {
    /// Whether this status permits no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Whether a job in this status occupies its kind's active slot.
    pub fn is_active(&self) -> bool {
        matches!(self, JobStatus::Submitted | JobStatus::InProgress)
    }
}

/// Point-in-time view of a job, published to observers on every change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    /// Current client-side status.
    pub status: JobStatus,

    /// Displayed completion percentage, 0-100. Never decreases across the
    /// life of one job, whatever the server reports.
    pub progress_percent: u8,

    /// Human-readable status text from the last poll.
    pub message: String,

    /// Consecutive failed poll attempts. Reset by every successful poll.
    pub poll_failures: u32,

    /// Result reference, populated only on `Completed`: a download URL for
    /// exports, report data or a score for audits.
    pub result_ref: Option<Value>,
}

impl JobSnapshot {
    /// The "no job" snapshot used by UI before any submission.
    pub fn idle() -> Self {
        Self {
            status: JobStatus::Idle,
            progress_percent: 0,
            message: String::new(),
            poll_failures: 0,
            result_ref: None,
        }
    }

    /// Snapshot of a freshly submitted job.
    pub(crate) fn submitted() -> Self {
        Self {
            status: JobStatus::Submitted,
            ..Self::idle()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(!JobStatus::Idle.is_terminal());
        assert!(!JobStatus::Submitted.is_terminal());
        assert!(!JobStatus::InProgress.is_terminal());
    }

    #[test]
    fn test_active_states() {
        assert!(JobStatus::Submitted.is_active());
        assert!(JobStatus::InProgress.is_active());
        assert!(!JobStatus::Idle.is_active());
        assert!(!JobStatus::Cancelled.is_active());
    }

    #[test]
    fn test_idle_snapshot() {
        let snapshot = JobSnapshot::idle();
        assert_eq!(snapshot.status, JobStatus::Idle);
        assert_eq!(snapshot.progress_percent, 0);
        assert!(snapshot.result_ref.is_none());
    }
}
