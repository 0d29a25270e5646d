//! Identifier and wire types for the backend contract.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Opaque identifier for an editable entity (page, design config).
///
/// Entity IDs are assigned by the backend and treated as opaque strings
/// by the coordinator.
#[derive(Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct EntityId(String);

impl EntityId {
    /// Creates an entity ID from its string value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the string value of this entity ID.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Server-assigned identifier for a submitted job.
#[derive(Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct JobId(String);

impl JobId {
    /// Creates a job ID from its string value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the string value of this job ID.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JobId({})", self.0)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Kind of long-running backend job.
///
/// Kind-specific behavior is limited to the submission endpoint and the
/// interpretation of the completed job's result reference (download URL for
/// export, report data for audits). Status tracking is identical for all
/// kinds.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Static site export; result is a download URL for the archive.
    Export,
    /// Publish to the hosting target.
    Publish,
    /// SEO audit; result is the report payload.
    Audit,
    /// Analytics report generation.
    ReportGeneration,
}

impl JobKind {
    /// Returns the URL path segment for this kind (`/jobs/{kind}/...`).
    pub fn as_str(&self) -> &str {
        match self {
            JobKind::Export => "export",
            JobKind::Publish => "publish",
            JobKind::Audit => "audit",
            JobKind::ReportGeneration => "report-generation",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job status as reported by the backend's status endpoint.
///
/// This is the wire-level status. The coordinator maps it into the richer
/// client-side [`JobStatus`](crate::job::JobStatus), which additionally
/// tracks submission and local cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteJobStatus {
    /// Accepted but not yet started.
    #[serde(alias = "submitted")]
    Queued,
    /// Actively running.
    InProgress,
    /// Finished successfully.
    Completed,
    /// Finished with a server-reported failure.
    Failed,
}

/// Response body of `GET /jobs/{kind}/{job_id}/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusReport {
    /// Current server-side status.
    pub status: RemoteJobStatus,

    /// Completion percentage, 0-100. The server does not guarantee this is
    /// monotone; the controller clamps displayed values.
    #[serde(default)]
    pub progress: u8,

    /// Human-readable status text for display.
    #[serde(default)]
    pub message: String,

    /// Result reference, present once the job completed: a download URL for
    /// exports, report data for audits, a score for SEO runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

/// Response body of `POST /jobs/{kind}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct JobSubmitResponse {
    pub job_id: String,
}

/// Errors returned by backend operations.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// The request did not complete (connection refused, DNS, reset).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The request exceeded the configured timeout.
    #[error("Request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// The backend rejected the request (validation failure, conflict).
    /// Business rejections are never retried.
    #[error("Rejected by backend (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// The response body could not be interpreted.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl BackendError {
    /// Whether this failure is transient and worth retrying.
    ///
    /// Only transport-level failures qualify. A business rejection or a
    /// malformed response will not improve on retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BackendError::Transport(_) | BackendError::Timeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_roundtrip() {
        let id = EntityId::new("page-7");
        assert_eq!(id.as_str(), "page-7");
        assert_eq!(format!("{}", id), "page-7");
    }

    #[test]
    fn test_job_id_equality() {
        let a = JobId::new("42");
        let b: JobId = "42".into();
        let c = JobId::new("43");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_job_kind_path_segments() {
        assert_eq!(JobKind::Export.as_str(), "export");
        assert_eq!(JobKind::ReportGeneration.as_str(), "report-generation");
    }

    #[test]
    fn test_status_report_defaults() {
        let report: JobStatusReport =
            serde_json::from_str(r#"{"status":"in_progress"}"#).unwrap();
        assert_eq!(report.status, RemoteJobStatus::InProgress);
        assert_eq!(report.progress, 0);
        assert!(report.message.is_empty());
        assert!(report.result.is_none());
    }

    #[test]
    fn test_transient_classification() {
        assert!(BackendError::Transport("reset".into()).is_transient());
        assert!(BackendError::Timeout {
            url: "u".into(),
            timeout_secs: 30
        }
        .is_transient());
        assert!(!BackendError::Rejected {
            status: 422,
            message: "bad".into()
        }
        .is_transient());
        assert!(!BackendError::InvalidResponse("truncated".into()).is_transient());
    }
}
