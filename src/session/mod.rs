//! High-level facade for one open project.
//!
//! A [`ProjectSession`] wires one draft store, one autosave coordinator,
//! and one job controller around an injected backend, and exposes the
//! surface the UI layer calls. Exactly one session should exist per open
//! project: two sessions over the same entities would each issue writes
//! and break the at-most-one-in-flight invariant.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use serde_json::json;
//! use sitesync::api::{HttpBackend, JobKind};
//! use sitesync::config::CoordinatorConfig;
//! use sitesync::session::ProjectSession;
//!
//! let backend = Arc::new(HttpBackend::new("https://api.example.com")?);
//! let session = ProjectSession::new(backend, CoordinatorConfig::default());
//!
//! session.open_document(&page_id, json!({"title": "Home"}))?;
//! session.update_document(&page_id, &json!({"title": "Welcome"}))?;
//! // ...a save fires once the document has been quiet for the window.
//!
//! let handle = session.submit_job(JobKind::Publish, json!({})).await?;
//! ```

use crate::api::{EntityId, JobId, JobKind, SyncBackend};
use crate::autosave::AutosaveCoordinator;
use crate::config::CoordinatorConfig;
use crate::draft::{DraftError, DraftState, DraftStore};
use crate::job::{JobController, JobError, JobHandle, JobSnapshot};
use serde_json::Value;
use std::sync::Arc;

/// Coordination facade for one open project.
pub struct ProjectSession {
    drafts: Arc<DraftStore>,
    autosave: AutosaveCoordinator,
    jobs: JobController,
}

impl ProjectSession {
    /// Creates a session over the given backend.
    ///
    /// The backend is injected so tests and previews can substitute a
    /// non-network implementation.
    pub fn new(backend: Arc<dyn SyncBackend>, config: CoordinatorConfig) -> Self {
        let drafts = Arc::new(DraftStore::new());
        let autosave = AutosaveCoordinator::new(
            Arc::clone(&drafts),
            Arc::clone(&backend),
            config.autosave,
        );
        let jobs = JobController::new(backend, config.polling);
        Self {
            drafts,
            autosave,
            jobs,
        }
    }

    // === Documents ===

    /// Registers a document with its backend-loaded state.
    pub fn open_document(&self, id: &EntityId, initial: Value) -> Result<(), DraftError> {
        self.drafts.open(id, initial)
    }

    /// Discards local state for a document.
    pub fn close_document(&self, id: &EntityId) {
        self.drafts.close(id);
    }

    /// Applies an edit and arms the autosave timer.
    ///
    /// The merged document is returned synchronously for optimistic
    /// rendering; persistence happens after the quiescence window.
    pub fn update_document(&self, id: &EntityId, patch: &Value) -> Result<Value, DraftError> {
        let merged = self.drafts.update(id, patch)?;
        self.autosave.notify_edit(id)?;
        Ok(merged)
    }

    /// Re-arms the autosave timer without changing the document.
    ///
    /// For callers that mutate the store directly.
    pub fn notify_edit(&self, id: &EntityId) -> Result<(), DraftError> {
        self.autosave.notify_edit(id)
    }

    /// Saves a document immediately (explicit "Save" action).
    pub async fn force_save(&self, id: &EntityId) -> Result<(), DraftError> {
        self.autosave.force_save(id).await
    }

    /// Returns the observable draft state (dirty flag, last-saved time,
    /// last error) for a document.
    pub fn draft_state(&self, id: &EntityId) -> Option<DraftState> {
        self.drafts.draft_state(id)
    }

    /// Returns the current local document.
    pub fn document(&self, id: &EntityId) -> Option<Value> {
        self.drafts.local_state(id)
    }

    // === Jobs ===

    /// Submits a job and starts tracking it.
    pub async fn submit_job(&self, kind: JobKind, params: Value) -> Result<JobHandle, JobError> {
        self.jobs.submit(kind, params).await
    }

    /// Returns the snapshot for a job, or `None` if unknown.
    pub fn job_state(&self, id: &JobId) -> Option<JobSnapshot> {
        self.jobs.job_state(id)
    }

    /// Returns the snapshot of the most recent job of `kind`, idle if none.
    pub async fn job_state_for_kind(&self, kind: JobKind) -> JobSnapshot {
        self.jobs.kind_state(kind).await
    }

    /// Stops polling a job.
    pub fn cancel_job(&self, id: &JobId) -> Result<(), JobError> {
        self.jobs.cancel(id)
    }

    /// Downloads the artifact of a completed job.
    pub async fn fetch_job_result(&self, id: &JobId) -> Result<Vec<u8>, JobError> {
        self.jobs.fetch_result(id).await
    }
}

impl std::fmt::Debug for ProjectSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectSession").finish()
    }
}
