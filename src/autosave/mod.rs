//! Debounced persistence of dirty documents.
//!
//! The coordinator sits between UI edits and the backend: every local
//! mutation arms a debounce timer, and when the quiescence window elapses a
//! save cycle runs. The cycle guarantees:
//!
//! 1. At most one outstanding write per document at any time.
//! 2. No edit is silently dropped: an edit either rides the in-flight
//!    snapshot or forces a follow-up cycle via the pending-resave flag.
//! 3. A burst of edits costs at most one request per quiescence window,
//!    plus possibly one immediate follow-up for edits that landed
//!    mid-flight.
//!
//! A failed save is recorded on the document and not retried; the next edit
//! or an explicit [`force_save`](AutosaveCoordinator::force_save) drives
//! recovery.

use crate::api::{EntityId, SyncBackend};
use crate::config::AutosaveConfig;
use crate::debounce::DebounceScheduler;
use crate::draft::{DraftError, DraftStore, SaveBegin};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Coordinates debounced save cycles for all open documents.
///
/// Cheap to clone; clones share the same store, backend, and timer table.
/// One coordinator instance exists per project session - a second instance
/// over the same store would break the at-most-one-in-flight invariant.
#[derive(Clone)]
pub struct AutosaveCoordinator {
    store: Arc<DraftStore>,
    backend: Arc<dyn SyncBackend>,
    scheduler: DebounceScheduler<EntityId>,
    config: AutosaveConfig,
}

impl AutosaveCoordinator {
    /// Creates a coordinator over the given store and backend.
    pub fn new(
        store: Arc<DraftStore>,
        backend: Arc<dyn SyncBackend>,
        config: AutosaveConfig,
    ) -> Self {
        Self {
            store,
            backend,
            scheduler: DebounceScheduler::new(),
            config,
        }
    }

    /// Notes a local edit and (re)arms the quiescence timer for `id`.
    ///
    /// Call this on every mutation. The save fires only once the document
    /// has been quiet for the configured window; rapid edits keep pushing
    /// the timer back.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError::UnknownDocument`] if the entity was never
    /// opened.
    pub fn notify_edit(&self, id: &EntityId) -> Result<(), DraftError> {
        if self.store.draft_state(id).is_none() {
            return Err(DraftError::UnknownDocument(id.clone()));
        }

        let coordinator = self.clone();
        let entity = id.clone();
        self.scheduler
            .schedule(id.clone(), self.config.debounce_window, async move {
                coordinator.run_save_cycles(&entity).await;
            });
        Ok(())
    }

    /// Saves `id` immediately, bypassing the debounce timer.
    ///
    /// Folds into the same state machine as timed saves: if a request is
    /// already outstanding this only marks the pending-resave flag, so the
    /// at-most-one-in-flight rule holds for manual saves too. Returns once
    /// every required cycle has resolved.
    pub async fn force_save(&self, id: &EntityId) -> Result<(), DraftError> {
        if self.store.draft_state(id).is_none() {
            return Err(DraftError::UnknownDocument(id.clone()));
        }
        self.scheduler.cancel(id);
        self.run_save_cycles(id).await;
        Ok(())
    }

    /// Runs save cycles for `id` until the document needs none.
    ///
    /// Each cycle snapshots the local state, issues one persistence call,
    /// and reconciles the outcome. When edits arrived mid-flight the store
    /// requests a follow-up cycle, which runs immediately with the latest
    /// state.
    async fn run_save_cycles(&self, id: &EntityId) {
        loop {
            let snapshot = match self.store.begin_save(id) {
                Ok(SaveBegin::Snapshot(snapshot)) => snapshot,
                Ok(SaveBegin::AlreadyInFlight) => {
                    debug!(entity_id = %id, "Save already in flight, follow-up queued");
                    return;
                }
                Ok(SaveBegin::Clean) => return,
                Err(DraftError::UnknownDocument(_)) | Err(DraftError::AlreadyOpen(_)) => {
                    // Document closed between the timer arming and firing.
                    debug!(entity_id = %id, "Skipping save for closed document");
                    return;
                }
            };

            debug!(entity_id = %id, "Issuing save request");
            match self.backend.save_entity(id, &snapshot).await {
                Ok(()) => match self.store.mark_save_succeeded(id) {
                    Ok(true) => {
                        debug!(entity_id = %id, "Edits arrived mid-flight, running follow-up save");
                        continue;
                    }
                    Ok(false) => {
                        info!(entity_id = %id, "Document saved");
                        return;
                    }
                    Err(_) => return,
                },
                Err(error) => {
                    warn!(entity_id = %id, error = %error, "Save request failed");
                    let _ = self.store.mark_save_failed(id, error.to_string());
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{BackendError, BackendFuture, JobId, JobKind, JobStatusReport};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Backend that records save calls and answers from a script.
    struct RecordingBackend {
        saves: Mutex<Vec<Value>>,
        failures_remaining: AtomicUsize,
    }

    impl RecordingBackend {
        fn new() -> Self {
            Self {
                saves: Mutex::new(Vec::new()),
                failures_remaining: AtomicUsize::new(0),
            }
        }

        fn failing(times: usize) -> Self {
            let backend = Self::new();
            backend.failures_remaining.store(times, Ordering::SeqCst);
            backend
        }

        fn save_count(&self) -> usize {
            self.saves.lock().unwrap().len()
        }

        fn last_save(&self) -> Option<Value> {
            self.saves.lock().unwrap().last().cloned()
        }
    }

    impl SyncBackend for RecordingBackend {
        fn save_entity<'a>(
            &'a self,
            _id: &'a EntityId,
            snapshot: &'a Value,
        ) -> BackendFuture<'a, ()> {
            Box::pin(async move {
                // Simulate network latency so mid-flight edits are possible.
                tokio::time::sleep(Duration::from_millis(20)).await;
                if self
                    .failures_remaining
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok()
                {
                    return Err(BackendError::Transport("simulated outage".into()));
                }
                self.saves.lock().unwrap().push(snapshot.clone());
                Ok(())
            })
        }

        fn submit_job<'a>(&'a self, _: JobKind, _: &'a Value) -> BackendFuture<'a, JobId> {
            unimplemented!("not used by autosave tests")
        }

        fn job_status<'a>(
            &'a self,
            _: JobKind,
            _: &'a JobId,
        ) -> BackendFuture<'a, JobStatusReport> {
            unimplemented!("not used by autosave tests")
        }

        fn download_result<'a>(&'a self, _: JobKind, _: &'a JobId) -> BackendFuture<'a, Vec<u8>> {
            unimplemented!("not used by autosave tests")
        }
    }

    fn coordinator(
        backend: Arc<RecordingBackend>,
        window: Duration,
    ) -> (AutosaveCoordinator, Arc<DraftStore>, EntityId) {
        let store = Arc::new(DraftStore::new());
        let id = EntityId::new("page-1");
        store.open(&id, json!({})).unwrap();
        let coordinator =
            AutosaveCoordinator::new(Arc::clone(&store), backend, AutosaveConfig::new(window));
        (coordinator, store, id)
    }

    #[tokio::test]
    async fn test_burst_of_edits_issues_one_save() {
        let backend = Arc::new(RecordingBackend::new());
        let (coordinator, store, id) =
            coordinator(Arc::clone(&backend), Duration::from_millis(30));

        for n in 0..3 {
            store.update(&id, &json!({"body": n})).unwrap();
            coordinator.notify_edit(&id).unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(backend.save_count(), 1);
        assert_eq!(backend.last_save(), Some(json!({"body": 2})));
        assert!(!store.is_dirty(&id));
    }

    #[tokio::test]
    async fn test_notify_edit_unknown_document() {
        let backend = Arc::new(RecordingBackend::new());
        let (coordinator, _store, _id) =
            coordinator(Arc::clone(&backend), Duration::from_millis(10));

        let unknown = EntityId::new("nope");
        assert_eq!(
            coordinator.notify_edit(&unknown),
            Err(DraftError::UnknownDocument(unknown.clone()))
        );
    }

    #[tokio::test]
    async fn test_force_save_bypasses_debounce() {
        let backend = Arc::new(RecordingBackend::new());
        let (coordinator, store, id) =
            coordinator(Arc::clone(&backend), Duration::from_secs(60));

        store.update(&id, &json!({"a": 1})).unwrap();
        coordinator.notify_edit(&id).unwrap();
        coordinator.force_save(&id).await.unwrap();

        assert_eq!(backend.save_count(), 1);
        assert!(!store.is_dirty(&id));
        // The debounce timer was cancelled; no second save later.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(backend.save_count(), 1);
    }

    #[tokio::test]
    async fn test_force_save_on_clean_document_is_noop() {
        let backend = Arc::new(RecordingBackend::new());
        let (coordinator, _store, id) =
            coordinator(Arc::clone(&backend), Duration::from_millis(10));

        coordinator.force_save(&id).await.unwrap();
        assert_eq!(backend.save_count(), 0);
    }

    #[tokio::test]
    async fn test_midflight_edit_triggers_followup_save() {
        let backend = Arc::new(RecordingBackend::new());
        let (coordinator, store, id) =
            coordinator(Arc::clone(&backend), Duration::from_millis(10));

        store.update(&id, &json!({"body": "first"})).unwrap();

        // Start the save directly, then edit while the request is in flight
        // (the mock backend sleeps 20ms before acknowledging).
        let save = {
            let coordinator = coordinator.clone();
            let id = id.clone();
            tokio::spawn(async move { coordinator.force_save(&id).await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        store.update(&id, &json!({"body": "second"})).unwrap();

        save.await.unwrap().unwrap();

        assert_eq!(backend.save_count(), 2);
        assert_eq!(backend.last_save(), Some(json!({"body": "second"})));
        assert!(!store.is_dirty(&id));
    }

    #[tokio::test]
    async fn test_failed_save_does_not_retry() {
        let backend = Arc::new(RecordingBackend::failing(1));
        let (coordinator, store, id) =
            coordinator(Arc::clone(&backend), Duration::from_millis(10));

        store.update(&id, &json!({"a": 1})).unwrap();
        coordinator.force_save(&id).await.unwrap();

        let state = store.draft_state(&id).unwrap();
        assert!(state.dirty);
        assert!(state.last_save_error.is_some());
        assert_eq!(backend.save_count(), 0);

        // No background retry fires on its own.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(backend.save_count(), 0);

        // The next explicit save recovers.
        coordinator.force_save(&id).await.unwrap();
        assert_eq!(backend.save_count(), 1);
        assert!(!store.is_dirty(&id));
    }
}
