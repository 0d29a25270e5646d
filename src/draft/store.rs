//! Thread-safe store of document slots with the save-cycle transitions.

use super::document::{merge_patch, DocumentSlot, DraftState, SaveBegin};
use crate::api::EntityId;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from draft store operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DraftError {
    /// The entity was never opened in this session.
    #[error("Unknown document: {0}")]
    UnknownDocument(EntityId),

    /// The entity is already open; a slot cannot be seeded twice.
    #[error("Document already open: {0}")]
    AlreadyOpen(EntityId),
}

/// Holds the draft state of every document open in the session.
///
/// One store exists per project session. All methods are synchronous and
/// non-blocking; the store is never held across a network await, which is
/// what keeps the save-cycle transitions atomic.
#[derive(Debug, Default)]
pub struct DraftStore {
    slots: Mutex<HashMap<EntityId, DocumentSlot>>,
}

impl DraftStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a slot for `id` with its backend-loaded state.
    ///
    /// The initial state counts as synced: the document starts clean at
    /// version 0.
    pub fn open(&self, id: &EntityId, initial: Value) -> Result<(), DraftError> {
        let mut slots = self.lock();
        if slots.contains_key(id) {
            return Err(DraftError::AlreadyOpen(id.clone()));
        }
        slots.insert(id.clone(), DocumentSlot::new(initial));
        debug!(entity_id = %id, "Document opened");
        Ok(())
    }

    /// Discards the slot for `id`, if present.
    ///
    /// Any outstanding acknowledgment for the entity is ignored afterwards.
    pub fn close(&self, id: &EntityId) {
        self.lock().remove(id);
    }

    /// Merges `patch` into the local state and returns the merged document.
    ///
    /// Marks the document dirty. If a save is in flight, the pending-resave
    /// flag is set so the edit is captured by a follow-up cycle. The merged
    /// state is returned synchronously for optimistic rendering.
    pub fn update(&self, id: &EntityId, patch: &Value) -> Result<Value, DraftError> {
        let mut slots = self.lock();
        let slot = Self::slot_mut(&mut slots, id)?;

        merge_patch(&mut slot.local_state, patch);
        slot.dirty = true;
        if slot.save_in_flight() {
            slot.pending_resave = true;
        }
        Ok(slot.local_state.clone())
    }

    /// Attempts to begin a save cycle for `id`.
    ///
    /// - If a request is already outstanding, sets `pending_resave` and
    ///   returns [`SaveBegin::AlreadyInFlight`]; the caller must not issue a
    ///   second request.
    /// - If the document is clean, returns [`SaveBegin::Clean`].
    /// - Otherwise records the current local state as the in-flight snapshot,
    ///   clears `pending_resave`, and returns the snapshot to persist.
    pub fn begin_save(&self, id: &EntityId) -> Result<SaveBegin, DraftError> {
        let mut slots = self.lock();
        let slot = Self::slot_mut(&mut slots, id)?;

        if slot.save_in_flight() {
            slot.pending_resave = true;
            return Ok(SaveBegin::AlreadyInFlight);
        }
        if !slot.dirty {
            return Ok(SaveBegin::Clean);
        }

        let snapshot = slot.local_state.clone();
        slot.in_flight_snapshot = Some(snapshot.clone());
        slot.pending_resave = false;
        Ok(SaveBegin::Snapshot(snapshot))
    }

    /// Records a successful acknowledgment of the in-flight snapshot.
    ///
    /// The snapshot becomes the synced state and the version counter
    /// advances. The document is only marked clean if the local state still
    /// equals the acknowledged snapshot; otherwise edits arrived mid-flight
    /// and `pending_resave` stays set.
    ///
    /// Returns true when a follow-up save cycle is required.
    pub fn mark_save_succeeded(&self, id: &EntityId) -> Result<bool, DraftError> {
        let mut slots = self.lock();
        let slot = Self::slot_mut(&mut slots, id)?;

        let snapshot = match slot.in_flight_snapshot.take() {
            Some(s) => s,
            None => {
                // Acknowledgment for a slot with no recorded request; the
                // document was closed and reopened mid-flight. Ignore.
                warn!(entity_id = %id, "Dropping save acknowledgment with no in-flight snapshot");
                return Ok(false);
            }
        };

        slot.synced_version += 1;
        slot.last_saved_at = Some(Utc::now());
        slot.last_save_error = None;

        if slot.local_state == snapshot {
            slot.dirty = false;
            slot.pending_resave = false;
        } else {
            // Edits landed between send and acknowledgment.
            slot.pending_resave = true;
        }
        slot.synced_state = snapshot;

        debug!(
            entity_id = %id,
            synced_version = slot.synced_version,
            pending_resave = slot.pending_resave,
            "Save acknowledged"
        );
        Ok(slot.pending_resave)
    }

    /// Records a failed save attempt.
    ///
    /// The document stays dirty and the error is surfaced for the UI. No
    /// retry is scheduled here: recovery is driven by the next edit or an
    /// explicit manual save, so a persistently broken connection cannot
    /// cause a retry storm.
    pub fn mark_save_failed(&self, id: &EntityId, error: String) -> Result<(), DraftError> {
        let mut slots = self.lock();
        let slot = Self::slot_mut(&mut slots, id)?;

        slot.in_flight_snapshot = None;
        slot.pending_resave = false;
        slot.dirty = true;
        warn!(entity_id = %id, error = %error, "Save failed");
        slot.last_save_error = Some(error);
        Ok(())
    }

    /// Returns the observable draft state for `id`, or `None` if unopened.
    pub fn draft_state(&self, id: &EntityId) -> Option<DraftState> {
        self.lock().get(id).map(DocumentSlot::draft_state)
    }

    /// Returns a clone of the current local document for `id`.
    pub fn local_state(&self, id: &EntityId) -> Option<Value> {
        self.lock().get(id).map(|slot| slot.local_state.clone())
    }

    /// Returns true if the document exists and has unsaved edits.
    pub fn is_dirty(&self, id: &EntityId) -> bool {
        self.lock().get(id).is_some_and(|slot| slot.dirty)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<EntityId, DocumentSlot>> {
        self.slots.lock().expect("draft store poisoned")
    }

    fn slot_mut<'a>(
        slots: &'a mut HashMap<EntityId, DocumentSlot>,
        id: &EntityId,
    ) -> Result<&'a mut DocumentSlot, DraftError> {
        slots
            .get_mut(id)
            .ok_or_else(|| DraftError::UnknownDocument(id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store_with(id: &EntityId, initial: Value) -> DraftStore {
        let store = DraftStore::new();
        store.open(id, initial).unwrap();
        store
    }

    #[test]
    fn test_open_twice_is_rejected() {
        let id = EntityId::new("page-1");
        let store = store_with(&id, json!({}));
        assert_eq!(
            store.open(&id, json!({})),
            Err(DraftError::AlreadyOpen(id.clone()))
        );
    }

    #[test]
    fn test_update_unknown_document_is_an_error() {
        let store = DraftStore::new();
        let id = EntityId::new("nope");
        assert_eq!(
            store.update(&id, &json!({"a": 1})),
            Err(DraftError::UnknownDocument(id.clone()))
        );
    }

    #[test]
    fn test_update_marks_dirty_and_returns_merged_state() {
        let id = EntityId::new("page-1");
        let store = store_with(&id, json!({"title": "Home"}));

        let merged = store.update(&id, &json!({"body": "text"})).unwrap();
        assert_eq!(merged, json!({"title": "Home", "body": "text"}));
        assert!(store.is_dirty(&id));
    }

    #[test]
    fn test_begin_save_on_clean_document() {
        let id = EntityId::new("page-1");
        let store = store_with(&id, json!({}));
        assert_eq!(store.begin_save(&id).unwrap(), SaveBegin::Clean);
    }

    #[test]
    fn test_begin_save_snapshots_dirty_document() {
        let id = EntityId::new("page-1");
        let store = store_with(&id, json!({}));
        store.update(&id, &json!({"a": 1})).unwrap();

        match store.begin_save(&id).unwrap() {
            SaveBegin::Snapshot(snapshot) => assert_eq!(snapshot, json!({"a": 1})),
            other => panic!("expected snapshot, got {:?}", other),
        }
        assert!(store.draft_state(&id).unwrap().save_in_flight);
    }

    #[test]
    fn test_second_begin_save_sets_pending_resave() {
        let id = EntityId::new("page-1");
        let store = store_with(&id, json!({}));
        store.update(&id, &json!({"a": 1})).unwrap();

        assert!(matches!(
            store.begin_save(&id).unwrap(),
            SaveBegin::Snapshot(_)
        ));
        assert_eq!(store.begin_save(&id).unwrap(), SaveBegin::AlreadyInFlight);
        assert!(store.draft_state(&id).unwrap().pending_resave);
    }

    #[test]
    fn test_ack_with_unchanged_state_marks_clean() {
        let id = EntityId::new("page-1");
        let store = store_with(&id, json!({}));
        store.update(&id, &json!({"a": 1})).unwrap();
        store.begin_save(&id).unwrap();

        let resave = store.mark_save_succeeded(&id).unwrap();
        assert!(!resave);

        let state = store.draft_state(&id).unwrap();
        assert!(!state.dirty);
        assert!(!state.save_in_flight);
        assert_eq!(state.synced_version, 1);
        assert!(state.last_saved_at.is_some());
        assert!(state.last_save_error.is_none());
    }

    #[test]
    fn test_ack_after_midflight_edit_requests_resave() {
        let id = EntityId::new("page-1");
        let store = store_with(&id, json!({}));
        store.update(&id, &json!({"a": 1})).unwrap();
        store.begin_save(&id).unwrap();

        // Edit lands while the request is outstanding.
        store.update(&id, &json!({"a": 2})).unwrap();

        let resave = store.mark_save_succeeded(&id).unwrap();
        assert!(resave);

        let state = store.draft_state(&id).unwrap();
        assert!(state.dirty);
        assert!(state.pending_resave);
        assert_eq!(state.synced_version, 1);
    }

    #[test]
    fn test_failed_save_keeps_dirty_and_records_error() {
        let id = EntityId::new("page-1");
        let store = store_with(&id, json!({}));
        store.update(&id, &json!({"a": 1})).unwrap();
        store.begin_save(&id).unwrap();

        store
            .mark_save_failed(&id, "connection reset".to_string())
            .unwrap();

        let state = store.draft_state(&id).unwrap();
        assert!(state.dirty);
        assert!(!state.save_in_flight);
        assert!(!state.pending_resave);
        assert_eq!(state.last_save_error.as_deref(), Some("connection reset"));
        assert_eq!(state.synced_version, 0);
    }

    #[test]
    fn test_success_clears_previous_error() {
        let id = EntityId::new("page-1");
        let store = store_with(&id, json!({}));
        store.update(&id, &json!({"a": 1})).unwrap();
        store.begin_save(&id).unwrap();
        store.mark_save_failed(&id, "boom".to_string()).unwrap();

        store.update(&id, &json!({"a": 2})).unwrap();
        store.begin_save(&id).unwrap();
        store.mark_save_succeeded(&id).unwrap();

        let state = store.draft_state(&id).unwrap();
        assert!(state.last_save_error.is_none());
        assert!(!state.dirty);
    }

    #[test]
    fn test_ack_after_close_is_ignored() {
        let id = EntityId::new("page-1");
        let store = store_with(&id, json!({}));
        store.update(&id, &json!({"a": 1})).unwrap();
        store.begin_save(&id).unwrap();

        store.close(&id);
        store.open(&id, json!({})).unwrap();

        // The reopened slot has no in-flight snapshot; the stale ack is a
        // no-op rather than a spurious version bump.
        let resave = store.mark_save_succeeded(&id).unwrap();
        assert!(!resave);
        assert_eq!(store.draft_state(&id).unwrap().synced_version, 0);
    }
}
