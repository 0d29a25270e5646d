//! Per-entity document slot and JSON merge semantics.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Observable draft state for one entity, as exposed to the UI layer.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftState {
    /// True when local edits have diverged from the last acknowledged
    /// snapshot.
    pub dirty: bool,

    /// True while a persistence request is outstanding.
    pub save_in_flight: bool,

    /// True when edits arrived during an in-flight save; a follow-up save
    /// cycle will run once the current one resolves.
    pub pending_resave: bool,

    /// Logical version of the last acknowledged snapshot. Starts at 0 and
    /// increments per successful save.
    pub synced_version: u64,

    /// Wall-clock time of the last successful save, if any.
    pub last_saved_at: Option<DateTime<Utc>>,

    /// Message of the last failed save, cleared by the next success.
    pub last_save_error: Option<String>,
}

/// Outcome of attempting to begin a save cycle for a document.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveBegin {
    /// A save was started; persist exactly this snapshot.
    Snapshot(Value),

    /// A request is already outstanding. The pending-resave flag has been
    /// set; no second request may be issued.
    AlreadyInFlight,

    /// Nothing to save: the document matches its synced snapshot.
    Clean,
}

/// Internal state slot for one editable entity.
#[derive(Debug, Clone)]
pub(crate) struct DocumentSlot {
    /// Current in-memory document.
    pub local_state: Value,

    /// Last snapshot acknowledged by the backend.
    pub synced_state: Value,

    /// Logical version counter for `synced_state`.
    pub synced_version: u64,

    /// The exact snapshot currently in flight, if any.
    pub in_flight_snapshot: Option<Value>,

    pub dirty: bool,
    pub pending_resave: bool,
    pub last_saved_at: Option<DateTime<Utc>>,
    pub last_save_error: Option<String>,
}

impl DocumentSlot {
    pub fn new(initial: Value) -> Self {
        Self {
            local_state: initial.clone(),
            synced_state: initial,
            synced_version: 0,
            in_flight_snapshot: None,
            dirty: false,
            pending_resave: false,
            last_saved_at: None,
            last_save_error: None,
        }
    }

    pub fn save_in_flight(&self) -> bool {
        self.in_flight_snapshot.is_some()
    }

    pub fn draft_state(&self) -> DraftState {
        DraftState {
            dirty: self.dirty,
            save_in_flight: self.save_in_flight(),
            pending_resave: self.pending_resave,
            synced_version: self.synced_version,
            last_saved_at: self.last_saved_at,
            last_save_error: self.last_save_error.clone(),
        }
    }
}

/// Applies a JSON merge patch (RFC 7396 semantics) to `target`.
///
/// Object patches merge recursively; a `null` member removes the key; any
/// non-object patch replaces the target wholesale.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    match patch {
        Value::Object(entries) => {
            if !target.is_object() {
                *target = Value::Object(Map::new());
            }
            let obj = target.as_object_mut().expect("target coerced to object");
            for (key, member) in entries {
                if member.is_null() {
                    obj.remove(key);
                } else {
                    merge_patch(obj.entry(key.clone()).or_insert(Value::Null), member);
                }
            }
        }
        _ => *target = patch.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_patch_adds_and_overwrites() {
        let mut doc = json!({"title": "Home", "body": "old"});
        merge_patch(&mut doc, &json!({"body": "new", "slug": "home"}));
        assert_eq!(doc, json!({"title": "Home", "body": "new", "slug": "home"}));
    }

    #[test]
    fn test_merge_patch_recurses_into_objects() {
        let mut doc = json!({"seo": {"title": "a", "description": "b"}});
        merge_patch(&mut doc, &json!({"seo": {"title": "c"}}));
        assert_eq!(doc, json!({"seo": {"title": "c", "description": "b"}}));
    }

    #[test]
    fn test_merge_patch_null_removes_key() {
        let mut doc = json!({"title": "Home", "draft_note": "wip"});
        merge_patch(&mut doc, &json!({"draft_note": null}));
        assert_eq!(doc, json!({"title": "Home"}));
    }

    #[test]
    fn test_merge_patch_non_object_replaces() {
        let mut doc = json!({"sections": [1, 2]});
        merge_patch(&mut doc, &json!({"sections": [3]}));
        assert_eq!(doc, json!({"sections": [3]}));

        let mut scalar = json!({"a": 1});
        merge_patch(&mut scalar, &json!("flat"));
        assert_eq!(scalar, json!("flat"));
    }

    #[test]
    fn test_new_slot_is_clean() {
        let slot = DocumentSlot::new(json!({"a": 1}));
        let state = slot.draft_state();
        assert!(!state.dirty);
        assert!(!state.save_in_flight);
        assert!(!state.pending_resave);
        assert_eq!(state.synced_version, 0);
        assert!(state.last_saved_at.is_none());
        assert!(state.last_save_error.is_none());
    }
}
