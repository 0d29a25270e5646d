//! Per-key debounce scheduling.
//!
//! Collapses bursts of triggers into a single deferred action: an action
//! scheduled for a key runs only after the key has been quiet for the
//! configured delay. Rescheduling before the delay elapses cancels the
//! pending timer and arms a new one with the new action (last call wins).
//!
//! This is pure timing plumbing with no failure modes of its own. Autosave
//! uses it to coalesce keystrokes; debounced analysis triggers (SEO scoring
//! after edits) can share the same scheduler under a different key space.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use sitesync::debounce::DebounceScheduler;
//!
//! let scheduler: DebounceScheduler<String> = DebounceScheduler::new();
//! scheduler.schedule("page-1".to_string(), Duration::from_secs(2), async {
//!     // runs 2s after the last schedule() call for "page-1"
//! });
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::trace;

/// A pending timer for one key.
struct PendingTimer {
    /// Generation at the time the timer was armed. A fired timer only
    /// removes its own map entry if the generation still matches, so it
    /// never clobbers a newer timer armed for the same key.
    generation: u64,
    handle: JoinHandle<()>,
}

/// Last-call-wins deferred execution, keyed by `K`.
///
/// Cloning the scheduler is cheap; all clones share the same timer table.
pub struct DebounceScheduler<K> {
    timers: Arc<Mutex<HashMap<K, PendingTimer>>>,
}

impl<K> Clone for DebounceScheduler<K> {
    fn clone(&self) -> Self {
        Self {
            timers: Arc::clone(&self.timers),
        }
    }
}

impl<K> Default for DebounceScheduler<K>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> DebounceScheduler<K>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    /// Creates an empty scheduler.
    pub fn new() -> Self {
        Self {
            timers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Registers `action` to run after `delay` of quiescence for `key`.
    ///
    /// Any pending timer for the same key is cancelled without firing; the
    /// new action replaces it. The action never runs synchronously with this
    /// call, even for a zero delay.
    pub fn schedule<F>(&self, key: K, delay: Duration, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let timers = Arc::clone(&self.timers);
        let task_key = key.clone();

        let mut guard = self.timers.lock().expect("debounce timer table poisoned");
        let generation = guard.get(&key).map_or(0, |t| t.generation.wrapping_add(1));

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            // Deregister before running so the action itself may reschedule.
            {
                let mut guard = timers.lock().expect("debounce timer table poisoned");
                let still_armed = guard
                    .get(&task_key)
                    .is_some_and(|t| t.generation == generation);
                if !still_armed {
                    return;
                }
                guard.remove(&task_key);
            }

            action.await;
        });

        if let Some(previous) = guard.insert(key, PendingTimer { generation, handle }) {
            trace!("Debounce timer rearmed, cancelling previous");
            previous.handle.abort();
        }
    }

    /// Clears a pending timer for `key` without firing it.
    ///
    /// No-op if nothing is scheduled for the key.
    pub fn cancel(&self, key: &K) {
        let removed = {
            let mut guard = self.timers.lock().expect("debounce timer table poisoned");
            guard.remove(key)
        };
        if let Some(timer) = removed {
            timer.handle.abort();
        }
    }

    /// Returns true if a timer is currently armed for `key`.
    pub fn is_scheduled(&self, key: &K) -> bool {
        self.timers
            .lock()
            .expect("debounce timer table poisoned")
            .contains_key(key)
    }
}
