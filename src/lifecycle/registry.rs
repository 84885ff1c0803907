//! Reference owner that drives lifecycle states and saves state by key.

use crate::error::{LifecycleError, Result};
use crate::snapshot::Snapshot;
use crate::types::{LifecycleEvent, LifecycleState, ObserverId};
use parking_lot::{Mutex, RwLock};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::owner::{LifecycleObserver, LifecycleOwner, SavedStateOwner, SavedStateProvider};

/// An owner whose state is moved explicitly.
///
/// Moving across several states dispatches every intermediate event, one at a
/// time, with the state already set to the event's target. `Destroyed` is
/// absorbing: later moves are ignored.
pub struct LifecycleRegistry {
    state: RwLock<LifecycleState>,
    /// Registered observers, in registration order.
    observers: RwLock<Vec<(ObserverId, Arc<dyn LifecycleObserver>)>>,
    /// Counter for generating observer IDs.
    next_id: AtomicU64,
    providers: Mutex<BTreeMap<String, Arc<dyn SavedStateProvider>>>,
    /// State handed over from the previous session, not yet consumed.
    restored: Mutex<Option<Snapshot>>,
}

impl LifecycleRegistry {
    /// Create an owner in `Initialized` with nothing to restore.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(LifecycleState::Initialized),
            observers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            providers: Mutex::new(BTreeMap::new()),
            restored: Mutex::new(None),
        }
    }

    /// Create an owner restoring `snapshot`, as produced by [`Self::save_state`].
    pub fn with_restored_state(snapshot: Snapshot) -> Self {
        let registry = Self::new();
        *registry.restored.lock() = Some(snapshot);
        registry
    }

    /// Move to the target state of `event`.
    pub fn handle_event(&self, event: LifecycleEvent) -> Result<()> {
        self.move_to(event.target_state())
    }

    /// Step towards `target`, dispatching each event on the way.
    ///
    /// Observers that fail do not stop dispatch; the first error is returned.
    pub fn move_to(&self, target: LifecycleState) -> Result<()> {
        let mut first_error = None;

        loop {
            let current = self.current_state();
            if current == target {
                break;
            }
            if current.is_terminal() {
                tracing::debug!(to = ?target, "lifecycle.move.after_destroy");
                break;
            }
            if target == LifecycleState::Initialized {
                return Err(LifecycleError::InvalidTransition {
                    from: current,
                    to: target,
                });
            }

            let next = if target > current {
                LifecycleEvent::up_from(current)
            } else {
                LifecycleEvent::down_from(current)
            };
            let Some(event) = next else {
                break;
            };

            *self.state.write() = event.target_state();
            if let Err(e) = self.dispatch(event) {
                first_error.get_or_insert(e);
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Collect the snapshot of every provider, each nested under its key.
    ///
    /// Restored entries nobody consumed are carried over.
    pub fn save_state(&self) -> Result<Snapshot> {
        let mut saved = self.restored.lock().clone().unwrap_or_default();

        let providers: Vec<_> = self
            .providers
            .lock()
            .iter()
            .map(|(key, provider)| (key.clone(), Arc::clone(provider)))
            .collect();

        for (key, provider) in providers {
            let snapshot = provider.save_state()?;
            tracing::debug!(key = %key, entries = snapshot.len(), "lifecycle.save_state");
            saved.put_snapshot(key, snapshot);
        }

        Ok(saved)
    }

    /// Get observer count.
    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }

    pub fn provider_count(&self) -> usize {
        self.providers.lock().len()
    }

    fn is_registered(&self, id: ObserverId) -> bool {
        self.observers.read().iter().any(|(other, _)| *other == id)
    }

    fn dispatch(&self, event: LifecycleEvent) -> Result<()> {
        // Dispatch outside the lock so observers may add or remove themselves.
        let observers = self.observers.read().clone();
        let mut first_error = None;

        for (id, observer) in observers {
            // Skip observers removed earlier in this dispatch
            if !self.is_registered(id) {
                continue;
            }
            if let Err(e) = observer.on_event(event) {
                tracing::warn!(observer = %id, event = ?event, error = %e, "lifecycle.dispatch.failed");
                first_error.get_or_insert(e);
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}

impl Default for LifecycleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleOwner for LifecycleRegistry {
    fn current_state(&self) -> LifecycleState {
        *self.state.read()
    }

    fn add_observer(&self, observer: Arc<dyn LifecycleObserver>) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.observers.write().push((id, observer));
        tracing::debug!(observer = %id, "lifecycle.observer.add");
        id
    }

    fn remove_observer(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(other, _)| *other != id);
        let removed = observers.len() != before;
        if removed {
            tracing::debug!(observer = %id, "lifecycle.observer.remove");
        }
        removed
    }
}

impl SavedStateOwner for LifecycleRegistry {
    fn consume_restored_state(&self, key: &str) -> Option<Snapshot> {
        self.restored
            .lock()
            .as_mut()
            .and_then(|restored| restored.take_snapshot(key))
    }

    fn register_state_provider(
        &self,
        key: &str,
        provider: Arc<dyn SavedStateProvider>,
    ) -> Result<()> {
        match self.providers.lock().entry(key.to_string()) {
            Entry::Occupied(_) => Err(LifecycleError::DuplicateStateKey(key.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(provider);
                Ok(())
            }
        }
    }

    fn unregister_state_provider(&self, key: &str) {
        self.providers.lock().remove(key);
    }
}
