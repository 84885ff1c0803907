//! Capabilities an owner exposes to the binding layer.

use crate::error::Result;
use crate::snapshot::Snapshot;
use crate::types::{LifecycleEvent, LifecycleState, ObserverId};
use std::sync::Arc;

/// Receives an owner's lifecycle transitions.
pub trait LifecycleObserver: Send + Sync {
    /// Handle one transition. Called serially, in the order the owner moves.
    fn on_event(&self, event: LifecycleEvent) -> Result<()>;
}

/// Component whose lifecycle gates subscriptions.
pub trait LifecycleOwner: Send + Sync {
    /// Live state, already updated when an event is dispatched.
    fn current_state(&self) -> LifecycleState;

    /// Start delivering transitions to `observer`.
    ///
    /// Past transitions are not replayed.
    fn add_observer(&self, observer: Arc<dyn LifecycleObserver>) -> ObserverId;

    /// Stop delivering transitions. Returns false if `id` was not registered.
    fn remove_observer(&self, id: ObserverId) -> bool;
}

/// Produces the state saved for one key when the owner saves its state.
pub trait SavedStateProvider: Send + Sync {
    fn save_state(&self) -> Result<Snapshot>;
}

/// Owner that can persist snapshots across a restart.
pub trait SavedStateOwner: LifecycleOwner {
    /// Hand out the snapshot restored for `key`, at most once.
    fn consume_restored_state(&self, key: &str) -> Option<Snapshot>;

    /// Ask `provider` for its snapshot whenever the owner saves state.
    fn register_state_provider(
        &self,
        key: &str,
        provider: Arc<dyn SavedStateProvider>,
    ) -> Result<()>;

    fn unregister_state_provider(&self, key: &str);
}
