//! Subscription entry with a persistence hook around it.

use crate::error::Result;
use crate::snapshot::Snapshot;
use std::sync::Arc;

use super::subscription::{Entry, SubscriptionEntry};

/// Persists a value across a save/restore boundary.
pub trait PersistenceDelegate: Send + Sync {
    /// Seed state from a previous session. `None` means nothing was saved.
    fn restore(&self, snapshot: Option<&Snapshot>) -> Result<()>;

    /// Snapshot the current state. Empty when there is nothing to keep.
    fn capture(&self) -> Result<Snapshot>;
}

/// An [`Entry`] whose state survives a restart.
///
/// Callers restore before the first activation of a session and capture
/// after (or instead of) the last deactivation.
pub trait PersistentEntry: Entry {
    fn restore(&self, snapshot: Option<&Snapshot>) -> Result<()>;

    fn capture(&self) -> Result<Snapshot>;
}

/// A [`SubscriptionEntry`] paired with the delegate that persists what the
/// subscription delivers.
pub struct ExtendedSubscriptionEntry {
    inner: SubscriptionEntry,
    delegate: Arc<dyn PersistenceDelegate>,
}

impl ExtendedSubscriptionEntry {
    pub fn new(inner: SubscriptionEntry, delegate: Arc<dyn PersistenceDelegate>) -> Self {
        Self { inner, delegate }
    }

    /// Detach, then capture the final cached value.
    pub fn deactivate_and_capture(&self) -> Result<Snapshot> {
        self.inner.deactivate();
        self.delegate.capture()
    }
}

impl Entry for ExtendedSubscriptionEntry {
    fn activate(&self) {
        self.inner.activate()
    }

    fn deactivate(&self) {
        self.inner.deactivate()
    }

    fn is_active(&self) -> bool {
        self.inner.is_active()
    }
}

impl PersistentEntry for ExtendedSubscriptionEntry {
    fn restore(&self, snapshot: Option<&Snapshot>) -> Result<()> {
        self.delegate.restore(snapshot)
    }

    fn capture(&self) -> Result<Snapshot> {
        self.delegate.capture()
    }
}
