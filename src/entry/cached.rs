//! Last-write-wins holder for the most recent stream value.

use crate::error::Result;
use crate::snapshot::{codec, Snapshot};
use parking_lot::Mutex;
use std::any::Any;

use super::extended::PersistenceDelegate;

/// Key the cached value is stored under inside its own snapshot.
pub const CACHED_VALUE_KEY: &str = "cached_value";

/// Single-slot cache. Writes may come from any thread.
pub struct CachedValue<T> {
    slot: Mutex<Option<T>>,
    key: &'static str,
}

impl<T: Clone> CachedValue<T> {
    pub fn new() -> Self {
        Self::with_key(CACHED_VALUE_KEY)
    }

    /// Cache persisted under `key` instead of [`CACHED_VALUE_KEY`].
    pub fn with_key(key: &'static str) -> Self {
        Self {
            slot: Mutex::new(None),
            key,
        }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn store(&self, value: T) {
        *self.slot.lock() = Some(value);
    }

    pub fn get(&self) -> Option<T> {
        self.slot.lock().clone()
    }

    pub fn has_value(&self) -> bool {
        self.slot.lock().is_some()
    }
}

impl<T: Clone> Default for CachedValue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CachedValue<T>
where
    T: Any + Clone + Send,
{
    /// Seed the cache from `snapshot` and return the value read, if any.
    ///
    /// A missing snapshot means there is no prior value.
    pub fn restore_value(&self, snapshot: Option<&Snapshot>) -> Result<Option<T>> {
        let Some(snapshot) = snapshot else {
            return Ok(None);
        };

        let value = codec::get::<T>(snapshot, self.key)?;
        if let Some(value) = &value {
            self.store(value.clone());
        }
        tracing::debug!(key = self.key, restored = value.is_some(), "cache.restore");
        Ok(value)
    }
}

impl<T> PersistenceDelegate for CachedValue<T>
where
    T: Any + Clone + Send,
{
    fn restore(&self, snapshot: Option<&Snapshot>) -> Result<()> {
        self.restore_value(snapshot).map(|_| ())
    }

    /// Empty unless a value was ever cached.
    fn capture(&self) -> Result<Snapshot> {
        let mut snapshot = Snapshot::new();
        if let Some(value) = self.get() {
            codec::put(&mut snapshot, self.key, &value)?;
        }
        tracing::debug!(key = self.key, captured = !snapshot.is_empty(), "cache.capture");
        Ok(snapshot)
    }
}
