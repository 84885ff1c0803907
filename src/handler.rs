//! Caller-facing factories that turn a stream into an owner binder.
//!
//! ```ignore
//! let handler = LifecycleHandler::new(HandlerConfig::default());
//! let binder = handler.observe(subject.clone());
//! binder.bind(&owner, Callbacks::new(|value| println!("{value}")));
//! ```

use crate::entry::{
    CachedValue, Entry, ExtendedSubscriptionEntry, PersistenceDelegate, PersistentEntry,
    SubscriptionEntry,
};
use crate::error::Result;
use crate::lifecycle::{LifecycleOwner, SavedStateOwner};
use crate::observer::{ExtendedLifecycleBoundObserver, LifecycleBoundObserver};
use crate::stream::{Callbacks, Source};
use crate::types::LifeSpan;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;

/// Configuration shared by every binder a handler creates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerConfig {
    /// Window during which bound entries stay subscribed.
    pub life_span: LifeSpan,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            life_span: LifeSpan::Started,
        }
    }
}

/// Creates binders for plain lifecycle-bound subscriptions.
#[derive(Clone, Debug, Default)]
pub struct LifecycleHandler {
    config: HandlerConfig,
}

impl LifecycleHandler {
    pub fn new(config: HandlerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// Prepare `source` for binding. Each call gets its own observer.
    pub fn observe<T, S>(&self, source: S) -> Binder<T>
    where
        S: Source<T> + 'static,
        T: 'static,
    {
        Binder {
            source: Arc::new(source),
            observer: LifecycleBoundObserver::new(self.config.life_span),
        }
    }
}

/// A stream waiting for an owner.
pub struct Binder<T> {
    source: Arc<dyn Source<T>>,
    observer: Arc<LifecycleBoundObserver>,
}

impl<T: 'static> Binder<T> {
    /// Bind to `owner`, delivering into `callbacks` while the owner is inside
    /// the configured life span.
    ///
    /// Binding again replaces the previous entry on this binder's observer.
    pub fn bind(
        &self,
        owner: &Arc<dyn LifecycleOwner>,
        callbacks: Callbacks<T>,
    ) -> Arc<SubscriptionEntry> {
        let entry = Arc::new(SubscriptionEntry::from_source(
            Arc::clone(&self.source),
            callbacks,
        ));
        let bound: Arc<dyn Entry> = entry.clone();
        self.observer.register(owner, bound);
        entry
    }

    pub fn observer(&self) -> &Arc<LifecycleBoundObserver> {
        &self.observer
    }
}

/// Creates binders whose entries persist through the owner's saved state.
#[derive(Clone, Debug, Default)]
pub struct ExtendedLifecycleHandler {
    config: HandlerConfig,
}

impl ExtendedLifecycleHandler {
    pub fn new(config: HandlerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// Prepare `source` for binding, persisted by `delegate` under `key`.
    ///
    /// The delegate only sees what the caller routes to it; see
    /// [`observe_cached`](Self::observe_cached) for the common case. An empty
    /// key disables persistence.
    pub fn observe<T, S>(
        &self,
        source: S,
        delegate: Arc<dyn PersistenceDelegate>,
        key: impl Into<String>,
    ) -> ExtendedBinder<T>
    where
        S: Source<T> + 'static,
        T: 'static,
    {
        ExtendedBinder {
            source: Arc::new(source),
            delegate,
            tap: None,
            observer: ExtendedLifecycleBoundObserver::new(self.config.life_span, key),
        }
    }

    /// Like [`observe`](Self::observe), caching the last delivered value and
    /// persisting it.
    pub fn observe_cached<T, S>(
        &self,
        source: S,
        key: impl Into<String>,
    ) -> (ExtendedBinder<T>, Arc<CachedValue<T>>)
    where
        S: Source<T> + 'static,
        T: Any + Clone + Send + Sync,
    {
        let cache = Arc::new(CachedValue::new());
        let delegate: Arc<dyn PersistenceDelegate> = cache.clone();
        let mut binder = self.observe(source, delegate, key);

        let tap_cache = Arc::clone(&cache);
        binder.tap = Some(Arc::new(move |value: &T| tap_cache.store(value.clone())));
        (binder, cache)
    }
}

type TapFn<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// A persisted stream waiting for an owner.
pub struct ExtendedBinder<T> {
    source: Arc<dyn Source<T>>,
    delegate: Arc<dyn PersistenceDelegate>,
    tap: Option<TapFn<T>>,
    observer: Arc<ExtendedLifecycleBoundObserver>,
}

impl<T: 'static> ExtendedBinder<T> {
    /// Bind to `owner`. Fails when another provider already uses this
    /// binder's key, or when restoring an already-started owner fails.
    pub fn bind(
        &self,
        owner: &Arc<dyn SavedStateOwner>,
        callbacks: Callbacks<T>,
    ) -> Result<Arc<ExtendedSubscriptionEntry>> {
        let callbacks = match &self.tap {
            Some(tap) => {
                let tap = Arc::clone(tap);
                callbacks.inspect(move |value| tap(value))
            }
            None => callbacks,
        };
        let inner = SubscriptionEntry::from_source(Arc::clone(&self.source), callbacks);
        let entry = Arc::new(ExtendedSubscriptionEntry::new(
            inner,
            Arc::clone(&self.delegate),
        ));
        let bound: Arc<dyn PersistentEntry> = entry.clone();
        self.observer.register(owner, bound)?;
        Ok(entry)
    }

    pub fn observer(&self) -> &Arc<ExtendedLifecycleBoundObserver> {
        &self.observer
    }

    pub fn key(&self) -> &str {
        self.observer.key()
    }
}
