//! Emitters that hand out owner binders instead of their emit side.

use crate::entry::{CachedValue, PersistenceDelegate};
use crate::error::{Result, StreamError};
use crate::handler::{Binder, ExtendedBinder, ExtendedLifecycleHandler, LifecycleHandler};
use crate::snapshot::Snapshot;
use crate::stream::Subject;
use std::any::Any;
use std::sync::Arc;

/// Key a [`PersistentSubject`] stores its cached value under, inside the
/// snapshot nested at the subject's own key.
pub const EXTENDED_LIFECYCLE_AWARE_KEY: &str = "EXTENDED_LIFECYCLE_AWARE_KEY";

/// Something many owners can observe, each through its own binder.
pub trait LifecycleAware<T> {
    fn observe(&self) -> Binder<T>;
}

/// Like [`LifecycleAware`], with the value surviving a save/restore cycle.
pub trait ExtendedLifecycleAware<T> {
    fn observe(&self) -> ExtendedBinder<T>;

    /// Saved-state key the binders persist under.
    fn key(&self) -> &str;
}

/// A [`Subject`] wrapped for lifecycle-bound observation.
pub struct SubjectLifecycleAware<T> {
    subject: Subject<T>,
    handler: LifecycleHandler,
}

impl<T> SubjectLifecycleAware<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(subject: Subject<T>, handler: LifecycleHandler) -> Self {
        Self { subject, handler }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subject.subscriber_count()
    }
}

impl<T> LifecycleAware<T> for SubjectLifecycleAware<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn observe(&self) -> Binder<T> {
        self.handler.observe(self.subject.clone())
    }
}

struct PersistentState<T> {
    subject: Subject<T>,
    cache: CachedValue<T>,
}

impl<T> PersistenceDelegate for PersistentState<T>
where
    T: Any + Clone + Send + Sync,
{
    fn restore(&self, snapshot: Option<&Snapshot>) -> Result<()> {
        if let Some(value) = self.cache.restore_value(snapshot)? {
            self.subject.emit(value);
        }
        Ok(())
    }

    fn capture(&self) -> Result<Snapshot> {
        self.cache.capture()
    }
}

/// A subject that remembers the last value emitted through it and persists
/// that value through every owner it is bound to.
///
/// Restoring re-emits the saved value, so with a
/// [`behavior`](Subject::behavior) subject the first subscriber of the new
/// session receives it before anything else.
pub struct PersistentSubject<T> {
    state: Arc<PersistentState<T>>,
    handler: ExtendedLifecycleHandler,
    key: String,
}

impl<T> PersistentSubject<T>
where
    T: Any + Clone + Send + Sync,
{
    pub fn new(subject: Subject<T>, handler: ExtendedLifecycleHandler, key: impl Into<String>) -> Self {
        Self {
            state: Arc::new(PersistentState {
                subject,
                cache: CachedValue::with_key(EXTENDED_LIFECYCLE_AWARE_KEY),
            }),
            handler,
            key: key.into(),
        }
    }

    /// Cache `value`, then deliver it to current subscribers.
    pub fn emit(&self, value: T) {
        self.state.cache.store(value.clone());
        self.state.subject.emit(value);
    }

    pub fn error(&self, error: StreamError) {
        self.state.subject.error(error);
    }

    pub fn complete(&self) {
        self.state.subject.complete();
    }

    /// Last value emitted or restored.
    pub fn cached(&self) -> Option<T> {
        self.state.cache.get()
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.subject.subscriber_count()
    }
}

impl<T> ExtendedLifecycleAware<T> for PersistentSubject<T>
where
    T: Any + Clone + Send + Sync,
{
    fn observe(&self) -> ExtendedBinder<T> {
        let delegate: Arc<dyn PersistenceDelegate> = self.state.clone();
        self.handler
            .observe(self.state.subject.clone(), delegate, self.key.clone())
    }

    fn key(&self) -> &str {
        &self.key
    }
}
