//! Lifecycle-bound observer that also restores and saves its entry's state.

use crate::entry::PersistentEntry;
use crate::error::Result;
use crate::lifecycle::{LifecycleObserver, SavedStateOwner, SavedStateProvider};
use crate::snapshot::Snapshot;
use crate::types::{LifeSpan, LifecycleEvent, ObserverId};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

use super::same_target;

struct Registration {
    owner: Weak<dyn SavedStateOwner>,
    entry: Arc<dyn PersistentEntry>,
    observer_id: Option<ObserverId>,
    /// Whether this entry has been restored for this registration.
    restored: bool,
    /// Whether this observer is the owner's saved-state provider for `key`.
    providing: bool,
}

struct Attached {
    owner: Arc<dyn SavedStateOwner>,
    entry: Arc<dyn PersistentEntry>,
    observer_id: ObserverId,
    restored: bool,
    providing: bool,
}

/// Same activation rules as [`LifecycleBoundObserver`](super::LifecycleBoundObserver),
/// plus persistence under `key`:
/// - right before the first activation of a registration, the entry is
///   restored from the owner's restored state for `key`
/// - whenever the owner saves state, the entry is captured under `key`
///
/// An empty key turns persistence off.
pub struct ExtendedLifecycleBoundObserver {
    this: Weak<Self>,
    span: LifeSpan,
    key: String,
    registration: Mutex<Option<Registration>>,
}

impl ExtendedLifecycleBoundObserver {
    pub fn new(span: LifeSpan, key: impl Into<String>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            span,
            key: key.into(),
            registration: Mutex::new(None),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn span(&self) -> LifeSpan {
        self.span
    }

    fn persists(&self) -> bool {
        !self.key.is_empty()
    }

    /// Bind `entry` to `owner`, restoring and activating it if the owner is
    /// already inside the life span.
    ///
    /// Registering again replaces the entry without deactivating the old one;
    /// the new entry gets its own restore.
    pub fn register(
        &self,
        owner: &Arc<dyn SavedStateOwner>,
        entry: Arc<dyn PersistentEntry>,
    ) -> Result<()> {
        if owner.current_state().is_terminal() {
            tracing::debug!(key = %self.key, "observer.register.destroyed_owner");
            return Ok(());
        }
        let Some(this) = self.this.upgrade() else {
            return Ok(());
        };

        let already_providing = self
            .registration
            .lock()
            .as_ref()
            .is_some_and(|r| r.providing && same_target(&r.owner, owner));
        if self.persists() && !already_providing {
            owner.register_state_provider(&self.key, this.clone())?;
        }

        let (attached, stale) = {
            let mut registration = self.registration.lock();
            let (attached, stale) = match registration.take() {
                Some(previous) if same_target(&previous.owner, owner) => {
                    (previous.observer_id, None)
                }
                Some(previous) => (None, Some(previous)),
                None => (None, None),
            };
            *registration = Some(Registration {
                owner: Arc::downgrade(owner),
                entry,
                observer_id: attached,
                restored: false,
                providing: self.persists(),
            });
            (attached, stale)
        };

        if let Some(stale) = stale {
            self.release(&stale.owner, stale.observer_id, stale.providing);
        }

        if attached.is_none() {
            let id = owner.add_observer(this);
            if let Some(registration) = self.registration.lock().as_mut() {
                registration.observer_id = Some(id);
            }
            tracing::debug!(observer = %id, key = %self.key, span = ?self.span, "observer.attach");
        }

        self.maybe_activate()
    }

    /// Deactivate the entry and detach from the owner.
    pub fn unregister(&self) {
        let Some(attached) = self.attached() else {
            return;
        };
        attached.entry.deactivate();
        self.detach(&attached);
    }

    pub fn is_attached(&self) -> bool {
        self.attached().is_some()
    }

    /// Capture the bound entry now. Empty when nothing is bound.
    pub fn capture(&self) -> Result<Snapshot> {
        let entry = self
            .registration
            .lock()
            .as_ref()
            .map(|registration| Arc::clone(&registration.entry));
        match entry {
            Some(entry) => entry.capture(),
            None => Ok(Snapshot::new()),
        }
    }

    fn attached(&self) -> Option<Attached> {
        let registration = self.registration.lock();
        let registration = registration.as_ref()?;
        Some(Attached {
            observer_id: registration.observer_id?,
            owner: registration.owner.upgrade()?,
            entry: Arc::clone(&registration.entry),
            restored: registration.restored,
            providing: registration.providing,
        })
    }

    fn maybe_activate(&self) -> Result<()> {
        let Some(attached) = self.attached() else {
            return Ok(());
        };
        if !attached
            .owner
            .current_state()
            .is_at_least(self.span.active_state())
        {
            return Ok(());
        }

        if !attached.restored {
            if self.persists() {
                let snapshot = attached.owner.consume_restored_state(&self.key);
                tracing::debug!(
                    key = %self.key,
                    found = snapshot.is_some(),
                    "observer.restore"
                );
                attached.entry.restore(snapshot.as_ref())?;
            }
            self.mark_restored(&attached.entry);
        }

        attached.entry.activate();
        Ok(())
    }

    fn mark_restored(&self, entry: &Arc<dyn PersistentEntry>) {
        if let Some(registration) = self.registration.lock().as_mut() {
            if Arc::ptr_eq(&registration.entry, entry) {
                registration.restored = true;
            }
        }
    }

    fn detach(&self, attached: &Attached) {
        {
            let mut registration = self.registration.lock();
            let bound_here = registration
                .as_ref()
                .is_some_and(|r| r.observer_id == Some(attached.observer_id));
            if bound_here {
                *registration = None;
            }
        }
        self.release(
            &Arc::downgrade(&attached.owner),
            Some(attached.observer_id),
            attached.providing,
        );
        tracing::debug!(observer = %attached.observer_id, key = %self.key, "observer.detach");
    }

    fn release(
        &self,
        owner: &Weak<dyn SavedStateOwner>,
        observer_id: Option<ObserverId>,
        providing: bool,
    ) {
        let Some(owner) = owner.upgrade() else {
            return;
        };
        if let Some(id) = observer_id {
            owner.remove_observer(id);
        }
        if providing {
            owner.unregister_state_provider(&self.key);
        }
    }
}

impl LifecycleObserver for ExtendedLifecycleBoundObserver {
    fn on_event(&self, event: LifecycleEvent) -> Result<()> {
        let Some(attached) = self.attached() else {
            tracing::trace!(event = ?event, key = %self.key, "observer.event.detached");
            return Ok(());
        };

        if event == LifecycleEvent::Destroy {
            attached.entry.deactivate();
            self.detach(&attached);
        } else if event == self.span.opening_event() {
            self.maybe_activate()?;
        } else if event == self.span.closing_event() {
            attached.entry.deactivate();
        }

        Ok(())
    }
}

impl SavedStateProvider for ExtendedLifecycleBoundObserver {
    fn save_state(&self) -> Result<Snapshot> {
        self.capture()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{
        CachedValue, Entry, ExtendedSubscriptionEntry, SubscriptionEntry, CACHED_VALUE_KEY,
    };
    use crate::error::LifecycleError;
    use crate::lifecycle::LifecycleRegistry;
    use crate::stream::{Callbacks, Subject};
    use crate::types::LifecycleState;

    const KEY: &str = "greeting";

    fn owner_in(
        state: LifecycleState,
        restored: Option<Snapshot>,
    ) -> (Arc<LifecycleRegistry>, Arc<dyn SavedStateOwner>) {
        let registry = Arc::new(match restored {
            Some(snapshot) => LifecycleRegistry::with_restored_state(snapshot),
            None => LifecycleRegistry::new(),
        });
        registry.move_to(state).unwrap();
        let owner: Arc<dyn SavedStateOwner> = registry.clone();
        (registry, owner)
    }

    fn caching_entry<T>(subject: &Subject<T>, cache: &Arc<CachedValue<T>>) -> Arc<ExtendedSubscriptionEntry>
    where
        T: Clone + Send + Sync + 'static,
    {
        let tap = Arc::clone(cache);
        let inner = SubscriptionEntry::from_source(
            subject.clone(),
            Callbacks::new(|_: T| {}).inspect(move |value| tap.store(value.clone())),
        );
        Arc::new(ExtendedSubscriptionEntry::new(inner, cache.clone()))
    }

    fn saved_greeting(value: &str) -> Snapshot {
        let mut inner = Snapshot::new();
        inner.put_typed(CACHED_VALUE_KEY, &value.to_string()).unwrap();
        let mut outer = Snapshot::new();
        outer.put_snapshot(KEY, inner);
        outer
    }

    #[test]
    fn test_restore_runs_before_first_activation() {
        let (registry, owner) = owner_in(LifecycleState::Created, Some(saved_greeting("Test")));
        let subject = Subject::<String>::publish();
        let cache = Arc::new(CachedValue::new());
        let entry = caching_entry(&subject, &cache);
        let observer = ExtendedLifecycleBoundObserver::new(LifeSpan::Started, KEY);

        observer.register(&owner, entry.clone()).unwrap();
        assert!(!cache.has_value());
        assert_eq!(subject.subscriber_count(), 0);

        registry.move_to(LifecycleState::Started).unwrap();
        assert_eq!(cache.get().as_deref(), Some("Test"));
        assert!(entry.is_active());
    }

    #[test]
    fn test_restore_happens_once_per_registration() {
        let (registry, owner) = owner_in(LifecycleState::Started, Some(saved_greeting("Test")));
        let subject = Subject::<String>::publish();
        let cache = Arc::new(CachedValue::new());
        let observer = ExtendedLifecycleBoundObserver::new(LifeSpan::Started, KEY);
        observer
            .register(&owner, caching_entry(&subject, &cache))
            .unwrap();

        subject.emit("newer".to_string());
        registry.move_to(LifecycleState::Created).unwrap();
        registry.move_to(LifecycleState::Started).unwrap();

        assert_eq!(cache.get().as_deref(), Some("newer"));
    }

    #[test]
    fn test_save_state_captures_under_key() {
        let (registry, owner) = owner_in(LifecycleState::Started, None);
        let subject = Subject::<String>::publish();
        let cache = Arc::new(CachedValue::new());
        let observer = ExtendedLifecycleBoundObserver::new(LifeSpan::Started, KEY);
        observer
            .register(&owner, caching_entry(&subject, &cache))
            .unwrap();

        subject.emit("Test".to_string());
        let saved = registry.save_state().unwrap();

        let nested = saved.get_snapshot(KEY).unwrap();
        assert_eq!(
            nested.get_typed::<String>(CACHED_VALUE_KEY).unwrap().as_deref(),
            Some("Test")
        );
    }

    #[test]
    fn test_empty_key_skips_persistence() {
        let (registry, owner) = owner_in(LifecycleState::Started, Some(saved_greeting("Test")));
        let subject = Subject::<String>::publish();
        let cache = Arc::new(CachedValue::new());
        let observer = ExtendedLifecycleBoundObserver::new(LifeSpan::Started, "");
        observer
            .register(&owner, caching_entry(&subject, &cache))
            .unwrap();

        assert_eq!(subject.subscriber_count(), 1);
        assert!(!cache.has_value());
        assert_eq!(registry.provider_count(), 0);
    }

    #[test]
    fn test_destroy_detaches_and_stops_providing() {
        let (registry, owner) = owner_in(LifecycleState::Started, None);
        let subject = Subject::<String>::publish();
        let cache = Arc::new(CachedValue::new());
        let observer = ExtendedLifecycleBoundObserver::new(LifeSpan::Started, KEY);
        observer
            .register(&owner, caching_entry(&subject, &cache))
            .unwrap();
        assert_eq!(registry.provider_count(), 1);

        registry.move_to(LifecycleState::Destroyed).unwrap();
        assert_eq!(subject.subscriber_count(), 0);
        assert_eq!(registry.observer_count(), 0);
        assert_eq!(registry.provider_count(), 0);
        assert!(!observer.is_attached());

        observer.on_event(LifecycleEvent::Start).unwrap();
        assert_eq!(subject.subscriber_count(), 0);
    }

    #[test]
    fn test_reregister_keeps_single_provider() {
        let (registry, owner) = owner_in(LifecycleState::Started, None);
        let subject = Subject::<String>::publish();
        let cache = Arc::new(CachedValue::new());
        let observer = ExtendedLifecycleBoundObserver::new(LifeSpan::Started, KEY);

        observer
            .register(&owner, caching_entry(&subject, &cache))
            .unwrap();
        observer
            .register(&owner, caching_entry(&subject, &cache))
            .unwrap();

        assert_eq!(registry.provider_count(), 1);
        assert_eq!(registry.observer_count(), 1);
        // Records current behavior, not a guarantee: the replaced entry is
        // left subscribed until the subject or its owner goes away.
        assert_eq!(subject.subscriber_count(), 2);
    }

    #[test]
    fn test_duplicate_key_across_observers() {
        let (_registry, owner) = owner_in(LifecycleState::Created, None);
        let subject = Subject::<String>::publish();
        let cache = Arc::new(CachedValue::new());

        let first = ExtendedLifecycleBoundObserver::new(LifeSpan::Started, KEY);
        first
            .register(&owner, caching_entry(&subject, &cache))
            .unwrap();

        let second = ExtendedLifecycleBoundObserver::new(LifeSpan::Started, KEY);
        let result = second.register(&owner, caching_entry(&subject, &cache));
        assert!(matches!(result, Err(LifecycleError::DuplicateStateKey(_))));
        assert!(!second.is_attached());
    }

    #[test]
    fn test_restore_failure_surfaces_on_start() {
        let mut inner = Snapshot::new();
        inner.put_typed(CACHED_VALUE_KEY, &1i32).unwrap();
        let mut saved = Snapshot::new();
        saved.put_snapshot(KEY, inner);

        let (registry, owner) = owner_in(LifecycleState::Created, Some(saved));
        let subject = Subject::<u64>::publish();
        let cache = Arc::new(CachedValue::<u64>::new());
        let observer = ExtendedLifecycleBoundObserver::new(LifeSpan::Started, KEY);
        observer
            .register(&owner, caching_entry(&subject, &cache))
            .unwrap();

        let result = registry.move_to(LifecycleState::Started);
        assert!(matches!(
            result,
            Err(LifecycleError::UnsupportedValueType { .. })
        ));
        // Restore aborted, so the entry never activated
        assert_eq!(subject.subscriber_count(), 0);
    }
}
