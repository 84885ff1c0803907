//! Observer that keeps an entry attached while its owner's life span is open.

use crate::entry::Entry;
use crate::error::Result;
use crate::lifecycle::{LifecycleObserver, LifecycleOwner};
use crate::types::{LifeSpan, LifecycleEvent, ObserverId};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

use super::same_target;

/// The (owner, entry) pair this observer is bound to.
struct Registration {
    owner: Weak<dyn LifecycleOwner>,
    entry: Arc<dyn Entry>,
    /// Set while registered with the owner.
    observer_id: Option<ObserverId>,
}

/// Everything needed to act on an event, cloned out of the lock.
struct Attached {
    owner: Arc<dyn LifecycleOwner>,
    entry: Arc<dyn Entry>,
    observer_id: ObserverId,
}

/// Activates its entry when the owner enters the life span and deactivates it
/// when the owner leaves it.
///
/// The observer keeps no copy of the owner's state; each decision reads the
/// owner's live state. Registering after the owner is already inside the span
/// activates immediately. Registering on a destroyed owner does nothing.
pub struct LifecycleBoundObserver {
    this: Weak<Self>,
    span: LifeSpan,
    registration: Mutex<Option<Registration>>,
}

impl LifecycleBoundObserver {
    pub fn new(span: LifeSpan) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            span,
            registration: Mutex::new(None),
        })
    }

    pub fn span(&self) -> LifeSpan {
        self.span
    }

    /// Bind `entry` to `owner`.
    ///
    /// Registering again replaces the entry. The replaced entry is dropped
    /// from this observer but not deactivated.
    pub fn register(&self, owner: &Arc<dyn LifecycleOwner>, entry: Arc<dyn Entry>) {
        if owner.current_state().is_terminal() {
            tracing::debug!("observer.register.destroyed_owner");
            return;
        }

        let (attached, stale) = {
            let mut registration = self.registration.lock();
            let (attached, stale) = match registration.take() {
                Some(previous) if same_target(&previous.owner, owner) => {
                    (previous.observer_id, None)
                }
                Some(previous) => (None, previous.observer_id.map(|id| (previous.owner, id))),
                None => (None, None),
            };
            *registration = Some(Registration {
                owner: Arc::downgrade(owner),
                entry,
                observer_id: attached,
            });
            (attached, stale)
        };

        if let Some((previous_owner, id)) = stale {
            if let Some(previous_owner) = previous_owner.upgrade() {
                previous_owner.remove_observer(id);
            }
        }

        if attached.is_none() {
            let Some(this) = self.this.upgrade() else {
                return;
            };
            let id = owner.add_observer(this);
            if let Some(registration) = self.registration.lock().as_mut() {
                registration.observer_id = Some(id);
            }
            tracing::debug!(observer = %id, span = ?self.span, "observer.attach");
        }

        self.maybe_activate();
    }

    /// Deactivate the entry and detach from the owner.
    pub fn unregister(&self) {
        let Some(attached) = self.attached() else {
            return;
        };
        attached.entry.deactivate();
        self.detach(&attached);
    }

    /// Whether the observer is currently registered with a live owner.
    pub fn is_attached(&self) -> bool {
        self.attached().is_some()
    }

    /// Currently bound entry, attached or not.
    pub fn entry(&self) -> Option<Arc<dyn Entry>> {
        self.registration
            .lock()
            .as_ref()
            .map(|registration| Arc::clone(&registration.entry))
    }

    fn attached(&self) -> Option<Attached> {
        let registration = self.registration.lock();
        let registration = registration.as_ref()?;
        Some(Attached {
            observer_id: registration.observer_id?,
            owner: registration.owner.upgrade()?,
            entry: Arc::clone(&registration.entry),
        })
    }

    fn maybe_activate(&self) {
        let Some(attached) = self.attached() else {
            return;
        };
        if attached
            .owner
            .current_state()
            .is_at_least(self.span.active_state())
        {
            attached.entry.activate();
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
        attached.owner.remove_observer(attached.observer_id);
        tracing::debug!(observer = %attached.observer_id, "observer.detach");
    }
}

impl LifecycleObserver for LifecycleBoundObserver {
    fn on_event(&self, event: LifecycleEvent) -> Result<()> {
        let Some(attached) = self.attached() else {
            tracing::trace!(event = ?event, "observer.event.detached");
            return Ok(());
        };

        if event == LifecycleEvent::Destroy {
            attached.entry.deactivate();
            self.detach(&attached);
        } else if event == self.span.opening_event() {
            self.maybe_activate();
        } else if event == self.span.closing_event() {
            attached.entry.deactivate();
        }

        Ok(())
    }
}
