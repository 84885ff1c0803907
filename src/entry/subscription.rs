//! One subscribe operation bound to an activate/deactivate contract.

use crate::stream::{Callbacks, Disposable, Source};
use parking_lot::Mutex;

/// Two-phase attach/detach contract driven by an observer.
pub trait Entry: Send + Sync {
    /// Attach if not attached. Repeated calls while attached do nothing.
    fn activate(&self);

    /// Detach if attached. Repeated calls do nothing.
    fn deactivate(&self);

    fn is_active(&self) -> bool;
}

type SubscribeFn = Box<dyn Fn() -> Box<dyn Disposable> + Send + Sync>;

/// Internal subscription slot.
enum Slot {
    Idle,
    /// The subscribe function is running. `wanted` holds the last
    /// activate/deactivate request made meanwhile; the result is kept only
    /// if it is still wanted.
    Activating { wanted: bool },
    Active(Box<dyn Disposable>),
}

/// Owns at most one live subscription produced by its subscribe function.
///
/// The slot lock is never held while subscribing or disposing, so callbacks
/// fired by either may call back into the entry.
pub struct SubscriptionEntry {
    subscribe: SubscribeFn,
    slot: Mutex<Slot>,
}

impl SubscriptionEntry {
    pub fn new<F>(subscribe: F) -> Self
    where
        F: Fn() -> Box<dyn Disposable> + Send + Sync + 'static,
    {
        Self {
            subscribe: Box::new(subscribe),
            slot: Mutex::new(Slot::Idle),
        }
    }

    /// Entry that attaches `callbacks` to `source` on every activation.
    pub fn from_source<T, S>(source: S, callbacks: Callbacks<T>) -> Self
    where
        S: Source<T> + 'static,
        T: 'static,
    {
        Self::new(move || source.subscribe(callbacks.clone()))
    }
}

impl Entry for SubscriptionEntry {
    fn activate(&self) {
        {
            let mut slot = self.slot.lock();
            if let Slot::Activating { wanted } = &mut *slot {
                *wanted = true;
                return;
            }
            if !matches!(*slot, Slot::Idle) {
                return;
            }
            *slot = Slot::Activating { wanted: true };
        }

        let subscription = (self.subscribe)();

        let mut slot = self.slot.lock();
        match std::mem::replace(&mut *slot, Slot::Idle) {
            Slot::Activating { wanted: true } => {
                *slot = Slot::Active(subscription);
                tracing::debug!("entry.activate");
            }
            _ => {
                drop(slot);
                tracing::debug!("entry.activate.cancelled");
                subscription.dispose();
            }
        }
    }

    fn deactivate(&self) {
        let previous = {
            let mut slot = self.slot.lock();
            if let Slot::Activating { wanted } = &mut *slot {
                *wanted = false;
                return;
            }
            std::mem::replace(&mut *slot, Slot::Idle)
        };

        if let Slot::Active(subscription) = previous {
            subscription.dispose();
            tracing::debug!("entry.deactivate");
        }
    }

    fn is_active(&self) -> bool {
        matches!(
            *self.slot.lock(),
            Slot::Active(_) | Slot::Activating { wanted: true }
        )
    }
}
