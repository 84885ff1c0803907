//! Multicast emitter that fans values out to attached callbacks.

use crate::error::StreamError;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use super::types::{Callbacks, Disposable, Source, SubscriptionId};

/// Internal subscriber state.
struct Subscriber<T> {
    callbacks: Callbacks<T>,
    /// Set on dispose; checked before every delivery.
    disposed: AtomicBool,
}

impl<T> Subscriber<T> {
    fn is_live(&self) -> bool {
        !self.disposed.load(Ordering::SeqCst)
    }
}

/// How the emitter terminated.
#[derive(Clone)]
enum Terminal {
    Completed,
    Failed(StreamError),
}

/// Everything subscribe, emit and terminate must see consistently.
struct State<T> {
    /// Attached subscribers by ID, delivered in subscription order.
    subscribers: BTreeMap<SubscriptionId, Arc<Subscriber<T>>>,
    latest: Option<T>,
    terminal: Option<Terminal>,
}

struct Shared<T> {
    state: RwLock<State<T>>,
    /// Counter for generating subscription IDs.
    next_id: AtomicU64,
    /// Whether new subscribers receive the latest value first.
    replay_latest: bool,
}

/// A hot emitter: values pushed through [`Subject::emit`] go to every
/// subscriber attached at that moment.
///
/// Built with [`Subject::behavior`], the subject also remembers the latest
/// value and hands it to each new subscriber.
///
/// Callbacks always run outside the internal lock, so they may subscribe,
/// dispose or emit again.
pub struct Subject<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Subject<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Emitter that only delivers values emitted after subscription.
    pub fn publish() -> Self {
        Self::with_replay(false, None)
    }

    /// Emitter that replays the latest value to new subscribers.
    pub fn behavior() -> Self {
        Self::with_replay(true, None)
    }

    /// Replaying emitter seeded with `initial`.
    pub fn behavior_with(initial: T) -> Self {
        Self::with_replay(true, Some(initial))
    }

    fn with_replay(replay_latest: bool, initial: Option<T>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: RwLock::new(State {
                    subscribers: BTreeMap::new(),
                    latest: initial,
                    terminal: None,
                }),
                next_id: AtomicU64::new(1),
                replay_latest,
            }),
        }
    }

    /// Deliver `value` to every live subscriber.
    ///
    /// Ignored once the subject has completed or failed.
    pub fn emit(&self, value: T) {
        // Recording the latest value and picking the recipients happen under
        // one lock, so a concurrent subscriber gets the value exactly once:
        // either as its replay or as a delivery.
        let recipients: Vec<_> = {
            let mut state = self.shared.state.write();
            if state.terminal.is_some() {
                tracing::trace!("subject.emit.after_terminal");
                return;
            }
            if self.shared.replay_latest {
                state.latest = Some(value.clone());
            }
            state.subscribers.values().cloned().collect()
        };

        for subscriber in recipients {
            if subscriber.is_live() {
                subscriber.callbacks.next(value.clone());
            }
        }
    }

    /// Terminate with an error and detach everyone.
    pub fn error(&self, error: StreamError) {
        self.terminate(Terminal::Failed(error));
    }

    /// Terminate normally and detach everyone.
    pub fn complete(&self) {
        self.terminate(Terminal::Completed);
    }

    fn terminate(&self, terminal: Terminal) {
        let drained: Vec<_> = {
            let mut state = self.shared.state.write();
            if state.terminal.is_some() {
                return;
            }
            state.terminal = Some(terminal.clone());
            std::mem::take(&mut state.subscribers).into_values().collect()
        };

        for subscriber in drained {
            if subscriber.is_live() {
                deliver_terminal(&subscriber.callbacks, &terminal);
            }
        }
    }

    /// Number of attached subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.shared.state.read().subscribers.len()
    }

    pub fn has_subscribers(&self) -> bool {
        self.subscriber_count() > 0
    }

    /// Latest value, for replaying subjects.
    pub fn latest(&self) -> Option<T> {
        self.shared.state.read().latest.clone()
    }

    pub fn is_terminated(&self) -> bool {
        self.shared.state.read().terminal.is_some()
    }
}

impl<T> Source<T> for Subject<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn subscribe(&self, callbacks: Callbacks<T>) -> Box<dyn Disposable> {
        let id = SubscriptionId(self.shared.next_id.fetch_add(1, Ordering::SeqCst));
        let subscriber = Arc::new(Subscriber {
            callbacks,
            disposed: AtomicBool::new(false),
        });

        // The terminal check and the insert share one lock, so a concurrent
        // terminate either drains this subscriber or is seen here.
        let attached = {
            let mut state = self.shared.state.write();
            if let Some(terminal) = state.terminal.clone() {
                Err(terminal)
            } else {
                state.subscribers.insert(id, Arc::clone(&subscriber));
                let replay = if self.shared.replay_latest {
                    state.latest.clone()
                } else {
                    None
                };
                Ok(replay)
            }
        };

        let replay = match attached {
            Ok(replay) => replay,
            Err(terminal) => {
                subscriber.callbacks.subscribed();
                deliver_terminal(&subscriber.callbacks, &terminal);
                subscriber.disposed.store(true, Ordering::SeqCst);
                return Box::new(SubjectSubscription {
                    id,
                    shared: Weak::new(),
                    subscriber,
                });
            }
        };
        tracing::trace!(subscription = id.0, "subject.subscribe");

        subscriber.callbacks.subscribed();
        if let Some(value) = replay {
            if subscriber.is_live() {
                subscriber.callbacks.next(value);
            }
        }

        Box::new(SubjectSubscription {
            id,
            shared: Arc::downgrade(&self.shared),
            subscriber,
        })
    }
}

fn deliver_terminal<T>(callbacks: &Callbacks<T>, terminal: &Terminal) {
    match terminal {
        Terminal::Completed => callbacks.complete(),
        Terminal::Failed(error) => callbacks.error(Arc::clone(error)),
    }
}

/// Subscription handle returned by [`Subject`].
struct SubjectSubscription<T> {
    id: SubscriptionId,
    shared: Weak<Shared<T>>,
    subscriber: Arc<Subscriber<T>>,
}

impl<T> Disposable for SubjectSubscription<T>
where
    T: Send + Sync,
{
    fn dispose(&self) {
        if self.subscriber.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(shared) = self.shared.upgrade() {
            shared.state.write().subscribers.remove(&self.id);
            tracing::trace!(subscription = self.id.0, "subject.dispose");
        }
    }

    fn is_disposed(&self) -> bool {
        !self.subscriber.is_live()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::Notification;
    use parking_lot::Mutex;

    #[test]
    fn test_subscribe_dispose() {
        let subject = Subject::<u32>::publish();

        assert!(!subject.has_subscribers());
        let handle = subject.subscribe(Callbacks::new(|_| {}));
        assert_eq!(subject.subscriber_count(), 1);
        assert!(subject.has_subscribers());

        handle.dispose();
        assert_eq!(subject.subscriber_count(), 0);
        assert!(handle.is_disposed());

        // Second dispose is a no-op
        handle.dispose();
        assert_eq!(subject.subscriber_count(), 0);
    }

    #[test]
    fn test_publish_does_not_replay() {
        let subject = Subject::publish();
        subject.emit("early".to_string());

        let (callbacks, receiver) = Callbacks::channel(8);
        let _handle = subject.subscribe(callbacks);
        assert!(receiver.try_recv().is_err());

        subject.emit("late".to_string());
        assert_eq!(
            receiver.try_recv().unwrap().into_value().as_deref(),
            Some("late")
        );
    }

    #[test]
    fn test_behavior_replays_latest() {
        let subject = Subject::behavior();
        subject.emit(1);
        subject.emit(2);

        let (callbacks, receiver) = Callbacks::channel(8);
        let _handle = subject.subscribe(callbacks);

        assert_eq!(receiver.try_recv().unwrap().into_value(), Some(2));
        assert!(receiver.try_recv().is_err());
        assert_eq!(subject.latest(), Some(2));
    }

    #[test]
    fn test_disposed_subscriber_gets_nothing() {
        let subject = Subject::publish();
        let (callbacks, receiver) = Callbacks::channel(8);
        let handle = subject.subscribe(callbacks);

        subject.emit(1);
        handle.dispose();
        subject.emit(2);

        assert_eq!(receiver.try_recv().unwrap().into_value(), Some(1));
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_complete_detaches_everyone() {
        let subject = Subject::<u8>::publish();
        let (callbacks, receiver) = Callbacks::channel(8);
        let _handle = subject.subscribe(callbacks);

        subject.complete();
        assert_eq!(subject.subscriber_count(), 0);
        assert!(matches!(receiver.try_recv().unwrap(), Notification::Complete));

        // Late subscribers see the terminal event right away
        let (late, late_receiver) = Callbacks::channel(8);
        let handle = subject.subscribe(late);
        assert!(handle.is_disposed());
        assert!(matches!(late_receiver.try_recv().unwrap(), Notification::Complete));

        subject.emit(9);
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_dispose_from_inside_callback() {
        let subject = Subject::publish();
        let slot: Arc<Mutex<Option<Box<dyn Disposable>>>> = Arc::new(Mutex::new(None));
        let seen = Arc::new(AtomicU64::new(0));

        let inner_slot = Arc::clone(&slot);
        let inner_seen = Arc::clone(&seen);
        let handle = subject.subscribe(Callbacks::new(move |_: u32| {
            inner_seen.fetch_add(1, Ordering::SeqCst);
            if let Some(handle) = inner_slot.lock().take() {
                handle.dispose();
            }
        }));
        *slot.lock() = Some(handle);

        subject.emit(1);
        subject.emit(2);

        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(subject.subscriber_count(), 0);
    }

    #[test]
    fn test_complete_racing_subscribers_detaches_all() {
        for _ in 0..50 {
            let subject = Subject::<u32>::publish();
            let completions = Arc::new(AtomicU64::new(0));

            let subscribers: Vec<_> = (0..4)
                .map(|_| {
                    let subject = subject.clone();
                    let completions = Arc::clone(&completions);
                    std::thread::spawn(move || {
                        let _handle = subject.subscribe(Callbacks::new(|_| {}).on_complete(
                            move || {
                                completions.fetch_add(1, Ordering::SeqCst);
                            },
                        ));
                    })
                })
                .collect();
            let completer = {
                let subject = subject.clone();
                std::thread::spawn(move || subject.complete())
            };

            for thread in subscribers {
                thread.join().unwrap();
            }
            completer.join().unwrap();

            // Every subscriber was either drained or saw the terminal state
            assert_eq!(subject.subscriber_count(), 0);
            assert_eq!(completions.load(Ordering::SeqCst), 4);
        }
    }

    #[test]
    fn test_emit_racing_subscribe_delivers_once() {
        for round in 0..50u32 {
            let subject = Subject::behavior_with(0u32);
            let (callbacks, receiver) = Callbacks::channel(8);

            let emitter = {
                let subject = subject.clone();
                std::thread::spawn(move || subject.emit(round + 1))
            };
            let _handle = subject.subscribe(callbacks);
            emitter.join().unwrap();

            let values: Vec<_> = receiver
                .try_iter()
                .filter_map(Notification::into_value)
                .collect();
            let latest = values.iter().filter(|v| **v == round + 1).count();
            assert_eq!(latest, 1, "values: {:?}", values);
        }
    }
}
