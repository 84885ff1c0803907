//! Stream capability types.

use crate::error::StreamError;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::fmt;
use std::sync::Arc;

/// Handle to a live subscription.
pub trait Disposable: Send + Sync {
    /// Stop further deliveries. Repeated calls are no-ops.
    fn dispose(&self);

    /// Whether `dispose` has taken effect.
    fn is_disposed(&self) -> bool;
}

/// A subscribable producer that may deliver 0..N values, then optionally an
/// error or a completion.
///
/// Every stream shape (at most one value, zero or more values, exactly one
/// value) fits behind this one signature; the shape only changes how many
/// times the producer calls back.
pub trait Source<T>: Send + Sync {
    /// Attach `callbacks` and return the handle that detaches them.
    fn subscribe(&self, callbacks: Callbacks<T>) -> Box<dyn Disposable>;
}

impl<T, S> Source<T> for Arc<S>
where
    S: Source<T> + ?Sized,
{
    fn subscribe(&self, callbacks: Callbacks<T>) -> Box<dyn Disposable> {
        (**self).subscribe(callbacks)
    }
}

/// Source backed by a plain subscribe function.
pub struct FromFn<F>(F);

/// Wrap a subscribe function as a [`Source`].
pub fn from_fn<T, F>(subscribe: F) -> FromFn<F>
where
    F: Fn(Callbacks<T>) -> Box<dyn Disposable> + Send + Sync,
{
    FromFn(subscribe)
}

impl<T, F> Source<T> for FromFn<F>
where
    F: Fn(Callbacks<T>) -> Box<dyn Disposable> + Send + Sync,
{
    fn subscribe(&self, callbacks: Callbacks<T>) -> Box<dyn Disposable> {
        (self.0)(callbacks)
    }
}

/// Unique identifier for a subscription on one emitter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub u64);

type NextFn<T> = Arc<dyn Fn(T) + Send + Sync>;
type ErrorFn = Arc<dyn Fn(StreamError) + Send + Sync>;
type SignalFn = Arc<dyn Fn() + Send + Sync>;

/// The callbacks one subscription delivers into.
///
/// `on_next` is required; the rest are optional and bundled here instead of
/// spreading them over separate observe variants.
pub struct Callbacks<T> {
    on_next: NextFn<T>,
    on_error: Option<ErrorFn>,
    on_complete: Option<SignalFn>,
    on_subscribe: Option<SignalFn>,
}

impl<T> Clone for Callbacks<T> {
    fn clone(&self) -> Self {
        Self {
            on_next: Arc::clone(&self.on_next),
            on_error: self.on_error.clone(),
            on_complete: self.on_complete.clone(),
            on_subscribe: self.on_subscribe.clone(),
        }
    }
}

impl<T> fmt::Debug for Callbacks<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_error", &self.on_error.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .field("on_subscribe", &self.on_subscribe.is_some())
            .finish()
    }
}

impl<T: 'static> Callbacks<T> {
    /// Callbacks delivering values to `on_next` only.
    pub fn new<F>(on_next: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Self {
            on_next: Arc::new(on_next),
            on_error: None,
            on_complete: None,
            on_subscribe: None,
        }
    }

    pub fn on_error<F>(mut self, on_error: F) -> Self
    where
        F: Fn(StreamError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(on_error));
        self
    }

    pub fn on_complete<F>(mut self, on_complete: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_complete = Some(Arc::new(on_complete));
        self
    }

    /// Called once each time the callbacks are attached to a producer.
    pub fn on_subscribe<F>(mut self, on_subscribe: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_subscribe = Some(Arc::new(on_subscribe));
        self
    }

    /// Run `tap` on every value before it reaches `on_next`.
    pub fn inspect<F>(mut self, tap: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let next = self.on_next;
        self.on_next = Arc::new(move |value| {
            tap(&value);
            next(value)
        });
        self
    }

    /// Callbacks that forward every notification into a bounded channel.
    ///
    /// Notifications that do not fit are dropped with a warning.
    pub fn channel(capacity: usize) -> (Self, Receiver<Notification<T>>)
    where
        T: Send,
    {
        let (sender, receiver) = bounded(capacity);
        let error_sender = sender.clone();
        let complete_sender = sender.clone();

        let callbacks = Callbacks::new(move |value| forward(&sender, Notification::Next(value)))
            .on_error(move |error| forward(&error_sender, Notification::Error(error)))
            .on_complete(move || forward(&complete_sender, Notification::Complete));

        (callbacks, receiver)
    }
}

impl<T> Callbacks<T> {
    pub fn next(&self, value: T) {
        (self.on_next)(value)
    }

    /// Deliver an error. Without an error callback the error is logged.
    pub fn error(&self, error: StreamError) {
        match &self.on_error {
            Some(on_error) => on_error(error),
            None => tracing::warn!(error = %error, "stream.error.unhandled"),
        }
    }

    pub fn complete(&self) {
        if let Some(on_complete) = &self.on_complete {
            on_complete()
        }
    }

    pub fn subscribed(&self) {
        if let Some(on_subscribe) = &self.on_subscribe {
            on_subscribe()
        }
    }
}

fn forward<T>(sender: &Sender<Notification<T>>, notification: Notification<T>) {
    match sender.try_send(notification) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => {
            tracing::warn!("stream.channel.full");
        }
        Err(TrySendError::Disconnected(_)) => {
            tracing::trace!("stream.channel.disconnected");
        }
    }
}

/// One delivery, as seen through [`Callbacks::channel`].
#[derive(Clone, Debug)]
pub enum Notification<T> {
    Next(T),
    Error(StreamError),
    Complete,
}

impl<T> Notification<T> {
    pub fn into_value(self) -> Option<T> {
        match self {
            Notification::Next(value) => Some(value),
            _ => None,
        }
    }
}
