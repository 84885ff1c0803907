//! Stream capability consumed by the binding layer.
//!
//! The binding layer only needs "something that can be subscribed to and
//! later disposed". This module defines that capability:
//! - [`Source`]: a subscribable producer
//! - [`Disposable`]: the handle that detaches a subscription
//! - [`Callbacks`]: the value/error/complete/subscribe callbacks of one subscription
//!
//! and [`Subject`], an in-process multicast emitter implementing it.
//!
//! # Example
//!
//! ```ignore
//! let subject = Subject::behavior();
//! let handle = subject.subscribe(Callbacks::new(|s: String| println!("{s}")));
//! subject.emit("hello".to_string());
//! handle.dispose();
//! ```

mod subject;
mod types;

pub use subject::Subject;
pub use types::{
    from_fn, Callbacks, Disposable, FromFn, Notification, Source, SubscriptionId,
};
