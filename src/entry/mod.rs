//! Entries: one subscription each, attached and detached on demand.
//!
//! An observer never subscribes directly. It asks its entry to
//! [`activate`](Entry::activate) or [`deactivate`](Entry::deactivate), both
//! idempotent. [`ExtendedSubscriptionEntry`] adds `restore`/`capture` around
//! that, backed by a [`PersistenceDelegate`] such as [`CachedValue`].

mod cached;
mod extended;
mod subscription;

pub use cached::{CachedValue, CACHED_VALUE_KEY};
pub use extended::{ExtendedSubscriptionEntry, PersistenceDelegate, PersistentEntry};
pub use subscription::{Entry, SubscriptionEntry};
