//! # Lifebound
//!
//! Stream subscriptions scoped to the lifecycle of an owning component.
//!
//! ## Core Concepts
//!
//! - **Owners**: components moving through `Created`, `Started`, `Resumed` and
//!   finally `Destroyed`, notifying observers of each step
//! - **Entries**: one subscribe operation behind an idempotent
//!   activate/deactivate contract
//! - **Observers**: attach an entry while the owner is inside a life span and
//!   detach it for good on destroy
//! - **Snapshots**: typed key/value containers carrying the last cached value
//!   of a stream across a save/restore boundary
//!
//! ## Example
//!
//! ```ignore
//! use lifebound::{Callbacks, HandlerConfig, LifecycleHandler, LifecycleRegistry, Subject};
//!
//! let owner = Arc::new(LifecycleRegistry::new());
//! owner.move_to(LifecycleState::Created)?;
//!
//! let subject = Subject::publish();
//! let handler = LifecycleHandler::new(HandlerConfig::default());
//! let owner_ref: Arc<dyn LifecycleOwner> = owner.clone();
//! handler
//!     .observe(subject.clone())
//!     .bind(&owner_ref, Callbacks::new(|count: u32| println!("{count}")));
//!
//! owner.move_to(LifecycleState::Started)?; // subscribes
//! subject.emit(1);
//! owner.move_to(LifecycleState::Destroyed)?; // unsubscribes and detaches
//! ```

pub mod aware;
pub mod entry;
pub mod error;
pub mod handler;
pub mod lifecycle;
pub mod observer;
pub mod snapshot;
pub mod stream;
pub mod types;

// Re-exports
pub use aware::{
    ExtendedLifecycleAware, LifecycleAware, PersistentSubject, SubjectLifecycleAware,
    EXTENDED_LIFECYCLE_AWARE_KEY,
};
pub use entry::{
    CachedValue, Entry, ExtendedSubscriptionEntry, PersistenceDelegate, PersistentEntry,
    SubscriptionEntry, CACHED_VALUE_KEY,
};
pub use error::{LifecycleError, Result, StreamError};
pub use handler::{
    Binder, ExtendedBinder, ExtendedLifecycleHandler, HandlerConfig, LifecycleHandler,
};
pub use lifecycle::{
    LifecycleObserver, LifecycleOwner, LifecycleRegistry, SavedStateOwner, SavedStateProvider,
};
pub use observer::{ExtendedLifecycleBoundObserver, LifecycleBoundObserver};
pub use snapshot::{Record, RecordRef, Snapshot, SnapshotValue, ValueCategory};
pub use stream::{
    from_fn, Callbacks, Disposable, FromFn, Notification, Source, Subject, SubscriptionId,
};
pub use types::*;
