//! Observers binding an entry to an owner's lifecycle.
//!
//! | Event | Action |
//! |---|---|
//! | register, owner destroyed | nothing |
//! | register, owner alive | attach, then activate if inside the span |
//! | span opens (`Start` by default) | activate if the owner is inside the span |
//! | span closes (`Stop` by default) | deactivate |
//! | `Destroy` | deactivate, detach |
//!
//! Events reaching a detached observer are ignored, so a destroyed owner can
//! never resubscribe.

mod bound;
mod extended;

pub use bound::LifecycleBoundObserver;
pub use extended::ExtendedLifecycleBoundObserver;

use std::sync::{Arc, Weak};

/// Whether `weak` still points at the same allocation as `arc`.
fn same_target<T: ?Sized, U: ?Sized>(weak: &Weak<T>, arc: &Arc<U>) -> bool {
    weak.upgrade().is_some_and(|strong| {
        std::ptr::eq(
            Arc::as_ptr(&strong) as *const (),
            Arc::as_ptr(arc) as *const (),
        )
    })
}
