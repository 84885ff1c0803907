//! Lifecycle capability consumed by observers.
//!
//! An owner exposes its live [`LifecycleState`](crate::LifecycleState) and
//! notifies registered [`LifecycleObserver`]s of each transition. Owners that
//! also implement [`SavedStateOwner`] can hand snapshots to the next session.
//!
//! [`LifecycleRegistry`] is a complete owner for hosts without their own
//! lifecycle framework, and for tests.
//!
//! # Example
//!
//! ```ignore
//! let owner = Arc::new(LifecycleRegistry::new());
//! owner.move_to(LifecycleState::Resumed)?;   // Create, Start, Resume
//! let saved = owner.save_state()?;
//! owner.move_to(LifecycleState::Destroyed)?; // Pause, Stop, Destroy
//!
//! let next = Arc::new(LifecycleRegistry::with_restored_state(saved));
//! ```

mod owner;
mod registry;

pub use owner::{LifecycleObserver, LifecycleOwner, SavedStateOwner, SavedStateProvider};
pub use registry::LifecycleRegistry;
