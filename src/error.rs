//! Error types for lifecycle-bound subscriptions.

use crate::types::LifecycleState;
use std::sync::Arc;
use thiserror::Error;

/// Main error type for binding and persistence operations.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Cannot persist or restore a value of type {type_name}")]
    UnsupportedValueType { type_name: &'static str },

    #[error("Saved state provider already registered for key: {0}")]
    DuplicateStateKey(String),

    #[error("Invalid lifecycle transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: LifecycleState,
        to: LifecycleState,
    },
}

impl LifecycleError {
    /// Shorthand for rejecting the declared type `T`.
    pub fn unsupported<T: ?Sized>() -> Self {
        LifecycleError::UnsupportedValueType {
            type_name: std::any::type_name::<T>(),
        }
    }
}

/// Opaque error delivered through a stream's error channel.
///
/// The binding layer never inspects these; they go straight to the caller's
/// error callback.
pub type StreamError = Arc<dyn std::error::Error + Send + Sync>;

/// Result type for binding and persistence operations.
pub type Result<T> = std::result::Result<T, LifecycleError>;
