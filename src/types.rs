//! Core lifecycle types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete lifecycle state of an owner.
///
/// Ordered so that `Destroyed` sits below every live state: a destroyed owner
/// is never "at least" anything an observer waits for.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Destroyed,
    #[default]
    Initialized,
    Created,
    Started,
    Resumed,
}

impl LifecycleState {
    /// Whether this state is at or beyond `other`.
    pub fn is_at_least(self, other: LifecycleState) -> bool {
        self >= other
    }

    /// Destroyed is absorbing.
    pub fn is_terminal(self) -> bool {
        self == LifecycleState::Destroyed
    }
}

/// Named transition delivered to lifecycle observers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    Create,
    Start,
    Resume,
    Pause,
    Stop,
    Destroy,
}

impl LifecycleEvent {
    /// State the owner is in while this event is being dispatched.
    pub fn target_state(self) -> LifecycleState {
        match self {
            LifecycleEvent::Create => LifecycleState::Created,
            LifecycleEvent::Start => LifecycleState::Started,
            LifecycleEvent::Resume => LifecycleState::Resumed,
            LifecycleEvent::Pause => LifecycleState::Started,
            LifecycleEvent::Stop => LifecycleState::Created,
            LifecycleEvent::Destroy => LifecycleState::Destroyed,
        }
    }

    /// Event that moves an owner one step up from `state`.
    pub fn up_from(state: LifecycleState) -> Option<Self> {
        match state {
            LifecycleState::Initialized => Some(LifecycleEvent::Create),
            LifecycleState::Created => Some(LifecycleEvent::Start),
            LifecycleState::Started => Some(LifecycleEvent::Resume),
            LifecycleState::Resumed | LifecycleState::Destroyed => None,
        }
    }

    /// Event that moves an owner one step down from `state`.
    pub fn down_from(state: LifecycleState) -> Option<Self> {
        match state {
            LifecycleState::Resumed => Some(LifecycleEvent::Pause),
            LifecycleState::Started => Some(LifecycleEvent::Stop),
            LifecycleState::Created | LifecycleState::Initialized => Some(LifecycleEvent::Destroy),
            LifecycleState::Destroyed => None,
        }
    }
}

/// Window of the owner's lifecycle during which a subscription stays attached.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifeSpan {
    /// Between `Create` and `Destroy`.
    Created,
    /// Between `Start` and `Stop`.
    #[default]
    Started,
    /// Between `Resume` and `Pause`.
    Resumed,
}

impl LifeSpan {
    /// Minimum owner state at which the span is open.
    pub fn active_state(self) -> LifecycleState {
        match self {
            LifeSpan::Created => LifecycleState::Created,
            LifeSpan::Started => LifecycleState::Started,
            LifeSpan::Resumed => LifecycleState::Resumed,
        }
    }

    /// Event that opens the span.
    pub fn opening_event(self) -> LifecycleEvent {
        match self {
            LifeSpan::Created => LifecycleEvent::Create,
            LifeSpan::Started => LifecycleEvent::Start,
            LifeSpan::Resumed => LifecycleEvent::Resume,
        }
    }

    /// Event that closes the span.
    pub fn closing_event(self) -> LifecycleEvent {
        match self {
            LifeSpan::Created => LifecycleEvent::Destroy,
            LifeSpan::Started => LifecycleEvent::Stop,
            LifeSpan::Resumed => LifecycleEvent::Pause,
        }
    }
}

/// Handle identifying an observer registered with an owner.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub u64);

impl fmt::Debug for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObserverId({})", self.0)
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
