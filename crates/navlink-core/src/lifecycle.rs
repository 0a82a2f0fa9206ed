//! Lifecycle states and the OS events that drive them

use serde::{Deserialize, Serialize};

/// Lifecycle state of a foreground owner (activity, car session, or the
/// merged application lifecycle)
///
/// Ordered from least to most foreground, so `state >= LifecycleState::Started`
/// reads as "at least started".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Constructed but never set up
    #[default]
    Initialized,
    Created,
    Started,
    Resumed,
}

impl LifecycleState {
    /// Check if this state is at least `other`
    pub fn is_at_least(self, other: LifecycleState) -> bool {
        self >= other
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleState::Initialized => write!(f, "initialized"),
            LifecycleState::Created => write!(f, "created"),
            LifecycleState::Started => write!(f, "started"),
            LifecycleState::Resumed => write!(f, "resumed"),
        }
    }
}

/// A single step between two adjacent lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    OnCreate,
    OnStart,
    OnResume,
    OnPause,
    OnStop,
}

impl LifecycleEvent {
    /// The event that moves one step up from `state`, if any
    pub fn up_from(state: LifecycleState) -> Option<Self> {
        match state {
            LifecycleState::Initialized => Some(Self::OnCreate),
            LifecycleState::Created => Some(Self::OnStart),
            LifecycleState::Started => Some(Self::OnResume),
            LifecycleState::Resumed => None,
        }
    }

    /// The event that moves one step down from `state`, if any
    ///
    /// `Created` is the floor: a lifecycle that has been set up never walks
    /// back to `Initialized`.
    pub fn down_from(state: LifecycleState) -> Option<Self> {
        match state {
            LifecycleState::Resumed => Some(Self::OnPause),
            LifecycleState::Started => Some(Self::OnStop),
            LifecycleState::Created | LifecycleState::Initialized => None,
        }
    }

    /// State reached after this event is dispatched
    pub fn target_state(self) -> LifecycleState {
        match self {
            Self::OnCreate | Self::OnStop => LifecycleState::Created,
            Self::OnStart | Self::OnPause => LifecycleState::Started,
            Self::OnResume => LifecycleState::Resumed,
        }
    }
}

/// Lifecycle callback delivered by the platform for a phone activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityEvent {
    Created,
    Started,
    Resumed,
    Paused,
    Stopped,
    Destroyed,
}

/// Lifecycle callback delivered by the platform for a projected car session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarSessionEvent {
    Created,
    Started,
    Stopped,
    Destroyed,
}
