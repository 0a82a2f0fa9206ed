//! Domain events for external consumers
//!
//! [`NavEvent`] is a serializable record of everything observable from the
//! coordination core: lifecycle transitions, engine attach/detach, surface
//! lifecycle and geometry, and audio guidance state.

use navlink_core::{EdgeInsets, LifecycleState, Rect, SurfaceContainer};
use serde::Serialize;

use crate::audio::AudioGuidanceState;
use crate::navigation::EngineId;
use crate::surface::SurfaceId;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NavEvent {
    // ─────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────
    /// The merged foreground lifecycle moved to a new state
    LifecycleChanged { state: LifecycleState },

    // ─────────────────────────────────────────────────────────
    // Engine
    // ─────────────────────────────────────────────────────────
    EngineAttached { engine_id: EngineId },

    EngineDetached { engine_id: EngineId },

    // ─────────────────────────────────────────────────────────
    // Surface
    // ─────────────────────────────────────────────────────────
    SurfaceLoaded {
        surface_id: SurfaceId,
        container: SurfaceContainer,
    },

    VisibleAreaChanged {
        visible_area: Rect,
        edge_insets: EdgeInsets,
    },

    SurfaceDetached { surface_id: SurfaceId },

    // ─────────────────────────────────────────────────────────
    // Audio
    // ─────────────────────────────────────────────────────────
    AudioStateChanged { state: AudioGuidanceState },
}

impl NavEvent {
    /// Returns a short string label for this event type (for logging/debugging).
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::LifecycleChanged { .. } => "lifecycle_changed",
            Self::EngineAttached { .. } => "engine_attached",
            Self::EngineDetached { .. } => "engine_detached",
            Self::SurfaceLoaded { .. } => "surface_loaded",
            Self::VisibleAreaChanged { .. } => "visible_area_changed",
            Self::SurfaceDetached { .. } => "surface_detached",
            Self::AudioStateChanged { .. } => "audio_state_changed",
        }
    }
}
