//! navlink-app - Foreground lifecycle and resource coordination for navlink
//!
//! This crate keeps one navigation engine and one car map surface alive
//! across the phone activity stack and a projected car session. It merges
//! both lifecycles, owns the engine and the surface, fans their events out to
//! registered observers, and drives audio guidance from engine voice
//! instructions.

pub mod audio;
pub mod config;
pub mod events;
pub mod lifecycle;
pub mod navigation;
pub mod observer_set;
pub mod surface;

// Re-export primary types
pub use audio::{AudioGuidance, AudioGuidanceState, PreferenceStore, VoicePlayer};
pub use config::Settings;
pub use events::NavEvent;
pub use lifecycle::{ForegroundLifecycle, LifecycleObserver};
pub use navigation::{AppContext, NavigationApp, NavigationEngine, NavigationObserver};
pub use observer_set::ObserverSet;
pub use surface::{CarMapObserver, CarMapSurface, CompositeSurfaceObserver, SurfaceSession};
