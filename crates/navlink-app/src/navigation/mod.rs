//! Navigation engine ownership and observer fan-out

pub mod app;
pub mod engine;
pub mod owner;

pub use app::NavigationApp;
pub use engine::{AppContext, EngineId, NavigationEngine, NavigationOptions, DEFAULT_VOICE_BUFFER};
pub use owner::{NavigationObserver, NavigationOwner, OptionsInitializer};
