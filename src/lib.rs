//! navlink Library
//!
//! Headless driver for the navlink coordination core. Replays scenarios of
//! platform callbacks and reports the resulting domain events.

pub mod headless;

// Re-export main entry points
pub use headless::{run_headless, HeadlessEvent, Scenario, ScenarioRunner};
