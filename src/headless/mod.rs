//! Headless mode - replay scenarios and print domain events as JSON
//!
//! The driver feeds a scenario of platform callbacks (activity and car
//! session lifecycle, surface changes, voice instructions, mute requests)
//! through the coordination core and writes every resulting [`NavEvent`] to
//! stdout.
//!
//! # Event Format
//!
//! Events are output as NDJSON (newline-delimited JSON), one event per line.
//! Each event carries the scenario step that produced it and a millisecond
//! timestamp.
//!
//! # Example Output
//!
//! ```json
//! {"step":0,"timestamp":1704700001000,"event":"lifecycle_changed","state":"created"}
//! {"step":1,"timestamp":1704700001002,"event":"lifecycle_changed","state":"started"}
//! {"step":1,"timestamp":1704700001002,"event":"engine_attached","engine_id":1}
//! ```

pub mod runner;
pub mod scenario;

use std::io::{self, Write};
use std::path::Path;

use chrono::Utc;
use navlink_app::config::load_settings;
use navlink_app::NavEvent;
use navlink_core::prelude::*;
use serde::Serialize;

pub use runner::{EventRecorder, ScenarioRunner, SETTLE_QUIET};
pub use scenario::{Scenario, Step};

/// A domain event stamped with the step that produced it
#[derive(Debug, Clone, Serialize)]
pub struct HeadlessEvent {
    pub step: usize,
    pub timestamp: i64,
    #[serde(flatten)]
    pub event: NavEvent,
}

impl HeadlessEvent {
    pub fn new(step: usize, event: NavEvent) -> Self {
        Self {
            step,
            timestamp: Utc::now().timestamp_millis(),
            event,
        }
    }

    /// Emit this event to stdout as JSON
    pub fn emit(&self) {
        let json = match serde_json::to_string(self) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize headless event: {}", e);
                return;
            }
        };

        let mut stdout = io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", json) {
            error!("Failed to write headless event to stdout: {}", e);
            return;
        }

        if let Err(e) = stdout.flush() {
            error!("Failed to flush headless stdout: {}", e);
        }
    }
}

/// Replay `scenario_path` with settings from `project_path`
pub async fn run_headless(project_path: &Path, scenario_path: &Path) -> Result<()> {
    info!("═══════════════════════════════════════════════════════");
    info!("navlink starting in HEADLESS mode");
    info!("Project: {}", project_path.display());
    info!("Scenario: {}", scenario_path.display());
    info!("═══════════════════════════════════════════════════════");

    let settings = load_settings(project_path);
    let scenario = Scenario::load(scenario_path)?;
    let mut runner = ScenarioRunner::new(settings)?;

    runner.run(&scenario, |event| event.emit()).await?;

    // Let audio guidance finish before the runtime shuts down.
    runner.audio().settle(SETTLE_QUIET).await;
    info!("navlink headless mode exiting");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use navlink_core::LifecycleState;

    #[test]
    fn test_event_json_is_flat() {
        let event = HeadlessEvent {
            step: 3,
            timestamp: 1_704_700_001_000,
            event: NavEvent::LifecycleChanged {
                state: LifecycleState::Resumed,
            },
        };

        let json = serde_json::to_string(&event).unwrap();

        assert_eq!(
            json,
            r#"{"step":3,"timestamp":1704700001000,"event":"lifecycle_changed","state":"resumed"}"#
        );
    }

    #[test]
    fn test_new_stamps_current_time() {
        let before = Utc::now().timestamp_millis();
        let event = HeadlessEvent::new(1, NavEvent::EngineAttached { engine_id: 9 });

        assert!(event.timestamp >= before);
        assert_eq!(event.event.event_type(), "engine_attached");
    }
}
