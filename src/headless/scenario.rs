//! Scenario files replayed by the headless driver
//!
//! A scenario is a TOML document with an ordered `[[steps]]` array. Each step
//! is tagged by `kind`:
//!
//! ```toml
//! name = "car session with voice"
//!
//! [[steps]]
//! kind = "car"
//! event = "created"
//!
//! [[steps]]
//! kind = "surface_available"
//! width = 800
//! height = 480
//!
//! [[steps]]
//! kind = "voice_instruction"
//! text = "Turn left"
//! ```

use std::path::Path;

use navlink_core::prelude::*;
use navlink_core::{ActivityEvent, CarSessionEvent};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
    Activity {
        event: ActivityEvent,
        #[serde(default)]
        changing_configuration: bool,
    },
    Car {
        event: CarSessionEvent,
    },
    SurfaceAvailable {
        width: u32,
        height: u32,
        #[serde(default)]
        dpi: Option<u32>,
    },
    SurfaceDestroyed,
    VisibleArea {
        left: i32,
        top: i32,
        right: i32,
        bottom: i32,
    },
    RouteActive {
        active: bool,
    },
    VoiceInstruction {
        text: String,
        #[serde(default)]
        ssml: Option<String>,
    },
    Mute,
    Unmute,
    Toggle,
    Language {
        code: String,
    },
    /// Wait until the audio pipeline stops publishing
    Settle,
}

impl Scenario {
    /// Parse and validate a scenario document
    pub fn parse(content: &str) -> Result<Self> {
        let scenario: Scenario = toml::from_str(content)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        Self::parse(&content)
    }

    /// Reject steps that can never be applied, numbering steps from 1
    pub fn validate(&self) -> Result<()> {
        for (index, step) in self.steps.iter().enumerate() {
            step.validate().map_err(|message| Error::scenario(index + 1, message))?;
        }
        Ok(())
    }
}

impl Step {
    fn validate(&self) -> std::result::Result<(), String> {
        match self {
            Step::SurfaceAvailable { width, height, dpi } => {
                if *width == 0 || *height == 0 {
                    return Err(format!("surface size {}x{} is empty", width, height));
                }
                if *dpi == Some(0) {
                    return Err("surface dpi must be positive".to_string());
                }
            }
            Step::VisibleArea {
                left,
                top,
                right,
                bottom,
            } => {
                if right < left || bottom < top {
                    return Err(format!(
                        "visible area ({}, {}) - ({}, {}) is inverted",
                        left, top, right, bottom
                    ));
                }
            }
            Step::VoiceInstruction { text, .. } if text.trim().is_empty() => {
                return Err("voice instruction text is empty".to_string());
            }
            Step::Language { code } if code.trim().is_empty() => {
                return Err("language code is empty".to_string());
            }
            _ => {}
        }
        Ok(())
    }
}
