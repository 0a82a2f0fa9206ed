//! Voice instruction and speech announcement value types

use serde::{Deserialize, Serialize};

/// A voice instruction emitted by the navigation engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceInstruction {
    /// Plain-text announcement
    pub announcement: String,

    /// Optional SSML markup for synthesizers that support it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssml_announcement: Option<String>,

    /// Distance along the current step at which the instruction fires
    #[serde(default)]
    pub distance_along_geometry: f64,
}

impl VoiceInstruction {
    pub fn new(announcement: impl Into<String>) -> Self {
        Self {
            announcement: announcement.into(),
            ssml_announcement: None,
            distance_along_geometry: 0.0,
        }
    }

    pub fn with_ssml(mut self, ssml: impl Into<String>) -> Self {
        self.ssml_announcement = Some(ssml.into());
        self
    }
}

/// Latest voice-instruction state published by the engine
///
/// `is_playable` is true while an active route can produce instructions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VoiceInstructionsState {
    pub is_playable: bool,
    pub instruction: Option<VoiceInstruction>,

    /// Bumped once per published instruction; 0 before the first.
    /// Re-broadcasts of the current instruction keep their sequence.
    #[serde(default)]
    pub sequence: u64,
}

/// An utterance that has been synthesized for a language and played
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechAnnouncement {
    pub text: String,
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssml: Option<String>,
}

impl SpeechAnnouncement {
    /// Build the announcement for `instruction` in `language`
    pub fn for_instruction(instruction: &VoiceInstruction, language: &str) -> Self {
        Self {
            text: instruction.announcement.clone(),
            language: language.to_string(),
            ssml: instruction.ssml_announcement.clone(),
        }
    }
}
