//! Published audio guidance state

use navlink_core::{SpeechAnnouncement, VoiceInstruction, VoiceInstructionsState};
use serde::Serialize;

/// Immutable snapshot published by [`AudioGuidance`](super::AudioGuidance)
///
/// A new snapshot replaces the previous one on every upstream event;
/// subscribers only see snapshots that differ from the last one.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AudioGuidanceState {
    pub is_muted: bool,
    pub is_playable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_instruction: Option<VoiceInstruction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_announcement: Option<SpeechAnnouncement>,
}

impl AudioGuidanceState {
    /// State for `voice` with no announcement played yet
    pub fn from_voice(is_muted: bool, voice: &VoiceInstructionsState) -> Self {
        Self {
            is_muted,
            is_playable: voice.is_playable,
            current_instruction: voice.instruction.clone(),
            last_announcement: None,
        }
    }

    pub fn with_announcement(mut self, announcement: SpeechAnnouncement) -> Self {
        self.last_announcement = Some(announcement);
        self
    }
}
