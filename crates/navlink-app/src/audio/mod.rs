//! Audio guidance: mute preference, language and voice playback

pub mod guidance;
pub mod preferences;
pub mod services;
pub mod state;

pub use guidance::AudioGuidance;
pub use preferences::{FilePreferenceStore, MemoryPreferenceStore};
pub use services::{
    LocalPreferenceStore, LocalVoicePlayer, PreferenceStore, TracingVoicePlayer, VoicePlayer,
};
pub use state::AudioGuidanceState;
