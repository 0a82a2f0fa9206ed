//! Collaborator seams for audio guidance
//!
//! Persisted preferences and speech playback are both asynchronous I/O owned
//! by the host application. Implement the `Send` variants
//! ([`PreferenceStore`], [`VoicePlayer`]) to use a collaborator with
//! [`AudioGuidance`](super::AudioGuidance).

use navlink_core::prelude::*;
use navlink_core::SpeechAnnouncement;
use tokio::sync::watch;

/// Persisted "audio muted" preference
#[trait_variant::make(PreferenceStore: Send)]
pub trait LocalPreferenceStore {
    /// Stream of the current preference value
    fn subscribe_muted(&self) -> watch::Receiver<bool>;

    /// Reload the persisted value and publish it
    async fn restore(&self) -> Result<bool>;

    /// Persist `muted` and publish it
    async fn set_muted(&self, muted: bool) -> Result<()>;
}

/// Speech synthesis and playback
#[trait_variant::make(VoicePlayer: Send)]
pub trait LocalVoicePlayer {
    /// Play `announcement`, resolving once playback completes
    ///
    /// The future may be dropped mid-playback when the configuration
    /// changes; implementations should stop speaking when that happens.
    async fn play(&self, announcement: &SpeechAnnouncement) -> Result<()>;
}

/// Player that only logs what it would say
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingVoicePlayer;

impl VoicePlayer for TracingVoicePlayer {
    async fn play(&self, announcement: &SpeechAnnouncement) -> Result<()> {
        info!("Speaking [{}]: {}", announcement.language, announcement.text);
        Ok(())
    }
}
