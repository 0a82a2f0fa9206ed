//! Audio guidance state machine
//!
//! [`AudioGuidance`] combines the persisted mute preference, the configured
//! language and the engine's voice instructions into one
//! [`AudioGuidanceState`] stream. It runs in one of two modes:
//!
//! - **Silent** (muted): tracks playability and the current instruction,
//!   never speaks.
//! - **Speaking** (unmuted): additionally plays every new instruction and
//!   publishes the announcement once playback completes.
//!
//! Any change to the preference or the language drops the running mode,
//! including playback in flight, and starts the mode for the new
//! configuration.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use navlink_core::prelude::*;
use navlink_core::{SpeechAnnouncement, VoiceInstructionsState};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use super::services::{PreferenceStore, VoicePlayer};
use super::state::AudioGuidanceState;
use crate::navigation::{NavigationEngine, NavigationObserver};

pub struct AudioGuidance<S, P> {
    store: Arc<S>,
    player: Arc<P>,
    language_tx: watch::Sender<String>,
    state_tx: Arc<watch::Sender<AudioGuidanceState>>,
    /// Preference writes still in flight
    pending_tx: Arc<watch::Sender<usize>>,
    writer: Mutex<Option<PreferenceWriter>>,
    pipeline: Mutex<Option<JoinHandle<()>>>,
}

impl<S, P> std::fmt::Debug for AudioGuidance<S, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioGuidance")
            .field("language", &*self.language_tx.borrow())
            .field("state", &*self.state_tx.borrow())
            .finish()
    }
}

impl<S, P> AudioGuidance<S, P>
where
    S: PreferenceStore + Sync + 'static,
    P: VoicePlayer + Sync + 'static,
{
    pub fn new(store: Arc<S>, player: Arc<P>, language: impl Into<String>) -> Self {
        let (language_tx, _) = watch::channel(language.into());
        let (state_tx, _) = watch::channel(AudioGuidanceState::default());
        let (pending_tx, _) = watch::channel(0);
        Self {
            store,
            player,
            language_tx,
            state_tx: Arc::new(state_tx),
            pending_tx: Arc::new(pending_tx),
            writer: Mutex::new(None),
            pipeline: Mutex::new(None),
        }
    }

    /// Latest published state
    pub fn current_state(&self) -> AudioGuidanceState {
        self.state_tx.borrow().clone()
    }

    /// Stream of distinct state snapshots
    pub fn subscribe(&self) -> watch::Receiver<AudioGuidanceState> {
        self.state_tx.subscribe()
    }

    pub fn language(&self) -> String {
        self.language_tx.borrow().clone()
    }

    /// Switch the announcement language; restarts the running mode
    pub fn set_language(&self, language: impl Into<String>) {
        let language = language.into();
        self.language_tx.send_if_modified(|current| {
            if *current == language {
                false
            } else {
                *current = language;
                true
            }
        });
    }

    /// Request the preference be set to muted
    pub fn mute(&self) {
        self.request(PreferenceRequest::Set(true));
    }

    /// Request the preference be set to unmuted
    pub fn unmute(&self) {
        self.request(PreferenceRequest::Set(false));
    }

    /// Request the opposite of the preference left by earlier requests
    pub fn toggle(&self) {
        self.request(PreferenceRequest::Toggle);
    }

    pub fn is_running(&self) -> bool {
        self.pipeline_slot()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Wait for preference writes to land and the state to stop changing
    ///
    /// The state counts as settled once no new snapshot arrives for `quiet`.
    pub async fn settle(&self, quiet: Duration) {
        let mut pending = self.pending_tx.subscribe();
        let _ = pending.wait_for(|count| *count == 0).await;

        let mut state = self.state_tx.subscribe();
        while let Ok(Ok(())) = tokio::time::timeout(quiet, state.changed()).await {}
    }

    /// Queue a preference change; requests are applied one at a time, in order
    fn request(&self, request: PreferenceRequest) {
        let Ok(runtime) = Handle::try_current() else {
            warn!("Audio preference change requested outside a tokio runtime");
            return;
        };
        let message = (request, PendingWrite::new(self.pending_tx.clone()));

        let mut slot = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let message = match slot.as_ref() {
            Some(writer) => match writer.tx.send(message) {
                Ok(()) => return,
                // Writer died with its runtime; start a new one below.
                Err(mpsc::error::SendError(message)) => message,
            },
            None => message,
        };

        let writer = PreferenceWriter::spawn(&runtime, self.store.clone());
        if writer.tx.send(message).is_err() {
            warn!("Audio preference writer stopped before accepting a request");
        }
        *slot = Some(writer);
    }

    fn start(&self, engine: &NavigationEngine) {
        let Ok(runtime) = Handle::try_current() else {
            error!(
                "Audio guidance attached to engine {} outside a tokio runtime",
                engine.id()
            );
            return;
        };
        let pipeline = Pipeline {
            store: self.store.clone(),
            player: self.player.clone(),
            muted_rx: self.store.subscribe_muted(),
            language_rx: self.language_tx.subscribe(),
            voice_rx: engine.subscribe_voice_instructions(),
            latest: engine.voice_instructions_state(),
            state_tx: self.state_tx.clone(),
        };
        let task = runtime.spawn(pipeline.run());
        if let Some(previous) = self.pipeline_slot().replace(task) {
            previous.abort();
        }
        debug!("Audio guidance following engine {}", engine.id());
    }

    fn stop(&self) {
        if let Some(task) = self.pipeline_slot().take() {
            task.abort();
        }
        let muted = self.state_tx.borrow().is_muted;
        publish(
            &self.state_tx,
            AudioGuidanceState {
                is_muted: muted,
                ..AudioGuidanceState::default()
            },
        );
    }

    fn pipeline_slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pipeline.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S, P> NavigationObserver for AudioGuidance<S, P>
where
    S: PreferenceStore + Sync + 'static,
    P: VoicePlayer + Sync + 'static,
{
    fn on_attached(&self, engine: &NavigationEngine) {
        self.start(engine);
    }

    fn on_detached(&self, engine: &NavigationEngine) {
        debug!("Audio guidance released engine {}", engine.id());
        self.stop();
    }
}

impl<S, P> Drop for AudioGuidance<S, P> {
    fn drop(&mut self) {
        let writer = self
            .writer
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(writer) = writer {
            writer.task.abort();
        }

        let task = self
            .pipeline
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
        }
    }
}

fn publish(state_tx: &watch::Sender<AudioGuidanceState>, next: AudioGuidanceState) {
    state_tx.send_if_modified(|current| {
        if *current == next {
            false
        } else {
            *current = next;
            true
        }
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PreferenceRequest {
    Set(bool),
    Toggle,
}

/// Single task applying preference requests in arrival order
struct PreferenceWriter {
    tx: mpsc::UnboundedSender<(PreferenceRequest, PendingWrite)>,
    task: JoinHandle<()>,
}

impl PreferenceWriter {
    fn spawn<S>(runtime: &Handle, store: Arc<S>) -> Self
    where
        S: PreferenceStore + Sync + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<(PreferenceRequest, PendingWrite)>();
        let task = runtime.spawn(async move {
            while let Some((request, _pending)) = rx.recv().await {
                let muted = match request {
                    PreferenceRequest::Set(muted) => muted,
                    PreferenceRequest::Toggle => {
                        let current = *store.subscribe_muted().borrow();
                        !current
                    }
                };
                if let Err(e) = store.set_muted(muted).await {
                    warn!("Failed to persist audio preference: {}", e);
                }
            }
        });
        Self { tx, task }
    }
}

/// Counts one in-flight preference write until dropped
struct PendingWrite(Arc<watch::Sender<usize>>);

impl PendingWrite {
    fn new(pending_tx: Arc<watch::Sender<usize>>) -> Self {
        pending_tx.send_modify(|count| *count += 1);
        Self(pending_tx)
    }
}

impl Drop for PendingWrite {
    fn drop(&mut self) {
        self.0.send_modify(|count| *count = count.saturating_sub(1));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pipeline
// ─────────────────────────────────────────────────────────────────────────────

struct Pipeline<S, P> {
    store: Arc<S>,
    player: Arc<P>,
    muted_rx: watch::Receiver<bool>,
    language_rx: watch::Receiver<String>,
    voice_rx: broadcast::Receiver<VoiceInstructionsState>,
    latest: VoiceInstructionsState,
    state_tx: Arc<watch::Sender<AudioGuidanceState>>,
}

impl<S, P> Pipeline<S, P>
where
    S: PreferenceStore + Sync + 'static,
    P: VoicePlayer + Sync + 'static,
{
    async fn run(mut self) {
        if let Err(e) = self.store.restore().await {
            warn!("Failed to restore audio preference: {}", e);
        }

        loop {
            let muted = *self.muted_rx.borrow_and_update();
            let language = self.language_rx.borrow_and_update().clone();
            debug!(
                "Audio guidance entering {} mode ({})",
                if muted { "silent" } else { "speaking" },
                language
            );

            let mode = Mode {
                muted,
                language: &language,
                player: self.player.as_ref(),
                voice_rx: &mut self.voice_rx,
                latest: &mut self.latest,
                state_tx: self.state_tx.as_ref(),
            };

            tokio::select! {
                changed = self.muted_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                changed = self.language_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                () = mode.run() => break,
            }
        }
        debug!("Audio guidance pipeline finished");
    }
}

/// One configuration of the pipeline; dropped when the configuration changes
struct Mode<'a, P> {
    muted: bool,
    language: &'a str,
    player: &'a P,
    voice_rx: &'a mut broadcast::Receiver<VoiceInstructionsState>,
    latest: &'a mut VoiceInstructionsState,
    state_tx: &'a watch::Sender<AudioGuidanceState>,
}

impl<P: VoicePlayer + Sync> Mode<'_, P> {
    /// Runs until the engine's voice channel closes
    async fn run(self) {
        publish(
            self.state_tx,
            AudioGuidanceState::from_voice(self.muted, self.latest),
        );
        // Sequence of the last instruction handled; replays never re-speak.
        let mut spoken = self.latest.sequence;

        loop {
            let voice = match self.voice_rx.recv().await {
                Ok(voice) => voice,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Audio guidance skipped {} voice updates", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return,
            };
            *self.latest = voice.clone();

            let state = AudioGuidanceState::from_voice(self.muted, &voice);
            publish(self.state_tx, state.clone());

            if voice.sequence == spoken {
                continue;
            }
            spoken = voice.sequence;
            if self.muted || !voice.is_playable {
                continue;
            }
            let Some(instruction) = voice.instruction else {
                continue;
            };

            let announcement = SpeechAnnouncement::for_instruction(&instruction, self.language);
            match self.player.play(&announcement).await {
                Ok(()) => publish(self.state_tx, state.with_announcement(announcement)),
                Err(e) => warn!("Voice playback failed: {}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::preferences::MemoryPreferenceStore;
    use crate::navigation::{AppContext, NavigationOptions};
    use navlink_core::VoiceInstruction;

    const WAIT: Duration = Duration::from_secs(5);

    #[derive(Default)]
    struct RecordingPlayer {
        played: Mutex<Vec<SpeechAnnouncement>>,
    }

    impl RecordingPlayer {
        fn played(&self) -> Vec<String> {
            self.played
                .lock()
                .unwrap()
                .iter()
                .map(|a| format!("{}:{}", a.language, a.text))
                .collect()
        }
    }

    impl VoicePlayer for RecordingPlayer {
        async fn play(&self, announcement: &SpeechAnnouncement) -> Result<()> {
            self.played.lock().unwrap().push(announcement.clone());
            Ok(())
        }
    }

    /// Never finishes playing
    struct StuckPlayer;

    impl VoicePlayer for StuckPlayer {
        async fn play(&self, _announcement: &SpeechAnnouncement) -> Result<()> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    struct FailingPlayer;

    impl VoicePlayer for FailingPlayer {
        async fn play(&self, _announcement: &SpeechAnnouncement) -> Result<()> {
            Err(Error::speech("no audio device"))
        }
    }

    fn engine() -> NavigationEngine {
        NavigationEngine::new(NavigationOptions::new(AppContext::new(
            "com.example.nav",
            "/tmp/navlink",
        )))
    }

    async fn wait_for(
        guidance_rx: &mut watch::Receiver<AudioGuidanceState>,
        check: impl FnMut(&AudioGuidanceState) -> bool,
    ) -> AudioGuidanceState {
        tokio::time::timeout(WAIT, guidance_rx.wait_for(check))
            .await
            .expect("timed out waiting for audio state")
            .expect("audio state channel closed")
            .clone()
    }

    fn announced(state: &AudioGuidanceState, text: &str) -> bool {
        state
            .last_announcement
            .as_ref()
            .is_some_and(|a| a.text == text)
    }

    fn current_is(state: &AudioGuidanceState, text: &str) -> bool {
        state
            .current_instruction
            .as_ref()
            .is_some_and(|i| i.announcement == text)
    }

    #[test]
    fn test_current_state_defaults_before_attach() {
        let guidance = AudioGuidance::new(
            Arc::new(MemoryPreferenceStore::default()),
            Arc::new(RecordingPlayer::default()),
            "en",
        );

        assert_eq!(guidance.current_state(), AudioGuidanceState::default());
        assert!(!guidance.is_running());
    }

    #[tokio::test]
    async fn test_mute_switches_to_silent_tracking() {
        let store = Arc::new(MemoryPreferenceStore::new(false));
        let player = Arc::new(RecordingPlayer::default());
        let guidance = AudioGuidance::new(store.clone(), player.clone(), "en");
        let mut rx = guidance.subscribe();
        let engine = engine();
        guidance.on_attached(&engine);

        engine.set_route_active(true);
        engine.publish_voice_instruction(VoiceInstruction::new("Turn left"));
        let state = wait_for(&mut rx, |s| announced(s, "Turn left")).await;
        assert!(!state.is_muted);
        assert_eq!(player.played(), vec!["en:Turn left"]);

        guidance.mute();
        let state = wait_for(&mut rx, |s| s.is_muted).await;
        assert!(state.is_playable);
        assert!(state.last_announcement.is_none());
        assert!(store.is_muted());

        engine.publish_voice_instruction(VoiceInstruction::new("Turn right"));
        let state = wait_for(&mut rx, |s| current_is(s, "Turn right")).await;
        assert!(state.is_muted);
        assert!(state.is_playable);
        assert!(state.last_announcement.is_none());
        assert_eq!(player.played(), vec!["en:Turn left"]);
    }

    #[tokio::test]
    async fn test_unmute_resumes_speaking_without_repeating() {
        let store = Arc::new(MemoryPreferenceStore::new(true));
        let player = Arc::new(RecordingPlayer::default());
        let guidance = AudioGuidance::new(store, player.clone(), "en");
        let mut rx = guidance.subscribe();
        let engine = engine();
        guidance.on_attached(&engine);

        engine.set_route_active(true);
        engine.publish_voice_instruction(VoiceInstruction::new("Keep left"));
        wait_for(&mut rx, |s| s.is_muted && current_is(s, "Keep left")).await;

        guidance.unmute();
        wait_for(&mut rx, |s| !s.is_muted).await;
        engine.publish_voice_instruction(VoiceInstruction::new("Exit"));
        wait_for(&mut rx, |s| announced(s, "Exit")).await;

        assert_eq!(player.played(), vec!["en:Exit"]);
    }

    #[tokio::test]
    async fn test_repeated_instruction_on_new_route_is_spoken_again() {
        let player = Arc::new(RecordingPlayer::default());
        let guidance = AudioGuidance::new(
            Arc::new(MemoryPreferenceStore::default()),
            player.clone(),
            "en",
        );
        let mut rx = guidance.subscribe();
        let engine = engine();
        guidance.on_attached(&engine);

        engine.set_route_active(true);
        engine.publish_voice_instruction(VoiceInstruction::new("Turn left"));
        wait_for(&mut rx, |s| announced(s, "Turn left")).await;

        engine.set_route_active(false);
        wait_for(&mut rx, |s| !s.is_playable).await;
        engine.set_route_active(true);
        engine.publish_voice_instruction(VoiceInstruction::new("Turn left"));
        wait_for(&mut rx, |s| announced(s, "Turn left")).await;

        assert_eq!(player.played(), vec!["en:Turn left", "en:Turn left"]);
    }

    #[tokio::test]
    async fn test_rebroadcast_of_current_instruction_is_not_repeated() {
        let player = Arc::new(RecordingPlayer::default());
        let guidance = AudioGuidance::new(
            Arc::new(MemoryPreferenceStore::default()),
            player.clone(),
            "en",
        );
        let mut rx = guidance.subscribe();
        let engine = engine();
        guidance.on_attached(&engine);

        engine.set_route_active(true);
        engine.publish_voice_instruction(VoiceInstruction::new("Turn left"));
        wait_for(&mut rx, |s| announced(s, "Turn left")).await;

        // Same instruction re-sent with the route flag.
        engine.set_route_active(true);
        engine.publish_voice_instruction(VoiceInstruction::new("Exit"));
        wait_for(&mut rx, |s| announced(s, "Exit")).await;

        assert_eq!(player.played(), vec!["en:Turn left", "en:Exit"]);
    }

    #[tokio::test]
    async fn test_instruction_without_active_route_is_not_played() {
        let player = Arc::new(RecordingPlayer::default());
        let guidance = AudioGuidance::new(
            Arc::new(MemoryPreferenceStore::default()),
            player.clone(),
            "en",
        );
        let mut rx = guidance.subscribe();
        let engine = engine();
        guidance.on_attached(&engine);

        engine.publish_voice_instruction(VoiceInstruction::new("Turn left"));
        let state = wait_for(&mut rx, |s| current_is(s, "Turn left")).await;
        assert!(!state.is_playable);
        assert!(state.last_announcement.is_none());

        engine.set_route_active(true);
        engine.publish_voice_instruction(VoiceInstruction::new("Exit"));
        wait_for(&mut rx, |s| announced(s, "Exit")).await;

        assert_eq!(player.played(), vec!["en:Exit"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_preference_requests_apply_in_order() {
        let store = Arc::new(MemoryPreferenceStore::new(false));
        let guidance = AudioGuidance::new(
            store.clone(),
            Arc::new(RecordingPlayer::default()),
            "en",
        );

        for _ in 0..500 {
            guidance.mute();
            guidance.unmute();
            guidance.settle(Duration::ZERO).await;
            assert!(!store.is_muted());

            guidance.mute();
            guidance.toggle();
            guidance.settle(Duration::ZERO).await;
            assert!(!store.is_muted());
        }
    }

    #[tokio::test]
    async fn test_toggle_flips_persisted_preference() {
        let store = Arc::new(MemoryPreferenceStore::new(false));
        let guidance = AudioGuidance::new(
            store.clone(),
            Arc::new(RecordingPlayer::default()),
            "en",
        );

        guidance.toggle();
        guidance.settle(Duration::from_millis(20)).await;
        assert!(store.is_muted());

        guidance.toggle();
        guidance.settle(Duration::from_millis(20)).await;
        assert!(!store.is_muted());
    }

    #[tokio::test]
    async fn test_language_change_applies_to_next_announcement() {
        let player = Arc::new(RecordingPlayer::default());
        let guidance = AudioGuidance::new(
            Arc::new(MemoryPreferenceStore::default()),
            player.clone(),
            "en",
        );
        let mut rx = guidance.subscribe();
        let engine = engine();
        guidance.on_attached(&engine);
        engine.set_route_active(true);
        wait_for(&mut rx, |s| s.is_playable).await;

        guidance.set_language("de");
        assert_eq!(guidance.language(), "de");
        // The mode restart is not observable on the state stream; give it a turn.
        tokio::time::sleep(Duration::from_millis(20)).await;
        engine.publish_voice_instruction(VoiceInstruction::new("Links abbiegen"));
        wait_for(&mut rx, |s| announced(s, "Links abbiegen")).await;

        assert_eq!(player.played(), vec!["de:Links abbiegen"]);
    }

    #[tokio::test]
    async fn test_mute_interrupts_playback_in_flight() {
        let store = Arc::new(MemoryPreferenceStore::new(false));
        let guidance = AudioGuidance::new(store, Arc::new(StuckPlayer), "en");
        let mut rx = guidance.subscribe();
        let engine = engine();
        guidance.on_attached(&engine);

        engine.set_route_active(true);
        engine.publish_voice_instruction(VoiceInstruction::new("Turn left"));
        wait_for(&mut rx, |s| current_is(s, "Turn left")).await;

        guidance.mute();
        let state = wait_for(&mut rx, |s| s.is_muted).await;
        assert!(state.last_announcement.is_none());

        engine.publish_voice_instruction(VoiceInstruction::new("Turn right"));
        wait_for(&mut rx, |s| current_is(s, "Turn right")).await;
    }

    #[tokio::test]
    async fn test_failed_playback_publishes_no_announcement() {
        let guidance = AudioGuidance::new(
            Arc::new(MemoryPreferenceStore::default()),
            Arc::new(FailingPlayer),
            "en",
        );
        let mut rx = guidance.subscribe();
        let engine = engine();
        guidance.on_attached(&engine);

        engine.set_route_active(true);
        engine.publish_voice_instruction(VoiceInstruction::new("Turn left"));
        wait_for(&mut rx, |s| current_is(s, "Turn left")).await;
        guidance.settle(Duration::from_millis(20)).await;

        assert!(guidance.current_state().last_announcement.is_none());
    }

    #[tokio::test]
    async fn test_detach_stops_pipeline_and_clears_playability() {
        let guidance = AudioGuidance::new(
            Arc::new(MemoryPreferenceStore::new(true)),
            Arc::new(RecordingPlayer::default()),
            "en",
        );
        let mut rx = guidance.subscribe();
        let engine = engine();
        guidance.on_attached(&engine);
        engine.set_route_active(true);
        wait_for(&mut rx, |s| s.is_playable).await;
        assert!(guidance.is_running());

        guidance.on_detached(&engine);

        assert!(!guidance.is_running());
        let state = guidance.current_state();
        assert!(state.is_muted);
        assert!(!state.is_playable);
    }

    #[test]
    fn test_attach_outside_runtime_is_ignored() {
        let guidance = AudioGuidance::new(
            Arc::new(MemoryPreferenceStore::default()),
            Arc::new(RecordingPlayer::default()),
            "en",
        );

        guidance.on_attached(&engine());
        guidance.mute();

        assert!(!guidance.is_running());
    }
}
