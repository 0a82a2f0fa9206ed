//! The shared navigation engine instance and its configuration

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use navlink_core::prelude::*;
use navlink_core::{VoiceInstruction, VoiceInstructionsState};
use tokio::sync::broadcast;

/// Unique identifier for an engine instance
pub type EngineId = u64;

static NEXT_ENGINE_ID: AtomicU64 = AtomicU64::new(1);

/// Default buffer for voice instruction fan-out to async subscribers
pub const DEFAULT_VOICE_BUFFER: usize = 64;

/// Application-level context handed to the engine options initializer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppContext {
    pub package_name: String,
    pub data_dir: PathBuf,
}

impl AppContext {
    pub fn new(package_name: impl Into<String>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            package_name: package_name.into(),
            data_dir: data_dir.into(),
        }
    }
}

/// Configuration for one engine instance
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationOptions {
    pub context: AppContext,

    /// Capacity of the voice instruction broadcast channel
    pub voice_buffer: usize,
}

impl NavigationOptions {
    pub fn new(context: AppContext) -> Self {
        Self {
            context,
            voice_buffer: DEFAULT_VOICE_BUFFER,
        }
    }

    pub fn with_voice_buffer(mut self, voice_buffer: usize) -> Self {
        self.voice_buffer = voice_buffer.max(1);
        self
    }
}

/// The navigation engine shared by every observer during a foreground session
///
/// Only [`NavigationOwner`](super::NavigationOwner) constructs and destroys
/// engines. Observers receive a borrow in `on_attached` and must drop any
/// derived subscriptions in `on_detached`.
pub struct NavigationEngine {
    id: EngineId,
    options: NavigationOptions,
    voice_tx: broadcast::Sender<VoiceInstructionsState>,
    voice_state: Mutex<VoiceInstructionsState>,
    destroyed: AtomicBool,
}

impl std::fmt::Debug for NavigationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationEngine")
            .field("id", &self.id)
            .field("package", &self.options.context.package_name)
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

impl NavigationEngine {
    pub(crate) fn new(options: NavigationOptions) -> Self {
        let (voice_tx, _) = broadcast::channel(options.voice_buffer.max(1));
        Self {
            id: NEXT_ENGINE_ID.fetch_add(1, Ordering::Relaxed),
            options,
            voice_tx,
            voice_state: Mutex::new(VoiceInstructionsState::default()),
            destroyed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> EngineId {
        self.id
    }

    pub fn options(&self) -> &NavigationOptions {
        &self.options
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    /// Latest voice instruction state, for subscribers joining late
    pub fn voice_instructions_state(&self) -> VoiceInstructionsState {
        self.voice_state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn subscribe_voice_instructions(&self) -> broadcast::Receiver<VoiceInstructionsState> {
        self.voice_tx.subscribe()
    }

    /// Mark whether an active route can produce instructions
    ///
    /// Deactivating the route also clears the current instruction.
    pub fn set_route_active(&self, active: bool) {
        self.publish(|state| {
            state.is_playable = active;
            if !active {
                state.instruction = None;
            }
        });
    }

    /// Publish a voice instruction reached along the active route
    pub fn publish_voice_instruction(&self, instruction: VoiceInstruction) {
        self.publish(|state| {
            state.instruction = Some(instruction);
            state.sequence += 1;
        });
    }

    fn publish(&self, update: impl FnOnce(&mut VoiceInstructionsState)) {
        if self.is_destroyed() {
            warn!("Ignoring voice update on destroyed engine {}", self.id);
            return;
        }
        let snapshot = {
            let mut state = self
                .voice_state
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            update(&mut state);
            state.clone()
        };
        // No subscribers is fine.
        let _ = self.voice_tx.send(snapshot);
    }

    pub(crate) fn destroy(&self) {
        if !self.destroyed.swap(true, Ordering::AcqRel) {
            info!("Navigation engine {} destroyed", self.id);
        }
    }
}
