//! Headless scenario runner
//!
//! Wires a [`NavigationApp`], a [`SurfaceSession`] and [`AudioGuidance`] the
//! way a host application would, then replays scenario steps through them.
//! Synchronous fan-out is captured by an [`EventRecorder`] registered as a
//! lifecycle, engine and surface observer. Audio guidance state is sampled
//! after every step.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use navlink_app::audio::{FilePreferenceStore, TracingVoicePlayer};
use navlink_app::config::Settings;
use navlink_app::lifecycle::LifecycleObserver;
use navlink_app::navigation::NavigationOptions;
use navlink_app::surface::{CarMapObserver, CarMapSurface, RenderTarget, SurfaceSession};
use navlink_app::{
    AudioGuidance, AudioGuidanceState, NavEvent, NavigationApp, NavigationEngine,
    NavigationObserver,
};
use navlink_core::prelude::*;
use navlink_core::{EdgeInsets, LifecycleState, Rect, SurfaceContainer, VoiceInstruction};
use tokio::sync::watch;

use super::scenario::{Scenario, Step};
use super::HeadlessEvent;

/// Quiet period after which the audio pipeline counts as settled
pub const SETTLE_QUIET: Duration = Duration::from_millis(50);

type HeadlessAudio = AudioGuidance<FilePreferenceStore, TracingVoicePlayer>;

// ─────────────────────────────────────────────────────────────────────────────
// Event recording
// ─────────────────────────────────────────────────────────────────────────────

/// Observer that turns every callback into a [`NavEvent`]
#[derive(Debug, Default)]
pub struct EventRecorder {
    events: Mutex<Vec<NavEvent>>,
}

impl EventRecorder {
    /// Drain recorded events in callback order
    pub fn take(&self) -> Vec<NavEvent> {
        std::mem::take(&mut *self.lock())
    }

    fn record(&self, event: NavEvent) {
        trace!("Recorded {}", event.event_type());
        self.lock().push(event);
    }

    fn lifecycle(&self, state: LifecycleState) {
        self.record(NavEvent::LifecycleChanged { state });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<NavEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LifecycleObserver for EventRecorder {
    fn on_create(&self) {
        self.lifecycle(LifecycleState::Created);
    }

    fn on_start(&self) {
        self.lifecycle(LifecycleState::Started);
    }

    fn on_resume(&self) {
        self.lifecycle(LifecycleState::Resumed);
    }

    fn on_pause(&self) {
        self.lifecycle(LifecycleState::Started);
    }

    fn on_stop(&self) {
        self.lifecycle(LifecycleState::Created);
    }
}

impl NavigationObserver for EventRecorder {
    fn on_attached(&self, engine: &NavigationEngine) {
        self.record(NavEvent::EngineAttached {
            engine_id: engine.id(),
        });
    }

    fn on_detached(&self, engine: &NavigationEngine) {
        self.record(NavEvent::EngineDetached {
            engine_id: engine.id(),
        });
    }
}

impl CarMapObserver for EventRecorder {
    fn on_loaded(&self, surface: &CarMapSurface) {
        self.record(NavEvent::SurfaceLoaded {
            surface_id: surface.id(),
            container: surface.container(),
        });
    }

    fn on_visible_area_changed(&self, visible_area: Rect, edge_insets: EdgeInsets) {
        self.record(NavEvent::VisibleAreaChanged {
            visible_area,
            edge_insets,
        });
    }

    fn on_detached(&self, surface: &CarMapSurface) {
        self.record(NavEvent::SurfaceDetached {
            surface_id: surface.id(),
        });
    }
}

/// Render target with nothing behind it
#[derive(Debug, Default)]
struct HeadlessRenderTarget;

impl RenderTarget for HeadlessRenderTarget {
    fn stop(&self) {
        debug!("Render target stopped");
    }

    fn surface_destroyed(&self) {
        debug!("Render target surface destroyed");
    }

    fn destroy(&self) {
        debug!("Render target destroyed");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Runner
// ─────────────────────────────────────────────────────────────────────────────

pub struct ScenarioRunner {
    settings: Settings,
    app: NavigationApp,
    surfaces: SurfaceSession,
    audio: Arc<HeadlessAudio>,
    audio_rx: watch::Receiver<AudioGuidanceState>,
    recorder: Arc<EventRecorder>,
}

impl ScenarioRunner {
    /// Build and wire every component from `settings`
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate()?;

        let recorder = Arc::new(EventRecorder::default());
        let app = NavigationApp::new(settings.app_context());
        app.lifecycle().add_observer(recorder.clone());
        app.setup(|context| NavigationOptions::new(context.clone()))?;

        let store = Arc::new(FilePreferenceStore::new(
            settings.preferences_path(),
            settings.voice.muted_by_default,
        ));
        let audio = Arc::new(AudioGuidance::new(
            store,
            Arc::new(TracingVoicePlayer),
            settings.voice.language.clone(),
        ));
        app.register_observer(recorder.clone())?;
        app.register_observer(audio.clone())?;

        let surfaces = SurfaceSession::new();
        surfaces.register_observer(recorder.clone());

        let audio_rx = audio.subscribe();
        info!(
            "Headless runner ready for {} (language {})",
            settings.app.package_name, settings.voice.language
        );

        Ok(Self {
            settings,
            app,
            surfaces,
            audio,
            audio_rx,
            recorder,
        })
    }

    pub fn app(&self) -> &NavigationApp {
        &self.app
    }

    pub fn surfaces(&self) -> &SurfaceSession {
        &self.surfaces
    }

    pub fn audio(&self) -> &HeadlessAudio {
        &self.audio
    }

    /// Replay every step, handing each resulting event to `emit`
    ///
    /// Events produced while wiring the runner are emitted as step 0.
    pub async fn run(
        &mut self,
        scenario: &Scenario,
        mut emit: impl FnMut(HeadlessEvent),
    ) -> Result<()> {
        scenario.validate()?;
        info!(
            "Running scenario {} ({} steps)",
            scenario.name.as_deref().unwrap_or("<unnamed>"),
            scenario.steps.len()
        );

        self.flush(0, &mut emit);
        for (index, step) in scenario.steps.iter().enumerate() {
            let number = index + 1;
            debug!("Step {}: {:?}", number, step);
            self.apply(number, step).await?;
            tokio::task::yield_now().await;
            self.flush(number, &mut emit);
        }
        Ok(())
    }

    async fn apply(&self, number: usize, step: &Step) -> Result<()> {
        match step {
            Step::Activity {
                event,
                changing_configuration,
            } => {
                let lifecycle = self.app.lifecycle();
                lifecycle
                    .counters()
                    .check_activity(*event, *changing_configuration)
                    .map_err(|e| Error::scenario(number, e.to_string()))?;
                lifecycle.handle_activity(*event, *changing_configuration);
            }
            Step::Car { event } => {
                let lifecycle = self.app.lifecycle();
                lifecycle
                    .counters()
                    .check_car_session(*event)
                    .map_err(|e| Error::scenario(number, e.to_string()))?;
                lifecycle.handle_car_session(*event);
            }
            Step::SurfaceAvailable { width, height, dpi } => {
                let dpi = dpi.unwrap_or(self.settings.surface.dpi);
                let container = SurfaceContainer::new(*width, *height, dpi);
                let surface = CarMapSurface::new(container, Arc::new(HeadlessRenderTarget));
                self.surfaces.surface_available(surface);
            }
            Step::SurfaceDestroyed => self.surfaces.surface_destroyed(),
            Step::VisibleArea {
                left,
                top,
                right,
                bottom,
            } => {
                self.surfaces
                    .surface_visible_area_changed(Rect::new(*left, *top, *right, *bottom));
            }
            Step::RouteActive { active } => {
                self.engine(number)?.set_route_active(*active);
            }
            Step::VoiceInstruction { text, ssml } => {
                let mut instruction = VoiceInstruction::new(text.clone());
                if let Some(ssml) = ssml {
                    instruction = instruction.with_ssml(ssml.clone());
                }
                self.engine(number)?.publish_voice_instruction(instruction);
            }
            Step::Mute => self.audio.mute(),
            Step::Unmute => self.audio.unmute(),
            Step::Toggle => self.audio.toggle(),
            Step::Language { code } => self.audio.set_language(code.clone()),
            Step::Settle => self.audio.settle(SETTLE_QUIET).await,
        }
        Ok(())
    }

    fn engine(&self, number: usize) -> Result<Arc<NavigationEngine>> {
        self.app.current().ok_or_else(|| {
            Error::scenario(
                number,
                "no navigation engine; create an activity or car session first",
            )
        })
    }

    fn flush(&mut self, step: usize, emit: &mut impl FnMut(HeadlessEvent)) {
        for event in self.recorder.take() {
            emit(HeadlessEvent::new(step, event));
        }
        if self.audio_rx.has_changed().unwrap_or(false) {
            let state = self.audio_rx.borrow_and_update().clone();
            emit(HeadlessEvent::new(step, NavEvent::AudioStateChanged { state }));
        }
    }
}
