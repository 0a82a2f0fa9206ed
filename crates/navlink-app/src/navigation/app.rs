//! Application-wide entry point for the shared navigation engine
//!
//! One [`NavigationApp`] is built by the host application and passed to every
//! component that needs the engine. It wires a [`NavigationOwner`] to the
//! merged [`ForegroundLifecycle`] once [`setup`](NavigationApp::setup) has
//! supplied an options initializer.

use std::sync::Arc;

use navlink_core::prelude::*;

use super::engine::{AppContext, NavigationEngine, NavigationOptions};
use super::owner::{NavigationObserver, NavigationOwner, OptionsInitializer};
use crate::lifecycle::{ForegroundLifecycle, LifecycleObserver};

pub struct NavigationApp {
    lifecycle: Arc<ForegroundLifecycle>,
    owner: Arc<NavigationOwner>,
}

impl std::fmt::Debug for NavigationApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationApp")
            .field("lifecycle", &self.lifecycle.current_state())
            .field("owner", &self.owner)
            .finish()
    }
}

impl NavigationApp {
    /// Build an app with its own foreground lifecycle
    pub fn new(context: AppContext) -> Self {
        Self::with_lifecycle(context, Arc::new(ForegroundLifecycle::new()))
    }

    /// Build an app that follows an existing foreground lifecycle
    pub fn with_lifecycle(context: AppContext, lifecycle: Arc<ForegroundLifecycle>) -> Self {
        Self {
            lifecycle,
            owner: Arc::new(NavigationOwner::new(context)),
        }
    }

    /// Start following the foreground lifecycle
    ///
    /// `initializer` is called once per foreground session to configure the
    /// new engine. Calling `setup` again before [`disable`](Self::disable)
    /// is an error.
    pub fn setup<F>(&self, initializer: F) -> Result<()>
    where
        F: Fn(&AppContext) -> NavigationOptions + Send + Sync + 'static,
    {
        if self.owner.is_setup() {
            return Err(Error::illegal_state(
                "NavigationApp::setup called twice; call disable() first",
            ));
        }
        let initializer: Arc<OptionsInitializer> = Arc::new(initializer);
        self.owner.set_initializer(Some(initializer));

        info!(
            "Navigation app set up for {}",
            self.owner.context().package_name
        );
        self.lifecycle.add_observer(self.owner_as_lifecycle_observer());
        self.lifecycle.setup();
        Ok(())
    }

    /// Stop following the lifecycle and tear down any live engine
    ///
    /// Registered observers stay registered and are attached again after the
    /// next [`setup`](Self::setup) once the lifecycle starts.
    pub fn disable(&self) {
        if !self.owner.is_setup() {
            return;
        }
        self.lifecycle
            .remove_observer(&self.owner_as_lifecycle_observer());
        self.owner.destroy_engine();
        self.owner.set_initializer(None);
        info!("Navigation app disabled");
    }

    pub fn is_setup(&self) -> bool {
        self.owner.is_setup()
    }

    /// Register an engine observer
    ///
    /// Fails with [`Error::IllegalState`] before [`setup`](Self::setup).
    pub fn register_observer(&self, observer: Arc<dyn NavigationObserver>) -> Result<()> {
        if !self.owner.is_setup() {
            return Err(Error::illegal_state(
                "NavigationApp::register_observer called before setup",
            ));
        }
        self.owner.register(observer);
        Ok(())
    }

    /// Unregister an engine observer; unknown observers are ignored
    pub fn unregister_observer(&self, observer: &Arc<dyn NavigationObserver>) {
        self.owner.unregister(observer);
    }

    /// Snapshot of the live engine, if a foreground session is active
    pub fn current(&self) -> Option<Arc<NavigationEngine>> {
        self.owner.current()
    }

    pub fn lifecycle(&self) -> &Arc<ForegroundLifecycle> {
        &self.lifecycle
    }

    pub fn engines_created(&self) -> usize {
        self.owner.engines_created()
    }

    fn owner_as_lifecycle_observer(&self) -> Arc<dyn LifecycleObserver> {
        self.owner.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use navlink_core::{ActivityEvent, CarSessionEvent, LifecycleState};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Counting {
        attached: AtomicUsize,
        detached: AtomicUsize,
        engine_ids: Mutex<Vec<u64>>,
    }

    impl NavigationObserver for Counting {
        fn on_attached(&self, engine: &NavigationEngine) {
            self.attached.fetch_add(1, Ordering::SeqCst);
            self.engine_ids.lock().unwrap().push(engine.id());
        }

        fn on_detached(&self, _engine: &NavigationEngine) {
            self.detached.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn app() -> NavigationApp {
        NavigationApp::new(AppContext::new("com.example.nav", "/tmp/navlink"))
    }

    fn default_options(ctx: &AppContext) -> NavigationOptions {
        NavigationOptions::new(ctx.clone())
    }

    #[test]
    fn test_register_before_setup_fails() {
        let app = app();
        let err = app
            .register_observer(Arc::new(Counting::default()))
            .unwrap_err();

        assert!(matches!(err, Error::IllegalState { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_double_setup_fails() {
        let app = app();
        app.setup(default_options).unwrap();

        let err = app.setup(default_options).unwrap_err();
        assert!(matches!(err, Error::IllegalState { .. }));
    }

    #[test]
    fn test_setup_moves_lifecycle_to_created() {
        let app = app();
        assert_eq!(app.lifecycle().current_state(), LifecycleState::Initialized);

        app.setup(default_options).unwrap();

        assert_eq!(app.lifecycle().current_state(), LifecycleState::Created);
        assert!(app.current().is_none());
    }

    #[test]
    fn test_car_session_end_to_end() {
        let app = app();
        app.setup(default_options).unwrap();
        let observer = Arc::new(Counting::default());
        app.register_observer(observer.clone()).unwrap();

        app.lifecycle().handle_car_session(CarSessionEvent::Created);
        app.lifecycle().handle_car_session(CarSessionEvent::Started);
        assert_eq!(observer.attached.load(Ordering::SeqCst), 1);
        assert!(app.current().is_some());

        app.lifecycle().handle_car_session(CarSessionEvent::Stopped);
        app.lifecycle().handle_car_session(CarSessionEvent::Destroyed);
        assert_eq!(observer.detached.load(Ordering::SeqCst), 1);
        assert!(app.current().is_none());
        assert_eq!(app.engines_created(), 1);
    }

    #[test]
    fn test_setup_after_activity_created_builds_engine() {
        let app = app();
        app.lifecycle()
            .handle_activity(ActivityEvent::Created, false);

        app.setup(default_options).unwrap();

        assert!(app.current().is_some());
        assert_eq!(app.engines_created(), 1);
    }

    #[test]
    fn test_initializer_receives_context() {
        let app = app();
        let seen = Arc::new(Mutex::new(None));
        let seen_in_init = seen.clone();
        app.setup(move |ctx| {
            *seen_in_init.lock().unwrap() = Some(ctx.package_name.clone());
            NavigationOptions::new(ctx.clone()).with_voice_buffer(8)
        })
        .unwrap();

        app.lifecycle()
            .handle_activity(ActivityEvent::Created, false);

        assert_eq!(seen.lock().unwrap().as_deref(), Some("com.example.nav"));
        assert_eq!(app.current().unwrap().options().voice_buffer, 8);
    }

    #[test]
    fn test_disable_detaches_and_allows_setup_again() {
        let app = app();
        app.setup(default_options).unwrap();
        let observer = Arc::new(Counting::default());
        app.register_observer(observer.clone()).unwrap();
        app.lifecycle()
            .handle_activity(ActivityEvent::Created, false);
        assert_eq!(observer.attached.load(Ordering::SeqCst), 1);

        app.disable();
        assert_eq!(observer.detached.load(Ordering::SeqCst), 1);
        assert!(app.current().is_none());
        assert!(!app.is_setup());

        app.setup(default_options).unwrap();
        assert_eq!(observer.attached.load(Ordering::SeqCst), 2);
        let ids = observer.engine_ids.lock().unwrap().clone();
        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn test_unregister_unknown_is_noop() {
        let app = app();
        app.setup(default_options).unwrap();
        let stranger: Arc<dyn NavigationObserver> = Arc::new(Counting::default());

        app.unregister_observer(&stranger);
    }
}
