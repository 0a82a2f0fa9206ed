//! Ownership of the single shared navigation engine
//!
//! [`NavigationOwner`] follows the merged foreground lifecycle: it builds one
//! engine when the lifecycle reaches `Started` and tears it down on the way
//! back to `Created`. Registered observers are attached and detached in
//! registration order.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use navlink_core::prelude::*;

use super::engine::{AppContext, NavigationEngine, NavigationOptions};
use crate::lifecycle::LifecycleObserver;
use crate::observer_set::ObserverSet;

/// Produces engine options for each new foreground session
pub type OptionsInitializer = dyn Fn(&AppContext) -> NavigationOptions + Send + Sync;

/// Collaborator that needs the navigation engine while it exists
pub trait NavigationObserver: Send + Sync {
    /// The engine is available; called once per engine instance
    fn on_attached(&self, engine: &NavigationEngine);

    /// The engine is going away; drop everything derived from it
    fn on_detached(&self, engine: &NavigationEngine);
}

/// Creates, shares and destroys the navigation engine
pub struct NavigationOwner {
    context: AppContext,
    initializer: Mutex<Option<Arc<OptionsInitializer>>>,
    engine: Mutex<Option<Arc<NavigationEngine>>>,
    observers: ObserverSet<dyn NavigationObserver>,
    /// Observers that have seen `on_attached` for the current engine
    attached: ObserverSet<dyn NavigationObserver>,
    engines_created: AtomicUsize,
}

impl std::fmt::Debug for NavigationOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationOwner")
            .field("context", &self.context)
            .field("has_initializer", &self.is_setup())
            .field("engine", &self.current())
            .field("observers", &self.observers.len())
            .field("engines_created", &self.engines_created())
            .finish()
    }
}

impl NavigationOwner {
    pub fn new(context: AppContext) -> Self {
        Self {
            context,
            initializer: Mutex::new(None),
            engine: Mutex::new(None),
            observers: ObserverSet::new(),
            attached: ObserverSet::new(),
            engines_created: AtomicUsize::new(0),
        }
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub(crate) fn set_initializer(&self, initializer: Option<Arc<OptionsInitializer>>) {
        *self
            .initializer
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = initializer;
    }

    pub fn is_setup(&self) -> bool {
        self.initializer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Snapshot of the current engine handle
    pub fn current(&self) -> Option<Arc<NavigationEngine>> {
        self.engine_slot().clone()
    }

    /// Number of engines built over the owner's lifetime
    pub fn engines_created(&self) -> usize {
        self.engines_created.load(Ordering::Relaxed)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Register `observer`, attaching it at once if an engine exists
    ///
    /// Registering the same observer twice is a no-op.
    pub fn register(&self, observer: Arc<dyn NavigationObserver>) {
        if self.observers.contains(&observer) {
            return;
        }
        if let Some(engine) = self.current() {
            self.attached.insert(observer.clone());
            observer.on_attached(&engine);
        }
        self.observers.insert(observer);
    }

    /// Detach `observer` from the current engine, then forget it
    ///
    /// Unregistering an observer that was never registered does nothing, and
    /// an observer that was never attached is not detached.
    pub fn unregister(&self, observer: &Arc<dyn NavigationObserver>) {
        if !self.observers.contains(observer) {
            return;
        }
        if self.attached.remove(observer) {
            if let Some(engine) = self.current() {
                observer.on_detached(&engine);
            }
        }
        self.observers.remove(observer);
    }

    /// Build the engine and attach every registered observer
    fn create_engine(&self) {
        let initializer = self
            .initializer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(initializer) = initializer else {
            warn!("Lifecycle started but navigation owner has no initializer");
            return;
        };

        let options = initializer(&self.context);
        let engine = {
            let mut slot = self.engine_slot();
            if let Some(existing) = slot.as_ref() {
                let message = format!(
                    "navigation engine {} already exists; a previous foreground session was not torn down",
                    existing.id()
                );
                error!("{}", message);
                drop(slot);
                panic!("{message}");
            }
            let engine = Arc::new(NavigationEngine::new(options));
            *slot = Some(engine.clone());
            engine
        };
        self.engines_created.fetch_add(1, Ordering::Relaxed);
        info!("Navigation engine {} created", engine.id());

        for observer in self.observers.snapshot() {
            if self.observers.contains(&observer) && self.attached.insert(observer.clone()) {
                observer.on_attached(&engine);
            }
        }
    }

    /// Detach every observer and destroy the engine, if one exists
    ///
    /// The handle stays published until the fan-out finishes so an observer
    /// unregistered from inside another observer's `on_detached` is still
    /// detached exactly once.
    pub(crate) fn destroy_engine(&self) {
        let Some(engine) = self.current() else {
            return;
        };
        for observer in self.observers.snapshot() {
            if self.attached.remove(&observer) {
                observer.on_detached(&engine);
            }
        }
        self.engine_slot().take();
        // Anything registered while the fan-out ran was attached to this engine.
        for observer in self.attached.drain() {
            observer.on_detached(&engine);
        }
        engine.destroy();
    }

    fn engine_slot(&self) -> MutexGuard<'_, Option<Arc<NavigationEngine>>> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LifecycleObserver for NavigationOwner {
    fn on_start(&self) {
        self.create_engine();
    }

    fn on_stop(&self) {
        self.destroy_engine();
    }
}
