//! Observable lifecycle with ordered state walks

use std::sync::{Arc, Mutex, PoisonError};

use navlink_core::prelude::*;
use navlink_core::{LifecycleEvent, LifecycleState};
use tokio::sync::watch;

use crate::observer_set::ObserverSet;

/// Receives lifecycle steps from a [`LifecycleRegistry`]
///
/// Every step between two states is delivered, in order, so an observer
/// never sees `on_resume` without a preceding `on_start`.
pub trait LifecycleObserver: Send + Sync {
    fn on_create(&self) {}
    fn on_start(&self) {}
    fn on_resume(&self) {}
    fn on_pause(&self) {}
    fn on_stop(&self) {}
}

fn dispatch(observer: &dyn LifecycleObserver, event: LifecycleEvent) {
    match event {
        LifecycleEvent::OnCreate => observer.on_create(),
        LifecycleEvent::OnStart => observer.on_start(),
        LifecycleEvent::OnResume => observer.on_resume(),
        LifecycleEvent::OnPause => observer.on_pause(),
        LifecycleEvent::OnStop => observer.on_stop(),
    }
}

/// Holds a lifecycle state and walks observers through every transition
pub struct LifecycleRegistry {
    state: Mutex<LifecycleState>,
    observers: ObserverSet<dyn LifecycleObserver>,
    state_tx: watch::Sender<LifecycleState>,
}

impl std::fmt::Debug for LifecycleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleRegistry")
            .field("state", &self.current_state())
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Default for LifecycleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleRegistry {
    pub fn new() -> Self {
        let (state_tx, _) = watch::channel(LifecycleState::Initialized);
        Self {
            state: Mutex::new(LifecycleState::Initialized),
            observers: ObserverSet::new(),
            state_tx,
        }
    }

    pub fn current_state(&self) -> LifecycleState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Watch the state from async code
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state_tx.subscribe()
    }

    /// Register `observer` and walk it up to the current state
    pub fn add_observer(&self, observer: Arc<dyn LifecycleObserver>) {
        if !self.observers.insert(observer.clone()) {
            return;
        }
        let target = self.current_state();
        let mut reached = LifecycleState::Initialized;
        while reached < target {
            let Some(event) = LifecycleEvent::up_from(reached) else {
                break;
            };
            dispatch(observer.as_ref(), event);
            reached = event.target_state();
        }
    }

    /// Unregister `observer` without delivering any further step
    pub fn remove_observer(&self, observer: &Arc<dyn LifecycleObserver>) -> bool {
        self.observers.remove(observer)
    }

    /// Move to `target`, dispatching each intermediate step to all observers
    ///
    /// Walking down never goes below `Created`; asking for `Initialized`
    /// after the registry has been created is a no-op.
    pub fn move_to(&self, target: LifecycleState) {
        loop {
            let current = self.current_state();
            let event = if current < target {
                LifecycleEvent::up_from(current)
            } else if current > target {
                LifecycleEvent::down_from(current)
            } else {
                None
            };
            let Some(event) = event else {
                return;
            };

            let next = event.target_state();
            *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
            self.state_tx.send_replace(next);
            debug!("Lifecycle {} -> {} ({:?})", current, next, event);

            for observer in self.observers.snapshot() {
                dispatch(observer.as_ref(), event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<&'static str>>,
    }

    impl Recorder {
        fn take(&self) -> Vec<&'static str> {
            std::mem::take(&mut *self.events.lock().unwrap())
        }
        fn push(&self, name: &'static str) {
            self.events.lock().unwrap().push(name);
        }
    }

    impl LifecycleObserver for Recorder {
        fn on_create(&self) {
            self.push("create");
        }
        fn on_start(&self) {
            self.push("start");
        }
        fn on_resume(&self) {
            self.push("resume");
        }
        fn on_pause(&self) {
            self.push("pause");
        }
        fn on_stop(&self) {
            self.push("stop");
        }
    }

    #[test]
    fn test_move_up_dispatches_each_step() {
        let registry = LifecycleRegistry::new();
        let recorder = Arc::new(Recorder::default());
        registry.add_observer(recorder.clone());

        registry.move_to(LifecycleState::Resumed);

        assert_eq!(recorder.take(), vec!["create", "start", "resume"]);
        assert_eq!(registry.current_state(), LifecycleState::Resumed);
    }

    #[test]
    fn test_move_down_stops_at_created() {
        let registry = LifecycleRegistry::new();
        registry.move_to(LifecycleState::Resumed);
        let recorder = Arc::new(Recorder::default());
        registry.add_observer(recorder.clone());
        recorder.take();

        registry.move_to(LifecycleState::Initialized);

        assert_eq!(recorder.take(), vec!["pause", "stop"]);
        assert_eq!(registry.current_state(), LifecycleState::Created);
    }

    #[test]
    fn test_late_observer_is_walked_to_current_state() {
        let registry = LifecycleRegistry::new();
        registry.move_to(LifecycleState::Started);

        let recorder = Arc::new(Recorder::default());
        registry.add_observer(recorder.clone());

        assert_eq!(recorder.take(), vec!["create", "start"]);
    }

    #[test]
    fn test_same_state_is_noop() {
        let registry = LifecycleRegistry::new();
        registry.move_to(LifecycleState::Started);
        let recorder = Arc::new(Recorder::default());
        registry.add_observer(recorder.clone());
        recorder.take();

        registry.move_to(LifecycleState::Started);

        assert!(recorder.take().is_empty());
    }

    #[test]
    fn test_removed_observer_gets_nothing() {
        let registry = LifecycleRegistry::new();
        let recorder = Arc::new(Recorder::default());
        let as_observer: Arc<dyn LifecycleObserver> = recorder.clone();
        registry.add_observer(as_observer.clone());
        assert!(registry.remove_observer(&as_observer));

        registry.move_to(LifecycleState::Resumed);

        assert!(recorder.take().is_empty());
    }

    #[tokio::test]
    async fn test_subscribe_sees_latest_state() {
        let registry = LifecycleRegistry::new();
        let mut rx = registry.subscribe();

        registry.move_to(LifecycleState::Started);

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), LifecycleState::Started);
    }
}
