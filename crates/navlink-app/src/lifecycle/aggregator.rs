//! Merges phone-activity and car-session lifecycles into one
//!
//! The phone activity stack and the projected car session each drive their
//! own platform callbacks. [`ForegroundLifecycle`] counts both and exposes a
//! single merged lifecycle:
//!
//! | Counters                                   | Merged state |
//! |--------------------------------------------|--------------|
//! | any activity or car session foregrounded   | `Resumed`    |
//! | any activity or car session created        | `Started`    |
//! | nothing created                            | `Created`    |
//!
//! Configuration changes (an activity destroyed and immediately recreated)
//! are absorbed by the `*_changing_configuration` counters and never reach
//! the merged lifecycle.
//!
//! Counter underflow and a second concurrent car session are wiring bugs in
//! the host application and abort via panic.

use std::sync::{Arc, Mutex, PoisonError};

use navlink_core::prelude::*;
use navlink_core::{ActivityEvent, CarSessionEvent, LifecycleState};
use tokio::sync::watch;

use super::registry::{LifecycleObserver, LifecycleRegistry};

/// Raw foreground bookkeeping behind the merged lifecycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForegroundCounters {
    pub activities_created: u32,
    pub activities_foregrounded: u32,
    pub created_changing_configuration: u32,
    pub foregrounded_changing_configuration: u32,
    pub car_created: u32,
    pub car_foregrounded: u32,
}

impl ForegroundCounters {
    /// Merged lifecycle state implied by these counters
    pub fn merged_state(&self) -> LifecycleState {
        if self.activities_foregrounded > 0 || self.car_foregrounded > 0 {
            LifecycleState::Resumed
        } else if self.activities_created > 0 || self.car_created > 0 {
            LifecycleState::Started
        } else {
            LifecycleState::Created
        }
    }

    /// Validate an activity callback against these counters without applying it
    pub fn check_activity(
        &self,
        event: ActivityEvent,
        changing_configuration: bool,
    ) -> Result<()> {
        let mut next = *self;
        next.apply_activity(event, changing_configuration)
            .map_err(Error::illegal_state)
    }

    /// Validate a car-session callback against these counters without applying it
    pub fn check_car_session(&self, event: CarSessionEvent) -> Result<()> {
        let mut next = *self;
        next.apply_car(event).map_err(Error::illegal_state)
    }

    fn apply_activity(
        &mut self,
        event: ActivityEvent,
        changing_configuration: bool,
    ) -> std::result::Result<(), String> {
        match event {
            ActivityEvent::Created => {
                if self.created_changing_configuration > 0 {
                    self.created_changing_configuration -= 1;
                } else {
                    self.activities_created += 1;
                }
            }
            ActivityEvent::Started => {
                if self.foregrounded_changing_configuration > 0 {
                    self.foregrounded_changing_configuration -= 1;
                } else {
                    self.activities_foregrounded += 1;
                }
            }
            ActivityEvent::Resumed | ActivityEvent::Paused => {}
            ActivityEvent::Stopped => {
                if self.activities_foregrounded == 0 {
                    return Err("activity stopped without a matching start".to_string());
                }
                if changing_configuration {
                    self.foregrounded_changing_configuration += 1;
                } else {
                    self.activities_foregrounded -= 1;
                }
            }
            ActivityEvent::Destroyed => {
                if self.activities_created == 0 {
                    return Err("activity destroyed without a matching create".to_string());
                }
                if changing_configuration {
                    self.created_changing_configuration += 1;
                } else {
                    self.activities_created -= 1;
                }
            }
        }
        Ok(())
    }

    fn apply_car(&mut self, event: CarSessionEvent) -> std::result::Result<(), String> {
        match event {
            CarSessionEvent::Created => {
                if self.car_created > 0 {
                    return Err("a car session is already created".to_string());
                }
                self.car_created = 1;
            }
            CarSessionEvent::Started => {
                if self.car_created == 0 {
                    return Err("car session started before it was created".to_string());
                }
                if self.car_foregrounded > 0 {
                    return Err("car session started twice".to_string());
                }
                self.car_foregrounded = 1;
            }
            CarSessionEvent::Stopped => {
                if self.car_foregrounded == 0 {
                    return Err("car session stopped without a matching start".to_string());
                }
                self.car_foregrounded = 0;
            }
            CarSessionEvent::Destroyed => {
                if self.car_created == 0 {
                    return Err("car session destroyed without a matching create".to_string());
                }
                if self.car_foregrounded > 0 {
                    return Err("car session destroyed while still started".to_string());
                }
                self.car_created = 0;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Inner {
    counters: ForegroundCounters,
    is_setup: bool,
}

/// Single merged lifecycle over every activity and the car session
#[derive(Debug)]
pub struct ForegroundLifecycle {
    inner: Mutex<Inner>,
    registry: LifecycleRegistry,
}

impl Default for ForegroundLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl ForegroundLifecycle {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            registry: LifecycleRegistry::new(),
        }
    }

    /// Leave `Initialized` and start publishing the merged state
    ///
    /// Events received before setup are counted, so setup jumps straight to
    /// whatever state they imply.
    pub fn setup(&self) {
        let target = {
            let mut inner = self.lock();
            if inner.is_setup {
                return;
            }
            inner.is_setup = true;
            inner.counters.merged_state()
        };
        info!("Foreground lifecycle set up, merged state {}", target);
        self.registry.move_to(target);
    }

    pub fn is_setup(&self) -> bool {
        self.lock().is_setup
    }

    pub fn current_state(&self) -> LifecycleState {
        self.registry.current_state()
    }

    pub fn counters(&self) -> ForegroundCounters {
        self.lock().counters
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.registry.subscribe()
    }

    pub fn add_observer(&self, observer: Arc<dyn LifecycleObserver>) {
        self.registry.add_observer(observer);
    }

    pub fn remove_observer(&self, observer: &Arc<dyn LifecycleObserver>) -> bool {
        self.registry.remove_observer(observer)
    }

    /// Feed a phone-activity callback
    ///
    /// `changing_configuration` is only consulted for `Stopped` and
    /// `Destroyed`; the paired `Started`/`Created` consumes the suppression
    /// counter instead.
    pub fn handle_activity(&self, event: ActivityEvent, changing_configuration: bool) {
        trace!(
            "Activity {:?} (changing_configuration={})",
            event,
            changing_configuration
        );
        let result = {
            let mut inner = self.lock();
            inner
                .counters
                .apply_activity(event, changing_configuration)
                .map(|()| (inner.is_setup, inner.counters))
        };
        self.settle(result);
    }

    /// Feed a car-session callback
    pub fn handle_car_session(&self, event: CarSessionEvent) {
        trace!("Car session {:?}", event);
        let result = {
            let mut inner = self.lock();
            inner
                .counters
                .apply_car(event)
                .map(|()| (inner.is_setup, inner.counters))
        };
        self.settle(result);
    }

    fn settle(&self, result: std::result::Result<(bool, ForegroundCounters), String>) {
        match result {
            Ok((is_setup, counters)) => {
                debug!("Foreground counters {:?}", counters);
                if is_setup {
                    self.registry.move_to(counters.merged_state());
                }
            }
            Err(message) => {
                error!("Foreground lifecycle invariant violated: {}", message);
                panic!("foreground lifecycle invariant violated: {message}");
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
