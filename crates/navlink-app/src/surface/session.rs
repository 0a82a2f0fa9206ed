//! The active car map surface and its geometry
//!
//! The car host hands the app one rendering surface at a time and reports
//! which part of it is unobstructed. [`SurfaceSession`] owns that surface,
//! derives [`EdgeInsets`] from the visible area, and fans surface events out
//! to [`CarMapObserver`]s. Observers registering late are replayed the
//! current surface and geometry before `register_observer` returns.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use navlink_core::prelude::*;
use navlink_core::{EdgeInsets, Rect, SurfaceContainer};

use crate::observer_set::ObserverSet;

/// Unique identifier for a car map surface
pub type SurfaceId = u64;

static NEXT_SURFACE_ID: AtomicU64 = AtomicU64::new(1);

/// Rendering resources behind a car map surface
pub trait RenderTarget: Send + Sync {
    fn stop(&self);
    fn surface_destroyed(&self);
    fn destroy(&self);
}

/// A car-projected map surface and the container it renders into
#[derive(Clone)]
pub struct CarMapSurface {
    id: SurfaceId,
    container: SurfaceContainer,
    target: Arc<dyn RenderTarget>,
}

impl std::fmt::Debug for CarMapSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CarMapSurface")
            .field("id", &self.id)
            .field("container", &self.container)
            .finish()
    }
}

impl PartialEq for CarMapSurface {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CarMapSurface {}

impl CarMapSurface {
    pub fn new(container: SurfaceContainer, target: Arc<dyn RenderTarget>) -> Self {
        Self {
            id: NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed),
            container,
            target,
        }
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }

    pub fn container(&self) -> SurfaceContainer {
        self.container
    }

    fn release(&self) {
        self.target.stop();
        self.target.surface_destroyed();
        self.target.destroy();
    }
}

/// Receives car map surface lifecycle and geometry events
pub trait CarMapObserver: Send + Sync {
    /// A surface is ready for rendering
    fn on_loaded(&self, _surface: &CarMapSurface) {}

    /// The unobstructed part of the surface changed
    fn on_visible_area_changed(&self, _visible_area: Rect, _edge_insets: EdgeInsets) {}

    /// The surface is gone; drop everything derived from it
    fn on_detached(&self, _surface: &CarMapSurface) {}
}

/// Immutable view of a surface slot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurfaceSnapshot {
    pub surface: Option<CarMapSurface>,
    pub visible_area: Option<Rect>,
    pub edge_insets: Option<EdgeInsets>,
}

impl SurfaceSnapshot {
    /// Visible area and insets, when both are known
    pub fn geometry(&self) -> Option<(Rect, EdgeInsets)> {
        self.visible_area.zip(self.edge_insets)
    }

    fn recompute_insets(&mut self) {
        self.edge_insets = match (&self.surface, &self.visible_area) {
            (Some(surface), Some(area)) => Some(surface.container().edge_insets(area)),
            _ => None,
        };
    }
}

/// Owns the single active car map surface
#[derive(Default)]
pub struct SurfaceSession {
    state: Mutex<SurfaceSnapshot>,
    observers: ObserverSet<dyn CarMapObserver>,
}

impl std::fmt::Debug for SurfaceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceSession")
            .field("state", &self.snapshot())
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl SurfaceSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> SurfaceSnapshot {
        self.state().clone()
    }

    pub fn surface(&self) -> Option<CarMapSurface> {
        self.state().surface.clone()
    }

    pub fn visible_area(&self) -> Option<Rect> {
        self.state().visible_area
    }

    pub fn edge_insets(&self) -> Option<EdgeInsets> {
        self.state().edge_insets
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Register `observer` and replay the current surface and geometry
    pub fn register_observer(&self, observer: Arc<dyn CarMapObserver>) {
        if !self.observers.insert(observer.clone()) {
            return;
        }
        let snapshot = self.snapshot();
        if let Some(surface) = &snapshot.surface {
            observer.on_loaded(surface);
        }
        if let Some((area, insets)) = snapshot.geometry() {
            observer.on_visible_area_changed(area, insets);
        }
    }

    /// Detach `observer` from the current surface, then forget it
    pub fn unregister_observer(&self, observer: &Arc<dyn CarMapObserver>) {
        if !self.observers.contains(observer) {
            return;
        }
        if let Some(surface) = self.surface() {
            observer.on_detached(&surface);
        }
        self.observers.remove(observer);
    }

    /// Install a new surface, detaching observers from the previous one first
    pub fn surface_available(&self, surface: CarMapSurface) {
        info!(
            "Car map surface {} available ({}x{} @ {}dpi)",
            surface.id(),
            surface.container().width,
            surface.container().height,
            surface.container().dpi
        );

        let old = {
            let mut state = self.state();
            let old = state.surface.take();
            state.recompute_insets();
            old
        };
        if let Some(old) = old {
            self.fan_out(|observer| observer.on_detached(&old));
        }

        self.state().surface = Some(surface.clone());
        self.state().recompute_insets();
        self.fan_out(|observer| observer.on_loaded(&surface));

        self.notify_visible_area();
    }

    /// Release the current surface's rendering resources and detach observers
    pub fn surface_destroyed(&self) {
        let old = {
            let mut state = self.state();
            let old = state.surface.take();
            state.recompute_insets();
            old
        };
        let Some(old) = old else {
            debug!("Surface destroyed with no surface loaded");
            return;
        };
        info!("Car map surface {} destroyed", old.id());
        old.release();
        self.fan_out(|observer| observer.on_detached(&old));
    }

    /// Record the unobstructed area and broadcast it if a surface is loaded
    pub fn surface_visible_area_changed(&self, visible_area: Rect) {
        debug!("Visible area changed to {}", visible_area);
        {
            let mut state = self.state();
            state.visible_area = Some(visible_area);
            state.recompute_insets();
        }
        self.notify_visible_area();
    }

    fn notify_visible_area(&self) {
        let Some((area, insets)) = self.state().geometry() else {
            return;
        };
        self.fan_out(|observer| observer.on_visible_area_changed(area, insets));
    }

    fn fan_out(&self, notify: impl Fn(&dyn CarMapObserver)) {
        for observer in self.observers.snapshot() {
            if self.observers.contains(&observer) {
                notify(observer.as_ref());
            }
        }
    }

    fn state(&self) -> MutexGuard<'_, SurfaceSnapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
