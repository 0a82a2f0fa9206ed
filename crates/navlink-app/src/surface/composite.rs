//! Tree of car map observers sharing one registration
//!
//! A screen usually has several widgets that all need the map surface. A
//! [`CompositeSurfaceObserver`] is registered once with the
//! [`SurfaceSession`](super::SurfaceSession) and forwards every event to its
//! own handler first, then to each child in insertion order. Children may be
//! composites themselves, giving a preorder traversal of the whole tree.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use navlink_core::{EdgeInsets, Rect};

use super::session::{CarMapObserver, CarMapSurface, SurfaceSnapshot};

#[derive(Default)]
pub struct CompositeSurfaceObserver {
    handler: Option<Arc<dyn CarMapObserver>>,
    children: Vec<Arc<dyn CarMapObserver>>,
    state: Mutex<SurfaceSnapshot>,
}

impl std::fmt::Debug for CompositeSurfaceObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeSurfaceObserver")
            .field("has_handler", &self.handler.is_some())
            .field("children", &self.children.len())
            .field("state", &*self.state())
            .finish()
    }
}

impl CompositeSurfaceObserver {
    /// A composite with no handler of its own
    pub fn new() -> Self {
        Self::default()
    }

    /// A composite whose own `handler` runs before any child
    pub fn with_handler(handler: Arc<dyn CarMapObserver>) -> Self {
        Self {
            handler: Some(handler),
            ..Self::default()
        }
    }

    pub fn with_child(mut self, child: Arc<dyn CarMapObserver>) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(&self) -> &[Arc<dyn CarMapObserver>] {
        &self.children
    }

    /// Surface and geometry last seen by this node
    pub fn snapshot(&self) -> SurfaceSnapshot {
        self.state().clone()
    }

    fn forward(&self, notify: impl Fn(&dyn CarMapObserver)) {
        if let Some(handler) = &self.handler {
            notify(handler.as_ref());
        }
        for child in &self.children {
            notify(child.as_ref());
        }
    }

    fn state(&self) -> MutexGuard<'_, SurfaceSnapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CarMapObserver for CompositeSurfaceObserver {
    fn on_loaded(&self, surface: &CarMapSurface) {
        self.state().surface = Some(surface.clone());
        self.forward(|observer| observer.on_loaded(surface));
    }

    fn on_visible_area_changed(&self, visible_area: Rect, edge_insets: EdgeInsets) {
        {
            let mut state = self.state();
            state.visible_area = Some(visible_area);
            state.edge_insets = Some(edge_insets);
        }
        self.forward(|observer| observer.on_visible_area_changed(visible_area, edge_insets));
    }

    fn on_detached(&self, surface: &CarMapSurface) {
        *self.state() = SurfaceSnapshot::default();
        self.forward(|observer| observer.on_detached(surface));
    }
}
