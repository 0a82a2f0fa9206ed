//! Surface geometry: visible areas, containers and the insets between them

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in container pixels
///
/// `right` and `bottom` are exclusive edges, matching platform rect
/// conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Rectangle covering a whole `width` x `height` container
    ///
    /// Sizes beyond `i32::MAX` are clamped.
    pub fn from_size(width: u32, height: u32) -> Self {
        let clamp = |v: u32| i32::try_from(v).unwrap_or(i32::MAX);
        Self::new(0, 0, clamp(width), clamp(height))
    }

    pub fn width(&self) -> i32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> i32 {
        self.bottom.saturating_sub(self.top)
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Rect({}, {} - {}, {})",
            self.left, self.top, self.right, self.bottom
        )
    }
}

/// Size and density of the container a car map surface renders into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceContainer {
    pub width: u32,
    pub height: u32,
    pub dpi: u32,
}

impl SurfaceContainer {
    pub fn new(width: u32, height: u32, dpi: u32) -> Self {
        Self { width, height, dpi }
    }

    /// Insets from each container edge to `visible_area`
    pub fn edge_insets(&self, visible_area: &Rect) -> EdgeInsets {
        EdgeInsets {
            top: f64::from(visible_area.top),
            left: f64::from(visible_area.left),
            bottom: f64::from(self.height) - f64::from(visible_area.bottom),
            right: f64::from(self.width) - f64::from(visible_area.right),
        }
    }
}

/// Padding in logical units between a container's edges and its visible
/// sub-rectangle
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EdgeInsets {
    pub top: f64,
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
}

impl EdgeInsets {
    pub fn new(top: f64, left: f64, bottom: f64, right: f64) -> Self {
        Self {
            top,
            left,
            bottom,
            right,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.top == 0.0 && self.left == 0.0 && self.bottom == 0.0 && self.right == 0.0
    }
}
