//! # navlink-core - Core Domain Types
//!
//! Foundation crate for navlink. Provides the error taxonomy, logging
//! bootstrap, lifecycle states, surface geometry and voice types shared by
//! the coordination layer.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, thiserror, toml, tracing).
//!
//! ## Public API
//!
//! ### Lifecycle (`lifecycle`)
//! - [`LifecycleState`] - Merged foreground state (Initialized, Created, Started, Resumed)
//! - [`LifecycleEvent`] - Single step between adjacent states
//! - [`ActivityEvent`], [`CarSessionEvent`] - Platform callbacks feeding the aggregator
//!
//! ### Geometry (`geometry`)
//! - [`Rect`] - Visible area of a car map surface
//! - [`SurfaceContainer`] - Container size and density
//! - [`EdgeInsets`] - Derived padding between container and visible area
//!
//! ### Voice (`voice`)
//! - [`VoiceInstruction`], [`VoiceInstructionsState`] - Engine output
//! - [`SpeechAnnouncement`] - A played utterance
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Error enum with `fatal` vs `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use navlink_core::prelude::*;
//! ```

pub mod error;
pub mod geometry;
pub mod lifecycle;
pub mod logging;
pub mod prelude;
pub mod voice;

pub use error::{Error, Result, ResultExt};
pub use geometry::{EdgeInsets, Rect, SurfaceContainer};
pub use lifecycle::{ActivityEvent, CarSessionEvent, LifecycleEvent, LifecycleState};
pub use voice::{SpeechAnnouncement, VoiceInstruction, VoiceInstructionsState};
