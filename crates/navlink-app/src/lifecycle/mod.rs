//! Lifecycle tracking for the phone and car foreground contexts

pub mod aggregator;
pub mod registry;

pub use aggregator::{ForegroundCounters, ForegroundLifecycle};
pub use registry::{LifecycleObserver, LifecycleRegistry};
