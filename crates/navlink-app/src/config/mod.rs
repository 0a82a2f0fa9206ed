//! Configuration file parsing for navlink
//!
//! Supports `.navlink/config.toml` in a project directory.

pub mod settings;
pub mod types;

pub use settings::{init_config_dir, load_settings, save_settings, CONFIG_FILENAME, NAVLINK_DIR};
pub use types::*;
