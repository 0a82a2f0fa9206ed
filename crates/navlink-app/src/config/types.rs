//! Configuration types for navlink
//!
//! Defines:
//! - `Settings` - Top-level `.navlink/config.toml` contents
//! - `AppSettings`, `VoiceSettings`, `SurfaceSettings` - Per-section settings

use std::path::PathBuf;

use navlink_core::prelude::*;
use serde::{Deserialize, Serialize};

use crate::navigation::AppContext;

/// Global application settings from `.navlink/config.toml`
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub app: AppSettings,

    #[serde(default)]
    pub voice: VoiceSettings,

    #[serde(default)]
    pub surface: SurfaceSettings,
}

impl Settings {
    /// Reject settings the coordination core cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.app.package_name.trim().is_empty() {
            return Err(Error::config_invalid("app.package_name must not be empty"));
        }
        if self.voice.language.trim().is_empty() {
            return Err(Error::config_invalid("voice.language must not be empty"));
        }
        if self.voice.preferences_file.as_os_str().is_empty() {
            return Err(Error::config_invalid(
                "voice.preferences_file must not be empty",
            ));
        }
        Ok(())
    }

    /// Directory for persisted runtime data
    pub fn data_dir(&self) -> PathBuf {
        self.app.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    /// Full path of the audio guidance preference file
    ///
    /// Relative `preferences_file` values resolve against [`data_dir`](Self::data_dir).
    pub fn preferences_path(&self) -> PathBuf {
        self.data_dir().join(&self.voice.preferences_file)
    }

    /// Context handed to the engine options initializer
    pub fn app_context(&self) -> AppContext {
        AppContext::new(self.app.package_name.clone(), self.data_dir())
    }
}

/// Application identity and storage
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AppSettings {
    #[serde(default = "default_package_name")]
    pub package_name: String,

    /// Defaults to the platform local data directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            package_name: default_package_name(),
            data_dir: None,
        }
    }
}

/// Audio guidance settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct VoiceSettings {
    /// Initial announcement language
    #[serde(default = "default_language")]
    pub language: String,

    /// Preference value used until one has been persisted
    #[serde(default)]
    pub muted_by_default: bool,

    #[serde(default = "default_preferences_file")]
    pub preferences_file: PathBuf,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            language: default_language(),
            muted_by_default: false,
            preferences_file: default_preferences_file(),
        }
    }
}

/// Car map surface defaults
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SurfaceSettings {
    /// Container density when a surface does not report one
    #[serde(default = "default_dpi")]
    pub dpi: u32,
}

impl Default for SurfaceSettings {
    fn default() -> Self {
        Self { dpi: default_dpi() }
    }
}

fn default_package_name() -> String {
    "com.navlink.app".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_preferences_file() -> PathBuf {
    PathBuf::from("audio_guidance.toml")
}

fn default_dpi() -> u32 {
    160
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("navlink")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::default();

        assert_eq!(settings.app.package_name, "com.navlink.app");
        assert_eq!(settings.voice.language, "en");
        assert!(!settings.voice.muted_by_default);
        assert_eq!(settings.surface.dpi, 160);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let settings: Settings = toml::from_str("[voice]\nlanguage = \"fr\"\n").unwrap();

        assert_eq!(settings.voice.language, "fr");
        assert_eq!(
            settings.voice.preferences_file,
            PathBuf::from("audio_guidance.toml")
        );
        assert_eq!(settings.app.package_name, "com.navlink.app");
    }

    #[test]
    fn test_empty_language_is_invalid() {
        let mut settings = Settings::default();
        settings.voice.language = "  ".to_string();

        let err = settings.validate().unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid { .. }));
    }

    #[test]
    fn test_empty_package_name_is_invalid() {
        let mut settings = Settings::default();
        settings.app.package_name.clear();

        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_preferences_path_resolves_against_data_dir() {
        let mut settings = Settings::default();
        settings.app.data_dir = Some(PathBuf::from("/var/lib/navlink"));

        assert_eq!(
            settings.preferences_path(),
            PathBuf::from("/var/lib/navlink/audio_guidance.toml")
        );
        assert_eq!(
            settings.app_context(),
            AppContext::new("com.navlink.app", "/var/lib/navlink")
        );
    }
}
