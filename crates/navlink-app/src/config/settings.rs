//! Settings loading and persistence for `.navlink/config.toml`

use std::path::Path;

use navlink_core::prelude::*;

use super::types::Settings;

pub const NAVLINK_DIR: &str = ".navlink";
pub const CONFIG_FILENAME: &str = "config.toml";

// ─────────────────────────────────────────────────────────────────────────────
// Settings Loading
// ─────────────────────────────────────────────────────────────────────────────

/// Load settings from .navlink/config.toml
///
/// Returns default settings if the file doesn't exist or can't be parsed.
pub fn load_settings(project_path: &Path) -> Settings {
    let config_path = project_path.join(NAVLINK_DIR).join(CONFIG_FILENAME);

    if !config_path.exists() {
        debug!("No config file at {:?}, using defaults", config_path);
        return Settings::default();
    }

    match std::fs::read_to_string(&config_path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                debug!("Loaded settings from {:?}", config_path);
                settings
            }
            Err(e) => {
                warn!("Failed to parse {:?}: {}", config_path, e);
                Settings::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", config_path, e);
            Settings::default()
        }
    }
}

/// Create .navlink/config.toml with commented defaults if it is missing
pub fn init_config_dir(project_path: &Path) -> Result<()> {
    let navlink_dir = project_path.join(NAVLINK_DIR);

    if !navlink_dir.exists() {
        std::fs::create_dir_all(&navlink_dir)
            .map_err(|e| Error::config(format!("Failed to create .navlink dir: {}", e)))?;
        info!("Created .navlink directory");
    }

    let config_path = navlink_dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        std::fs::write(&config_path, generate_default_config())
            .map_err(|e| Error::config(format!("Failed to write config.toml: {}", e)))?;
    }

    Ok(())
}

/// Save settings to .navlink/config.toml
///
/// Uses atomic write (temp file + rename).
pub fn save_settings(project_path: &Path, settings: &Settings) -> Result<()> {
    settings.validate()?;

    let navlink_dir = project_path.join(NAVLINK_DIR);
    if !navlink_dir.exists() {
        std::fs::create_dir_all(&navlink_dir)
            .map_err(|e| Error::config(format!("Failed to create .navlink dir: {}", e)))?;
    }

    let config_path = navlink_dir.join(CONFIG_FILENAME);
    let temp_path = navlink_dir.join(".config.toml.tmp");

    let content = toml::to_string_pretty(settings)
        .map_err(|e| Error::config(format!("Failed to serialize settings: {}", e)))?;
    let full_content = format!("{}{}", generate_config_header(), content);

    std::fs::write(&temp_path, &full_content)
        .map_err(|e| Error::config(format!("Failed to write temp file: {}", e)))?;
    std::fs::rename(&temp_path, &config_path)
        .map_err(|e| Error::config(format!("Failed to rename temp file: {}", e)))?;

    info!("Saved settings to {:?}", config_path);
    Ok(())
}

fn generate_config_header() -> String {
    "# navlink configuration\n# Generated by navlink\n\n".to_string()
}

fn generate_default_config() -> String {
    r#"# navlink configuration

[app]
package_name = "com.navlink.app"
# data_dir = "/path/to/data"    # Defaults to the platform data directory

[voice]
language = "en"
muted_by_default = false
preferences_file = "audio_guidance.toml"    # Relative to data_dir

[surface]
dpi = 160
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_settings_defaults() {
        let temp = tempdir().unwrap();
        let settings = load_settings(temp.path());

        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_settings_custom() {
        let temp = tempdir().unwrap();
        let navlink_dir = temp.path().join(".navlink");
        std::fs::create_dir_all(&navlink_dir).unwrap();

        let config = r#"
[app]
package_name = "com.example.drive"

[voice]
language = "de"
muted_by_default = true

[surface]
dpi = 240
"#;
        std::fs::write(navlink_dir.join("config.toml"), config).unwrap();

        let settings = load_settings(temp.path());

        assert_eq!(settings.app.package_name, "com.example.drive");
        assert_eq!(settings.voice.language, "de");
        assert!(settings.voice.muted_by_default);
        assert_eq!(settings.surface.dpi, 240);
    }

    #[test]
    fn test_load_settings_invalid_toml() {
        let temp = tempdir().unwrap();
        let navlink_dir = temp.path().join(".navlink");
        std::fs::create_dir_all(&navlink_dir).unwrap();

        std::fs::write(navlink_dir.join("config.toml"), "not valid toml {{{{").unwrap();

        let settings = load_settings(temp.path());
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_init_config_dir() {
        let temp = tempdir().unwrap();

        init_config_dir(temp.path()).unwrap();

        let content = std::fs::read_to_string(temp.path().join(".navlink/config.toml")).unwrap();
        let settings: Settings =
            toml::from_str(&content).expect("Default config should be valid TOML");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_init_config_dir_idempotent() {
        let temp = tempdir().unwrap();
        init_config_dir(temp.path()).unwrap();

        let config_path = temp.path().join(".navlink/config.toml");
        std::fs::write(&config_path, "[voice]\nlanguage = \"it\"\n").unwrap();

        init_config_dir(temp.path()).unwrap();

        let content = std::fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("language = \"it\""));
    }

    #[test]
    fn test_save_settings_round_trip() {
        let temp = tempdir().unwrap();
        let mut settings = Settings::default();
        settings.voice.language = "sv".to_string();
        settings.surface.dpi = 320;

        save_settings(temp.path(), &settings).unwrap();

        assert_eq!(load_settings(temp.path()), settings);
        assert!(!temp.path().join(".navlink/.config.toml.tmp").exists());
    }

    #[test]
    fn test_save_settings_rejects_invalid() {
        let temp = tempdir().unwrap();
        let mut settings = Settings::default();
        settings.voice.language.clear();

        let err = save_settings(temp.path(), &settings).unwrap_err();

        assert!(matches!(err, Error::ConfigInvalid { .. }));
        assert!(!temp.path().join(".navlink/config.toml").exists());
    }
}
