//! Error types for the navigation coordination core

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // ─────────────────────────────────────────────────────────────
    // Lifecycle/Wiring Errors
    // ─────────────────────────────────────────────────────────────
    /// A public operation was called in a state its contract forbids.
    ///
    /// Always a wiring mistake in the surrounding application.
    #[error("Illegal state: {message}")]
    IllegalState { message: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid configuration: {message}")]
    ConfigInvalid { message: String },

    // ─────────────────────────────────────────────────────────────
    // Collaborator Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Preference store error: {message}")]
    Preference { message: String },

    #[error("Speech playback error: {message}")]
    Speech { message: String },

    // ─────────────────────────────────────────────────────────────
    // Headless Scenario Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Scenario error at step {step}: {message}")]
    Scenario { step: usize, message: String },
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::IllegalState {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            message: message.into(),
        }
    }

    pub fn preference(message: impl Into<String>) -> Self {
        Self::Preference {
            message: message.into(),
        }
    }

    pub fn speech(message: impl Into<String>) -> Self {
        Self::Speech {
            message: message.into(),
        }
    }

    pub fn scenario(step: usize, message: impl Into<String>) -> Self {
        Self::Scenario {
            step,
            message: message.into(),
        }
    }

    /// Check if this is a recoverable error
    ///
    /// Recoverable errors come from collaborators (persisted preferences,
    /// speech playback) and are reported through logs, never thrown into
    /// an observer fan-out.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Preference { .. } | Error::Speech { .. } | Error::Io(_)
        )
    }

    /// Check if this error indicates a caller bug that must abort
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::IllegalState { .. } | Error::ConfigInvalid { .. } | Error::Scenario { .. }
        )
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}
