//! Preference store implementations
//!
//! - [`MemoryPreferenceStore`] keeps the value in process, for tests and
//!   hosts that persist preferences elsewhere.
//! - [`FilePreferenceStore`] persists the value as a small TOML file.

use std::path::{Path, PathBuf};

use navlink_core::prelude::*;
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};

use super::services::PreferenceStore;

/// On-disk shape of the audio guidance preference file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct PersistedPreferences {
    muted: bool,
}

fn publish(tx: &watch::Sender<bool>, muted: bool) {
    tx.send_if_modified(|current| {
        if *current == muted {
            false
        } else {
            *current = muted;
            true
        }
    });
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory store
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct MemoryPreferenceStore {
    muted_tx: watch::Sender<bool>,
}

impl MemoryPreferenceStore {
    pub fn new(muted: bool) -> Self {
        let (muted_tx, _) = watch::channel(muted);
        Self { muted_tx }
    }

    pub fn is_muted(&self) -> bool {
        *self.muted_tx.borrow()
    }
}

impl Default for MemoryPreferenceStore {
    fn default() -> Self {
        Self::new(false)
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn subscribe_muted(&self) -> watch::Receiver<bool> {
        self.muted_tx.subscribe()
    }

    async fn restore(&self) -> Result<bool> {
        Ok(self.is_muted())
    }

    async fn set_muted(&self, muted: bool) -> Result<()> {
        publish(&self.muted_tx, muted);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File-backed store
// ─────────────────────────────────────────────────────────────────────────────

/// Preference store persisted as `muted = <bool>` in a TOML file
#[derive(Debug)]
pub struct FilePreferenceStore {
    path: PathBuf,
    default_muted: bool,
    muted_tx: watch::Sender<bool>,
    write_lock: Mutex<()>,
}

impl FilePreferenceStore {
    /// Store backed by `path`; `default_muted` applies until the file exists
    pub fn new(path: impl Into<PathBuf>, default_muted: bool) -> Self {
        let (muted_tx, _) = watch::channel(default_muted);
        Self {
            path: path.into(),
            default_muted,
            muted_tx,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_persisted(&self) -> Result<Option<bool>> {
        if !tokio::fs::try_exists(&self.path).await? {
            debug!("No audio preference file at {:?}", self.path);
            return Ok(None);
        }
        let content = tokio::fs::read_to_string(&self.path).await?;
        let persisted: PersistedPreferences = toml::from_str(&content).map_err(|e| {
            Error::preference(format!("Failed to parse {:?}: {}", self.path, e))
        })?;
        Ok(Some(persisted.muted))
    }

    async fn write_persisted(&self, muted: bool) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                Error::preference(format!("Failed to create {:?}: {}", dir, e))
            })?;
        }

        let content = toml::to_string_pretty(&PersistedPreferences { muted })?;
        let temp_path = self.path.with_extension("toml.tmp");

        tokio::fs::write(&temp_path, content)
            .await
            .map_err(|e| Error::preference(format!("Failed to write temp file: {}", e)))?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| Error::preference(format!("Failed to rename temp file: {}", e)))?;

        debug!("Saved audio preference to {:?}", self.path);
        Ok(())
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn subscribe_muted(&self) -> watch::Receiver<bool> {
        self.muted_tx.subscribe()
    }

    async fn restore(&self) -> Result<bool> {
        let muted = self.read_persisted().await?.unwrap_or(self.default_muted);
        publish(&self.muted_tx, muted);
        Ok(muted)
    }

    async fn set_muted(&self, muted: bool) -> Result<()> {
        self.write_persisted(muted).await?;
        publish(&self.muted_tx, muted);
        Ok(())
    }
}
