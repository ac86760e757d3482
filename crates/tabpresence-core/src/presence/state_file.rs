//! Presence state file.
//!
//! Writes the current presence payload to a JSON file so that a separate
//! bridge process can forward it to the remote presence service. The file
//! exists only while something is being published.

use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{Presence, PresenceError, PresencePublisher};
use crate::browsers::BrowserState;

/// Default location of the presence state file
pub fn default_state_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("tabpresence")
        .join("presence.json")
}

/// On-disk document
#[derive(Debug, Serialize)]
struct PresenceDocument<'a> {
    /// Application id the bridge should publish under
    #[serde(skip_serializing_if = "str::is_empty")]
    application_id: &'a str,
    presence: &'a Presence,
    url: &'a str,
}

/// Publisher that mirrors presence into a JSON state file
pub struct FilePublisher {
    path: PathBuf,
    application_id: String,
    connected: bool,
}

impl FilePublisher {
    pub fn new(path: impl Into<PathBuf>, application_id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            application_id: application_id.into(),
            connected: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write atomically through a temp file so readers never see a partial
    /// document
    fn write(&self, presence: &Presence, url: &str) -> Result<(), PresenceError> {
        let doc = PresenceDocument {
            application_id: &self.application_id,
            presence,
            url,
        };
        let json = serde_json::to_string_pretty(&doc)?;

        let temp_path = self.path.with_extension("tmp");
        let _ = fs::remove_file(&temp_path);

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;

        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }

    fn remove(&self) -> Result<(), PresenceError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl PresencePublisher for FilePublisher {
    fn name(&self) -> &str {
        "file"
    }

    fn initialize(&mut self) -> Result<(), PresenceError> {
        let dir = self.path.parent().ok_or_else(|| {
            PresenceError::Unavailable(format!("invalid state file path: {:?}", self.path))
        })?;
        fs::create_dir_all(dir).map_err(|e| {
            PresenceError::Unavailable(format!("cannot create {:?}: {}", dir, e))
        })?;

        // Stale file from a previous run
        self.remove()?;
        self.connected = true;
        info!("Presence state file: {:?}", self.path);
        Ok(())
    }

    fn publish(&mut self, state: &BrowserState) -> Result<(), PresenceError> {
        if !self.connected {
            return Err(PresenceError::NotConnected);
        }
        self.write(&Presence::from_state(state), &state.url)?;
        debug!("Wrote presence for {} to {:?}", state.browser_name, self.path);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), PresenceError> {
        if !self.connected {
            return Ok(());
        }
        self.remove()
    }

    fn dispose(&mut self) {
        if let Err(e) = self.clear() {
            debug!("Failed to remove presence state file: {}", e);
        }
        self.connected = false;
    }
}
