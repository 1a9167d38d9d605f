//! Persistent storage for alerts.
//!
//! Stores the alert index as a JSON file in the app data directory. Only the
//! alerts are written; the instant and event indexes are rebuilt on load.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::alerts::index::{AlertIndex, IndexSnapshot};

/// Reads and writes one alert index file.
pub struct AlertStore {
    /// Directory holding the alert file
    data_dir: PathBuf,
    file_name: String,
}

impl AlertStore {
    /// Create a new alert store.
    ///
    /// # Arguments
    /// * `data_dir` - Directory for the alert file (created on first save)
    /// * `file_name` - Name of the JSON file inside `data_dir`
    pub fn new(data_dir: PathBuf, file_name: impl Into<String>) -> Self {
        Self {
            data_dir,
            file_name: file_name.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.data_dir.join(&self.file_name)
    }

    /// Load the index from disk.
    ///
    /// A missing file gives an empty index; so does a file that no longer parses,
    /// after logging a warning.
    pub fn load(&self) -> io::Result<AlertIndex> {
        let path = self.path();
        if !path.exists() {
            return Ok(AlertIndex::new());
        }

        let content = fs::read_to_string(&path)?;
        let snapshot = match serde_json::from_str::<IndexSnapshot>(&content) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::warn!("Ignoring unreadable alert file {}: {}", path.display(), e);
                return Ok(AlertIndex::new());
            }
        };
        match AlertIndex::from_snapshot(snapshot) {
            Ok(index) => {
                log::info!("Loaded {} alerts from {}", index.len(), path.display());
                Ok(index)
            }
            Err(e) => {
                log::warn!("Ignoring alert file {}: {}", path.display(), e);
                Ok(AlertIndex::new())
            }
        }
    }

    /// Save the index to disk.
    pub fn save(&self, index: &AlertIndex) -> io::Result<()> {
        // Ensure directory exists
        fs::create_dir_all(&self.data_dir)?;

        let content = serde_json::to_string_pretty(&index.snapshot())?;
        fs::write(self.path(), content)?;
        log::debug!("Saved {} alerts to {}", index.len(), self.path().display());

        Ok(())
    }

    /// Delete the alert file if present.
    pub fn clear(&self) -> io::Result<()> {
        remove_if_exists(&self.path())
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
