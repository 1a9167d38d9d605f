use std::path::PathBuf;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;

use super::parser::IntervalUnit;
use super::store::AlertStore;

/// Application settings for alert storage and input handling.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    pub data_dir: PathBuf,
    #[serde(default = "default_alerts_file")]
    pub alerts_file: String,
    /// chrono format for entered alert times
    #[serde(default = "default_entry_time_format")]
    pub entry_time_format: String,
    /// Unit applied to intervals entered as a bare number
    #[serde(default)]
    pub default_interval_unit: IntervalUnit,
}

fn default_alerts_file() -> String {
    "alerts.json".to_string()
}

fn default_entry_time_format() -> String {
    "%d/%m/%Y %H:%M".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string());

        Self {
            data_dir: PathBuf::from(home).join(".event-alerts"),
            alerts_file: default_alerts_file(),
            entry_time_format: default_entry_time_format(),
            default_interval_unit: IntervalUnit::Days,
        }
    }
}

impl Settings {
    /// Alert store described by these settings.
    pub fn store(&self) -> AlertStore {
        AlertStore::new(self.data_dir.clone(), self.alerts_file.clone())
    }
}

pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new(app_config_dir: PathBuf) -> Self {
        Self {
            config_path: app_config_dir.join("settings.json"),
        }
    }

    pub fn load(&self) -> Settings {
        if self.config_path.exists() {
            match fs::read_to_string(&self.config_path).map(|c| serde_json::from_str(&c)) {
                Ok(Ok(settings)) => return settings,
                Ok(Err(e)) => {
                    log::warn!("Invalid settings in {}: {}", self.config_path.display(), e);
                }
                Err(e) => log::warn!("Cannot read {}: {}", self.config_path.display(), e),
            }
        }
        Settings::default()
    }

    pub fn save(&self, settings: &Settings) -> io::Result<()> {
        // Ensure directory exists
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(settings)?;
        fs::write(&self.config_path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::alerts::index::AlertIndex;
    use crate::core::model::EventInfo;
    use crate::core::parser::{parse_entry_time, parse_interval};
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let manager = ConfigManager::new(dir.path().to_path_buf());

        let default = manager.load();
        assert_eq!(default.alerts_file, "alerts.json");
        assert_eq!(default.default_interval_unit, IntervalUnit::Days);

        let new_settings = Settings {
            data_dir: PathBuf::from("/tmp/alerts"),
            alerts_file: "team.json".to_string(),
            entry_time_format: "%Y-%m-%d %H:%M".to_string(),
            default_interval_unit: IntervalUnit::Hours,
        };

        manager.save(&new_settings).unwrap();
        let loaded = manager.load();

        assert_eq!(loaded, new_settings);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("settings.json"), r#"{"data_dir": "/tmp/x"}"#).unwrap();

        let loaded = ConfigManager::new(dir.path().to_path_buf()).load();
        assert_eq!(loaded.data_dir, PathBuf::from("/tmp/x"));
        assert_eq!(loaded.entry_time_format, "%d/%m/%Y %H:%M");
    }

    #[test]
    fn test_settings_drive_input_and_storage() {
        let dir = tempdir().unwrap();
        let settings = Settings {
            data_dir: dir.path().to_path_buf(),
            default_interval_unit: IntervalUnit::Hours,
            ..Settings::default()
        };

        let start = parse_entry_time("10/01/2024 10:00", &settings.entry_time_format).unwrap();
        let now = parse_entry_time("08/01/2024 10:00", &settings.entry_time_format).unwrap();
        let interval = parse_interval("12", settings.default_interval_unit).unwrap();

        let mut index = AlertIndex::new();
        let event = EventInfo::new("standup", "Standup", start);
        index.add_recurring_alert(&event, "Twice a day", interval, now).unwrap();

        let store = settings.store();
        store.save(&index).unwrap();
        assert!(dir.path().join("alerts.json").exists());
        assert_eq!(store.load().unwrap().len(), 1);
    }
}
