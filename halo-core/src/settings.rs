//! User settings persistence via TOML.
//!
//! Settings are stored at `<config_dir>/halodrive/settings.toml`.
//! A missing file yields defaults; a corrupted one yields defaults and a warning.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::present::DEFAULT_CAPACITY;
use crate::store::engine::StoreOptions;

pub const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root of all persisted state: the file store and the session value.
    pub data_dir: PathBuf,
    /// Capacity shown in the usage bar. Not enforced.
    pub capacity_bytes: u64,
    pub compression_level: i32,
    pub min_gain: f32,
    /// Used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        let data_dir = project_dirs()
            .map(|d| d.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("halodrive-data"));
        let store = StoreOptions::default();
        Self {
            data_dir,
            capacity_bytes: DEFAULT_CAPACITY,
            compression_level: store.compression_level,
            min_gain: store.min_gain,
            log_filter: "warn".to_string(),
        }
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", "halodrive")
}

impl Settings {
    /// Default location of the settings file, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|d| d.config_dir().join(SETTINGS_FILE))
    }

    /// Load from `path`, or from the default location when `None`.
    pub fn load(path: Option<&Path>) -> Self {
        match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(p) => Self::load_from(&p),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(settings) => {
                    tracing::debug!(path = %path.display(), "settings loaded");
                    settings
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "corrupted settings file, using defaults"
                    );
                    Self::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "settings file not found, using defaults");
                Self::default()
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to read settings file, using defaults"
                );
                Self::default()
            }
        }
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            compression_level: self.compression_level,
            min_gain: self.min_gain,
        }
    }

    /// Directory of the record store inside the data dir.
    pub fn store_dir(&self) -> PathBuf {
        self.data_dir.join("drive")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn written_file_is_loaded() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cfg").join(SETTINGS_FILE);
        let settings = Settings {
            data_dir: tmp.path().join("data"),
            capacity_bytes: 1024,
            compression_level: 9,
            min_gain: 0.1,
            log_filter: "halo_core=debug".into(),
        };
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, toml::to_string_pretty(&settings).unwrap()).unwrap();
        assert_eq!(Settings::load(Some(&path)), settings);
    }

    #[test]
    fn missing_file_returns_defaults() {
        let tmp = TempDir::new().unwrap();
        let loaded = Settings::load_from(&tmp.path().join("nope.toml"));
        assert_eq!(loaded, Settings::default());
    }

    #[test]
    fn corrupted_file_returns_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(SETTINGS_FILE);
        std::fs::write(&path, "capacity_bytes = [not toml").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(SETTINGS_FILE);
        std::fs::write(&path, "capacity_bytes = 2048\n").unwrap();
        let loaded = Settings::load_from(&path);
        assert_eq!(loaded.capacity_bytes, 2048);
        assert_eq!(loaded.log_filter, "warn");
        assert_eq!(loaded.store_options(), StoreOptions::default());
    }
}
