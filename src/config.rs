use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::timer::{Delays, DEFAULT_REVEAL_DELAY_MS, DEFAULT_RIDDLE_DEBOUNCE_MS};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Pre-filled minutes on the setup screen
    pub default_minutes: u32,
    /// Allow scheduling the background alarm helper
    pub background_alarm: bool,
    pub sound: bool,
    pub sound_file: Option<PathBuf>,
    pub riddle_debounce_ms: u64,
    pub reveal_delay_ms: u64,
    /// Custom riddle pack (JSON)
    pub riddles_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_minutes: 5,
            background_alarm: true,
            sound: true,
            sound_file: None,
            riddle_debounce_ms: DEFAULT_RIDDLE_DEBOUNCE_MS,
            reveal_delay_ms: DEFAULT_REVEAL_DELAY_MS,
            riddles_path: None,
        }
    }
}

impl Config {
    pub fn delays(&self) -> Delays {
        Delays {
            riddle_debounce_ms: self.riddle_debounce_ms,
            reveal_delay_ms: self.reveal_delay_ms,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "nazotimer") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("nazotimer_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(_) => return Config::default(),
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "invalid config, using defaults"
                );
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}
