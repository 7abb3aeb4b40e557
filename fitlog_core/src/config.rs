//! Configuration file support for Fitlog.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/fitlog/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub insights: InsightsConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// File names used inside the data directory
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_table_file")]
    pub table_file: String,

    #[serde(default = "default_meals_file")]
    pub meals_file: String,

    #[serde(default = "default_session_file")]
    pub session_file: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            table_file: default_table_file(),
            meals_file: default_meals_file(),
            session_file: default_session_file(),
        }
    }
}

/// Insights window configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InsightsConfig {
    #[serde(default = "default_window_days")]
    pub window_days: i64,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        PathBuf::from(home).join(".local/share")
    });
    base.join("fitlog")
}

fn default_table_file() -> String {
    "user_metrics.json".into()
}

fn default_meals_file() -> String {
    "meals.jsonl".into()
}

fn default_session_file() -> String {
    "session.json".into()
}

fn default_window_days() -> i64 {
    crate::insights::DEFAULT_WINDOW_DAYS
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::debug!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
            PathBuf::from(home).join(".config")
        });
        base.join("fitlog").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.insights.window_days <= 0 {
            return Err(Error::Config(format!(
                "insights.window_days must be positive, got {}",
                self.insights.window_days
            )));
        }
        for (key, name) in [
            ("store.table_file", &self.store.table_file),
            ("store.meals_file", &self.store.meals_file),
            ("store.session_file", &self.store.session_file),
        ] {
            if name.trim().is_empty() {
                return Err(Error::Config(format!("{} must not be empty", key)));
            }
        }
        Ok(())
    }

    /// Path of the metrics table inside `data_dir`
    pub fn table_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.store.table_file)
    }

    /// Path of the meal journal inside `data_dir`
    pub fn meals_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.store.meals_file)
    }

    /// Path of the persisted session inside `data_dir`
    pub fn session_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.store.session_file)
    }
}
