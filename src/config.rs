//! Configuration types for the achievements add-on
//!
//! These types are loaded from TOML files. `Preferences` holds the settings
//! the host persists on the user's behalf, `AddonConfig` describes where the
//! add-on lives and how often it polls.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::catalog::{ACHIEVEMENTS_DIR, COMMUNITY_DIR, DEFAULT_SOURCE};
use crate::error::{AchievementsError, Result};

/// Default delay between polls, in seconds
pub const DEFAULT_POLL_INTERVAL: f64 = 5.0;

/// User preferences persisted by the host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Also load sources from the community directory
    pub enable_community: bool,
}

impl Preferences {
    /// Load preferences from a TOML string
    pub fn from_toml(toml_str: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Load preferences from a file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("No preferences at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(AchievementsError::ConfigIo {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        Self::from_toml(&content).map_err(|source| AchievementsError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write preferences to a file as TOML
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string(self)?;
        fs::write(path, content).map_err(|source| AchievementsError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Add-on configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddonConfig {
    /// Directory the add-on is installed in
    pub addon_dir: PathBuf,

    /// Seconds between polls
    #[serde(default = "default_poll_interval")]
    pub poll_interval: f64,

    /// Seconds before the first poll after registration
    #[serde(default = "default_poll_interval")]
    pub first_interval: f64,

    /// File the host persists preferences to. When unset, the in-memory
    /// preferences below are used.
    #[serde(default)]
    pub preferences_file: Option<PathBuf>,

    #[serde(default)]
    pub preferences: Preferences,
}

fn default_poll_interval() -> f64 {
    DEFAULT_POLL_INTERVAL
}

fn check_interval(name: &'static str, seconds: f64) -> Result<()> {
    if seconds.is_finite() && seconds > 0.0 {
        Ok(())
    } else {
        Err(AchievementsError::InvalidInterval { name, seconds })
    }
}

impl AddonConfig {
    /// Create a configuration with default intervals
    pub fn new(addon_dir: impl Into<PathBuf>) -> Self {
        Self {
            addon_dir: addon_dir.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            first_interval: DEFAULT_POLL_INTERVAL,
            preferences_file: None,
            preferences: Preferences::default(),
        }
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| AchievementsError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| {
            AchievementsError::ConfigParse {
                path: path.to_path_buf(),
                source,
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that both intervals are finite and positive
    ///
    /// Builder-made configs are checked when the add-on registers.
    pub fn validate(&self) -> Result<()> {
        check_interval("poll_interval", self.poll_interval)?;
        check_interval("first_interval", self.first_interval)
    }

    pub fn with_poll_interval(mut self, seconds: f64) -> Self {
        self.poll_interval = seconds;
        self
    }

    pub fn with_first_interval(mut self, seconds: f64) -> Self {
        self.first_interval = seconds;
        self
    }

    pub fn with_preferences_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.preferences_file = Some(path.into());
        self
    }

    pub fn with_preferences(mut self, preferences: Preferences) -> Self {
        self.preferences = preferences;
        self
    }

    /// `<addon_dir>/achievements`
    pub fn achievements_dir(&self) -> PathBuf {
        self.addon_dir.join(ACHIEVEMENTS_DIR)
    }

    /// `<addon_dir>/achievements/default.json`
    pub fn default_source(&self) -> PathBuf {
        self.achievements_dir().join(DEFAULT_SOURCE)
    }

    /// `<addon_dir>/achievements/community`
    pub fn community_dir(&self) -> PathBuf {
        self.achievements_dir().join(COMMUNITY_DIR)
    }
}
