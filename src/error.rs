//! Error types for the achievements engine

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::host::HostError;

/// Result type for add-on operations
pub type Result<T> = std::result::Result<T, AchievementsError>;

/// Boxed error returned by custom trigger producers
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A single catalog source could not be used
///
/// Never fatal: the source contributes zero definitions and loading moves on.
#[derive(Debug, Error)]
pub enum SourceLoadError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl SourceLoadError {
    /// Path of the source that failed
    pub fn path(&self) -> &Path {
        match self {
            SourceLoadError::Io { path, .. } => path,
            SourceLoadError::Parse { path, .. } => path,
        }
    }
}

/// Failure to produce a value for a trigger
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TriggerError {
    /// No producer is registered under this name
    #[error("unknown trigger '{0}'")]
    Unknown(String),

    /// The producer failed while computing its value
    #[error("trigger '{trigger}' failed: {reason}")]
    Failed { trigger: String, reason: String },
}

impl TriggerError {
    pub fn failed(trigger: impl Into<String>, reason: impl ToString) -> Self {
        TriggerError::Failed {
            trigger: trigger.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the trigger name has no registered producer
    pub fn is_unknown(&self) -> bool {
        matches!(self, TriggerError::Unknown(_))
    }
}

/// Errors surfaced by the add-on lifecycle and configuration API
#[derive(Debug, Error)]
pub enum AchievementsError {
    #[error("achievements add-on is already registered")]
    AlreadyRegistered,

    #[error("achievements add-on is not registered")]
    NotRegistered,

    #[error("failed to access config {}: {source}", .path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    ConfigToml(#[from] toml::de::Error),

    #[error("{name} must be a positive number of seconds, got {seconds}")]
    InvalidInterval { name: &'static str, seconds: f64 },

    #[error("failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error(transparent)]
    SourceLoad(#[from] SourceLoadError),

    #[error(transparent)]
    Trigger(#[from] TriggerError),

    #[error(transparent)]
    Host(#[from] HostError),
}
