//! Achievement catalog: definitions and loading from JSON sources
//!
//! A catalog is assembled from a primary source shipped with the add-on and,
//! when enabled, any number of community sources dropped into a directory.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{AddonConfig, Preferences};
use crate::error::SourceLoadError;

/// Directory holding achievement sources, relative to the add-on directory
pub const ACHIEVEMENTS_DIR: &str = "achievements";
/// Primary source file name inside [`ACHIEVEMENTS_DIR`]
pub const DEFAULT_SOURCE: &str = "default.json";
/// Community sources directory inside [`ACHIEVEMENTS_DIR`]
pub const COMMUNITY_DIR: &str = "community";

/// A single achievement definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementDefinition {
    /// Identifier, also the key in the unlocked set
    pub id: String,
    /// Display label, falls back to `id`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Name of the trigger whose value is compared to `threshold`
    pub trigger: String,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_threshold() -> f64 {
    1.0
}

impl AchievementDefinition {
    /// Create a definition with the default threshold of 1
    pub fn new(id: impl Into<String>, trigger: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            trigger: trigger.into(),
            threshold: default_threshold(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Label shown in notifications and the list view
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Ordered achievement definitions
///
/// Load order is kept as-is. Duplicate ids are allowed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    definitions: Vec<AchievementDefinition>,
}

impl Catalog {
    pub fn new(definitions: Vec<AchievementDefinition>) -> Self {
        Self { definitions }
    }

    /// Parse a catalog from a JSON array of definitions
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// First definition with the given id
    pub fn get(&self, id: &str) -> Option<&AchievementDefinition> {
        self.definitions.iter().find(|def| def.id == id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AchievementDefinition> {
        self.definitions.iter()
    }

    pub fn definitions(&self) -> &[AchievementDefinition] {
        &self.definitions
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl FromIterator<AchievementDefinition> for Catalog {
    fn from_iter<I: IntoIterator<Item = AchievementDefinition>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a AchievementDefinition;
    type IntoIter = std::slice::Iter<'a, AchievementDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.definitions.iter()
    }
}

/// Result of loading a list of sources
#[derive(Debug, Default)]
pub struct CatalogLoad {
    pub catalog: Catalog,
    /// Sources that contributed definitions (possibly zero of them)
    pub loaded_sources: Vec<PathBuf>,
    /// Sources that failed and contributed nothing
    pub errors: Vec<SourceLoadError>,
}

/// Read one source file
pub fn load_source(path: &Path) -> Result<Vec<AchievementDefinition>, SourceLoadError> {
    let text = fs::read_to_string(path).map_err(|source| SourceLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&text).map_err(|source| SourceLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load and concatenate sources in order
///
/// A failing source is logged and skipped; later sources still load.
pub fn load_catalog<P: AsRef<Path>>(sources: &[P]) -> CatalogLoad {
    let mut load = CatalogLoad::default();
    let mut definitions = Vec::new();

    for source in sources {
        let path = source.as_ref();
        match load_source(path) {
            Ok(defs) => {
                log::debug!("Loaded {} achievements from {}", defs.len(), path.display());
                definitions.extend(defs);
                load.loaded_sources.push(path.to_path_buf());
            }
            Err(e) => {
                log::warn!("[Achievements] {}", e);
                load.errors.push(e);
            }
        }
    }

    load.catalog = Catalog::new(definitions);
    load
}

/// Source list for an add-on
///
/// The primary source always comes first. Community sources follow in the
/// order the filesystem lists them, and only when `enable_community` is set.
pub fn discover_sources(config: &AddonConfig, preferences: &Preferences) -> Vec<PathBuf> {
    let mut sources = vec![config.default_source()];

    if !preferences.enable_community {
        return sources;
    }

    let community = config.community_dir();
    if !community.is_dir() {
        log::debug!("No community directory at {}", community.display());
        return sources;
    }

    match fs::read_dir(&community) {
        Ok(entries) => {
            for entry in entries.flatten() {
                let is_json = entry
                    .file_name()
                    .to_string_lossy()
                    .to_lowercase()
                    .ends_with(".json");
                if is_json {
                    sources.push(entry.path());
                }
            }
        }
        Err(e) => {
            log::warn!(
                "[Achievements] Failed to list {}: {}",
                community.display(),
                e
            );
        }
    }

    sources
}
