//! Host UI surface: the achievement list view and the sync command

use std::fmt;
use std::path::PathBuf;

use crate::catalog::Catalog;
use crate::core::UnlockedSet;

/// Operator id the host binds the sync command to
pub const SYNC_OPERATOR: &str = "achievements.sync";
/// Label of the sync command
pub const SYNC_LABEL: &str = "Sync Achievements";

const UNLOCKED_MARKER: &str = "✔";
const PENDING_MARKER: &str = "  ";

/// One line of the achievement list view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelRow {
    pub id: String,
    pub label: String,
    pub unlocked: bool,
}

impl fmt::Display for PanelRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.unlocked {
            UNLOCKED_MARKER
        } else {
            PENDING_MARKER
        };
        write!(f, "{} {}", marker, self.label)
    }
}

/// Rows for every catalog entry, in catalog order
pub fn panel_rows(catalog: &Catalog, unlocked: &UnlockedSet) -> Vec<PanelRow> {
    catalog
        .iter()
        .map(|def| PanelRow {
            id: def.id.clone(),
            label: def.display_name().to_string(),
            unlocked: unlocked.contains(&def.id),
        })
        .collect()
}

/// Result of running the sync command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Definitions in the new catalog
    pub loaded: usize,
    /// Sources that failed to load
    pub failed_sources: Vec<PathBuf>,
}

impl SyncReport {
    /// Message reported back to the operator
    pub fn message(&self) -> String {
        format!("Loaded {} achievements.", self.loaded)
    }
}
