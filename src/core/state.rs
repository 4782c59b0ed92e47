//! Shared achievement state: event counters, unlocked set and the active catalog

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::catalog::Catalog;

/// Counter incremented on every completed document save
pub const SAVE_COUNT: &str = "save_count";
/// Counter incremented on every completed render
pub const RENDER_COUNT: &str = "render_count";
/// Counter incremented once per newly created scene object
pub const OBJECT_CREATED: &str = "object_created";

/// Named event counters
///
/// Counts never decrease. Unseen names read as 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCounters {
    counts: BTreeMap<String, u64>,
}

impl EventCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment a counter, returning its new value
    pub fn increment(&mut self, name: &str) -> u64 {
        let count = self.counts.entry(name.to_string()).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    /// Current value of a counter
    pub fn get(&self, name: &str) -> u64 {
        self.counts.get(name).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(name, count)| (name.as_str(), *count))
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Ids of unlocked achievements
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockedSet {
    ids: BTreeSet<String>,
}

impl UnlockedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Add an id. Returns false if it was already present.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        self.ids.insert(id.into())
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.ids.remove(id)
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(|id| id.as_str())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Process-lifetime state shared by dispatch, registry and evaluator
///
/// Each field sits behind its own lock so host callbacks may run concurrently
/// with a poll. The catalog is swapped as a whole and readers hold an `Arc`
/// to the version they started with.
#[derive(Debug, Default)]
pub struct AchievementContext {
    counters: Mutex<EventCounters>,
    unlocked: Mutex<UnlockedSet>,
    catalog: RwLock<Arc<Catalog>>,
}

impl AchievementContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context with an initial catalog
    pub fn with_catalog(catalog: Catalog) -> Self {
        Self {
            catalog: RwLock::new(Arc::new(catalog)),
            ..Self::default()
        }
    }

    /// Increment an event counter, returning its new value
    pub fn increment(&self, name: &str) -> u64 {
        self.counters.lock().increment(name)
    }

    /// Current value of an event counter
    pub fn counter(&self, name: &str) -> u64 {
        self.counters.lock().get(name)
    }

    /// Copy of all event counters
    pub fn counters(&self) -> EventCounters {
        self.counters.lock().clone()
    }

    /// Whether an achievement id is unlocked
    pub fn is_unlocked(&self, id: &str) -> bool {
        self.unlocked.lock().contains(id)
    }

    /// Mark an id unlocked. Returns true only for the call that unlocked it.
    pub fn try_unlock(&self, id: &str) -> bool {
        self.unlocked.lock().insert(id)
    }

    /// Copy of the unlocked set
    pub fn unlocked(&self) -> UnlockedSet {
        self.unlocked.lock().clone()
    }

    /// Return an id to pending. Returns false if it was not unlocked.
    pub fn revoke(&self, id: &str) -> bool {
        self.unlocked.lock().remove(id)
    }

    /// Re-arm every achievement without touching the catalog
    pub fn reset_unlocked(&self) {
        self.unlocked.lock().clear();
    }

    /// Snapshot of the active catalog
    ///
    /// A later swap does not affect a snapshot already taken.
    pub fn catalog(&self) -> Arc<Catalog> {
        self.catalog.read().clone()
    }

    /// Swap in a new catalog and clear the unlocked set, returning the old catalog
    ///
    /// Previously unlocked achievements become pending again.
    pub fn replace_catalog(&self, catalog: Catalog) -> Arc<Catalog> {
        let mut current = self.catalog.write();
        let previous = std::mem::replace(&mut *current, Arc::new(catalog));
        self.unlocked.lock().clear();
        previous
    }

    /// Serializable snapshot of everything the context holds
    pub fn snapshot(&self) -> AchievementState {
        let catalog = self.catalog();
        let unlocked = self.unlocked.lock().clone();
        let achievements = catalog
            .iter()
            .map(|def| AchievementStatus {
                id: def.id.clone(),
                name: def.display_name().to_string(),
                trigger: def.trigger.clone(),
                threshold: def.threshold,
                unlocked: unlocked.contains(&def.id),
            })
            .collect();

        AchievementState {
            registered: false,
            achievements,
            unlocked: unlocked.iter().map(str::to_string).collect(),
            counters: self
                .counters
                .lock()
                .iter()
                .map(|(name, count)| (name.to_string(), count))
                .collect(),
        }
    }
}

/// Display status of one catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementStatus {
    pub id: String,
    pub name: String,
    pub trigger: String,
    pub threshold: f64,
    pub unlocked: bool,
}

/// Current state of the achievements engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AchievementState {
    /// Whether the add-on is registered with the host
    pub registered: bool,
    /// Catalog entries in load order
    pub achievements: Vec<AchievementStatus>,
    /// Unlocked achievement ids
    pub unlocked: Vec<String>,
    /// Event counter values
    #[serde(default)]
    pub counters: BTreeMap<String, u64>,
}

impl AchievementState {
    /// Check if an achievement has been unlocked
    pub fn is_unlocked(&self, id: &str) -> bool {
        self.unlocked.iter().any(|unlocked| unlocked == id)
    }

    /// Get the value of an event counter
    pub fn counter(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }
}
