//! Trigger registry for looking up value sources by name

use std::collections::HashMap;
use std::sync::Arc;

use super::Trigger;
use crate::core::{AchievementContext, OBJECT_CREATED, RENDER_COUNT, SAVE_COUNT};
use crate::error::TriggerError;
use crate::host::{HostError, ObjectKind, SceneQuery};

/// Sum of vertices over all mesh objects
pub const VERTEX_COUNT: &str = "vertex_count";
/// Number of collections in the document
pub const COLLECTION_COUNT: &str = "collection_count";
/// Number of materials in the document
pub const MATERIAL_COUNT: &str = "material_count";
/// Sum of shader nodes over node-based materials
pub const NODE_COUNT: &str = "node_count";

/// Registry mapping trigger names to triggers
#[derive(Debug, Default, Clone)]
pub struct TriggerRegistry {
    triggers: HashMap<String, Trigger>,
}

impl TriggerRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            triggers: HashMap::new(),
        }
    }

    /// Create a registry holding every built-in trigger
    pub fn with_builtin(scene: Arc<dyn SceneQuery>) -> Self {
        let mut registry = Self::new();
        registry.register_builtin(scene);
        registry
    }

    /// Register a trigger, returning the binding it replaced
    pub fn register(&mut self, name: impl Into<String>, trigger: Trigger) -> Option<Trigger> {
        let name = name.into();
        let previous = self.triggers.insert(name.clone(), trigger);
        if previous.is_some() {
            log::debug!("Replaced trigger '{}'", name);
        }
        previous
    }

    /// Remove a trigger
    pub fn unregister(&mut self, name: &str) -> Option<Trigger> {
        self.triggers.remove(name)
    }

    /// Look up a trigger by name
    pub fn resolve(&self, name: &str) -> Option<&Trigger> {
        self.triggers.get(name)
    }

    /// Check if a trigger is registered
    pub fn has_trigger(&self, name: &str) -> bool {
        self.triggers.contains_key(name)
    }

    /// Produce the current value of a trigger
    pub fn evaluate(&self, name: &str, context: &AchievementContext) -> Result<f64, TriggerError> {
        self.resolve(name)
            .ok_or_else(|| TriggerError::Unknown(name.to_string()))?
            .evaluate(name, context)
    }

    /// All registered trigger names, sorted
    pub fn trigger_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.triggers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    /// Register the event-counter and scene triggers
    pub fn register_builtin(&mut self, scene: Arc<dyn SceneQuery>) {
        log::info!("Registering built-in triggers");

        self.register_event_counters();
        self.register_scene_queries(scene);

        log::info!("Registered {} built-in triggers", self.triggers.len());
    }

    /// Register one trigger per event counter fed by host notifications
    pub fn register_event_counters(&mut self) {
        for counter in [SAVE_COUNT, RENDER_COUNT, OBJECT_CREATED] {
            self.register(counter, Trigger::counter(counter));
        }
    }

    /// Register triggers that query live scene data
    pub fn register_scene_queries(&mut self, scene: Arc<dyn SceneQuery>) {
        let s = scene.clone();
        self.register(
            VERTEX_COUNT,
            Trigger::host_query(move || Ok(vertex_count(s.as_ref())? as f64)),
        );

        let s = scene.clone();
        self.register(
            COLLECTION_COUNT,
            Trigger::host_query(move || Ok(s.collection_count()? as f64)),
        );

        let s = scene.clone();
        self.register(
            MATERIAL_COUNT,
            Trigger::host_query(move || Ok(s.materials()?.len() as f64)),
        );

        self.register(
            NODE_COUNT,
            Trigger::host_query(move || Ok(node_count(scene.as_ref())? as f64)),
        );
    }
}

fn vertex_count(scene: &dyn SceneQuery) -> Result<usize, HostError> {
    let mut total = 0;
    for object in scene.objects()? {
        if object.kind != ObjectKind::Mesh {
            continue;
        }
        total += object.vertex_count.ok_or_else(|| HostError::MissingData {
            entity: "object",
            name: object.name.clone(),
            field: "mesh data",
        })?;
    }
    Ok(total)
}

fn node_count(scene: &dyn SceneQuery) -> Result<usize, HostError> {
    Ok(scene
        .materials()?
        .iter()
        .filter(|material| material.use_nodes)
        .map(|material| material.node_count)
        .sum())
}
