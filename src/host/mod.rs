//! Host application abstraction
//!
//! These traits allow the engine to run inside any content-creation host.
//! The engine only ever talks to the host through them, which also enables
//! host-free testing with [`LocalHost`].

mod dispatch;
mod local;

pub use dispatch::EventDispatch;
pub use local::LocalHost;

use std::sync::Arc;

use thiserror::Error;

/// Error reported by the host while answering a scene query
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// Host data is not reachable right now (no active scene, data being rebuilt)
    #[error("host data unavailable: {0}")]
    Unavailable(String),

    /// Host data exists but is missing a field the query needs
    #[error("{entity} '{name}' has no {field}")]
    MissingData {
        entity: &'static str,
        name: String,
        field: &'static str,
    },
}

/// Notification channels the engine can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostChannel {
    /// A document save completed
    DocumentSaved,
    /// A render completed
    RenderCompleted,
    /// The scene graph was re-evaluated after changes
    SceneGraphUpdated,
}

/// Kind of data-block a change record refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    Object,
    Mesh,
    Material,
    Collection,
    Scene,
    Other,
}

/// One entry of a scene-graph update batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeRecord {
    pub entity: EntityType,
    /// Whether the entity was created by this update
    pub is_new: bool,
}

impl ChangeRecord {
    /// A record for a newly created entity
    pub fn created(entity: EntityType) -> Self {
        Self {
            entity,
            is_new: true,
        }
    }

    /// A record for an entity that already existed
    pub fn updated(entity: EntityType) -> Self {
        Self {
            entity,
            is_new: false,
        }
    }
}

/// A notification delivered by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostNotification {
    DocumentSaved,
    RenderCompleted,
    SceneGraphUpdated(Vec<ChangeRecord>),
}

impl HostNotification {
    /// Channel this notification is delivered on
    pub fn channel(&self) -> HostChannel {
        match self {
            HostNotification::DocumentSaved => HostChannel::DocumentSaved,
            HostNotification::RenderCompleted => HostChannel::RenderCompleted,
            HostNotification::SceneGraphUpdated(_) => HostChannel::SceneGraphUpdated,
        }
    }
}

/// Handler invoked for each notification on a subscribed channel
pub type NotificationHandler = Arc<dyn Fn(&HostNotification) + Send + Sync>;

/// Timer callback; returns the delay in seconds until the next call, or `None` to stop
pub type TimerCallback = Arc<dyn Fn() -> Option<f64> + Send + Sync>;

/// Handle for a notification subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Handle for a registered timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

/// Services the host application provides to the engine
pub trait Host: Send + Sync {
    /// Subscribe a handler to a notification channel
    fn subscribe(&self, channel: HostChannel, handler: NotificationHandler) -> SubscriptionId;

    /// Remove a subscription. Returns false if it was not registered.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;

    /// Register a periodic callback, first called after `first_interval` seconds
    fn register_timer(&self, first_interval: f64, callback: TimerCallback) -> TimerId;

    /// Remove a timer. Returns false if it was not registered.
    fn unregister_timer(&self, id: TimerId) -> bool;

    /// Show a transient message to the user
    fn display_notification(&self, message: &str);
}

/// Type of a scene object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Mesh,
    Curve,
    Light,
    Camera,
    Empty,
    Other,
}

/// Object as seen by scene queries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneObject {
    pub name: String,
    pub kind: ObjectKind,
    /// Vertex count of the mesh data, `None` when the object carries no mesh
    pub vertex_count: Option<usize>,
}

impl SceneObject {
    pub fn mesh(name: impl Into<String>, vertex_count: usize) -> Self {
        Self {
            name: name.into(),
            kind: ObjectKind::Mesh,
            vertex_count: Some(vertex_count),
        }
    }

    pub fn new(name: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            name: name.into(),
            kind,
            vertex_count: None,
        }
    }
}

/// Material as seen by scene queries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneMaterial {
    pub name: String,
    /// Whether the material is driven by a node tree
    pub use_nodes: bool,
    pub node_count: usize,
}

impl SceneMaterial {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            use_nodes: false,
            node_count: 0,
        }
    }

    pub fn with_nodes(name: impl Into<String>, node_count: usize) -> Self {
        Self {
            name: name.into(),
            use_nodes: true,
            node_count,
        }
    }
}

/// Live read access to host scene data
///
/// Implementations must answer from current host state on every call.
pub trait SceneQuery: Send + Sync {
    /// All objects in the open document
    fn objects(&self) -> Result<Vec<SceneObject>, HostError>;

    /// Number of collections in the open document
    fn collection_count(&self) -> Result<usize, HostError>;

    /// All materials in the open document
    fn materials(&self) -> Result<Vec<SceneMaterial>, HostError>;
}
