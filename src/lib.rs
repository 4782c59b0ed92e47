//! Scene Achievements
//!
//! A data-driven achievement engine for 3D content-creation hosts. It samples
//! host state and event counters on a fixed cadence and unlocks achievements
//! whose declarative thresholds are met.
//!
//! The engine is split into:
//! - `triggers` - Named value sources and the unlock evaluator
//! - `core` - Shared state, unlock events and the add-on runner
//! - `host` - The host abstraction, event hook dispatch and an in-process host
//! - `catalog` - Achievement definitions and JSON source loading
//!
//! ```no_run
//! use std::sync::Arc;
//! use scene_achievements::{AchievementsAddon, AddonConfig, LocalHost};
//!
//! let host = Arc::new(LocalHost::new());
//! let addon = AchievementsAddon::new(
//!     AddonConfig::new("/path/to/addon"),
//!     host.clone(),
//!     host.clone(),
//! );
//! addon.register()?;
//! host.advance(5.0);
//! for row in addon.panel_rows() {
//!     println!("{}", row);
//! }
//! # Ok::<(), scene_achievements::AchievementsError>(())
//! ```

pub mod catalog;
pub mod config;
pub mod core;
pub mod error;
pub mod host;
pub mod panel;
pub mod triggers;

// Re-export commonly used types
pub use catalog::{load_catalog, AchievementDefinition, Catalog, CatalogLoad};
pub use config::{AddonConfig, Preferences};
pub use crate::core::{AchievementContext, AchievementState, AchievementsAddon, UnlockEvent};
pub use error::{AchievementsError, Result, SourceLoadError, TriggerError};
pub use host::{Host, HostNotification, LocalHost, SceneQuery};
pub use triggers::{PollReport, Trigger, TriggerRegistry, UnlockEvaluator};
