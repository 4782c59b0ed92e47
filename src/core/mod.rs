//! Core achievement abstractions
//!
//! This module contains the main types for the engine:
//! - `AchievementContext` - Counters, unlocked set and catalog shared by every component
//! - `AchievementsAddon` - Runner that wires the engine into a host
//! - `UnlockEvent` - Events emitted when an achievement unlocks

mod state;
mod runner;
mod events;

pub use state::{
    AchievementContext, AchievementState, AchievementStatus, EventCounters, UnlockedSet,
    OBJECT_CREATED, RENDER_COUNT, SAVE_COUNT,
};
pub use runner::AchievementsAddon;
pub use events::{EventHandler, UnlockCallback, UnlockEvent};
