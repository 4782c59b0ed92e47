//! Trigger system for achievement unlocking
//!
//! This module provides the named value sources achievements are compared
//! against and the evaluator that polls them.

mod types;
mod registry;
mod evaluator;

pub use types::{Producer, Trigger, TriggerKind};
pub use registry::{TriggerRegistry, COLLECTION_COUNT, MATERIAL_COUNT, NODE_COUNT, VERTEX_COUNT};
pub use evaluator::{PollReport, UnlockEvaluator};

pub(crate) use types::panic_message;
