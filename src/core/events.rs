//! Events emitted by the unlock evaluator

use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use crate::catalog::AchievementDefinition;
use crate::triggers::panic_message;

/// Event emitted when an achievement unlocks
#[derive(Debug, Clone)]
pub struct UnlockEvent {
    /// The achievement id that unlocked
    pub achievement_id: String,
    /// Display name of the achievement
    pub name: String,
    /// Trigger that satisfied the threshold
    pub trigger: String,
    /// Value the trigger produced
    pub value: f64,
    pub threshold: f64,
    /// When the event occurred
    pub timestamp: Instant,
}

impl UnlockEvent {
    /// Create an unlock event for a definition whose trigger produced `value`
    pub fn new(definition: &AchievementDefinition, value: f64) -> Self {
        Self {
            achievement_id: definition.id.clone(),
            name: definition.display_name().to_string(),
            trigger: definition.trigger.clone(),
            value,
            threshold: definition.threshold,
            timestamp: Instant::now(),
        }
    }

    /// Message shown to the user for this unlock
    pub fn message(&self) -> String {
        format!("🎉 Achievement Unlocked: {}", self.name)
    }
}

/// Callback type for unlock events
pub type UnlockCallback = Box<dyn Fn(&UnlockEvent) + Send + Sync>;

/// Event handler that can have multiple listeners
pub struct EventHandler {
    callbacks: Vec<UnlockCallback>,
}

impl EventHandler {
    /// Create a new event handler
    pub fn new() -> Self {
        Self {
            callbacks: Vec::new(),
        }
    }

    /// Add a callback for unlock events
    pub fn on_unlock(&mut self, callback: UnlockCallback) {
        self.callbacks.push(callback);
    }

    /// Emit an unlock event to all listeners
    ///
    /// A panicking listener is logged and the remaining listeners still run.
    pub fn emit(&self, event: &UnlockEvent) {
        for callback in &self.callbacks {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| callback(event))) {
                log::error!(
                    "[Achievements] Unlock listener failed for {}: {}",
                    event.achievement_id,
                    panic_message(&*payload)
                );
            }
        }
    }

    /// Check if there are any listeners
    pub fn has_listeners(&self) -> bool {
        !self.callbacks.is_empty()
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_message_uses_display_name() {
        let def = AchievementDefinition::new("first_render", "render_count")
            .with_name("Lights, Camera");
        let event = UnlockEvent::new(&def, 1.0);
        assert_eq!(event.message(), "🎉 Achievement Unlocked: Lights, Camera");

        let def = AchievementDefinition::new("a1", "save_count");
        assert!(UnlockEvent::new(&def, 3.0).message().contains("a1"));
    }

    #[test]
    fn test_emit_reaches_every_listener() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut handler = EventHandler::new();
        assert!(!handler.has_listeners());

        for _ in 0..2 {
            let calls = calls.clone();
            handler.on_unlock(Box::new(move |_: &UnlockEvent| {
                calls.fetch_add(1, Ordering::SeqCst);
            }));
        }

        let def = AchievementDefinition::new("a1", "save_count");
        handler.emit(&UnlockEvent::new(&def, 1.0));
        assert!(handler.has_listeners());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_emit_survives_panicking_listener() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut handler = EventHandler::new();
        handler.on_unlock(Box::new(|_: &UnlockEvent| panic!("listener bug")));
        let counter = calls.clone();
        handler.on_unlock(Box::new(move |_: &UnlockEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let def = AchievementDefinition::new("a1", "save_count");
        handler.emit(&UnlockEvent::new(&def, 1.0));
        handler.emit(&UnlockEvent::new(&def, 2.0));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
