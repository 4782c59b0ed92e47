//! Unlock evaluation engine

use super::TriggerRegistry;
use crate::catalog::AchievementDefinition;
use crate::core::{AchievementContext, UnlockEvent};
use crate::error::TriggerError;

/// Outcome of one poll pass
#[derive(Debug, Clone, Default)]
pub struct PollReport {
    /// Seconds until the next poll should run
    pub next_delay: f64,
    /// Achievements unlocked by this pass, in catalog order
    pub unlocked: Vec<UnlockEvent>,
    /// Pending definitions whose trigger was evaluated
    pub evaluated: usize,
    /// Pending definitions skipped because their trigger failed or is unknown
    pub skipped: usize,
}

impl PollReport {
    /// Ids unlocked by this pass
    pub fn unlocked_ids(&self) -> Vec<&str> {
        self.unlocked
            .iter()
            .map(|event| event.achievement_id.as_str())
            .collect()
    }
}

/// Evaluates pending achievements against the trigger registry
pub struct UnlockEvaluator<'a> {
    context: &'a AchievementContext,
    registry: &'a TriggerRegistry,
}

impl<'a> UnlockEvaluator<'a> {
    /// Create a new evaluator over the given state and registry
    pub fn new(context: &'a AchievementContext, registry: &'a TriggerRegistry) -> Self {
        Self { context, registry }
    }

    /// Evaluate a single definition
    /// Returns the trigger value when the threshold is met, `None` otherwise
    pub fn evaluate(&self, definition: &AchievementDefinition) -> Result<Option<f64>, TriggerError> {
        let value = self.registry.evaluate(&definition.trigger, self.context)?;
        Ok((value >= definition.threshold).then_some(value))
    }

    /// Run one pass over the catalog
    ///
    /// Every pending definition is evaluated in catalog order. Failing triggers
    /// are skipped for this pass only. `interval` is returned as the delay until
    /// the next pass.
    pub fn poll(&self, interval: f64) -> PollReport {
        let mut report = PollReport {
            next_delay: interval,
            ..PollReport::default()
        };

        let catalog = self.context.catalog();
        for definition in catalog.iter() {
            if self.context.is_unlocked(&definition.id) {
                continue;
            }

            report.evaluated += 1;
            match self.evaluate(definition) {
                Ok(Some(value)) => {
                    if self.context.try_unlock(&definition.id) {
                        log::info!(
                            "Achievement unlocked: {} (id={}, {}={} >= {})",
                            definition.display_name(),
                            definition.id,
                            definition.trigger,
                            value,
                            definition.threshold
                        );
                        report.unlocked.push(UnlockEvent::new(definition, value));
                    }
                }
                Ok(None) => {}
                Err(e @ TriggerError::Unknown(_)) => {
                    log::debug!("Skipping {}: {}", definition.id, e);
                    report.skipped += 1;
                }
                Err(e) => {
                    log::warn!("[Achievements] Error checking {}: {}", definition.id, e);
                    report.skipped += 1;
                }
            }
        }

        report
    }
}
