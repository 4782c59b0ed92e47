//! Trigger type definitions

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::core::AchievementContext;
use crate::error::{BoxError, TriggerError};

/// Zero-argument computation backing a host-state trigger
pub type Producer = Arc<dyn Fn() -> Result<f64, BoxError> + Send + Sync>;

/// Family a trigger belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    HostStateQuery,
    EventCounterLookup,
}

/// A named value source that achievement thresholds are compared against
#[derive(Clone)]
pub enum Trigger {
    /// Recomputed from live host state on every evaluation
    HostStateQuery(Producer),

    /// Current value of an event counter
    EventCounterLookup(String),
}

impl Trigger {
    /// Create a host-state trigger from a closure
    pub fn host_query<F>(producer: F) -> Self
    where
        F: Fn() -> Result<f64, BoxError> + Send + Sync + 'static,
    {
        Trigger::HostStateQuery(Arc::new(producer))
    }

    /// Create a trigger reading the named event counter
    pub fn counter(name: impl Into<String>) -> Self {
        Trigger::EventCounterLookup(name.into())
    }

    pub fn kind(&self) -> TriggerKind {
        match self {
            Trigger::HostStateQuery(_) => TriggerKind::HostStateQuery,
            Trigger::EventCounterLookup(_) => TriggerKind::EventCounterLookup,
        }
    }

    /// Produce the current value. `name` is only used for error reporting.
    ///
    /// A producer that returns an error or panics yields `TriggerError::Failed`.
    pub fn evaluate(&self, name: &str, context: &AchievementContext) -> Result<f64, TriggerError> {
        match self {
            Trigger::HostStateQuery(producer) => {
                match panic::catch_unwind(AssertUnwindSafe(|| producer())) {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(e)) => Err(TriggerError::failed(name, e)),
                    Err(payload) => Err(TriggerError::failed(name, panic_message(&*payload))),
                }
            }
            Trigger::EventCounterLookup(counter) => Ok(context.counter(counter) as f64),
        }
    }
}

impl fmt::Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::HostStateQuery(_) => f.write_str("HostStateQuery(..)"),
            Trigger::EventCounterLookup(counter) => {
                f.debug_tuple("EventCounterLookup").field(counter).finish()
            }
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_counter_trigger_reads_live_value() {
        let context = AchievementContext::new();
        let trigger = Trigger::counter("save_count");
        assert_eq!(trigger.kind(), TriggerKind::EventCounterLookup);
        assert_eq!(trigger.evaluate("save_count", &context), Ok(0.0));

        context.increment("save_count");
        context.increment("save_count");
        assert_eq!(trigger.evaluate("save_count", &context), Ok(2.0));
        assert_eq!(context.counter("save_count"), 2);
    }

    #[test]
    fn test_host_query_recomputes_each_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let trigger = Trigger::host_query(move || {
            Ok(counter.fetch_add(1, Ordering::SeqCst) as f64 + 1.0)
        });
        let context = AchievementContext::new();

        assert_eq!(trigger.kind(), TriggerKind::HostStateQuery);
        assert_eq!(trigger.evaluate("calls", &context), Ok(1.0));
        assert_eq!(trigger.evaluate("calls", &context), Ok(2.0));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_host_query_error() {
        let trigger = Trigger::host_query(|| Err("no active scene".into()));
        let err = trigger
            .evaluate("vertex_count", &AchievementContext::new())
            .unwrap_err();
        assert_eq!(err, TriggerError::failed("vertex_count", "no active scene"));
    }

    #[test]
    fn test_host_query_panic_is_contained() {
        let trigger = Trigger::host_query(|| panic!("bad mesh"));
        let err = trigger
            .evaluate("vertex_count", &AchievementContext::new())
            .unwrap_err();
        assert_eq!(err, TriggerError::failed("vertex_count", "panicked: bad mesh"));
    }

    #[test]
    fn test_debug_output() {
        assert_eq!(
            format!("{:?}", Trigger::counter("render_count")),
            "EventCounterLookup(\"render_count\")"
        );
        assert_eq!(
            format!("{:?}", Trigger::host_query(|| Ok(0.0))),
            "HostStateQuery(..)"
        );
    }
}
