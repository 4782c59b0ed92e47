//! Event hook dispatch: host notifications to event counters

use parking_lot::{Mutex, RwLock};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::{EntityType, Host, HostChannel, HostNotification, NotificationHandler, SubscriptionId};
use crate::core::{AchievementContext, OBJECT_CREATED, RENDER_COUNT, SAVE_COUNT};
use crate::triggers::panic_message;

/// Channels the dispatch subscribes to
const CHANNELS: [HostChannel; 3] = [
    HostChannel::DocumentSaved,
    HostChannel::RenderCompleted,
    HostChannel::SceneGraphUpdated,
];

/// Wires host notification channels to event counters
pub struct EventDispatch {
    host: Arc<dyn Host>,
    subscriptions: Mutex<Vec<SubscriptionId>>,
    /// Cleared on detach so late deliveries are ignored
    attached: Arc<AtomicBool>,
    /// Read-held by every delivery, write-taken by detach
    in_flight: Arc<RwLock<()>>,
}

impl EventDispatch {
    pub fn new(host: Arc<dyn Host>) -> Self {
        Self {
            host,
            subscriptions: Mutex::new(Vec::new()),
            attached: Arc::new(AtomicBool::new(false)),
            in_flight: Arc::new(RwLock::new(())),
        }
    }

    /// Subscribe to all three channels, counting into `context`
    ///
    /// Returns false if already attached.
    pub fn attach(&self, context: Arc<AchievementContext>) -> bool {
        let mut subscriptions = self.subscriptions.lock();
        if self.attached.swap(true, Ordering::SeqCst) {
            return false;
        }

        for channel in CHANNELS {
            let context = context.clone();
            let attached = self.attached.clone();
            let in_flight = self.in_flight.clone();
            let handler: NotificationHandler = Arc::new(move |notification: &HostNotification| {
                let _delivery = in_flight.read();
                if !attached.load(Ordering::SeqCst) {
                    return;
                }
                // Nothing may unwind into the host's own dispatch
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    Self::handle(&context, notification)
                }));
                if let Err(payload) = result {
                    log::error!(
                        "[Achievements] Handler for {:?} failed: {}",
                        notification.channel(),
                        panic_message(&*payload)
                    );
                }
            });
            subscriptions.push(self.host.subscribe(channel, handler));
        }

        log::debug!("Attached {} event hooks", subscriptions.len());
        true
    }

    /// Unsubscribe every hook. Returns the number of hooks removed.
    ///
    /// Waits for deliveries already inside a handler, so no counter moves once
    /// this returns.
    pub fn detach(&self) -> usize {
        let mut subscriptions = self.subscriptions.lock();
        self.attached.store(false, Ordering::SeqCst);
        drop(self.in_flight.write());

        let removed = subscriptions
            .drain(..)
            .filter(|id| self.host.unsubscribe(*id))
            .count();
        log::debug!("Detached {} event hooks", removed);
        removed
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    /// Apply one notification to the counters
    ///
    /// A scene update counts one `object_created` per newly created object.
    pub fn handle(context: &AchievementContext, notification: &HostNotification) {
        match notification {
            HostNotification::DocumentSaved => {
                context.increment(SAVE_COUNT);
            }
            HostNotification::RenderCompleted => {
                context.increment(RENDER_COUNT);
            }
            HostNotification::SceneGraphUpdated(records) => {
                for record in records {
                    if record.entity == EntityType::Object && record.is_new {
                        context.increment(OBJECT_CREATED);
                    }
                }
            }
        }
    }
}

impl Drop for EventDispatch {
    fn drop(&mut self) {
        if self.is_attached() {
            self.detach();
        }
    }
}
