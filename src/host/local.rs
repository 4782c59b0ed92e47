//! In-process host implementation
//!
//! `LocalHost` keeps subscriptions, timers and scene data in memory. It runs
//! the engine without a content-creation application: notifications are
//! delivered with [`LocalHost::notify`] and timers fire on [`LocalHost::advance`].

use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};

use super::{
    Host, HostChannel, HostError, HostNotification, NotificationHandler, SceneMaterial,
    SceneObject, SceneQuery, SubscriptionId, TimerCallback, TimerId,
};

struct Subscription {
    id: SubscriptionId,
    channel: HostChannel,
    handler: NotificationHandler,
}

struct Timer {
    id: TimerId,
    due: f64,
    callback: TimerCallback,
}

#[derive(Default)]
struct Scene {
    objects: Vec<SceneObject>,
    materials: Vec<SceneMaterial>,
    collection_count: usize,
    unavailable: Option<String>,
}

impl Scene {
    fn check(&self) -> Result<(), HostError> {
        match &self.unavailable {
            Some(reason) => Err(HostError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }
}

/// Host backed entirely by in-memory state
#[derive(Default)]
pub struct LocalHost {
    next_id: AtomicU64,
    subscriptions: Mutex<Vec<Subscription>>,
    timers: Mutex<Vec<Timer>>,
    clock: Mutex<f64>,
    notifications: Mutex<Vec<String>>,
    scene: RwLock<Scene>,
}

impl LocalHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Deliver a notification to every handler subscribed to its channel
    ///
    /// Returns the number of handlers invoked.
    pub fn notify(&self, notification: &HostNotification) -> usize {
        let channel = notification.channel();
        let handlers: Vec<NotificationHandler> = self
            .subscriptions
            .lock()
            .iter()
            .filter(|sub| sub.channel == channel)
            .map(|sub| sub.handler.clone())
            .collect();

        for handler in &handlers {
            handler(notification);
        }
        handlers.len()
    }

    /// Move the clock forward, firing due timers in order
    ///
    /// Returns the number of timer callbacks run.
    pub fn advance(&self, seconds: f64) -> usize {
        let target = *self.clock.lock() + seconds;
        let mut fired = 0;

        loop {
            let next = {
                let mut timers = self.timers.lock();
                let index = timers
                    .iter()
                    .enumerate()
                    .filter(|(_, timer)| timer.due <= target)
                    .min_by(|(_, a), (_, b)| a.due.total_cmp(&b.due))
                    .map(|(index, _)| index);
                index.map(|index| timers.remove(index))
            };

            let Some(timer) = next else { break };
            *self.clock.lock() = timer.due;

            fired += 1;
            match (timer.callback)() {
                Some(delay) if !delay.is_finite() => {
                    log::warn!("Dropping timer {:?}: invalid delay {}", timer.id, delay);
                }
                Some(delay) => {
                    let stalled = delay <= 0.0;
                    self.timers.lock().push(Timer {
                        due: timer.due + delay.max(0.0),
                        ..timer
                    });
                    // A timer that does not move forward runs once per advance
                    if stalled {
                        break;
                    }
                }
                None => {}
            }
        }

        *self.clock.lock() = target;
        fired
    }

    /// Current clock value in seconds
    pub fn now(&self) -> f64 {
        *self.clock.lock()
    }

    /// Messages shown through `display_notification`, oldest first
    pub fn notifications(&self) -> Vec<String> {
        self.notifications.lock().clone()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.lock().len()
    }

    pub fn timer_count(&self) -> usize {
        self.timers.lock().len()
    }

    pub fn add_object(&self, object: SceneObject) {
        self.scene.write().objects.push(object);
    }

    pub fn add_material(&self, material: SceneMaterial) {
        self.scene.write().materials.push(material);
    }

    pub fn set_collection_count(&self, count: usize) {
        self.scene.write().collection_count = count;
    }

    /// Make every scene query fail with `HostError::Unavailable`, or clear the failure
    pub fn set_unavailable(&self, reason: Option<&str>) {
        self.scene.write().unavailable = reason.map(str::to_string);
    }
}

impl Host for LocalHost {
    fn subscribe(&self, channel: HostChannel, handler: NotificationHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id());
        self.subscriptions.lock().push(Subscription {
            id,
            channel,
            handler,
        });
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self.subscriptions.lock();
        let before = subscriptions.len();
        subscriptions.retain(|sub| sub.id != id);
        subscriptions.len() != before
    }

    fn register_timer(&self, first_interval: f64, callback: TimerCallback) -> TimerId {
        let id = TimerId(self.next_id());
        let due = self.now() + first_interval.max(0.0);
        self.timers.lock().push(Timer { id, due, callback });
        id
    }

    fn unregister_timer(&self, id: TimerId) -> bool {
        let mut timers = self.timers.lock();
        let before = timers.len();
        timers.retain(|timer| timer.id != id);
        timers.len() != before
    }

    fn display_notification(&self, message: &str) {
        self.notifications.lock().push(message.to_string());
    }
}

impl SceneQuery for LocalHost {
    fn objects(&self) -> Result<Vec<SceneObject>, HostError> {
        let scene = self.scene.read();
        scene.check()?;
        Ok(scene.objects.clone())
    }

    fn collection_count(&self) -> Result<usize, HostError> {
        let scene = self.scene.read();
        scene.check()?;
        Ok(scene.collection_count)
    }

    fn materials(&self) -> Result<Vec<SceneMaterial>, HostError> {
        let scene = self.scene.read();
        scene.check()?;
        Ok(scene.materials.clone())
    }
}
