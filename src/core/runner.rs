//! Main add-on runner

use parking_lot::{Mutex, ReentrantMutex, RwLock};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use super::events::{EventHandler, UnlockCallback};
use super::state::{AchievementContext, AchievementState};
use crate::catalog::{discover_sources, load_catalog, Catalog};
use crate::config::{AddonConfig, Preferences};
use crate::host::{EventDispatch, Host, SceneQuery, TimerCallback, TimerId};
use crate::panel::{panel_rows, PanelRow, SyncReport};
use crate::triggers::{panic_message, PollReport, Trigger, TriggerRegistry, UnlockEvaluator};
use crate::{AchievementsError, Result};

/// Everything one poll pass needs, shared with the host timer
#[derive(Clone)]
struct PollTask {
    context: Arc<AchievementContext>,
    registry: Arc<RwLock<TriggerRegistry>>,
    events: Arc<Mutex<EventHandler>>,
    host: Arc<dyn Host>,
    interval: f64,
    /// Held for a whole pass and for catalog swaps. Reentrant so a listener
    /// may unregister or sync from inside a pass.
    gate: Arc<ReentrantMutex<()>>,
}

impl PollTask {
    /// Run a pass on demand
    fn run(&self) -> PollReport {
        let _pass = self.gate.lock();
        let report = self.evaluate();
        self.deliver(&report, None);
        report
    }

    /// Run a pass fired by the host timer
    ///
    /// Returns the delay until the next pass, or `None` once `active` has been
    /// cleared. Unlocks from a pass cancelled mid-way go back to pending.
    fn run_scheduled(&self, active: &AtomicBool) -> Option<f64> {
        let _pass = self.gate.lock();
        if !active.load(Ordering::SeqCst) {
            return None;
        }

        let report = self.evaluate();
        if !active.load(Ordering::SeqCst) {
            for event in &report.unlocked {
                self.context.revoke(&event.achievement_id);
            }
            log::debug!(
                "Poll cancelled by teardown, {} unlocks left pending",
                report.unlocked.len()
            );
            return None;
        }

        self.deliver(&report, Some(active));
        active
            .load(Ordering::SeqCst)
            .then_some(report.next_delay)
    }

    fn evaluate(&self) -> PollReport {
        let registry = self.registry.read();
        UnlockEvaluator::new(&self.context, &registry).poll(self.interval)
    }

    /// Show every unlock in the host, then tell listeners
    fn deliver(&self, report: &PollReport, active: Option<&AtomicBool>) {
        for event in &report.unlocked {
            self.host.display_notification(&event.message());
        }

        let events = self.events.lock();
        for event in &report.unlocked {
            if active.is_some_and(|active| !active.load(Ordering::SeqCst)) {
                break;
            }
            events.emit(event);
        }
    }
}

/// Host timer registered by one `register` call
struct Schedule {
    id: TimerId,
    /// Cleared by `unregister`; checked by the timer closure
    active: Arc<AtomicBool>,
}

/// Achievements add-on: owns the shared state and its host hooks
pub struct AchievementsAddon {
    config: AddonConfig,
    /// Preferences used when no preferences file is configured
    preferences: Mutex<Preferences>,
    /// Whether the add-on is registered with the host
    registered: AtomicBool,
    dispatch: EventDispatch,
    schedule: Mutex<Option<Schedule>>,
    task: PollTask,
}

impl AchievementsAddon {
    /// Create an add-on with the built-in triggers reading from `scene`
    pub fn new(config: AddonConfig, host: Arc<dyn Host>, scene: Arc<dyn SceneQuery>) -> Self {
        Self::with_registry(config, host, TriggerRegistry::with_builtin(scene))
    }

    /// Create an add-on with a caller-supplied trigger registry
    pub fn with_registry(config: AddonConfig, host: Arc<dyn Host>, registry: TriggerRegistry) -> Self {
        let task = PollTask {
            context: Arc::new(AchievementContext::new()),
            registry: Arc::new(RwLock::new(registry)),
            events: Arc::new(Mutex::new(EventHandler::new())),
            host: host.clone(),
            interval: config.poll_interval,
            gate: Arc::new(ReentrantMutex::new(())),
        };

        Self {
            preferences: Mutex::new(config.preferences.clone()),
            config,
            registered: AtomicBool::new(false),
            dispatch: EventDispatch::new(host),
            schedule: Mutex::new(None),
            task,
        }
    }

    /// Shared achievement state
    pub fn context(&self) -> &Arc<AchievementContext> {
        &self.task.context
    }

    pub fn config(&self) -> &AddonConfig {
        &self.config
    }

    /// Check if the add-on is registered with the host
    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::SeqCst)
    }

    /// Load the catalog, attach event hooks and start the poll timer
    pub fn register(&self) -> Result<()> {
        let mut schedule = self.schedule.lock();
        if schedule.is_some() {
            return Err(AchievementsError::AlreadyRegistered);
        }
        self.config.validate()?;

        self.reload_catalog();
        self.dispatch.attach(self.task.context.clone());

        let task = self.task.clone();
        let active = Arc::new(AtomicBool::new(true));
        let flag = active.clone();
        let callback: TimerCallback = Arc::new(move || {
            match panic::catch_unwind(AssertUnwindSafe(|| task.run_scheduled(&flag))) {
                Ok(delay) => delay,
                Err(payload) => {
                    log::error!("[Achievements] Poll failed: {}", panic_message(&*payload));
                    flag.load(Ordering::SeqCst).then_some(task.interval)
                }
            }
        });
        let id = self.task.host.register_timer(self.config.first_interval, callback);
        *schedule = Some(Schedule { id, active });
        self.registered.store(true, Ordering::SeqCst);

        log::info!(
            "Achievements add-on registered ({} achievements, polling every {}s)",
            self.task.context.catalog().len(),
            self.config.poll_interval
        );
        Ok(())
    }

    /// Detach every hook and stop polling
    ///
    /// Waits for a pass or hook that is already running, so no poll or hook
    /// does any work once this returns.
    pub fn unregister(&self) -> Result<()> {
        let schedule = self
            .schedule
            .lock()
            .take()
            .ok_or(AchievementsError::NotRegistered)?;
        schedule.active.store(false, Ordering::SeqCst);
        self.registered.store(false, Ordering::SeqCst);

        self.dispatch.detach();
        drop(self.task.gate.lock());
        self.task.host.unregister_timer(schedule.id);

        log::info!("Achievements add-on unregistered");
        Ok(())
    }

    /// Run one poll pass now
    pub fn poll(&self) -> PollReport {
        self.task.run()
    }

    /// Reload the catalog from disk and re-arm every achievement
    pub fn sync(&self) -> Result<SyncReport> {
        let report = self.reload_catalog();
        log::info!("[Achievements] {}", report.message());
        Ok(report)
    }

    /// Rebuild the catalog from the configured sources
    ///
    /// Preferences are read here and nowhere else. The unlocked set is cleared.
    fn reload_catalog(&self) -> SyncReport {
        let preferences = self.preferences().unwrap_or_else(|e| {
            log::warn!("[Achievements] {}, using default preferences", e);
            Preferences::default()
        });
        let sources = discover_sources(&self.config, &preferences);
        let load = load_catalog(&sources);

        let report = SyncReport {
            loaded: load.catalog.len(),
            failed_sources: load.errors.iter().map(|e| e.path().to_path_buf()).collect(),
        };
        self.replace_catalog(load.catalog);
        report
    }

    /// Swap in a catalog directly, clearing the unlocked set
    ///
    /// Waits for a running pass so it never mixes two catalogs.
    pub fn replace_catalog(&self, catalog: Catalog) {
        let _pass = self.task.gate.lock();
        self.task.context.replace_catalog(catalog);
    }

    /// Current preferences, read from the preferences file when one is configured
    pub fn preferences(&self) -> Result<Preferences> {
        match &self.config.preferences_file {
            Some(path) => Preferences::load(path),
            None => Ok(self.preferences.lock().clone()),
        }
    }

    /// Toggle community sources. Takes effect on the next sync.
    pub fn set_enable_community(&self, enabled: bool) -> Result<()> {
        let mut preferences = self.preferences()?;
        preferences.enable_community = enabled;
        if let Some(path) = &self.config.preferences_file {
            preferences.save(path)?;
        }
        *self.preferences.lock() = preferences;
        Ok(())
    }

    /// Register or replace a trigger
    pub fn register_trigger(&self, name: impl Into<String>, trigger: Trigger) -> Option<Trigger> {
        self.task.registry.write().register(name, trigger)
    }

    /// Register a callback for unlock events
    pub fn on_unlock(&self, callback: UnlockCallback) {
        self.task.events.lock().on_unlock(callback);
    }

    /// Rows of the achievement list view
    pub fn panel_rows(&self) -> Vec<PanelRow> {
        let context = &self.task.context;
        let catalog = context.catalog();
        panel_rows(&catalog, &context.unlocked())
    }

    /// Get the current state
    pub fn state(&self) -> AchievementState {
        let mut state = self.task.context.snapshot();
        state.registered = self.is_registered();
        state
    }

    /// Get the current state as a JSON string
    pub fn state_json(&self) -> String {
        serde_json::to_string(&self.state()).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Drop for AchievementsAddon {
    fn drop(&mut self) {
        if self.is_registered() {
            let _ = self.unregister();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{UnlockEvent, SAVE_COUNT};
    use crate::host::{HostNotification, LocalHost};
    use std::fs;
    use tempfile::TempDir;

    fn addon_dir(default_json: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        let achievements = dir.path().join("achievements");
        fs::create_dir_all(&achievements).unwrap();
        fs::write(achievements.join("default.json"), default_json).unwrap();
        dir
    }

    fn addon(dir: &TempDir) -> (Arc<LocalHost>, AchievementsAddon) {
        let host = Arc::new(LocalHost::new());
        let addon = AchievementsAddon::new(AddonConfig::new(dir.path()), host.clone(), host.clone());
        (host, addon)
    }

    #[test]
    fn test_register_twice() {
        let dir = addon_dir("[]");
        let (_host, addon) = addon(&dir);

        addon.register().unwrap();
        assert!(matches!(
            addon.register(),
            Err(AchievementsError::AlreadyRegistered)
        ));
    }

    #[test]
    fn test_unregister_when_not_registered() {
        let dir = addon_dir("[]");
        let (_host, addon) = addon(&dir);
        assert!(matches!(
            addon.unregister(),
            Err(AchievementsError::NotRegistered)
        ));
    }

    #[test]
    fn test_register_loads_catalog_and_hooks() {
        let dir = addon_dir(r#"[{"id": "a1", "trigger": "save_count"}]"#);
        let (host, addon) = addon(&dir);

        addon.register().unwrap();
        assert!(addon.is_registered());
        assert_eq!(addon.context().catalog().len(), 1);
        assert_eq!(host.subscription_count(), 3);
        assert_eq!(host.timer_count(), 1);
        assert!(addon.state().registered);
    }

    #[test]
    fn test_poll_notifies_host_and_listeners() {
        let dir = addon_dir(r#"[{"id": "a1", "name": "Saver", "trigger": "save_count"}]"#);
        let (host, addon) = addon(&dir);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        addon.on_unlock(Box::new(move |event: &UnlockEvent| {
            sink.lock().push(event.achievement_id.clone());
        }));
        addon.register().unwrap();

        host.notify(&HostNotification::DocumentSaved);
        let report = addon.poll();

        assert_eq!(report.unlocked_ids(), vec!["a1"]);
        assert_eq!(host.notifications(), vec!["🎉 Achievement Unlocked: Saver"]);
        assert_eq!(*seen.lock(), vec!["a1".to_string()]);
    }

    #[test]
    fn test_custom_trigger() {
        let dir = addon_dir(r#"[{"id": "spin", "trigger": "spins", "threshold": 2}]"#);
        let (_host, addon) = addon(&dir);
        addon.register().unwrap();

        assert!(addon.poll().unlocked.is_empty());
        addon.register_trigger("spins", Trigger::host_query(|| Ok(2.0)));
        assert_eq!(addon.poll().unlocked_ids(), vec!["spin"]);
    }

    #[test]
    fn test_producer_may_sync_during_poll() {
        let dir = addon_dir(r#"[{"id": "reload", "trigger": "reloads"}]"#);
        let (_host, addon) = addon(&dir);
        let addon = Arc::new(addon);
        let handle = Arc::downgrade(&addon);
        addon.register_trigger(
            "reloads",
            Trigger::host_query(move || {
                let addon = handle.upgrade().ok_or("add-on dropped")?;
                Ok(addon.sync()?.loaded as f64)
            }),
        );
        addon.register().unwrap();

        assert_eq!(addon.poll().unlocked_ids(), vec!["reload"]);
    }

    #[test]
    fn test_state_json() {
        let dir = addon_dir(r#"[{"id": "a1", "trigger": "save_count"}]"#);
        let (host, addon) = addon(&dir);
        addon.register().unwrap();
        host.notify(&HostNotification::DocumentSaved);

        let state: AchievementState = serde_json::from_str(&addon.state_json()).unwrap();
        assert!(state.registered);
        assert_eq!(state.counter(SAVE_COUNT), 1);
        assert_eq!(state.achievements.len(), 1);
    }

    #[test]
    fn test_unregister_from_listener_stops_timer() {
        let dir = addon_dir(r#"[{"id": "a1", "trigger": "save_count"}]"#);
        let (host, addon) = addon(&dir);
        let addon = Arc::new(addon);
        let handle = Arc::downgrade(&addon);
        addon.on_unlock(Box::new(move |_: &UnlockEvent| {
            if let Some(addon) = handle.upgrade() {
                addon.unregister().unwrap();
            }
        }));
        addon.register().unwrap();

        host.notify(&HostNotification::DocumentSaved);
        assert_eq!(host.advance(5.0), 1);

        assert!(!addon.is_registered());
        assert_eq!(host.timer_count(), 0);
        assert_eq!(host.subscription_count(), 0);
        assert_eq!(host.notifications().len(), 1);
        assert_eq!(host.advance(20.0), 0);
    }

    #[test]
    fn test_panicking_listener_does_not_drop_notifications() {
        let dir = addon_dir(
            r#"[{"id": "a", "trigger": "save_count"}, {"id": "b", "trigger": "save_count"}]"#,
        );
        let (host, addon) = addon(&dir);
        let seen = Arc::new(Mutex::new(Vec::new()));
        addon.on_unlock(Box::new(|event: &UnlockEvent| {
            if event.achievement_id == "a" {
                panic!("listener rejected {}", event.achievement_id);
            }
        }));
        let sink = seen.clone();
        addon.on_unlock(Box::new(move |event: &UnlockEvent| {
            sink.lock().push(event.achievement_id.clone());
        }));
        addon.register().unwrap();

        host.notify(&HostNotification::DocumentSaved);
        assert_eq!(addon.poll().unlocked_ids(), vec!["a", "b"]);
        assert_eq!(
            host.notifications(),
            vec!["🎉 Achievement Unlocked: a", "🎉 Achievement Unlocked: b"]
        );
        assert_eq!(*seen.lock(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_register_rejects_zero_interval() {
        let dir = addon_dir("[]");
        let host = Arc::new(LocalHost::new());
        let addon = AchievementsAddon::new(
            AddonConfig::new(dir.path()).with_poll_interval(0.0),
            host.clone(),
            host.clone(),
        );

        assert!(matches!(
            addon.register(),
            Err(AchievementsError::InvalidInterval { .. })
        ));
        assert!(!addon.is_registered());
        assert_eq!(host.timer_count(), 0);
        assert_eq!(host.subscription_count(), 0);
    }

    #[test]
    fn test_corrupt_preferences_fall_back_to_defaults() {
        let dir = addon_dir(r#"[{"id": "a1", "trigger": "save_count"}]"#);
        let prefs = dir.path().join("prefs.toml");
        fs::write(&prefs, "enable_community = \"sometimes\"").unwrap();
        let host = Arc::new(LocalHost::new());
        let addon = AchievementsAddon::new(
            AddonConfig::new(dir.path()).with_preferences_file(&prefs),
            host.clone(),
            host.clone(),
        );

        addon.register().unwrap();
        assert_eq!(addon.context().catalog().len(), 1);
        assert_eq!(addon.sync().unwrap().loaded, 1);
    }

    #[test]
    fn test_drop_unregisters() {
        let dir = addon_dir("[]");
        let (host, addon) = addon(&dir);
        addon.register().unwrap();
        drop(addon);

        assert_eq!(host.subscription_count(), 0);
        assert_eq!(host.timer_count(), 0);
    }
}
