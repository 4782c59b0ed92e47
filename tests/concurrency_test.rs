//! Host callbacks and teardown racing a poll on other threads

use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use scene_achievements::core::SAVE_COUNT;
use scene_achievements::{AchievementsAddon, AddonConfig, HostNotification, LocalHost, Trigger};
use tempfile::TempDir;

fn setup(default_json: &str) -> (TempDir, Arc<LocalHost>, Arc<AchievementsAddon>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = TempDir::new().unwrap();
    let achievements = dir.path().join("achievements");
    fs::create_dir_all(&achievements).unwrap();
    fs::write(achievements.join("default.json"), default_json).unwrap();

    let host = Arc::new(LocalHost::new());
    let addon = AchievementsAddon::new(AddonConfig::new(dir.path()), host.clone(), host.clone());
    (dir, host, Arc::new(addon))
}

#[test]
fn test_unregister_waits_for_running_poll() {
    let (_dir, host, addon) = setup(r#"[{"id": "slow", "trigger": "slow_query"}]"#);

    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let entered_tx = Mutex::new(entered_tx);
    let release_rx = Mutex::new(release_rx);
    addon.register_trigger(
        "slow_query",
        Trigger::host_query(move || {
            let _ = entered_tx.lock().send(());
            let _ = release_rx.lock().recv();
            Ok(1.0)
        }),
    );
    addon.register().unwrap();

    let poller = {
        let host = host.clone();
        thread::spawn(move || host.advance(5.0))
    };
    entered_rx.recv().unwrap();

    let teardown = {
        let addon = addon.clone();
        thread::spawn(move || addon.unregister())
    };
    thread::sleep(Duration::from_millis(50));
    assert!(!teardown.is_finished());

    release_tx.send(()).unwrap();
    teardown.join().unwrap().unwrap();
    assert!(host.notifications().is_empty());

    assert_eq!(poller.join().unwrap(), 1);
    assert!(host.notifications().is_empty());
    assert!(!addon.context().is_unlocked("slow"));
    assert_eq!(host.timer_count(), 0);
    assert_eq!(host.subscription_count(), 0);
}

#[test]
fn test_concurrent_saves_while_polling() {
    const SAVERS: usize = 4;
    const SAVES_EACH: usize = 50;

    let (_dir, host, addon) = setup(
        r#"[
            {"id": "s1", "trigger": "save_count", "threshold": 1},
            {"id": "s50", "trigger": "save_count", "threshold": 50},
            {"id": "s120", "trigger": "save_count", "threshold": 120},
            {"id": "s200", "trigger": "save_count", "threshold": 200}
        ]"#,
    );
    addon.register().unwrap();
    let done = Arc::new(AtomicBool::new(false));

    let pollers: Vec<_> = (0..2)
        .map(|_| {
            let addon = addon.clone();
            let done = done.clone();
            thread::spawn(move || {
                let mut unlocked = Vec::new();
                while !done.load(Ordering::SeqCst) {
                    let report = addon.poll();
                    unlocked.extend(report.unlocked_ids().into_iter().map(str::to_string));
                }
                unlocked
            })
        })
        .collect();

    let savers: Vec<_> = (0..SAVERS)
        .map(|_| {
            let host = host.clone();
            thread::spawn(move || {
                for _ in 0..SAVES_EACH {
                    host.notify(&HostNotification::DocumentSaved);
                }
            })
        })
        .collect();
    for saver in savers {
        saver.join().unwrap();
    }
    done.store(true, Ordering::SeqCst);

    let mut unlocked: Vec<String> = pollers
        .into_iter()
        .flat_map(|poller| poller.join().unwrap())
        .collect();
    let report = addon.poll();
    unlocked.extend(report.unlocked_ids().into_iter().map(str::to_string));
    unlocked.sort();

    assert_eq!(addon.context().counter(SAVE_COUNT), (SAVERS * SAVES_EACH) as u64);
    assert_eq!(unlocked, vec!["s1", "s120", "s200", "s50"]);

    let notifications = host.notifications();
    assert_eq!(notifications.len(), 4);
    for id in ["s1", "s50", "s120", "s200"] {
        let message = format!("🎉 Achievement Unlocked: {}", id);
        assert_eq!(notifications.iter().filter(|n| **n == message).count(), 1);
    }
}
