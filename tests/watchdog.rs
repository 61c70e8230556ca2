mod common;

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use common::*;
use wifi_watchdog::config::Config;
use wifi_watchdog::notify::{dialog, BusEvent, SetupPage};
use wifi_watchdog::setup::SetupOutcome;
use wifi_watchdog::watchdog::{Tick, Watchdog, WatchdogState};

fn watchdog(
    config: Config,
    probe: &std::sync::Arc<FakeProbe>,
    launcher: &std::sync::Arc<ScriptedLauncher>,
    notifier: &std::sync::Arc<RecordingNotifier>,
) -> Watchdog {
    Watchdog::new(config, probe.clone(), launcher.clone(), notifier.clone())
}

#[tokio::test(start_paused = true)]
async fn test_online_ticks_never_launch() {
    let probe = FakeProbe::online();
    let launcher = ScriptedLauncher::new(vec![]);
    let notifier = RecordingNotifier::new();
    let mut dog = watchdog(test_config(), &probe, &launcher, &notifier);
    let shutdown = CancellationToken::new();

    for _ in 0..10 {
        assert_eq!(dog.tick(&shutdown).await.unwrap(), Tick::Online);
    }

    assert_eq!(launcher.launches(), 0);
    assert_eq!(probe.internet_checks(), 10);
    assert_eq!(notifier.events(), vec![BusEvent::ClockSync]);
}

#[tokio::test(start_paused = true)]
async fn test_clock_sync_on_every_return_online() {
    let probe = FakeProbe::associated("Home");
    let launcher = ScriptedLauncher::new(vec![]);
    let notifier = RecordingNotifier::new();
    let mut dog = watchdog(test_config(), &probe, &launcher, &notifier);
    let shutdown = CancellationToken::new();

    dog.tick(&shutdown).await.unwrap();
    probe.set_internet(true);
    dog.tick(&shutdown).await.unwrap();
    probe.set_internet(false);
    dog.tick(&shutdown).await.unwrap();
    probe.set_internet(true);
    dog.tick(&shutdown).await.unwrap();
    dog.tick(&shutdown).await.unwrap();

    assert_eq!(
        notifier.events(),
        vec![BusEvent::ClockSync, BusEvent::ClockSync]
    );
}

#[tokio::test(start_paused = true)]
async fn test_associated_without_internet_waits() {
    let probe = FakeProbe::associated("Home");
    let launcher = ScriptedLauncher::new(vec![Script::hang(&[])]);
    let notifier = RecordingNotifier::new();
    let mut dog = watchdog(test_config(), &probe, &launcher, &notifier);

    let tick = dog.tick(&CancellationToken::new()).await.unwrap();

    assert_eq!(tick, Tick::AssociatedWithoutInternet("Home".to_string()));
    assert_eq!(launcher.launches(), 0);
    assert!(notifier.notes().is_empty());
    assert_eq!(dog.state(), WatchdogState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_completed_setup_widens_poll_interval() {
    let probe = FakeProbe::offline();
    let launcher = ScriptedLauncher::new(vec![Script::hang(&[AP_CREATED, USER_JOINED, INTERNET])]);
    let notifier = RecordingNotifier::new();
    let mut dog = watchdog(test_config(), &probe, &launcher, &notifier);
    assert_eq!(dog.poll_interval(), Duration::from_secs(30));

    let tick = dog.tick(&CancellationToken::new()).await.unwrap();

    assert_eq!(tick, Tick::Provisioned(SetupOutcome::Completed));
    assert_eq!(dog.poll_interval(), Duration::from_secs(90));
    assert_eq!(dog.state(), WatchdogState::Monitoring);
    assert!(!dog.active_session().is_active());

    assert_eq!(
        notifier.events(),
        vec![BusEvent::SetupStarted, BusEvent::SetupCompleted]
    );
    assert_eq!(notifier.notes().last(), Some(&Note::Release));
    assert_eq!(
        notifier.pages(),
        vec![
            SetupPage::JoinAp,
            SetupPage::SelectNetwork,
            SetupPage::SetupCompleted
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_failed_setup_restarts_after_teardown() {
    let probe = FakeProbe::offline();
    let launcher = ScriptedLauncher::new(vec![
        Script::hang(&[SCAN_FAILED]),
        Script::hang(&["Access points: []", SCAN_FAILED]),
        Script::hang(&[AP_CREATED, INTERNET]),
    ]);
    let notifier = RecordingNotifier::new();
    let mut dog = watchdog(test_config(), &probe, &launcher, &notifier);

    let tick = dog.tick(&CancellationToken::new()).await.unwrap();

    assert_eq!(tick, Tick::Provisioned(SetupOutcome::Completed));
    assert_eq!(
        launcher.log(),
        vec![
            "launch 1",
            "interrupt 1",
            "launch 2",
            "interrupt 2",
            "launch 3",
            "interrupt 3",
        ]
    );
    assert_eq!(notifier.count(&Note::Event(BusEvent::SetupStarted)), 1);
    assert_eq!(notifier.count(&Note::Show(SetupPage::SetupFailed)), 2);
    assert_eq!(notifier.count(&Note::Event(BusEvent::SetupCompleted)), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failure_without_restart_returns_to_monitoring() {
    let config = Config {
        restart_on_failure: false,
        ..test_config()
    };
    let probe = FakeProbe::offline();
    let launcher = ScriptedLauncher::new(vec![Script::hang(&[SCAN_FAILED])]);
    let notifier = RecordingNotifier::new();
    let mut dog = watchdog(config, &probe, &launcher, &notifier);

    let tick = dog.tick(&CancellationToken::new()).await.unwrap();

    assert_eq!(tick, Tick::Provisioned(SetupOutcome::Failed));
    assert_eq!(launcher.launches(), 1);
    assert_eq!(dog.poll_interval(), Duration::from_secs(30));
    assert_eq!(dog.state(), WatchdogState::Monitoring);
    assert!(!notifier.events().contains(&BusEvent::SetupCompleted));
}

#[tokio::test(start_paused = true)]
async fn test_stop_on_connect_idles_watchdog() {
    let config = Config {
        stop_watchdog_on_connect: true,
        ..test_config()
    };
    let probe = FakeProbe::offline();
    let launcher = ScriptedLauncher::new(vec![Script::exit(&[INTERNET])]);
    let notifier = RecordingNotifier::new();
    let dog = watchdog(config, &probe, &launcher, &notifier);

    let handle = dog.spawn();
    handle.stopped().await;

    assert!(handle.is_stopped());
    assert_eq!(launcher.launches(), 1);
    assert_eq!(probe.internet_checks(), 1);
    assert!(notifier.events().contains(&BusEvent::SetupCompleted));
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_launch_failure_is_not_fatal() {
    let probe = FakeProbe::offline();
    let launcher = ScriptedLauncher::new(vec![]);
    let notifier = RecordingNotifier::new();
    let mut dog = watchdog(test_config(), &probe, &launcher, &notifier);

    assert!(dog.tick(&CancellationToken::new()).await.is_err());
    assert_eq!(dog.state(), WatchdogState::Monitoring);
    assert!(!dog.active_session().is_active());

    // The loop keeps polling after the failed launch
    let handle = dog.spawn();
    tokio::time::sleep(Duration::from_secs(65)).await;
    assert!(!handle.is_stopped());
    assert!(probe.internet_checks() >= 3);
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_debug_mode_speaks_setup_boundaries() {
    let config = Config {
        debug: true,
        ..test_config()
    };
    let probe = FakeProbe::offline();
    let launcher = ScriptedLauncher::new(vec![Script::exit(&[INTERNET])]);
    let notifier = RecordingNotifier::new();
    let mut dog = watchdog(config, &probe, &launcher, &notifier);

    dog.tick(&CancellationToken::new()).await.unwrap();

    assert_eq!(
        notifier.spoken(),
        vec![
            dialog::DEBUG_START_SETUP.to_string(),
            dialog::DEBUG_WIFI_CONNECTED.to_string(),
            dialog::DEBUG_END_SETUP.to_string(),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_saved_profile_delays_first_check() {
    let probe = FakeProbe::online();
    probe.set_saved_profile(true);
    let launcher = ScriptedLauncher::new(vec![]);
    let notifier = RecordingNotifier::new();
    let handle = watchdog(test_config(), &probe, &launcher, &notifier).spawn();

    tokio::time::sleep(Duration::from_secs(44)).await;
    assert_eq!(probe.internet_checks(), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(probe.internet_checks(), 1);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_no_saved_profile_checks_immediately() {
    let probe = FakeProbe::online();
    let launcher = ScriptedLauncher::new(vec![]);
    let notifier = RecordingNotifier::new();
    let handle = watchdog(test_config(), &probe, &launcher, &notifier).spawn();

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(probe.internet_checks(), 1);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(probe.internet_checks(), 2);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_internet_connected_tears_down_running_setup() {
    let probe = FakeProbe::offline();
    let launcher = ScriptedLauncher::new(vec![Script::hang(&[AP_CREATED])]);
    let notifier = RecordingNotifier::new();
    let handle = watchdog(test_config(), &probe, &launcher, &notifier).spawn();

    launcher.wait_for_launches(1).await;
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(handle.is_provisioning());

    probe.set_internet(true);
    handle.internet_connected();
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert!(!handle.is_provisioning());
    assert_eq!(launcher.log(), vec!["launch 1", "interrupt 1"]);
    assert!(notifier.events().contains(&BusEvent::ClockSync));
    assert!(notifier.notes().contains(&Note::Release));
    assert!(!notifier.events().contains(&BusEvent::SetupCompleted));

    // The loop keeps monitoring and finds the device online
    tokio::time::sleep(Duration::from_secs(31)).await;
    assert!(!handle.is_stopped());
    assert_eq!(launcher.launches(), 1);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_internet_connected_without_setup_only_syncs_clock() {
    let probe = FakeProbe::online();
    let launcher = ScriptedLauncher::new(vec![]);
    let notifier = RecordingNotifier::new();
    let handle = watchdog(test_config(), &probe, &launcher, &notifier).spawn();

    tokio::time::sleep(Duration::from_secs(1)).await;
    handle.internet_connected();

    assert_eq!(
        notifier.notes(),
        vec![
            Note::Event(BusEvent::ClockSync),
            Note::Event(BusEvent::ClockSync),
            Note::Release,
        ]
    );
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_tears_down_running_setup() {
    let probe = FakeProbe::offline();
    let launcher =
        ScriptedLauncher::new(vec![Script::hang(&[AP_CREATED]).dies_on(Stage::Close)]);
    let notifier = RecordingNotifier::new();
    let handle = watchdog(test_config(), &probe, &launcher, &notifier).spawn();

    launcher.wait_for_launches(1).await;
    handle.shutdown().await;

    assert_eq!(launcher.log(), vec!["launch 1", "interrupt 1", "close 1"]);
    assert_eq!(launcher.launches(), 1);
}
