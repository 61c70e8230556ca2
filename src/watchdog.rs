//! Internet watchdog
//!
//! Polls reachability and, when the device is offline and not associated to
//! any Wi-Fi network, runs the captive-portal setup until it reaches an
//! outcome. Only one setup runs at a time: the loop awaits it.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::Result;
use crate::notify::{dialog, BusEvent, DialogCatalog, Notifier};
use crate::probe::ReachabilityProbe;
use crate::process::Launcher;
use crate::setup::{ProvisioningSession, SetupOutcome};

/// Poll interval while a setup is in progress.
const BUSY_POLL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogState {
    Idle,
    Monitoring,
    SetupInProgress,
}

/// What one watchdog iteration observed or did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    Busy,
    Online,
    AssociatedWithoutInternet(String),
    Provisioned(SetupOutcome),
}

/// Cancellation token of the setup currently in progress, if any.
#[derive(Debug, Clone, Default)]
pub struct ActiveSession {
    token: Arc<Mutex<Option<CancellationToken>>>,
}

impl ActiveSession {
    fn begin(&self, parent: &CancellationToken) -> CancellationToken {
        let token = parent.child_token();
        *self.lock() = Some(token.clone());
        token
    }

    fn end(&self) {
        self.lock().take();
    }

    pub fn is_active(&self) -> bool {
        self.lock().is_some()
    }

    /// Ask the running setup to tear down. No-op without one.
    pub fn cancel(&self) -> bool {
        match self.lock().as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.token.lock().unwrap_or_else(|e| e.into_inner())
    }
}

pub struct Watchdog {
    config: Config,
    probe: Arc<dyn ReachabilityProbe>,
    notifier: Arc<dyn Notifier>,
    session: ProvisioningSession,
    active: ActiveSession,
    state: WatchdogState,
    interval: Duration,
    online: Option<bool>,
}

impl Watchdog {
    pub fn new(
        config: Config,
        probe: Arc<dyn ReachabilityProbe>,
        launcher: Arc<dyn Launcher>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let dialogs = Arc::new(DialogCatalog::from_config(&config));
        let session =
            ProvisioningSession::new(&config, launcher, Arc::clone(&notifier), dialogs);
        let interval = config.poll_interval();

        Self {
            config,
            probe,
            notifier,
            session,
            active: ActiveSession::default(),
            state: WatchdogState::Idle,
            interval,
            online: None,
        }
    }

    pub fn state(&self) -> WatchdogState {
        self.state
    }

    pub fn poll_interval(&self) -> Duration {
        self.interval
    }

    pub fn active_session(&self) -> ActiveSession {
        self.active.clone()
    }

    /// Run the loop on a background task.
    pub fn spawn(mut self) -> WatchdogHandle {
        let shutdown = CancellationToken::new();
        let stopped = CancellationToken::new();
        let active = self.active.clone();
        let notifier = Arc::clone(&self.notifier);

        let token = shutdown.clone();
        let guard = stopped.clone().drop_guard();
        let task = tokio::spawn(async move {
            let _guard = guard;
            self.run(&token).await;
        });

        WatchdogHandle {
            shutdown,
            stopped,
            active,
            notifier,
            task,
        }
    }

    /// Monitor until `shutdown` is cancelled or a completed setup stops the
    /// watchdog.
    pub async fn run(&mut self, shutdown: &CancellationToken) {
        self.state = WatchdogState::Monitoring;
        tracing::info!("Wifi watchdog started");

        if has_saved_profile(Arc::clone(&self.probe)).await {
            tracing::info!(
                "Detected previously configured wifi, waiting {}s for it to connect",
                self.config.grace_seconds
            );
            if !sleep_or_cancel(self.config.grace_period(), shutdown).await {
                self.stop().await;
                return;
            }
        }

        while self.state != WatchdogState::Idle && !shutdown.is_cancelled() {
            let delay = match self.tick(shutdown).await {
                Ok(Tick::Busy) => BUSY_POLL,
                Ok(_) => self.interval,
                Err(e) => {
                    tracing::error!("Watchdog check failed: {}", e);
                    self.interval
                }
            };

            if self.state == WatchdogState::Idle || !sleep_or_cancel(delay, shutdown).await {
                break;
            }
        }

        self.stop().await;
    }

    /// One iteration: probe, then provision if needed.
    pub async fn tick(&mut self, shutdown: &CancellationToken) -> Result<Tick> {
        if self.state == WatchdogState::SetupInProgress {
            return Ok(Tick::Busy);
        }

        let probe = Arc::clone(&self.probe);
        let has_internet = tokio::task::spawn_blocking(move || probe.has_internet()).await?;
        let was_online = self.online.replace(has_internet);

        if has_internet {
            if was_online != Some(true) {
                tracing::info!("Internet connectivity confirmed");
                self.notifier.emit(BusEvent::ClockSync);
            }
            return Ok(Tick::Online);
        }

        tracing::info!("No internet");
        let probe = Arc::clone(&self.probe);
        if let Some(ssid) = tokio::task::spawn_blocking(move || probe.wifi_association()).await? {
            tracing::warn!("Connected to wifi '{}', but no internet", ssid);
            return Ok(Tick::AssociatedWithoutInternet(ssid));
        }

        tracing::info!("Not connected to wifi, launching setup");
        let outcome = self.provision(shutdown).await?;
        Ok(Tick::Provisioned(outcome))
    }

    /// Run setup sessions until one ends without asking for a restart.
    async fn provision(&mut self, shutdown: &CancellationToken) -> Result<SetupOutcome> {
        self.state = WatchdogState::SetupInProgress;
        let token = self.active.begin(shutdown);
        self.notifier.emit(BusEvent::SetupStarted);
        if self.config.debug {
            self.session.speak(dialog::DEBUG_START_SETUP);
        }

        let mut restarts: u64 = 0;
        let result = loop {
            match self.session.run(&token).await {
                // The binary sometimes fails to enumerate access points and
                // only needs a fresh start
                Ok(SetupOutcome::RestartRequested) => {
                    restarts += 1;
                    tracing::warn!("Wifi setup failed, restarting (attempt {})", restarts + 1);
                }
                other => break other,
            }
        };

        self.active.end();
        self.state = WatchdogState::Monitoring;
        if self.config.debug {
            self.session.speak(dialog::DEBUG_END_SETUP);
        }

        if let Ok(SetupOutcome::Completed) = result {
            self.on_setup_completed();
        }
        result
    }

    fn on_setup_completed(&mut self) {
        self.interval = self.config.post_connect_poll_interval();
        if self.config.stop_watchdog_on_connect {
            tracing::info!("Wifi setup complete, stopping watchdog");
            self.state = WatchdogState::Idle;
        }
        self.notifier.emit(BusEvent::SetupCompleted);
        self.notifier.release_display();
    }

    async fn stop(&mut self) {
        self.session.teardown().await;
        self.state = WatchdogState::Idle;
        tracing::info!("Wifi watchdog stopped");
    }
}

async fn has_saved_profile(probe: Arc<dyn ReachabilityProbe>) -> bool {
    tokio::task::spawn_blocking(move || probe.has_saved_wifi_profile())
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("Saved profile lookup failed: {}", e);
            false
        })
}

/// Sleep for `duration`; `false` if `token` was cancelled first.
async fn sleep_or_cancel(duration: Duration, token: &CancellationToken) -> bool {
    tokio::select! {
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

/// Control surface of a spawned [`Watchdog`].
pub struct WatchdogHandle {
    shutdown: CancellationToken,
    stopped: CancellationToken,
    active: ActiveSession,
    notifier: Arc<dyn Notifier>,
    task: JoinHandle<()>,
}

impl WatchdogHandle {
    /// Another subsystem saw the device come online.
    pub fn internet_connected(&self) {
        self.notifier.emit(BusEvent::ClockSync);
        if self.active.cancel() {
            tracing::info!("Internet connected, tearing down wifi setup");
        }
        self.notifier.release_display();
    }

    pub fn is_provisioning(&self) -> bool {
        self.active.is_active()
    }

    /// Resolves once the watchdog loop has exited.
    pub async fn stopped(&self) {
        self.stopped.cancelled().await
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.is_cancelled()
    }

    /// Stop monitoring, tear down any setup and wait for the loop to exit.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        if let Err(e) = self.task.await {
            tracing::error!("Watchdog task failed: {}", e);
        }
    }
}
