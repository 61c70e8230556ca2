//! Scripted stand-ins for the probe, the provisioning binary and the bus.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use wifi_watchdog::config::Config;
use wifi_watchdog::error::{Result, WatchdogError};
use wifi_watchdog::notify::{BusEvent, DisplayDirective, Notifier, SetupPage, Utterance};
use wifi_watchdog::probe::ReachabilityProbe;
use wifi_watchdog::process::{LaunchSpec, Launcher, ManagedProcess};

pub const AP_CREATED: &str = "Access point OVOS created";
pub const USER_JOINED: &str = "User connected to the captive portal";
pub const INTERNET: &str = "Internet connectivity established";
pub const SCAN_FAILED: &str = "Error: Getting access points failed";
pub const SHORT_PASSWORD: &str = "Error: Password length should be at least 8 characters";

/// Config with the sudo prefix off and a fake binary path.
pub fn test_config() -> Config {
    Config {
        binary: PathBuf::from("/opt/fake/wifi-connect"),
        use_sudo: false,
        lang: Some("en-us".to_string()),
        ..Config::default()
    }
}

#[derive(Default)]
pub struct FakeProbe {
    internet: AtomicBool,
    ssid: Mutex<Option<String>>,
    saved_profile: AtomicBool,
    internet_checks: AtomicUsize,
}

impl FakeProbe {
    pub fn offline() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn online() -> Arc<Self> {
        let probe = Self::default();
        probe.set_internet(true);
        Arc::new(probe)
    }

    pub fn associated(ssid: &str) -> Arc<Self> {
        let probe = Self::default();
        probe.set_ssid(Some(ssid));
        Arc::new(probe)
    }

    pub fn set_internet(&self, value: bool) {
        self.internet.store(value, Ordering::SeqCst);
    }

    pub fn set_ssid(&self, ssid: Option<&str>) {
        *self.ssid.lock().unwrap() = ssid.map(String::from);
    }

    pub fn set_saved_profile(&self, value: bool) {
        self.saved_profile.store(value, Ordering::SeqCst);
    }

    pub fn internet_checks(&self) -> usize {
        self.internet_checks.load(Ordering::SeqCst)
    }
}

impl ReachabilityProbe for FakeProbe {
    fn has_internet(&self) -> bool {
        self.internet_checks.fetch_add(1, Ordering::SeqCst);
        self.internet.load(Ordering::SeqCst)
    }

    fn wifi_association(&self) -> Option<String> {
        self.ssid.lock().unwrap().clone()
    }

    fn has_saved_wifi_profile(&self) -> bool {
        self.saved_profile.load(Ordering::SeqCst)
    }
}

/// Teardown step at which a scripted process gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Interrupt,
    Close,
    Terminate,
    Kill,
    Never,
}

/// Output of one scripted provisioning run.
#[derive(Debug, Clone)]
pub struct Script {
    lines: Vec<String>,
    exits: bool,
    dies_on: Stage,
}

impl Script {
    /// Prints `lines` and keeps running.
    pub fn hang(lines: &[&str]) -> Self {
        Self {
            lines: lines.iter().map(|l| l.to_string()).collect(),
            exits: false,
            dies_on: Stage::Interrupt,
        }
    }

    /// Prints `lines` and exits.
    pub fn exit(lines: &[&str]) -> Self {
        Self {
            exits: true,
            ..Self::hang(lines)
        }
    }

    pub fn dies_on(mut self, stage: Stage) -> Self {
        self.dies_on = stage;
        self
    }
}

pub type EventLog = Arc<Mutex<Vec<String>>>;

/// Hands out scripted processes in order and records everything done to
/// them as `"<action> <launch number>"`. Launching past the last script
/// fails.
#[derive(Default)]
pub struct ScriptedLauncher {
    scripts: Mutex<VecDeque<Script>>,
    launches: AtomicUsize,
    specs: Mutex<Vec<LaunchSpec>>,
    log: EventLog,
}

impl ScriptedLauncher {
    pub fn new(scripts: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
            ..Self::default()
        })
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn specs(&self) -> Vec<LaunchSpec> {
        self.specs.lock().unwrap().clone()
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// Poll until `n` processes have been launched.
    pub async fn wait_for_launches(&self, n: usize) {
        while self.launches() < n {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl Launcher for ScriptedLauncher {
    fn launch(&self, spec: &LaunchSpec) -> Result<Box<dyn ManagedProcess>> {
        self.specs.lock().unwrap().push(spec.clone());
        let Some(script) = self.scripts.lock().unwrap().pop_front() else {
            return Err(WatchdogError::SpawnFailed {
                program: spec.binary.display().to_string(),
                reason: "no script left".to_string(),
            });
        };

        let id = self.launches.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.lock().unwrap().push(format!("launch {}", id));

        let (tx, rx) = mpsc::unbounded_channel();
        for line in &script.lines {
            let _ = tx.send(line.clone());
        }

        Ok(Box::new(ScriptedProcess {
            id,
            lines: rx,
            sender: (!script.exits).then_some(tx),
            alive: !script.exits,
            dies_on: script.dies_on,
            log: Arc::clone(&self.log),
        }))
    }
}

struct ScriptedProcess {
    id: usize,
    lines: mpsc::UnboundedReceiver<String>,
    // Holding the sender keeps the output stream open
    sender: Option<mpsc::UnboundedSender<String>>,
    alive: bool,
    dies_on: Stage,
    log: EventLog,
}

impl ScriptedProcess {
    fn record(&mut self, stage: Stage, action: &str) -> Result<()> {
        self.log
            .lock()
            .unwrap()
            .push(format!("{} {}", action, self.id));
        if stage >= self.dies_on {
            self.alive = false;
            self.sender = None;
        }
        Ok(())
    }
}

impl ManagedProcess for ScriptedProcess {
    fn lines(&mut self) -> &mut mpsc::UnboundedReceiver<String> {
        &mut self.lines
    }

    fn is_alive(&mut self) -> bool {
        self.alive
    }

    fn interrupt(&mut self) -> Result<()> {
        self.record(Stage::Interrupt, "interrupt")
    }

    fn close(&mut self) -> Result<()> {
        self.record(Stage::Close, "close")
    }

    fn terminate(&mut self) -> Result<()> {
        self.record(Stage::Terminate, "terminate")
    }

    fn kill(&mut self) -> Result<()> {
        self.record(Stage::Kill, "kill")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Note {
    Show(SetupPage),
    Speak(String),
    Release,
    Event(BusEvent),
}

#[derive(Default)]
pub struct RecordingNotifier {
    notes: Mutex<Vec<Note>>,
    shown: Mutex<Vec<(Instant, DisplayDirective)>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn notes(&self) -> Vec<Note> {
        self.notes.lock().unwrap().clone()
    }

    pub fn pages(&self) -> Vec<SetupPage> {
        self.shown.lock().unwrap().iter().map(|(_, d)| d.page).collect()
    }

    pub fn shown(&self) -> Vec<(Instant, DisplayDirective)> {
        self.shown.lock().unwrap().clone()
    }

    pub fn spoken(&self) -> Vec<String> {
        self.notes()
            .into_iter()
            .filter_map(|n| match n {
                Note::Speak(key) => Some(key),
                _ => None,
            })
            .collect()
    }

    pub fn events(&self) -> Vec<BusEvent> {
        self.notes()
            .into_iter()
            .filter_map(|n| match n {
                Note::Event(event) => Some(event),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, note: &Note) -> usize {
        self.notes().iter().filter(|n| *n == note).count()
    }
}

impl Notifier for RecordingNotifier {
    fn show(&self, directive: &DisplayDirective) {
        self.notes.lock().unwrap().push(Note::Show(directive.page));
        self.shown
            .lock()
            .unwrap()
            .push((Instant::now(), directive.clone()));
    }

    fn speak(&self, utterance: &Utterance) {
        self.notes
            .lock()
            .unwrap()
            .push(Note::Speak(utterance.key.clone()));
    }

    fn release_display(&self) {
        self.notes.lock().unwrap().push(Note::Release);
    }

    fn emit(&self, event: BusEvent) {
        self.notes.lock().unwrap().push(Note::Event(event));
    }
}
