//! One run of the provisioning binary, from spawn to teardown

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use super::machine::{SetupMachine, SetupOutcome, Step};
use super::protocol::{classify, LineFilter, SetupEvent};
use crate::config::{Config, TimingConfig};
use crate::error::Result;
use crate::notify::{DialogCatalog, Notifier, PageStyle};
use crate::process::{read_line, LaunchSpec, Launcher, ManagedProcess, ReadLine};

/// Per-run state, dropped when the run ends.
#[derive(Default)]
struct SessionState {
    lines: LineFilter,
    process: Option<Box<dyn ManagedProcess>>,
}

pub struct ProvisioningSession {
    spec: LaunchSpec,
    machine: SetupMachine,
    timing: TimingConfig,
    restart_on_failure: bool,
    launcher: Arc<dyn Launcher>,
    notifier: Arc<dyn Notifier>,
    dialogs: Arc<DialogCatalog>,
    state: SessionState,
}

impl ProvisioningSession {
    pub fn new(
        config: &Config,
        launcher: Arc<dyn Launcher>,
        notifier: Arc<dyn Notifier>,
        dialogs: Arc<DialogCatalog>,
    ) -> Self {
        Self {
            spec: LaunchSpec::from_config(config),
            machine: SetupMachine::new(PageStyle::from_config(config), config.debug),
            timing: config.timing.clone(),
            restart_on_failure: config.restart_on_failure,
            launcher,
            notifier,
            dialogs,
            state: SessionState::default(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.process.is_some()
    }

    /// Launch the provisioning binary and drive it until it reaches an outcome.
    ///
    /// The process is always torn down before this returns. Only a failure
    /// to launch is reported as an error.
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<SetupOutcome> {
        let id = Uuid::new_v4().simple().to_string();
        let span = tracing::info_span!("session", id = &id[..8]);
        self.run_inner(cancel).instrument(span).await
    }

    async fn run_inner(&mut self, cancel: &CancellationToken) -> Result<SetupOutcome> {
        self.teardown().await;
        if cancel.is_cancelled() {
            return Ok(SetupOutcome::Cancelled);
        }

        tracing::info!("Launching provisioning binary: {:?}", self.spec);
        let process = self.launcher.launch(&self.spec)?;
        self.state = SessionState {
            lines: LineFilter::new(),
            process: Some(process),
        };

        let outcome = self.drive(cancel).await;
        self.teardown().await;
        tracing::info!("Provisioning session ended: {:?}", outcome);
        Ok(outcome)
    }

    async fn drive(&mut self, cancel: &CancellationToken) -> SetupOutcome {
        let read_timeout = self.timing.read_timeout();

        loop {
            let Some(process) = self.state.process.as_mut() else {
                return SetupOutcome::ProcessExited;
            };

            let read = tokio::select! {
                biased;
                _ = cancel.cancelled() => return SetupOutcome::Cancelled,
                read = read_line(process.as_mut(), read_timeout) => read,
            };

            let raw = match read {
                ReadLine::Line(raw) => raw,
                ReadLine::Timeout => continue,
                ReadLine::Eof => {
                    tracing::info!("Provisioning process exited");
                    return SetupOutcome::ProcessExited;
                }
            };

            let Some(line) = self.state.lines.accept(&raw) else {
                continue;
            };
            let event = classify(&line);
            log_event(&event, &line);

            let step = self.machine.step(&event);
            if let Some(outcome) = self.apply(step, cancel).await {
                return outcome;
            }
        }
    }

    /// Render a step. Returns the session outcome if the step ends the run.
    async fn apply(&mut self, step: Step, cancel: &CancellationToken) -> Option<SetupOutcome> {
        let mut hold = Duration::ZERO;
        if let Some(directive) = &step.directive {
            self.notifier.show(directive);
            hold = directive.hold(&self.timing);
        }
        for key in &step.dialogs {
            self.speak(key);
        }

        let outcome = step.outcome.map(|outcome| match outcome {
            SetupOutcome::Failed if self.restart_on_failure => SetupOutcome::RestartRequested,
            other => other,
        });

        // Let the page be seen before output is consumed again
        let interrupted = !hold.is_zero() && !hold_for(hold, cancel).await;
        match outcome {
            Some(outcome) => Some(outcome),
            None if interrupted => Some(SetupOutcome::Cancelled),
            None => None,
        }
    }

    pub(crate) fn speak(&self, key: &str) {
        match self.dialogs.pick(key) {
            Some(utterance) => self.notifier.speak(&utterance),
            None => tracing::warn!("No dialog for '{}' in {}", key, self.dialogs.lang()),
        }
    }

    /// Stop the provisioning process, escalating from Ctrl-C to SIGKILL.
    ///
    /// Idempotent: without a process this does nothing. Failures of
    /// individual steps are logged and the escalation continues.
    pub async fn teardown(&mut self) {
        let process = std::mem::take(&mut self.state).process;
        let Some(mut process) = process else {
            return;
        };
        let pause = self.timing.teardown_step();

        if process.is_alive() {
            tracing::debug!("Interrupting provisioning process");
            best_effort("interrupt", process.interrupt());
            tokio::time::sleep(pause).await;
        }
        if process.is_alive() {
            tracing::warn!("Provisioning process did not exit gracefully, closing its terminal");
            best_effort("close", process.close());
            tokio::time::sleep(pause).await;
        }
        if process.is_alive() {
            tracing::warn!("Terminating provisioning process");
            best_effort("terminate", process.terminate());
            tokio::time::sleep(pause).await;
        }
        if process.is_alive() {
            tracing::warn!("Killing provisioning process");
            best_effort("kill", process.kill());
            tokio::time::sleep(pause).await;
        }

        if process.is_alive() {
            tracing::error!("Provisioning process survived teardown");
        } else {
            tracing::debug!("Provisioning process stopped");
        }
    }
}

/// Sleep for `duration`; `false` if cancelled first.
async fn hold_for(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

fn best_effort(step: &str, result: Result<()>) {
    if let Err(e) = result {
        tracing::warn!("Teardown step '{}' failed: {}", step, e);
    }
}

fn log_event(event: &SetupEvent, line: &str) {
    match event {
        SetupEvent::ErrorOccurred(_) => tracing::error!("{}", line),
        SetupEvent::ApsScanned(_)
        | SetupEvent::UserJoinedPortal
        | SetupEvent::InternetEstablished => tracing::info!("{}", line),
        SetupEvent::Unrecognized(_) => tracing::trace!("{}", line),
        _ => tracing::debug!("{}", line),
    }
}
