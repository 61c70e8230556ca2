//! Setup state machine: what each protocol event means for the user.

use serde::Serialize;

use super::protocol::SetupEvent;
use crate::notify::dialog;
use crate::notify::{DisplayDirective, PageStyle, SetupPage};

/// Errors the provisioning binary recovers from on its own.
pub const ACCEPTED_ERRORS: &[&str] = &["Password length should be at least 8 characters"];

/// Terminal result of one provisioning session run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SetupOutcome {
    Completed,
    Failed,
    ProcessExited,
    RestartRequested,
    /// Torn down on request before reaching any other outcome.
    Cancelled,
}

/// Reaction to one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Step {
    pub directive: Option<DisplayDirective>,
    /// Dialog keys to speak, in order.
    pub dialogs: Vec<&'static str>,
    pub outcome: Option<SetupOutcome>,
}

#[derive(Debug, Clone)]
pub struct SetupMachine {
    style: PageStyle,
    debug: bool,
}

impl SetupMachine {
    pub fn new(style: PageStyle, debug: bool) -> Self {
        Self { style, debug }
    }

    pub fn step(&self, event: &SetupEvent) -> Step {
        let mut step = match event {
            SetupEvent::ApCreated(_) => self.prompt(SetupPage::JoinAp, dialog::JOIN_AP),
            SetupEvent::UserJoinedPortal => {
                self.prompt(SetupPage::SelectNetwork, dialog::SELECT_NETWORK)
            }
            SetupEvent::InternetEstablished => Step {
                directive: Some(self.directive(SetupPage::SetupCompleted)),
                dialogs: Vec::new(),
                outcome: Some(SetupOutcome::Completed),
            },
            SetupEvent::ErrorOccurred(msg) if is_accepted_error(msg) => {
                tracing::warn!("Provisioning reported a recoverable error: {}", msg);
                Step::default()
            }
            SetupEvent::ErrorOccurred(_) => Step {
                directive: Some(self.directive(SetupPage::SetupFailed)),
                dialogs: vec![dialog::SETUP_FAILED],
                outcome: Some(SetupOutcome::Failed),
            },
            _ => Step::default(),
        };

        if self.debug {
            if let Some(key) = debug_dialog(event) {
                step.dialogs.push(key);
            }
        }
        step
    }

    fn prompt(&self, page: SetupPage, dialog_key: &'static str) -> Step {
        Step {
            directive: Some(self.directive(page)),
            dialogs: vec![dialog_key],
            outcome: None,
        }
    }

    fn directive(&self, page: SetupPage) -> DisplayDirective {
        DisplayDirective::for_page(page, &self.style)
    }
}

pub fn is_accepted_error(message: &str) -> bool {
    ACCEPTED_ERRORS.iter().any(|e| message.contains(e))
}

fn debug_dialog(event: &SetupEvent) -> Option<&'static str> {
    match event {
        SetupEvent::ApsScanned(_) => Some(dialog::DEBUG_WIFI_SCANNED),
        SetupEvent::ApStarting => Some(dialog::DEBUG_AP_START),
        SetupEvent::ApCreated(_) => Some(dialog::DEBUG_AP_CREATED),
        SetupEvent::HttpServerStarted(_) => Some(dialog::DEBUG_HTTP_STARTED),
        SetupEvent::ApStopping => Some(dialog::DEBUG_AP_STOP),
        SetupEvent::ApStopped(_) => Some(dialog::DEBUG_AP_STOPPED),
        SetupEvent::UserJoinedPortal => Some(dialog::DEBUG_USER_CONNECTED),
        SetupEvent::ConnectingToAp => Some(dialog::DEBUG_CONNECTING),
        SetupEvent::InternetEstablished => Some(dialog::DEBUG_WIFI_CONNECTED),
        SetupEvent::ErrorOccurred(_) | SetupEvent::Unrecognized(_) => None,
    }
}
