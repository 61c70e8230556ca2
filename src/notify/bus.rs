//! Line-delimited JSON bridge to the device message bus

use std::io::{self, Write};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::{DisplayDirective, Notifier, Utterance};

/// Lifecycle announcements, fire-and-forget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum BusEvent {
    #[serde(rename = "wifi.setup.started")]
    SetupStarted,
    #[serde(rename = "wifi.setup.completed")]
    SetupCompleted,
    #[serde(rename = "system.ntp.sync")]
    ClockSync,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum InboundMessage {
    #[serde(rename = "internet.connected")]
    InternetConnected,
    #[serde(rename = "shutdown")]
    Shutdown,
}

/// Parse one inbound line. Unknown message types and malformed JSON are
/// ignored by the caller, so they map to `None`.
pub fn parse_inbound(line: &str) -> Option<InboundMessage> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    serde_json::from_str(line).ok()
}

#[derive(Serialize)]
#[serde(tag = "type", content = "data")]
enum OutboundMessage<'a> {
    #[serde(rename = "display.show")]
    Show(&'a DisplayDirective),
    #[serde(rename = "display.release")]
    Release,
    #[serde(rename = "speak")]
    Speak(&'a Utterance),
}

/// Writes every notification as one JSON object per line.
pub struct JsonLinesNotifier<W: Write + Send> {
    out: Mutex<W>,
}

impl JsonLinesNotifier<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> JsonLinesNotifier<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|e| e.into_inner())
    }

    fn write_message<T: Serialize>(&self, message: &T) {
        let line = match serde_json::to_string(message) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("Failed to encode bus message: {}", e);
                return;
            }
        };

        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = writeln!(out, "{}", line).and_then(|_| out.flush()) {
            tracing::warn!("Failed to write bus message: {}", e);
        }
    }
}

impl<W: Write + Send> Notifier for JsonLinesNotifier<W> {
    fn show(&self, directive: &DisplayDirective) {
        self.write_message(&OutboundMessage::Show(directive));
    }

    fn speak(&self, utterance: &Utterance) {
        self.write_message(&OutboundMessage::Speak(utterance));
    }

    fn release_display(&self) {
        self.write_message(&OutboundMessage::Release);
    }

    fn emit(&self, event: BusEvent) {
        self.write_message(&event);
    }
}
