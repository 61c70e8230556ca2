//! Progress lines printed by the provisioning binary
//!
//! Several messages share prefixes ("Access points: " vs "Access point X
//! created"), so classification walks [`RULES`] in order and the first
//! match wins. New messages are supported by adding a row.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "detail", rename_all = "kebab-case")]
pub enum SetupEvent {
    ApsScanned(Vec<String>),
    ApStarting,
    ApCreated(String),
    HttpServerStarted(String),
    ApStopping,
    ApStopped(String),
    UserJoinedPortal,
    ConnectingToAp,
    InternetEstablished,
    ErrorOccurred(String),
    Unrecognized(String),
}

impl SetupEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SetupEvent::ApsScanned(_) => "aps-scanned",
            SetupEvent::ApStarting => "ap-starting",
            SetupEvent::ApCreated(_) => "ap-created",
            SetupEvent::HttpServerStarted(_) => "http-server-started",
            SetupEvent::ApStopping => "ap-stopping",
            SetupEvent::ApStopped(_) => "ap-stopped",
            SetupEvent::UserJoinedPortal => "user-joined-portal",
            SetupEvent::ConnectingToAp => "connecting-to-ap",
            SetupEvent::InternetEstablished => "internet-established",
            SetupEvent::ErrorOccurred(_) => "error-occurred",
            SetupEvent::Unrecognized(_) => "unrecognized",
        }
    }
}

struct Rule {
    matches: fn(&str) -> bool,
    build: fn(&str) -> SetupEvent,
}

const ACCESS_POINTS_PREFIX: &str = "Access points: ";

static AP_CREATED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Access point (.*?)\s*created$").expect("valid regex"));
static AP_STOPPED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Access point (.*?)\s*stopped$").expect("valid regex"));

static RULES: &[Rule] = &[
    Rule {
        matches: |l| l.starts_with(ACCESS_POINTS_PREFIX),
        build: |l| SetupEvent::ApsScanned(parse_access_points(&l[ACCESS_POINTS_PREFIX.len()..])),
    },
    Rule {
        matches: |l| l.starts_with("Starting access point..."),
        build: |_| SetupEvent::ApStarting,
    },
    Rule {
        matches: |l| AP_CREATED.is_match(l),
        build: |l| SetupEvent::ApCreated(capture_name(&AP_CREATED, l)),
    },
    Rule {
        matches: |l| l.starts_with("Starting HTTP server on"),
        build: |l| SetupEvent::HttpServerStarted(l.to_string()),
    },
    Rule {
        matches: |l| l.starts_with("Stopping access point"),
        build: |_| SetupEvent::ApStopping,
    },
    Rule {
        matches: |l| AP_STOPPED.is_match(l),
        build: |l| SetupEvent::ApStopped(capture_name(&AP_STOPPED, l)),
    },
    Rule {
        matches: |l| l == "User connected to the captive portal",
        build: |_| SetupEvent::UserJoinedPortal,
    },
    Rule {
        matches: |l| l.starts_with("Connecting to access point"),
        build: |_| SetupEvent::ConnectingToAp,
    },
    Rule {
        matches: |l| l.starts_with("Internet connectivity established"),
        build: |_| SetupEvent::InternetEstablished,
    },
    Rule {
        matches: |l| l.contains("Error") || l.contains("[Errno"),
        build: |l| SetupEvent::ErrorOccurred(l.to_string()),
    },
];

/// Map one trimmed output line to its event.
pub fn classify(line: &str) -> SetupEvent {
    RULES
        .iter()
        .find(|rule| (rule.matches)(line))
        .map(|rule| (rule.build)(line))
        .unwrap_or_else(|| SetupEvent::Unrecognized(line.to_string()))
}

fn capture_name(re: &Regex, line: &str) -> String {
    re.captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// The binary prints the scan result as a list literal: `["Home", "Office"]`.
fn parse_access_points(list: &str) -> Vec<String> {
    serde_json::from_str(list.trim()).unwrap_or_default()
}

/// Drops blank lines and repeats of the previous line.
///
/// The provisioning binary redraws some messages; only the first line of a
/// run of identical lines reaches the state machine.
#[derive(Debug, Default)]
pub struct LineFilter {
    last: Option<String>,
}

impl LineFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept(&mut self, raw: &str) -> Option<String> {
        let line = raw.trim();
        if line.is_empty() || self.last.as_deref() == Some(line) {
            return None;
        }
        self.last = Some(line.to_string());
        Some(line.to_string())
    }

    pub fn last(&self) -> Option<&str> {
        self.last.as_deref()
    }
}
