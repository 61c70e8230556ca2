//! Spoken prompts
//!
//! Each prompt key maps to a handful of interchangeable utterances, one of
//! which is picked at random every time the prompt is spoken. Utterances
//! come from `<locale_dir>/<lang>/<key>.dialog` when such a file exists,
//! otherwise from the built-in English set.

use std::fs;
use std::path::PathBuf;

use rand::seq::IndexedRandom;
use serde::Serialize;

use crate::config::Config;

pub const DEFAULT_LANG: &str = "en-us";

pub const JOIN_AP: &str = "wifi_intro_2";
pub const SELECT_NETWORK: &str = "wifi_intro_3";
pub const SETUP_FAILED: &str = "wifi_error";

pub const DEBUG_START_SETUP: &str = "debug_start_setup";
pub const DEBUG_END_SETUP: &str = "debug_end_setup";
pub const DEBUG_WIFI_SCANNED: &str = "debug_wifi_scanned";
pub const DEBUG_AP_START: &str = "debug_ap_start";
pub const DEBUG_AP_CREATED: &str = "debug_ap_created";
pub const DEBUG_HTTP_STARTED: &str = "debug_http_started";
pub const DEBUG_AP_STOP: &str = "debug_ap_stop";
pub const DEBUG_AP_STOPPED: &str = "debug_ap_stopped";
pub const DEBUG_USER_CONNECTED: &str = "debug_user_connected";
pub const DEBUG_CONNECTING: &str = "debug_connecting";
pub const DEBUG_WIFI_CONNECTED: &str = "debug_wifi_connected";

const BUILTIN_EN_US: &[(&str, &[&str])] = &[
    (
        JOIN_AP,
        &[
            "Use your phone or laptop to connect to the Wi-Fi network shown on the screen.",
            "To get me online, join the Wi-Fi network shown on the screen.",
        ],
    ),
    (
        SELECT_NETWORK,
        &[
            "Now choose your home Wi-Fi network and enter its password.",
            "Pick your Wi-Fi network from the list and type in the password.",
        ],
    ),
    (
        SETUP_FAILED,
        &[
            "Wi-Fi setup ran into a problem. Let's try that again.",
            "Something went wrong while connecting. Restarting Wi-Fi setup.",
        ],
    ),
    (DEBUG_START_SETUP, &["Starting Wi-Fi setup."]),
    (DEBUG_END_SETUP, &["Wi-Fi setup finished."]),
    (DEBUG_WIFI_SCANNED, &["Scanned for access points."]),
    (DEBUG_AP_START, &["Starting the access point."]),
    (DEBUG_AP_CREATED, &["Access point created."]),
    (DEBUG_HTTP_STARTED, &["Captive portal server started."]),
    (DEBUG_AP_STOP, &["Stopping the access point."]),
    (DEBUG_AP_STOPPED, &["Access point stopped."]),
    (DEBUG_USER_CONNECTED, &["Someone joined the setup portal."]),
    (DEBUG_CONNECTING, &["Connecting to the selected network."]),
    (DEBUG_WIFI_CONNECTED, &["Internet connection established."]),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Utterance {
    pub key: String,
    pub utterance: String,
    pub lang: String,
}

#[derive(Debug, Clone)]
pub struct DialogCatalog {
    lang: String,
    locale_dir: Option<PathBuf>,
}

impl DialogCatalog {
    pub fn new(lang: impl Into<String>, locale_dir: Option<PathBuf>) -> Self {
        Self {
            lang: lang.into(),
            locale_dir,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let lang = resolve_lang(config.lang.as_deref(), global_lang().as_deref());
        Self::new(lang, config.locale_dir.clone())
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    /// All candidate utterances for `key`.
    pub fn utterances(&self, key: &str) -> Vec<String> {
        if let Some(dir) = &self.locale_dir {
            let path = dir.join(&self.lang).join(format!("{}.dialog", key));
            match fs::read_to_string(&path) {
                Ok(content) => {
                    let lines = parse_dialog(&content);
                    if !lines.is_empty() {
                        return lines;
                    }
                }
                Err(e) => tracing::debug!("No dialog at {}: {}", path.display(), e),
            }
        }

        BUILTIN_EN_US
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, lines)| lines.iter().map(|l| l.to_string()).collect())
            .unwrap_or_default()
    }

    /// One utterance for `key`, chosen at random.
    pub fn pick(&self, key: &str) -> Option<Utterance> {
        let candidates = self.utterances(key);
        let utterance = candidates.choose(&mut rand::rng())?.clone();
        Some(Utterance {
            key: key.to_string(),
            utterance,
            lang: self.lang.clone(),
        })
    }
}

fn parse_dialog(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(String::from)
        .collect()
}

/// Instance setting, then the global default, then [`DEFAULT_LANG`].
pub fn resolve_lang(instance: Option<&str>, global: Option<&str>) -> String {
    instance
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .or_else(|| global.map(str::trim).filter(|l| !l.is_empty()))
        .unwrap_or(DEFAULT_LANG)
        .to_lowercase()
}

/// System-wide language from `LANG`, normalised to the `xx-yy` form.
pub fn global_lang() -> Option<String> {
    std::env::var("LANG")
        .ok()
        .and_then(|value| normalize_locale(&value))
}

fn normalize_locale(value: &str) -> Option<String> {
    let base = value.split(['.', '@']).next().unwrap_or_default().trim();
    if base.is_empty() || base == "C" || base == "POSIX" {
        return None;
    }
    Some(base.replace('_', "-").to_lowercase())
}
