//! Watchdog configuration, loaded once at startup from a TOML file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const APP_DIR_NAME: &str = "wifi-watchdog";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Shortest passphrase the provisioning binary accepts for its access point.
pub const MIN_PASSPHRASE_LEN: usize = 8;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SSID of the temporary access point the provisioning binary creates
    pub portal_ssid: String,
    pub portal_passphrase: Option<String>,
    /// Delay before the first check when a saved Wi-Fi profile exists
    pub grace_seconds: u64,
    pub poll_interval_seconds: u64,
    /// Poll interval once a setup has completed successfully
    pub post_connect_poll_interval_seconds: u64,
    pub stop_watchdog_on_connect: bool,
    /// Path of the captive-portal provisioning binary
    pub binary: PathBuf,
    pub use_sudo: bool,
    /// Relaunch the provisioning binary after it reports an error
    pub restart_on_failure: bool,
    /// Speak a prompt for every protocol step
    pub debug: bool,
    pub lang: Option<String>,
    pub locale_dir: Option<PathBuf>,
    /// Accent color of prompt pages
    pub color: String,
    pub select_network_highlight: String,
    pub connectivity_check_url: String,
    pub timing: TimingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            portal_ssid: "OVOS".to_string(),
            portal_passphrase: None,
            grace_seconds: 45,
            poll_interval_seconds: 30,
            post_connect_poll_interval_seconds: 90,
            stop_watchdog_on_connect: false,
            binary: PathBuf::from("/usr/local/sbin/wifi-connect"),
            use_sudo: true,
            restart_on_failure: true,
            debug: false,
            lang: None,
            locale_dir: None,
            color: "#FF0000".to_string(),
            select_network_highlight: "OVOS Device".to_string(),
            connectivity_check_url: "http://connectivitycheck.gstatic.com/generate_204"
                .to_string(),
            timing: TimingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub read_timeout_ms: u64,
    pub teardown_step_ms: u64,
    pub prompt_hold_ms: u64,
    pub completed_hold_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: 1000,
            teardown_step_ms: 1000,
            prompt_hold_ms: 2000,
            completed_hold_ms: 5000,
        }
    }
}

impl TimingConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn teardown_step(&self) -> Duration {
        Duration::from_millis(self.teardown_step_ms)
    }

    pub fn prompt_hold(&self) -> Duration {
        Duration::from_millis(self.prompt_hold_ms)
    }

    pub fn completed_hold(&self) -> Duration {
        Duration::from_millis(self.completed_hold_ms)
    }
}

impl Config {
    /// Load the config from `path`, or from the default location when `None`.
    ///
    /// A missing file at the default location yields the defaults; a missing
    /// explicitly requested file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match default_config_path() {
                Some(p) => (p, false),
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            if explicit {
                return Err(ConfigError::NotFound(path));
            }
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config = Self::from_toml(&content).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.clone(),
                source,
            },
            other => other,
        })?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.portal_ssid.trim().is_empty() {
            return Err(ConfigError::Invalid("portal_ssid must not be empty".into()));
        }
        if self.portal_ssid.len() > 32 {
            return Err(ConfigError::Invalid(
                "portal_ssid must be at most 32 bytes".into(),
            ));
        }
        if let Some(pass) = &self.portal_passphrase {
            if pass.len() < MIN_PASSPHRASE_LEN {
                return Err(ConfigError::Invalid(format!(
                    "portal_passphrase must be at least {} characters",
                    MIN_PASSPHRASE_LEN
                )));
            }
        }
        if self.poll_interval_seconds == 0 || self.post_connect_poll_interval_seconds == 0 {
            return Err(ConfigError::Invalid(
                "poll intervals must be greater than zero".into(),
            ));
        }
        if self.timing.read_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "timing.read_timeout_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_seconds)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn post_connect_poll_interval(&self) -> Duration {
        Duration::from_secs(self.post_connect_poll_interval_seconds)
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}
