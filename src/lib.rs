//! Wi-Fi provisioning watchdog
//!
//! Watches internet reachability and, when the device is offline and not
//! associated with any network, runs a captive-portal provisioning program
//! under a pseudo-terminal, translating its output into display and speech
//! notifications.

pub mod cli;
pub mod config;
pub mod error;
pub mod lock;
pub mod notify;
pub mod probe;
pub mod process;
pub mod setup;
pub mod watchdog;

pub use config::Config;
pub use error::{Result, WatchdogError};
pub use watchdog::{Watchdog, WatchdogHandle, WatchdogState};
