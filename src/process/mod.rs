//! Managed external processes
//!
//! The provisioning binary behaves differently when its output is not a
//! terminal, so it runs inside a pseudo-terminal. Everything platform
//! specific (pty plumbing, signals) lives behind [`ManagedProcess`] so the
//! setup state machine never touches it.

mod pty;

pub use pty::{PtyLauncher, PtyProcess};

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::config::Config;
use crate::error::Result;

/// Handle to a running subprocess whose output arrives line by line.
pub trait ManagedProcess: Send {
    /// Output lines with trailing line terminators removed. The channel
    /// closes once the process output reaches end of stream.
    fn lines(&mut self) -> &mut mpsc::UnboundedReceiver<String>;

    fn is_alive(&mut self) -> bool;

    /// Ask politely, as if Ctrl-C was pressed on the terminal.
    fn interrupt(&mut self) -> Result<()>;

    /// Close the controlling terminal (hang up).
    fn close(&mut self) -> Result<()>;

    /// SIGTERM
    fn terminate(&mut self) -> Result<()>;

    /// SIGKILL
    fn kill(&mut self) -> Result<()>;
}

/// Starts managed processes. Separated from [`ManagedProcess`] so tests can
/// hand out scripted processes.
pub trait Launcher: Send + Sync {
    fn launch(&self, spec: &LaunchSpec) -> Result<Box<dyn ManagedProcess>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadLine {
    Line(String),
    Timeout,
    Eof,
}

/// Wait up to `timeout` for the next output line.
pub async fn read_line(process: &mut dyn ManagedProcess, timeout: Duration) -> ReadLine {
    match tokio::time::timeout(timeout, process.lines().recv()).await {
        Ok(Some(line)) => ReadLine::Line(line),
        Ok(None) => ReadLine::Eof,
        Err(_) => ReadLine::Timeout,
    }
}

/// Command line of one provisioning binary invocation.
#[derive(Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub binary: PathBuf,
    pub portal_ssid: String,
    pub portal_passphrase: Option<String>,
    pub use_sudo: bool,
}

impl LaunchSpec {
    pub fn from_config(config: &Config) -> Self {
        Self {
            binary: config.binary.clone(),
            portal_ssid: config.portal_ssid.clone(),
            portal_passphrase: config.portal_passphrase.clone(),
            use_sudo: config.use_sudo,
        }
    }

    /// Program and arguments, with `sudo` prepended when configured.
    pub fn command_line(&self) -> (String, Vec<String>) {
        let binary = self.binary.display().to_string();
        let mut args = vec!["--portal-ssid".to_string(), self.portal_ssid.clone()];
        if let Some(pass) = &self.portal_passphrase {
            args.push("--portal-passphrase".to_string());
            args.push(pass.clone());
        }

        if self.use_sudo {
            let mut sudo_args = vec![binary];
            sudo_args.extend(args);
            ("sudo".to_string(), sudo_args)
        } else {
            (binary, args)
        }
    }
}

// Keeps the passphrase out of logs.
impl fmt::Debug for LaunchSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LaunchSpec")
            .field("binary", &self.binary)
            .field("portal_ssid", &self.portal_ssid)
            .field(
                "portal_passphrase",
                &self.portal_passphrase.as_ref().map(|_| "<redacted>"),
            )
            .field("use_sudo", &self.use_sudo)
            .finish()
    }
}
