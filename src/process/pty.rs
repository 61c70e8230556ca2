//! Pseudo-terminal backed provisioning process

use std::io::{Read, Write};
use std::thread;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use tokio::sync::mpsc;

use super::{LaunchSpec, Launcher, ManagedProcess};
use crate::error::{Result, WatchdogError};

const CTRL_C: &[u8] = b"\x03";

#[derive(Debug, Default, Clone, Copy)]
pub struct PtyLauncher;

impl Launcher for PtyLauncher {
    fn launch(&self, spec: &LaunchSpec) -> Result<Box<dyn ManagedProcess>> {
        Ok(Box::new(PtyProcess::spawn(spec)?))
    }
}

pub struct PtyProcess {
    child: Box<dyn Child + Send + Sync>,
    master: Option<Box<dyn MasterPty + Send>>,
    writer: Option<Box<dyn Write + Send>>,
    lines: mpsc::UnboundedReceiver<String>,
    pid: Option<u32>,
}

impl PtyProcess {
    pub fn spawn(spec: &LaunchSpec) -> Result<Self> {
        let (program, args) = spec.command_line();

        let pair = native_pty_system()
            .openpty(PtySize {
                rows: 24,
                cols: 200,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| WatchdogError::PtyOpen(e.to_string()))?;

        let mut cmd = CommandBuilder::new(&program);
        cmd.args(&args);

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| WatchdogError::SpawnFailed {
                program: program.clone(),
                reason: e.to_string(),
            })?;
        // The reader only sees EOF once every slave handle is gone
        drop(pair.slave);

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| WatchdogError::PtyOpen(e.to_string()))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|e| WatchdogError::PtyOpen(e.to_string()))?;

        let (tx, lines) = mpsc::unbounded_channel();
        thread::Builder::new()
            .name("pty-reader".to_string())
            .spawn(move || forward_lines(reader, tx))?;

        let pid = child.process_id();
        tracing::debug!("Spawned {} (pid {:?})", program, pid);

        Ok(Self {
            child,
            master: Some(pair.master),
            writer: Some(writer),
            lines,
            pid,
        })
    }

    fn signal(&self, signal: Signal) -> Result<()> {
        let pid = self.pid.ok_or(WatchdogError::NoPid)?;
        let pid = i32::try_from(pid).map_err(|_| WatchdogError::NoPid)?;
        kill(Pid::from_raw(pid), signal)?;
        Ok(())
    }
}

impl ManagedProcess for PtyProcess {
    fn lines(&mut self) -> &mut mpsc::UnboundedReceiver<String> {
        &mut self.lines
    }

    fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    fn interrupt(&mut self) -> Result<()> {
        match self.writer.as_mut() {
            Some(writer) => {
                writer.write_all(CTRL_C)?;
                writer.flush()?;
                Ok(())
            }
            None => self.signal(Signal::SIGINT),
        }
    }

    fn close(&mut self) -> Result<()> {
        self.writer.take();
        self.master.take();
        self.signal(Signal::SIGHUP)
    }

    fn terminate(&mut self) -> Result<()> {
        self.signal(Signal::SIGTERM)
    }

    fn kill(&mut self) -> Result<()> {
        self.signal(Signal::SIGKILL)?;
        // Reap so is_alive() reflects the kill
        let _ = self.child.try_wait();
        Ok(())
    }
}

impl Drop for PtyProcess {
    fn drop(&mut self) {
        if self.is_alive() {
            tracing::warn!("Provisioning process dropped while alive, killing it");
            let _ = self.child.kill();
            let _ = self.child.try_wait();
        }
    }
}

/// Split raw pty output into lines until the stream ends.
fn forward_lines(mut reader: Box<dyn Read + Send>, tx: mpsc::UnboundedSender<String>) {
    let mut buf = [0u8; 4096];
    let mut pending = Vec::new();

    loop {
        match reader.read(&mut buf) {
            // EIO is how Linux reports a hung-up pty, treat it like EOF
            Ok(0) | Err(_) => break,
            Ok(n) => {
                pending.extend_from_slice(&buf[..n]);
                for line in drain_lines(&mut pending) {
                    if tx.send(line).is_err() {
                        return;
                    }
                }
            }
        }
    }

    if !pending.is_empty() {
        let _ = tx.send(decode_line(&pending));
    }
}

fn drain_lines(pending: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
        let raw: Vec<u8> = pending.drain(..=pos).collect();
        lines.push(decode_line(&raw[..raw.len() - 1]));
    }
    lines
}

fn decode_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches(['\r', '\n'])
        .to_string()
}
