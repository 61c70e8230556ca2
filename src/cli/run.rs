//! `wifi-watchdog run` command implementation

use std::io::{self, BufRead};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use clap::Args;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::lock::{default_lock_path, InstanceLock};
use crate::notify::{parse_inbound, InboundMessage, JsonLinesNotifier};
use crate::probe::SystemProbe;
use crate::process::PtyLauncher;
use crate::watchdog::Watchdog;

#[derive(Args, Default)]
pub struct RunArgs {
    /// Don't take the single-instance lock
    #[arg(long)]
    no_lock: bool,
}

pub async fn run(config: Config, args: RunArgs) -> Result<()> {
    let _lock = if args.no_lock {
        None
    } else {
        Some(InstanceLock::acquire(&default_lock_path()).context("Failed to take instance lock")?)
    };

    let probe = Arc::new(SystemProbe::new(config.connectivity_check_url.clone()));
    let notifier = Arc::new(JsonLinesNotifier::stdout());
    let handle = Watchdog::new(config, probe, Arc::new(PtyLauncher), notifier).spawn();

    let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel();
    spawn_inbound_reader(inbound_tx).context("Failed to start inbound reader")?;

    let terminated = terminated();
    tokio::pin!(terminated);
    let mut stdin_open = true;
    let mut exit = Ok(());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, shutting down");
                break;
            }
            result = &mut terminated => {
                match result {
                    Ok(()) => tracing::info!("Terminated, shutting down"),
                    Err(e) => exit = Err(anyhow::Error::new(e).context("Failed to listen for SIGTERM")),
                }
                break;
            }
            _ = handle.stopped() => break,
            msg = inbound_rx.recv(), if stdin_open => match msg {
                Some(InboundMessage::InternetConnected) => handle.internet_connected(),
                Some(InboundMessage::Shutdown) => {
                    tracing::info!("Shutdown requested over the bus");
                    break;
                }
                None => {
                    tracing::debug!("Inbound stream closed");
                    stdin_open = false;
                }
            },
        }
    }

    handle.shutdown().await;
    exit
}

/// Read inbound bus messages from stdin, one JSON object per line.
///
/// Runs on a plain thread: a blocking stdin read can't be cancelled and
/// must not hold up runtime shutdown.
fn spawn_inbound_reader(tx: mpsc::UnboundedSender<InboundMessage>) -> io::Result<()> {
    thread::Builder::new()
        .name("bus-inbound".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        tracing::warn!("Failed to read inbound messages: {}", e);
                        break;
                    }
                };
                match parse_inbound(&line) {
                    Some(msg) => {
                        if tx.send(msg).is_err() {
                            break;
                        }
                    }
                    None => tracing::debug!("Ignoring inbound line: {}", line),
                }
            }
        })?;
    Ok(())
}

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        async fn terminated() -> io::Result<()> {
            use tokio::signal::unix::{signal, SignalKind};

            signal(SignalKind::terminate())?.recv().await;
            Ok(())
        }
    } else {
        async fn terminated() -> io::Result<()> {
            std::future::pending().await
        }
    }
}
