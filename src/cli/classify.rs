//! `wifi-watchdog classify` command implementation

use std::io::{self, BufRead, Write};

use anyhow::Result;
use clap::Args;

use crate::setup::{classify, LineFilter, SetupEvent};

#[derive(Args)]
pub struct ClassifyArgs {
    /// Print one JSON object per event
    #[arg(long)]
    json: bool,
}

pub fn run(args: ClassifyArgs) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    let mut filter = LineFilter::new();

    for line in stdin.lock().lines() {
        let Some(line) = filter.accept(&line?) else {
            continue;
        };
        let event = classify(&line);
        if args.json {
            writeln!(stdout, "{}", serde_json::to_string(&event)?)?;
        } else {
            writeln!(stdout, "{:<20} {}", event.name(), detail(&event))?;
        }
    }

    Ok(())
}

fn detail(event: &SetupEvent) -> String {
    match event {
        SetupEvent::ApsScanned(aps) => aps.join(", "),
        SetupEvent::ApCreated(name) | SetupEvent::ApStopped(name) => name.clone(),
        SetupEvent::HttpServerStarted(line)
        | SetupEvent::ErrorOccurred(line)
        | SetupEvent::Unrecognized(line) => line.clone(),
        _ => String::new(),
    }
}
