//! Command-line interface

pub mod classify;
pub mod run;
pub mod status;

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "wifi-watchdog", version, about)]
pub struct Cli {
    /// Path to the config file
    #[arg(short, long, global = true, env = "WIFI_WATCHDOG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Monitor connectivity and run wifi setup when offline (default)
    Run(run::RunArgs),

    /// Show the current reachability status
    Status(status::StatusArgs),

    /// Classify provisioning output read from stdin
    Classify(classify::ClassifyArgs),

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Cli {
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

pub async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(shell, &mut Cli::command(), "wifi-watchdog", &mut io::stdout());
            Ok(())
        }
        Some(Commands::Classify(args)) => classify::run(args),
        Some(Commands::Status(args)) => status::run(&load_config(&cli.config)?, args).await,
        Some(Commands::Run(args)) => run::run(load_config(&cli.config)?, args).await,
        None => run::run(load_config(&cli.config)?, run::RunArgs::default()).await,
    }
}

fn load_config(path: &Option<PathBuf>) -> Result<Config> {
    Config::load(path.as_deref()).context("Failed to load config")
}
