//! `wifi-watchdog status` command implementation

use anyhow::Result;
use clap::Args;

use crate::config::Config;
use crate::probe::{ReachabilityProbe, SystemProbe};

#[derive(Args)]
pub struct StatusArgs {
    /// Print as JSON
    #[arg(long)]
    json: bool,
}

pub async fn run(config: &Config, args: StatusArgs) -> Result<()> {
    let probe = SystemProbe::new(config.connectivity_check_url.clone());
    let (status, saved_profile) =
        tokio::task::spawn_blocking(move || (probe.snapshot(), probe.has_saved_wifi_profile()))
            .await?;

    if args.json {
        let value = serde_json::json!({
            "has_internet": status.has_internet,
            "wifi_associated": status.wifi_associated,
            "ssid": status.ssid,
            "saved_wifi_profile": saved_profile,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Internet:       {}", mark(status.has_internet));
    match &status.ssid {
        Some(ssid) => println!("Wi-Fi:          ✓ {}", ssid),
        None => println!("Wi-Fi:          ✗ not associated"),
    }
    println!("Saved profile:  {}", mark(saved_profile));

    Ok(())
}

fn mark(ok: bool) -> &'static str {
    if ok {
        "✓"
    } else {
        "✗"
    }
}
