//! Probe backed by OS tools and a connectivity-check endpoint

use std::net::{SocketAddr, TcpStream};
use std::process::Command;
use std::time::Duration;

use super::ReachabilityProbe;

const DNS_RESOLVERS: [&str; 2] = ["1.1.1.1:53", "8.8.8.8:53"];
const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const HTTP_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SystemProbe {
    check_url: String,
    dns_resolvers: Vec<SocketAddr>,
}

impl SystemProbe {
    pub fn new(check_url: impl Into<String>) -> Self {
        Self {
            check_url: check_url.into(),
            dns_resolvers: DNS_RESOLVERS
                .iter()
                .filter_map(|addr| addr.parse().ok())
                .collect(),
        }
    }

    pub fn with_dns_resolvers(mut self, resolvers: Vec<SocketAddr>) -> Self {
        self.dns_resolvers = resolvers;
        self
    }

    fn dns_reachable(&self) -> bool {
        self.dns_resolvers
            .iter()
            .any(|sock| TcpStream::connect_timeout(sock, CONNECT_TIMEOUT).is_ok())
    }

    fn check_url_reachable(&self) -> bool {
        let client = match reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
        {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!("Failed to build connectivity client: {}", e);
                return false;
            }
        };

        match client.get(&self.check_url).send() {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::debug!("Connectivity check to {} failed: {}", self.check_url, e);
                false
            }
        }
    }
}

impl ReachabilityProbe for SystemProbe {
    /// Online if either a public resolver accepts a connection or the
    /// check URL answers; networks that block outbound port 53 still count.
    fn has_internet(&self) -> bool {
        self.dns_reachable() || self.check_url_reachable()
    }

    fn wifi_association(&self) -> Option<String> {
        current_ssid()
    }

    fn has_saved_wifi_profile(&self) -> bool {
        Command::new("nmcli")
            .args(["connection", "show"])
            .output()
            .ok()
            .filter(|o| o.status.success())
            .map(|o| String::from_utf8_lossy(&o.stdout).contains("wifi"))
            .unwrap_or(false)
    }
}

cfg_if::cfg_if! {
    if #[cfg(target_os = "macos")] {
        fn current_ssid() -> Option<String> {
            let output = Command::new("networksetup")
                .args(["-getairportnetwork", "en0"])
                .output()
                .ok()?;
            if !output.status.success() {
                return None;
            }
            // "Current Wi-Fi Network: <ssid>" when associated
            let stdout = String::from_utf8_lossy(&output.stdout);
            stdout
                .trim()
                .split_once(": ")
                .map(|(_, ssid)| ssid.trim().to_string())
                .filter(|ssid| !ssid.is_empty())
        }
    } else {
        fn current_ssid() -> Option<String> {
            // iwgetid exits non-zero when there is no association
            let output = Command::new("iwgetid").arg("-r").output().ok()?;
            if !output.status.success() {
                return None;
            }
            parse_ssid(&String::from_utf8_lossy(&output.stdout))
        }
    }
}

#[cfg_attr(target_os = "macos", allow(dead_code))]
fn parse_ssid(stdout: &str) -> Option<String> {
    let ssid = stdout.trim();
    if ssid.is_empty() {
        None
    } else {
        Some(ssid.to_string())
    }
}
