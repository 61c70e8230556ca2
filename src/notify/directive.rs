//! Display directives for the setup screens

use std::time::Duration;

use serde::Serialize;

use crate::config::{Config, TimingConfig};

const COMPLETED_COLOR: &str = "#40DBB0";
const FAILED_COLOR: &str = "#FF0000";

/// Stable keys of the four setup screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SetupPage {
    JoinAp,
    SelectNetwork,
    SetupCompleted,
    SetupFailed,
}

impl SetupPage {
    pub fn key(&self) -> &'static str {
        match self {
            SetupPage::JoinAp => "join-ap",
            SetupPage::SelectNetwork => "select-network",
            SetupPage::SetupCompleted => "setup-completed",
            SetupPage::SetupFailed => "setup-failed",
        }
    }

    pub fn kind(&self) -> PageKind {
        match self {
            SetupPage::JoinAp | SetupPage::SelectNetwork => PageKind::Prompt,
            SetupPage::SetupCompleted | SetupPage::SetupFailed => PageKind::Status,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PageKind {
    Prompt,
    Status,
}

/// Values from the config that end up on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageStyle {
    pub portal_ssid: String,
    pub color: String,
    pub select_network_highlight: String,
}

impl PageStyle {
    pub fn from_config(config: &Config) -> Self {
        Self {
            portal_ssid: config.portal_ssid.clone(),
            color: config.color.clone(),
            select_network_highlight: config.select_network_highlight.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayDirective {
    pub page: SetupPage,
    pub image: String,
    pub label: String,
    pub highlight: String,
    pub color: String,
    pub page_kind: PageKind,
}

impl DisplayDirective {
    pub fn for_page(page: SetupPage, style: &PageStyle) -> Self {
        let (image, label, highlight, color) = match page {
            SetupPage::JoinAp => (
                "1_phone_connect-to-ap.png",
                "Connect to the Wi-Fi network",
                style.portal_ssid.as_str(),
                style.color.as_str(),
            ),
            SetupPage::SelectNetwork => (
                "3_phone_choose-wifi.png",
                "Select local Wi-Fi network to connect",
                style.select_network_highlight.as_str(),
                style.color.as_str(),
            ),
            SetupPage::SetupCompleted => ("icons/check-circle.svg", "Connected", "", COMPLETED_COLOR),
            SetupPage::SetupFailed => (
                "icons/times-circle.svg",
                "Connection Failed",
                "",
                FAILED_COLOR,
            ),
        };

        Self {
            page,
            image: image.to_string(),
            label: label.to_string(),
            highlight: highlight.to_string(),
            color: color.to_string(),
            page_kind: page.kind(),
        }
    }

    /// How long the page stays up before provisioning output is consumed again.
    pub fn hold(&self, timing: &TimingConfig) -> Duration {
        match self.page {
            SetupPage::SetupCompleted => timing.completed_hold(),
            _ => timing.prompt_hold(),
        }
    }
}
