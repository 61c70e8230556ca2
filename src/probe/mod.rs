//! Reachability and Wi-Fi association queries

mod system;

pub use system::SystemProbe;

use serde::Serialize;

/// Answers connectivity questions about the device.
///
/// Implementations are synchronous and must not fail: any error while
/// querying the system is reported as "no internet" / "not associated".
pub trait ReachabilityProbe: Send + Sync {
    fn has_internet(&self) -> bool;

    /// SSID of the currently associated wireless network, if any.
    fn wifi_association(&self) -> Option<String>;

    /// Whether the network manager knows a previously configured Wi-Fi profile.
    fn has_saved_wifi_profile(&self) -> bool;

    fn snapshot(&self) -> ReachabilityStatus {
        let ssid = self.wifi_association();
        ReachabilityStatus {
            has_internet: self.has_internet(),
            wifi_associated: ssid.is_some(),
            ssid,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReachabilityStatus {
    pub has_internet: bool,
    pub wifi_associated: bool,
    pub ssid: Option<String>,
}
