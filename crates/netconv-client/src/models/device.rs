//! Devices assigned to a site.

use netconv_core::ids::DeviceId;
use serde::{Deserialize, Serialize};

/// A device in a site's membership list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SiteDevice {
    /// Controller identifier
    #[serde(alias = "instanceUuid")]
    pub id: DeviceId,
    /// Hostname
    #[serde(default)]
    pub hostname: Option<String>,
    /// Management address
    #[serde(default)]
    pub management_ip_address: Option<String>,
    /// Platform identifier, e.g. `C9300-48U`
    #[serde(default)]
    pub platform_id: Option<String>,
    /// Device family
    #[serde(default)]
    pub family: Option<String>,
    /// Running software version
    #[serde(default)]
    pub software_version: Option<String>,
    /// Reachability as last polled
    #[serde(default)]
    pub reachability_status: Option<String>,
}
