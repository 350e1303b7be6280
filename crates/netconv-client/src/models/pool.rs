//! Global IP pool records.

use netconv_core::ids::GlobalPoolId;
use netconv_core::types::AddressSpace;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Global pool usage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PoolType {
    /// General purpose pool
    #[default]
    #[serde(alias = "generic", alias = "GENERIC")]
    Generic,
    /// Tunnel endpoint pool
    #[serde(alias = "tunnel", alias = "TUNNEL")]
    Tunnel,
}

impl PoolType {
    /// Wire spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Generic => "Generic",
            Self::Tunnel => "Tunnel",
        }
    }
}

impl fmt::Display for PoolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PoolType {
    type Err = netconv_core::Error;

    fn from_str(s: &str) -> netconv_core::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "generic" => Ok(Self::Generic),
            "tunnel" => Ok(Self::Tunnel),
            other => Err(netconv_core::Error::Parse(format!(
                "unknown global pool type `{other}`"
            ))),
        }
    }
}

/// A global pool as the controller reports it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GlobalPool {
    /// Controller identifier
    pub id: GlobalPoolId,
    /// Pool name
    pub ip_pool_name: String,
    /// Pool range
    pub ip_pool_cidr: String,
    /// Gateways; the controller keeps at most one
    #[serde(default)]
    pub gateways: Vec<String>,
    /// DHCP servers
    #[serde(default)]
    pub dhcp_server_ips: Vec<String>,
    /// DNS servers
    #[serde(default)]
    pub dns_server_ips: Vec<String>,
    /// True for IPv6 pools
    #[serde(default)]
    pub ipv6: bool,
    /// Usage type
    #[serde(default)]
    pub ip_pool_type: Option<PoolType>,
}

impl GlobalPool {
    /// Address space derived from the v6 flag.
    #[must_use]
    pub const fn address_space(&self) -> AddressSpace {
        if self.ipv6 {
            AddressSpace::V6
        } else {
            AddressSpace::V4
        }
    }

    /// First gateway, or empty when none is set.
    #[must_use]
    pub fn gateway(&self) -> &str {
        self.gateways.first().map_or("", String::as_str)
    }
}

/// One entry of a global pool create request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GlobalPoolCreate {
    /// Pool name
    pub ip_pool_name: String,
    /// Usage type
    #[serde(rename = "type")]
    pub pool_type: PoolType,
    /// Pool range
    pub ip_pool_cidr: String,
    /// Gateway
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,
    /// DHCP servers
    #[serde(default)]
    pub dhcp_server_ips: Vec<String>,
    /// DNS servers
    #[serde(default)]
    pub dns_server_ips: Vec<String>,
    /// Address space
    #[serde(rename = "IpAddressSpace")]
    pub ip_address_space: AddressSpace,
}

/// One entry of a global pool update request.
///
/// Range, type and address space are immutable and absent here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GlobalPoolUpdate {
    /// Identifier of the pool being updated
    pub id: GlobalPoolId,
    /// New or unchanged name
    pub ip_pool_name: String,
    /// Gateway
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,
    /// DHCP servers
    #[serde(default)]
    pub dhcp_server_ips: Vec<String>,
    /// DNS servers
    #[serde(default)]
    pub dns_server_ips: Vec<String>,
}

/// `{"settings": {"ippool": [...]}}` body shared by create and update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PoolSettings<T> {
    /// Wrapped list
    pub settings: IpPoolList<T>,
}

/// Inner list of [`PoolSettings`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IpPoolList<T> {
    /// Pool entries
    pub ippool: Vec<T>,
}

impl<T> PoolSettings<T> {
    /// Wrap a list of entries.
    #[must_use]
    pub const fn new(ippool: Vec<T>) -> Self {
        Self {
            settings: IpPoolList { ippool },
        }
    }
}
