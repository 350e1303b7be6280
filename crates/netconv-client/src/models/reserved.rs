//! Reserved sub-pool records.
//!
//! The controller reports a reservation as one sub-pool per address space, in
//! no particular order. Requests use a flat `ipv4*`/`ipv6*` layout instead.

use netconv_core::ids::{GlobalPoolId, ReservationId, SiteId};
use serde::{Deserialize, Serialize};

/// A reservation as the controller reports it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    /// Controller identifier
    pub id: ReservationId,
    /// Reservation name
    pub group_name: String,
    /// Owning site
    #[serde(default)]
    pub site_id: Option<SiteId>,
    /// Site hierarchy name of the owning site
    #[serde(default)]
    pub site_hierarchy: Option<String>,
    /// Usage type (`Generic`, `LAN`, `Management`, `Service`, `WAN`)
    #[serde(rename = "type", default)]
    pub pool_type: Option<String>,
    /// One sub-pool per address space
    #[serde(default)]
    pub ip_pools: Vec<ReservationSubPool>,
}

impl Reservation {
    /// The IPv4 sub-pool, identified by the absence of the v6 flag.
    #[must_use]
    pub fn v4(&self) -> Option<&ReservationSubPool> {
        self.ip_pools.iter().find(|pool| !pool.ipv6)
    }

    /// The IPv6 sub-pool, if the reservation has one.
    #[must_use]
    pub fn v6(&self) -> Option<&ReservationSubPool> {
        self.ip_pools.iter().find(|pool| pool.ipv6)
    }
}

/// One address-space half of a reservation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReservationSubPool {
    /// Sub-pool identifier
    #[serde(default)]
    pub id: Option<String>,
    /// Sub-pool name
    #[serde(default)]
    pub ip_pool_name: String,
    /// Carved range
    #[serde(default)]
    pub ip_pool_cidr: String,
    /// True for the IPv6 half
    #[serde(default)]
    pub ipv6: bool,
    /// Gateways
    #[serde(default)]
    pub gateways: Vec<String>,
    /// DHCP servers
    #[serde(default)]
    pub dhcp_server_ips: Vec<String>,
    /// DNS servers
    #[serde(default)]
    pub dns_server_ips: Vec<String>,
    /// Addresses in the range
    #[serde(default)]
    pub total_ip_address_count: Option<u64>,
    /// Global pool the range was carved from
    #[serde(default)]
    pub parent_uuid: Option<GlobalPoolId>,
    /// Free-form key/value annotations
    #[serde(default)]
    pub context: Vec<ReservationContext>,
}

impl ReservationSubPool {
    /// First gateway, or empty when none is set.
    #[must_use]
    pub fn gateway(&self) -> &str {
        self.gateways.first().map_or("", String::as_str)
    }

    /// Looks up a context annotation.
    #[must_use]
    pub fn context_value(&self, key: &str) -> Option<&str> {
        self.context
            .iter()
            .find(|entry| entry.context_key == key)
            .map(|entry| entry.context_value.as_str())
    }

    /// SLAAC flag, carried as a context annotation.
    #[must_use]
    pub fn slaac_support(&self) -> bool {
        self.context_value("slaacSupport")
            .is_some_and(|value| value.eq_ignore_ascii_case("true"))
    }

    /// Prefix length of the carved range.
    #[must_use]
    pub fn prefix_length(&self) -> Option<u8> {
        self.ip_pool_cidr
            .split_once('/')
            .and_then(|(_, prefix)| prefix.parse().ok())
    }

    /// Network address of the carved range.
    #[must_use]
    pub fn subnet(&self) -> &str {
        self.ip_pool_cidr
            .split_once('/')
            .map_or(self.ip_pool_cidr.as_str(), |(address, _)| address)
    }
}

/// Context annotation on a sub-pool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReservationContext {
    /// Annotation key
    pub context_key: String,
    /// Annotation value
    pub context_value: String,
}

/// Create or update body for a reservation.
///
/// Absent optional fields are left out of the JSON entirely.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReservePoolRequest {
    /// Reservation name
    pub name: String,
    /// Usage type
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub pool_type: Option<String>,
    /// Whether the reservation carries an IPv6 half
    #[serde(default)]
    pub ipv6_address_space: bool,
    /// Parent v4 global pool, by CIDR
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4_global_pool: Option<String>,
    /// Whether the v4 range is given by prefix length
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4_prefix: Option<bool>,
    /// v4 prefix length
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4_prefix_length: Option<u8>,
    /// v4 network address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4_subnet: Option<String>,
    /// v4 host count, when not given by prefix
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4_total_host: Option<u64>,
    /// v4 gateway
    #[serde(rename = "ipv4GateWay", default, skip_serializing_if = "Option::is_none")]
    pub ipv4_gateway: Option<String>,
    /// v4 DHCP servers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4_dhcp_servers: Option<Vec<String>>,
    /// v4 DNS servers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4_dns_servers: Option<Vec<String>>,
    /// Parent v6 global pool, by CIDR
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6_global_pool: Option<String>,
    /// Whether the v6 range is given by prefix length
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6_prefix: Option<bool>,
    /// v6 prefix length
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6_prefix_length: Option<u8>,
    /// v6 network address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6_subnet: Option<String>,
    /// v6 host count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6_total_host: Option<u64>,
    /// v6 gateway
    #[serde(rename = "ipv6GateWay", default, skip_serializing_if = "Option::is_none")]
    pub ipv6_gateway: Option<String>,
    /// v6 DHCP servers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6_dhcp_servers: Option<Vec<String>>,
    /// v6 DNS servers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6_dns_servers: Option<Vec<String>>,
    /// SLAAC on the v6 half
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slaac_support: Option<bool>,
}

impl ReservePoolRequest {
    /// Drops the fields the controller refuses to change after creation.
    ///
    /// The v6 range fields survive when `adding_v6` is set, since a v6 half
    /// may be attached to an existing v4-only reservation.
    #[must_use]
    pub fn into_update(mut self, adding_v6: bool) -> Self {
        self.pool_type = None;
        self.ipv4_global_pool = None;
        self.ipv4_prefix = None;
        self.ipv4_prefix_length = None;
        self.ipv4_subnet = None;
        self.ipv4_total_host = None;
        if !adding_v6 {
            self.ipv6_global_pool = None;
            self.ipv6_prefix = None;
            self.ipv6_prefix_length = None;
            self.ipv6_subnet = None;
            self.ipv6_total_host = None;
        }
        self
    }
}
