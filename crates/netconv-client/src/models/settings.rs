//! Site network settings.
//!
//! Controllers from 2.3.7.6 expose one endpoint per aspect
//! (`/sites/{id}/dhcpSettings`, ...). Older releases only have the combined
//! `/network` document, read as a list of keyed entries and written as one
//! settings object.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// DHCP aspect.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DhcpSettings {
    /// DHCP servers
    #[serde(default)]
    pub servers: Vec<String>,
}

/// DNS aspect.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DnsSettings {
    /// Domain name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_name: Option<String>,
    /// Primary first
    #[serde(default)]
    pub dns_servers: Vec<String>,
}

/// NTP aspect.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NtpSettings {
    /// NTP servers
    #[serde(default)]
    pub servers: Vec<String>,
}

/// Time zone aspect.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimeZoneSettings {
    /// Zone identifier, e.g. `GMT`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
}

/// Banner aspect.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BannerSettings {
    /// `Builtin` keeps the device banner, `Custom` pushes `message`
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub banner_type: Option<String>,
    /// Banner text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// AAA aspect.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AaaSettings {
    /// Server used for network device administration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aaa_network: Option<AaaServer>,
    /// Server used for client and endpoint authentication
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aaa_client: Option<AaaServer>,
}

/// One AAA server block.
///
/// The controller never returns the shared secret; it is write-only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AaaServer {
    /// `AAA` or `ISE`
    pub server_type: String,
    /// `RADIUS` or `TACACS`
    pub protocol: String,
    /// Policy administration node, required for ISE
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pan: Option<String>,
    /// Primary server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_server_ip: Option<String>,
    /// Secondary server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_server_ip: Option<String>,
    /// Shared secret
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "expose_optional_secret"
    )]
    pub shared_secret: Option<SecretString>,
}

/// Telemetry aspect.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySettings {
    /// Wired client data collection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wired_data_collection: Option<WiredDataCollection>,
    /// Wireless telemetry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wireless_telemetry: Option<WirelessTelemetry>,
    /// SNMP trap receivers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snmp_traps: Option<SnmpTraps>,
    /// Syslog receivers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syslogs: Option<Syslogs>,
    /// NetFlow export
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_visibility: Option<ApplicationVisibility>,
}

/// Wired data collection toggle.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WiredDataCollection {
    /// Enabled
    pub enable_wired_data_collection: bool,
}

/// Wireless telemetry toggle.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WirelessTelemetry {
    /// Enabled
    pub enable_wireless_telemetry: bool,
}

/// SNMP trap receivers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SnmpTraps {
    /// Send traps to the controller itself
    #[serde(default)]
    pub use_builtin_trap_server: bool,
    /// Additional receivers
    #[serde(default)]
    pub external_trap_servers: Vec<String>,
}

/// Syslog receivers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Syslogs {
    /// Send syslog to the controller itself
    #[serde(default)]
    pub use_builtin_syslog_server: bool,
    /// Additional receivers
    #[serde(default)]
    pub external_syslog_servers: Vec<String>,
}

/// NetFlow export settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationVisibility {
    /// Collector
    pub collector: NetflowCollector,
    /// Enable on wired access devices
    #[serde(default)]
    pub enable_on_wired_access_devices: bool,
}

/// NetFlow collector.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NetflowCollector {
    /// `Builtin` or `TelemetryBrokerOrUDPDirector`
    pub collector_type: String,
    /// Collector address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Collector port
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

/// One keyed entry of the combined settings document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSettingEntry {
    /// Setting key, e.g. `dhcp.server`
    pub key: String,
    /// Setting values; shape depends on the key
    #[serde(default)]
    pub value: Vec<Value>,
    /// Site the value is inherited from, when not set locally
    #[serde(default)]
    pub inherited_group_uuid: Option<String>,
}

/// Combined settings document written by the legacy endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyNetworkSettings {
    /// DHCP servers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dhcp_server: Option<Vec<String>>,
    /// DNS
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_server: Option<LegacyDns>,
    /// Syslog receivers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syslog_server: Option<LegacyReceivers>,
    /// SNMP trap receivers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snmp_server: Option<LegacyReceivers>,
    /// NetFlow collector
    #[serde(
        rename = "netflowcollector",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub netflow_collector: Option<LegacyNetflow>,
    /// NTP servers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ntp_server: Option<Vec<String>>,
    /// Time zone
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    /// Banner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_of_theday: Option<LegacyBanner>,
    /// Network device AAA
    #[serde(rename = "network_aaa", default, skip_serializing_if = "Option::is_none")]
    pub network_aaa: Option<LegacyAaa>,
    /// Client and endpoint AAA
    #[serde(
        rename = "clientAndEndpoint_aaa",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub client_and_endpoint_aaa: Option<LegacyAaa>,
}

/// Legacy DNS block.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LegacyDns {
    /// Domain name
    #[serde(default)]
    pub domain_name: String,
    /// Primary server
    #[serde(default)]
    pub primary_ip_address: String,
    /// Secondary server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_ip_address: Option<String>,
}

/// Legacy syslog or SNMP receiver block.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LegacyReceivers {
    /// Receivers
    #[serde(default)]
    pub ip_addresses: Vec<String>,
    /// Also send to the controller itself
    #[serde(rename = "configureDnacIP", default)]
    pub configure_controller_ip: bool,
}

/// Legacy NetFlow block.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LegacyNetflow {
    /// Collector address
    #[serde(default)]
    pub ip_address: String,
    /// Collector port
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

/// Legacy banner block.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LegacyBanner {
    /// Banner text
    #[serde(default)]
    pub banner_message: String,
    /// Keep the device's own banner
    #[serde(default)]
    pub retain_existing_banner: bool,
}

/// Legacy AAA block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyAaa {
    /// `AAA` or `ISE`
    pub servers: String,
    /// PAN address (ISE) or primary server (AAA)
    pub ip_address: String,
    /// Primary server when a PAN is set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    /// `RADIUS` or `TACACS`
    pub protocol: String,
    /// Shared secret
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "expose_optional_secret"
    )]
    pub shared_secret: Option<SecretString>,
}

// skip_serializing_if guarantees the value is present here.
#[allow(clippy::ref_option)]
fn expose_optional_secret<S>(
    secret: &Option<SecretString>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match secret {
        Some(secret) => serializer.serialize_str(secret.expose_secret()),
        None => serializer.serialize_none(),
    }
}
