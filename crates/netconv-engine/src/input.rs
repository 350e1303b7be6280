//! The declarative input document.
//!
//! Records keep every optional field as `Option` (or [`Patch`] for network
//! settings) so that "not specified" stays distinct from "empty" all the way
//! to the diff.

use crate::patch::Patch;
use crate::secret::Sealed;
use netconv_client::models::PoolType;
use netconv_core::types::AddressSpace;
use netconv_core::Error;
use secrecy::SecretString;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use validator::Validate;

/// Execution mode of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    /// Converge the controller towards the document
    #[default]
    Merged,
    /// Remove the entities the document names
    Deleted,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Merged => "merged",
            Self::Deleted => "deleted",
        })
    }
}

/// One input document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputDocument {
    /// Execution mode
    #[serde(default)]
    pub state: State,
    /// Re-fetch and re-diff after applying
    #[serde(default)]
    pub config_verify: bool,
    /// Resource groups
    #[serde(default)]
    pub config: InputConfig,
}

impl InputDocument {
    /// Parse a YAML (or JSON) document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InputInvalid`] if the text does not match the schema.
    pub fn from_yaml(text: &str) -> Result<Self, Error> {
        serde_yaml::from_str(text).map_err(|err| Error::input("document", err.to_string()))
    }

    /// Parse a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InputInvalid`] if the text does not match the schema.
    pub fn from_json(text: &str) -> Result<Self, Error> {
        serde_json::from_str(text).map_err(|err| Error::input("document", err.to_string()))
    }
}

/// The `config` mapping.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputConfig {
    /// Global pools
    #[serde(default)]
    pub global_pool_details: Option<GlobalPoolDetails>,
    /// Reserved sub-pools
    #[serde(default)]
    pub reserve_pool_details: Vec<ReservedPoolInput>,
    /// Per-site network settings
    #[serde(default)]
    pub network_management_details: Vec<NetworkInput>,
    /// Users
    #[serde(default)]
    pub user_details: Vec<UserInput>,
    /// Roles
    #[serde(default)]
    pub role_details: Vec<RoleInput>,
}

impl InputConfig {
    /// Global pool entries, empty when the group is absent.
    #[must_use]
    pub fn global_pools(&self) -> &[GlobalPoolInput] {
        self.global_pool_details
            .as_ref()
            .map_or(&[], |details| details.settings.ip_pool.as_slice())
    }

    /// Returns true when no group has entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.global_pools().is_empty()
            && self.reserve_pool_details.is_empty()
            && self.network_management_details.is_empty()
            && self.user_details.is_empty()
            && self.role_details.is_empty()
    }
}

/// `global_pool_details` wrapper.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlobalPoolDetails {
    /// Settings block
    #[serde(default)]
    pub settings: GlobalPoolSettings,
}

/// `global_pool_details.settings`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlobalPoolSettings {
    /// Pool entries
    #[serde(default)]
    pub ip_pool: Vec<GlobalPoolInput>,
}

/// One global pool entry.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct GlobalPoolInput {
    /// Pool name; empty with `force_delete` selects every pool
    #[validate(length(max = 100))]
    pub name: Option<String>,
    /// Name the pool currently has, for renames
    #[validate(length(min = 1, max = 100))]
    pub prev_name: Option<String>,
    /// Address space; derived from the CIDR when omitted
    pub ip_address_space: Option<AddressSpace>,
    /// Pool range
    pub cidr: Option<String>,
    /// Usage type
    #[serde(alias = "type")]
    pub pool_type: Option<PoolType>,
    /// Gateway
    pub gateway: Option<String>,
    /// DHCP servers
    pub dhcp_server_ips: Option<Vec<String>>,
    /// DNS servers
    pub dns_server_ips: Option<Vec<String>>,
    /// Sweep every pool when deleting with an empty name
    #[serde(default)]
    pub force_delete: bool,
}

/// Usage type of a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReservedPoolType {
    /// General purpose
    #[default]
    #[serde(alias = "generic", alias = "GENERIC")]
    Generic,
    /// Client LAN
    #[serde(rename = "LAN", alias = "lan", alias = "Lan")]
    Lan,
    /// Device management
    #[serde(alias = "management", alias = "MANAGEMENT")]
    Management,
    /// Service addresses
    #[serde(alias = "service", alias = "SERVICE")]
    Service,
    /// WAN links
    #[serde(rename = "WAN", alias = "wan", alias = "Wan")]
    Wan,
}

impl ReservedPoolType {
    /// Wire spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Generic => "Generic",
            Self::Lan => "LAN",
            Self::Management => "Management",
            Self::Service => "Service",
            Self::Wan => "WAN",
        }
    }
}

/// One reserved pool entry.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ReservedPoolInput {
    /// Reservation name; empty with `force_delete` selects every reservation
    #[validate(length(max = 100))]
    pub name: Option<String>,
    /// Name the reservation currently has, for renames
    #[validate(length(min = 1, max = 100))]
    pub prev_name: Option<String>,
    /// Owning site path
    pub site_name: Option<String>,
    /// Usage type
    #[serde(alias = "type")]
    pub pool_type: Option<ReservedPoolType>,
    /// Carry an IPv6 half
    pub ipv6_address_space: Option<bool>,
    /// Parent v4 global pool, by CIDR
    pub ipv4_global_pool: Option<String>,
    /// Parent v4 global pool, by name
    pub ipv4_global_pool_name: Option<String>,
    /// v4 range given by prefix length
    pub ipv4_prefix: Option<bool>,
    /// v4 prefix length
    #[validate(range(min = 1, max = 32))]
    pub ipv4_prefix_length: Option<u8>,
    /// v4 network address
    pub ipv4_subnet: Option<String>,
    /// v4 host count
    #[validate(range(min = 1))]
    pub ipv4_total_host: Option<u64>,
    /// v4 gateway
    pub ipv4_gateway: Option<String>,
    /// v4 DHCP servers
    pub ipv4_dhcp_servers: Option<Vec<String>>,
    /// v4 DNS servers
    pub ipv4_dns_servers: Option<Vec<String>>,
    /// Parent v6 global pool, by CIDR
    pub ipv6_global_pool: Option<String>,
    /// Parent v6 global pool, by name
    pub ipv6_global_pool_name: Option<String>,
    /// v6 range given by prefix length
    pub ipv6_prefix: Option<bool>,
    /// v6 prefix length
    #[validate(range(min = 1, max = 128))]
    pub ipv6_prefix_length: Option<u8>,
    /// v6 network address
    pub ipv6_subnet: Option<String>,
    /// v6 host count
    #[validate(range(min = 1))]
    pub ipv6_total_host: Option<u64>,
    /// v6 gateway
    pub ipv6_gateway: Option<String>,
    /// v6 DHCP servers
    pub ipv6_dhcp_servers: Option<Vec<String>>,
    /// v6 DNS servers
    pub ipv6_dns_servers: Option<Vec<String>>,
    /// SLAAC on the v6 half
    pub slaac_support: Option<bool>,
    /// Sweep the site when deleting with an empty name
    #[serde(default)]
    pub force_delete: bool,
}

/// One site's network settings entry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkInput {
    /// Site path; `Global` when omitted
    pub site_name: Option<String>,
    /// Settings
    #[serde(default)]
    pub settings: NetworkSettingsInput,
}

/// Per-site settings. Omitted keys keep the controller's value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkSettingsInput {
    /// DHCP servers
    #[serde(default)]
    pub dhcp_server: Patch<Vec<String>>,
    /// DNS
    #[serde(default)]
    pub dns_server: Patch<DnsInput>,
    /// NTP servers
    #[serde(default)]
    pub ntp_server: Patch<Vec<String>>,
    /// Time zone
    #[serde(default)]
    pub timezone: Patch<String>,
    /// Banner
    #[serde(default)]
    pub message_of_the_day: Patch<BannerInput>,
    /// SNMP trap receivers
    #[serde(default)]
    pub snmp_server: Patch<ReceiversInput>,
    /// Syslog receivers
    #[serde(default)]
    pub syslog_server: Patch<ReceiversInput>,
    /// NetFlow collector
    #[serde(default)]
    pub netflow_collector: Patch<NetflowInput>,
    /// Wired data collection
    #[serde(default)]
    pub wired_data_collection: Patch<bool>,
    /// Wireless telemetry
    #[serde(default)]
    pub wireless_telemetry: Patch<bool>,
    /// Network device AAA
    #[serde(default)]
    pub network_aaa: Patch<AaaInput>,
    /// Client and endpoint AAA
    #[serde(default)]
    pub client_and_endpoint_aaa: Patch<AaaInput>,
}

/// DNS settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DnsInput {
    /// Domain name
    pub domain_name: Option<String>,
    /// Primary server
    pub primary_ip_address: Option<String>,
    /// Secondary server
    pub secondary_ip_address: Option<String>,
}

/// Banner settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BannerInput {
    /// Custom banner text
    pub banner_message: Option<String>,
    /// Keep the device's own banner
    #[serde(default)]
    pub retain_existing_banner: bool,
}

/// SNMP or syslog receivers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReceiversInput {
    /// Also send to the controller itself
    #[serde(default, alias = "configure_dnac_ip")]
    pub configure_controller_ip: bool,
    /// Receivers
    #[serde(default)]
    pub ip_addresses: Vec<String>,
}

/// NetFlow collector type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CollectorType {
    /// The controller's own collector
    #[default]
    Builtin,
    /// External telemetry broker or UDP director
    #[serde(rename = "TelemetryBrokerOrUDPDirector")]
    TelemetryBroker,
}

impl CollectorType {
    /// Wire spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Builtin => "Builtin",
            Self::TelemetryBroker => "TelemetryBrokerOrUDPDirector",
        }
    }
}

/// NetFlow collector settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetflowInput {
    /// Collector type
    #[serde(default)]
    pub collector_type: CollectorType,
    /// Collector address
    pub ip_address: Option<String>,
    /// Collector port
    pub port: Option<u32>,
    /// Enable on wired access devices
    #[serde(default)]
    pub enable_on_wired_access_devices: bool,
}

/// AAA server type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AaaServerType {
    /// Generic AAA server
    #[serde(rename = "AAA", alias = "aaa")]
    Aaa,
    /// Identity Services Engine
    #[serde(rename = "ISE", alias = "ise")]
    Ise,
}

impl AaaServerType {
    /// Wire spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Aaa => "AAA",
            Self::Ise => "ISE",
        }
    }
}

/// AAA protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AaaProtocol {
    /// RADIUS
    #[default]
    #[serde(rename = "RADIUS", alias = "radius")]
    Radius,
    /// TACACS+
    #[serde(rename = "TACACS", alias = "tacacs")]
    Tacacs,
}

impl AaaProtocol {
    /// Wire spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Radius => "RADIUS",
            Self::Tacacs => "TACACS",
        }
    }
}

/// AAA server settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AaaInput {
    /// Server type
    pub server_type: AaaServerType,
    /// Protocol
    #[serde(default)]
    pub protocol: AaaProtocol,
    /// Policy administration node, required for ISE
    pub pan_address: Option<String>,
    /// Primary server
    pub primary_server_address: Option<String>,
    /// Secondary server
    pub secondary_server_address: Option<String>,
    /// Shared secret
    pub shared_secret: Option<SecretString>,
}

/// One user entry.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UserInput {
    /// Login name
    #[validate(length(min = 3, max = 50))]
    pub username: Option<String>,
    /// Given name
    #[validate(length(max = 255))]
    pub first_name: Option<String>,
    /// Family name
    #[validate(length(max = 255))]
    pub last_name: Option<String>,
    /// Mail address; fallback identifier
    #[validate(email)]
    pub email: Option<String>,
    /// Plaintext password; sealed and cleared by validation
    pub password: Option<SecretString>,
    /// Sealed password, set by validation
    #[serde(skip)]
    pub sealed_password: Option<Sealed>,
    /// Rotate the password of an existing user
    #[serde(default)]
    pub password_update: bool,
    /// Role names
    pub role_list: Option<Vec<String>>,
}

/// Permission level in a role entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// No access
    Deny,
    /// Read only
    Read,
    /// Full access
    Write,
}

impl<'de> Deserialize<'de> for Permission {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        match raw.to_ascii_lowercase().as_str() {
            "deny" => Ok(Self::Deny),
            "read" => Ok(Self::Read),
            "write" => Ok(Self::Write),
            _ => Err(de::Error::invalid_value(
                de::Unexpected::Str(&raw),
                &"one of read, write, deny",
            )),
        }
    }
}

/// A single object or a list of objects.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum OneOrList<T> {
    /// Bare object
    One(T),
    /// List form
    List(Vec<T>),
}

impl<T> OneOrList<T> {
    /// The first object.
    #[must_use]
    pub fn first(&self) -> Option<&T> {
        match self {
            Self::One(item) => Some(item),
            Self::List(items) => items.first(),
        }
    }

    /// Number of objects given.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::List(items) => items.len(),
        }
    }

    /// Returns true for an empty list.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A value inside a category block.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PermissionNode {
    /// `sub: read`
    Level(Permission),
    /// `inventory_management: [{overall: read, topology: deny}]`
    Nested(OneOrList<BTreeMap<String, Permission>>),
}

/// A category block: `overall` and sub-resource keys.
pub type PermissionBlock = BTreeMap<String, PermissionNode>;

/// One role entry.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct RoleInput {
    /// Role name
    #[validate(length(min = 1, max = 25))]
    pub role_name: Option<String>,
    /// Free text
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    /// Assurance permissions
    pub assurance: Option<OneOrList<PermissionBlock>>,
    /// Network analytics permissions
    pub network_analytics: Option<OneOrList<PermissionBlock>>,
    /// Network design permissions
    pub network_design: Option<OneOrList<PermissionBlock>>,
    /// Network provision permissions
    pub network_provision: Option<OneOrList<PermissionBlock>>,
    /// Network services permissions
    pub network_services: Option<OneOrList<PermissionBlock>>,
    /// Platform permissions
    pub platform: Option<OneOrList<PermissionBlock>>,
    /// Security permissions
    pub security: Option<OneOrList<PermissionBlock>>,
    /// System permissions
    pub system: Option<OneOrList<PermissionBlock>>,
    /// Utilities permissions
    pub utilities: Option<OneOrList<PermissionBlock>>,
}

impl RoleInput {
    /// Category block by input key.
    #[must_use]
    pub fn category(&self, key: &str) -> Option<&OneOrList<PermissionBlock>> {
        match key {
            "assurance" => self.assurance.as_ref(),
            "network_analytics" => self.network_analytics.as_ref(),
            "network_design" => self.network_design.as_ref(),
            "network_provision" => self.network_provision.as_ref(),
            "network_services" => self.network_services.as_ref(),
            "platform" => self.platform.as_ref(),
            "security" => self.security.as_ref(),
            "system" => self.system.as_ref(),
            "utilities" => self.utilities.as_ref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_global_pool_document() {
        let doc = InputDocument::from_yaml(
            r"
state: merged
config:
  global_pool_details:
    settings:
      ip_pool:
        - name: lab-v4
          ip_address_space: IPv4
          cidr: 10.0.0.0/16
          pool_type: Generic
",
        )
        .unwrap();

        assert_eq!(doc.state, State::Merged);
        assert!(!doc.config_verify);
        let pools = doc.config.global_pools();
        assert_eq!(pools.len(), 1);
        assert_eq!(pools[0].name.as_deref(), Some("lab-v4"));
        assert_eq!(pools[0].ip_address_space, Some(AddressSpace::V4));
        assert_eq!(pools[0].pool_type, Some(PoolType::Generic));
        assert_eq!(pools[0].dhcp_server_ips, None);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = InputDocument::from_yaml("state: merged\nconfig:\n  bogus_details: []\n")
            .unwrap_err();
        assert!(matches!(err, Error::InputInvalid { ref path, .. } if path == "document"));
    }

    #[test]
    fn role_categories_accept_object_or_list() {
        let doc = InputDocument::from_yaml(
            r"
state: merged
config:
  role_details:
    - role_name: ops
      assurance:
        - overall: WRITE
          troubleshooting_tools: deny
      network_provision:
        inventory_management:
          - overall: read
            topology: Write
",
        )
        .unwrap();

        let role = &doc.config.role_details[0];
        let assurance = role.assurance.as_ref().unwrap().first().unwrap();
        assert_eq!(
            assurance.get("overall"),
            Some(&PermissionNode::Level(Permission::Write))
        );
        assert_eq!(
            assurance.get("troubleshooting_tools"),
            Some(&PermissionNode::Level(Permission::Deny))
        );

        let provision = role.category("network_provision").unwrap().first().unwrap();
        let Some(PermissionNode::Nested(inventory)) = provision.get("inventory_management") else {
            panic!("expected nested block");
        };
        assert_eq!(
            inventory.first().unwrap().get("topology"),
            Some(&Permission::Write)
        );
    }

    #[test]
    fn bad_permission_level_is_rejected() {
        let result = InputDocument::from_yaml(
            "config:\n  role_details:\n    - role_name: x\n      assurance: {overall: admin}\n",
        );
        assert!(result.is_err());
    }

    #[test]
    fn network_settings_distinguish_null_from_missing() {
        let doc = InputDocument::from_json(
            r#"{"config": {"network_management_details": [{
                "site_name": "Global/HQ",
                "settings": {"ntp_server": null, "timezone": "GMT", "dhcp_server": []}
            }]}}"#,
        )
        .unwrap();

        let settings = &doc.config.network_management_details[0].settings;
        assert_eq!(settings.ntp_server, Patch::Clear);
        assert_eq!(settings.timezone, Patch::Set("GMT".into()));
        assert_eq!(settings.dhcp_server, Patch::Set(vec![]));
        assert!(settings.dns_server.is_preserve());
    }

    #[test]
    fn reserved_pool_type_spellings() {
        let pool: ReservedPoolInput =
            serde_json::from_str(r#"{"name": "p", "type": "LAN"}"#).unwrap();
        assert_eq!(pool.pool_type, Some(ReservedPoolType::Lan));
        assert_eq!(ReservedPoolType::Wan.as_str(), "WAN");
    }

    #[test]
    fn deleted_state_parses() {
        let doc = InputDocument::from_yaml(
            "state: deleted\nconfig:\n  reserve_pool_details:\n    - site_name: Global/HQ\n      force_delete: true\n      name: ''\n",
        )
        .unwrap();
        assert_eq!(doc.state, State::Deleted);
        assert!(doc.config.reserve_pool_details[0].force_delete);
        assert!(!doc.config.is_empty());
    }
}
