//! Site network services: DHCP, DNS, NTP, time zone, banner, AAA and
//! telemetry.
//!
//! Controllers serving the per-aspect endpoints get one read and, when the
//! aspect differs, one write per aspect the entry touches. Older controllers
//! only have the combined settings document, which is read, merged and
//! written back in one call.

use crate::diff::{Action, Planned};
use crate::family::{Context, Family, Plan};
use crate::input::{
    AaaInput, BannerInput, DnsInput, NetflowInput, NetworkInput, NetworkSettingsInput,
    ReceiversInput,
};
use crate::patch::Patch;
use crate::report::{Group, Outcome};
use crate::site::SiteResolver;
use async_trait::async_trait;
use netconv_client::methods;
use netconv_client::models::{
    AaaServer, AaaSettings, ApplicationVisibility, BannerSettings, DhcpSettings, DnsSettings,
    LegacyAaa, LegacyBanner, LegacyDns, LegacyNetflow, LegacyNetworkSettings, LegacyReceivers,
    NetflowCollector, NetworkSettingEntry, NtpSettings, SnmpTraps, Syslogs, TelemetrySettings,
    TimeZoneSettings, WiredDataCollection, WirelessTelemetry,
};
use netconv_core::ids::SiteId;
use netconv_core::types::{SitePath, GLOBAL_SITE};
use netconv_core::{Error, Result};
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Keys of the combined settings document.
pub mod keys {
    /// DHCP servers
    pub const DHCP: &str = "dhcp.server";
    /// DNS block
    pub const DNS: &str = "dns.server";
    /// NTP servers
    pub const NTP: &str = "ntp.server";
    /// Time zone
    pub const TIMEZONE: &str = "timezone.site";
    /// Banner block
    pub const BANNER: &str = "device.banner";
    /// Syslog receivers
    pub const SYSLOG: &str = "syslog.server";
    /// SNMP trap receivers
    pub const SNMP: &str = "snmp.trap.receiver";
    /// NetFlow collector
    pub const NETFLOW: &str = "netflow.collector";
    /// Network device AAA
    pub const NETWORK_AAA: &str = "aaa.network.server";
    /// Client and endpoint AAA
    pub const CLIENT_AAA: &str = "aaa.endpoint.server";
}

/// Per-aspect settings read for one site. `None` means the entry does not
/// touch the aspect, so it was not read.
#[derive(Debug, Clone, Default)]
pub struct AspectState {
    /// DHCP
    pub dhcp: Option<DhcpSettings>,
    /// DNS
    pub dns: Option<DnsSettings>,
    /// NTP
    pub ntp: Option<NtpSettings>,
    /// Time zone
    pub timezone: Option<TimeZoneSettings>,
    /// Banner
    pub banner: Option<BannerSettings>,
    /// AAA
    pub aaa: Option<AaaSettings>,
    /// Telemetry
    pub telemetry: Option<TelemetrySettings>,
}

/// Current settings of one site.
#[derive(Debug, Clone)]
pub enum SiteSettings {
    /// The site does not exist
    Missing,
    /// Read through the per-aspect endpoints
    Aspects {
        /// Site identifier
        id: SiteId,
        /// Aspects the entry touches
        state: AspectState,
    },
    /// Read from the combined settings document
    Legacy {
        /// Site identifier
        id: SiteId,
        /// Decoded document
        current: LegacyNetworkSettings,
    },
}

/// One aspect write.
#[derive(Debug, Clone)]
pub enum AspectWrite {
    /// DHCP
    Dhcp(DhcpSettings),
    /// DNS
    Dns(DnsSettings),
    /// NTP
    Ntp(NtpSettings),
    /// Time zone
    TimeZone(TimeZoneSettings),
    /// Banner
    Banner(BannerSettings),
    /// AAA
    Aaa(AaaSettings),
    /// Telemetry
    Telemetry(TelemetrySettings),
}

impl AspectWrite {
    /// Field label used in change reports.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Dhcp(_) => "dhcpServer",
            Self::Dns(_) => "dnsServer",
            Self::Ntp(_) => "ntpServer",
            Self::TimeZone(_) => "timezone",
            Self::Banner(_) => "messageOfTheday",
            Self::Aaa(_) => "aaa",
            Self::Telemetry(_) => "telemetry",
        }
    }
}

/// What a planned settings update sends.
#[derive(Debug, Clone)]
pub enum NetworkPayload {
    /// Per-aspect writes, in aspect order
    Aspects {
        /// Site identifier
        site_id: SiteId,
        /// Aspects that differ
        writes: Vec<AspectWrite>,
    },
    /// One write of the combined document
    Legacy {
        /// Site identifier
        site_id: SiteId,
        /// Merged document
        settings: LegacyNetworkSettings,
    },
}

/// The network services family.
#[derive(Debug)]
pub struct NetworkServices<'a> {
    entries: &'a [NetworkInput],
}

impl<'a> NetworkServices<'a> {
    /// Family over the input entries.
    #[must_use]
    pub const fn new(entries: &'a [NetworkInput]) -> Self {
        Self { entries }
    }

    fn site_key(entry: &NetworkInput) -> String {
        entry
            .site_name
            .clone()
            .unwrap_or_else(|| GLOBAL_SITE.to_string())
    }

    fn plan_entry(
        entry: &NetworkInput,
        have: &BTreeMap<String, SiteSettings>,
    ) -> Planned<NetworkPayload, SiteId> {
        let name = Self::site_key(entry);
        let settings = &entry.settings;
        match have.get(&name) {
            None | Some(SiteSettings::Missing) => Planned::new(
                name.clone(),
                Action::Blocked(Error::NotFound(format!("site {name}"))),
            ),
            Some(SiteSettings::Aspects { id, state }) => {
                let writes = aspect_writes(settings, state);
                if writes.is_empty() {
                    return Planned::new(name, Action::NoChange);
                }
                let changed = writes.iter().map(AspectWrite::name).collect();
                let payload = NetworkPayload::Aspects {
                    site_id: id.clone(),
                    writes,
                };
                Planned::new(name, Action::Update(payload)).with_changed_fields(changed)
            }
            Some(SiteSettings::Legacy { id, current }) => {
                let desired = legacy_desired(&name, settings, current);
                let changed = legacy_differences(current, &desired);
                if changed.is_empty() {
                    return Planned::new(name, Action::NoChange);
                }
                let payload = NetworkPayload::Legacy {
                    site_id: id.clone(),
                    settings: desired,
                };
                Planned::new(name, Action::Update(payload)).with_changed_fields(changed)
            }
        }
    }
}

async fn read_aspects(
    ctx: &Context<'_>,
    id: &SiteId,
    settings: &NetworkSettingsInput,
) -> Result<AspectState> {
    let api = ctx.api;
    let mut state = AspectState::default();
    if !settings.dhcp_server.is_preserve() {
        state.dhcp = Some(api.get_dhcp(id).await?);
    }
    if !settings.dns_server.is_preserve() {
        state.dns = Some(api.get_dns(id).await?);
    }
    if !settings.ntp_server.is_preserve() {
        state.ntp = Some(api.get_ntp(id).await?);
    }
    if !settings.timezone.is_preserve() {
        state.timezone = Some(api.get_timezone(id).await?);
    }
    if !settings.message_of_the_day.is_preserve() {
        state.banner = Some(api.get_banner(id).await?);
    }
    if !(settings.network_aaa.is_preserve() && settings.client_and_endpoint_aaa.is_preserve()) {
        state.aaa = Some(api.get_aaa(id).await?);
    }
    if touches_telemetry(settings) {
        state.telemetry = Some(api.get_telemetry(id).await?);
    }
    Ok(state)
}

fn touches_telemetry(settings: &NetworkSettingsInput) -> bool {
    !(settings.snmp_server.is_preserve()
        && settings.syslog_server.is_preserve()
        && settings.netflow_collector.is_preserve()
        && settings.wired_data_collection.is_preserve()
        && settings.wireless_telemetry.is_preserve())
}

fn same_servers(a: &[String], b: &[String]) -> bool {
    a.iter().collect::<BTreeSet<_>>() == b.iter().collect::<BTreeSet<_>>()
}

/// Aspects whose desired value differs from the controller's, in a fixed
/// order.
fn aspect_writes(settings: &NetworkSettingsInput, state: &AspectState) -> Vec<AspectWrite> {
    let mut writes = Vec::new();

    if let Some(current) = &state.dhcp {
        let servers = settings
            .dhcp_server
            .resolve_ref(Some(&current.servers))
            .unwrap_or_default();
        if !same_servers(&servers, &current.servers) {
            writes.push(AspectWrite::Dhcp(DhcpSettings { servers }));
        }
    }
    if let Some(current) = &state.dns {
        let desired = dns(&settings.dns_server, current);
        if desired != *current {
            writes.push(AspectWrite::Dns(desired));
        }
    }
    if let Some(current) = &state.ntp {
        let servers = settings
            .ntp_server
            .resolve_ref(Some(&current.servers))
            .unwrap_or_default();
        if !same_servers(&servers, &current.servers) {
            writes.push(AspectWrite::Ntp(NtpSettings { servers }));
        }
    }
    if let Some(current) = &state.timezone {
        let desired = TimeZoneSettings {
            identifier: settings.timezone.resolve_ref(current.identifier.as_ref()),
        };
        if desired != *current {
            writes.push(AspectWrite::TimeZone(desired));
        }
    }
    if let Some(current) = &state.banner {
        let desired = match &settings.message_of_the_day {
            Patch::Preserve => current.clone(),
            Patch::Clear => BannerSettings::default(),
            Patch::Set(banner) => banner_settings(banner),
        };
        if desired != *current {
            writes.push(AspectWrite::Banner(desired));
        }
    }
    if let Some(current) = &state.aaa {
        let desired = AaaSettings {
            aaa_network: aaa(&settings.network_aaa, current.aaa_network.as_ref(), "network_aaa"),
            aaa_client: aaa(
                &settings.client_and_endpoint_aaa,
                current.aaa_client.as_ref(),
                "client_and_endpoint_aaa",
            ),
        };
        if aaa_key(desired.aaa_network.as_ref()) != aaa_key(current.aaa_network.as_ref())
            || aaa_key(desired.aaa_client.as_ref()) != aaa_key(current.aaa_client.as_ref())
        {
            writes.push(AspectWrite::Aaa(desired));
        }
    }
    if let Some(current) = &state.telemetry {
        let desired = telemetry(settings, current);
        if desired != *current {
            writes.push(AspectWrite::Telemetry(desired));
        }
    }
    writes
}

fn dns(patch: &Patch<DnsInput>, current: &DnsSettings) -> DnsSettings {
    match patch {
        Patch::Preserve => current.clone(),
        Patch::Clear => DnsSettings::default(),
        Patch::Set(dns) => {
            let primary = dns
                .primary_ip_address
                .clone()
                .or_else(|| current.dns_servers.first().cloned());
            let secondary = dns
                .secondary_ip_address
                .clone()
                .or_else(|| current.dns_servers.get(1).cloned());
            DnsSettings {
                domain_name: dns.domain_name.clone().or_else(|| current.domain_name.clone()),
                dns_servers: primary.into_iter().chain(secondary).collect(),
            }
        }
    }
}

fn banner_settings(banner: &BannerInput) -> BannerSettings {
    if banner.retain_existing_banner {
        BannerSettings {
            banner_type: Some("Builtin".into()),
            message: None,
        }
    } else {
        BannerSettings {
            banner_type: Some("Custom".into()),
            message: banner.banner_message.clone(),
        }
    }
}

fn aaa_server(aaa: &AaaInput) -> AaaServer {
    AaaServer {
        server_type: aaa.server_type.as_str().to_string(),
        protocol: aaa.protocol.as_str().to_string(),
        pan: aaa.pan_address.clone(),
        primary_server_ip: aaa.primary_server_address.clone(),
        secondary_server_ip: aaa.secondary_server_address.clone(),
        shared_secret: aaa.shared_secret.clone(),
    }
}

fn aaa(patch: &Patch<AaaInput>, current: Option<&AaaServer>, field: &str) -> Option<AaaServer> {
    match patch {
        Patch::Set(aaa) => Some(aaa_server(aaa)),
        Patch::Preserve => current.cloned(),
        Patch::Clear => {
            warn!(field, "AAA servers cannot be removed, keeping the current server");
            current.cloned()
        }
    }
}

type AaaKey<'a> = (&'a str, &'a str, Option<&'a str>, Option<&'a str>, Option<&'a str>);

/// Comparable AAA fields. The shared secret is write-only and never
/// compared.
fn aaa_key(server: Option<&AaaServer>) -> Option<AaaKey<'_>> {
    server.map(|server| {
        (
            server.server_type.as_str(),
            server.protocol.as_str(),
            server.pan.as_deref(),
            server.primary_server_ip.as_deref(),
            server.secondary_server_ip.as_deref(),
        )
    })
}

fn receivers<T>(
    patch: &Patch<ReceiversInput>,
    current: Option<&T>,
    build: impl Fn(bool, Vec<String>) -> T,
) -> Option<T>
where
    T: Clone,
{
    match patch {
        Patch::Preserve => current.cloned(),
        Patch::Clear => Some(build(false, Vec::new())),
        Patch::Set(receivers) => Some(build(
            receivers.configure_controller_ip,
            receivers.ip_addresses.clone(),
        )),
    }
}

fn collector(netflow: &NetflowInput) -> ApplicationVisibility {
    ApplicationVisibility {
        collector: NetflowCollector {
            collector_type: netflow.collector_type.as_str().to_string(),
            address: netflow.ip_address.clone(),
            port: netflow.port.and_then(|port| u16::try_from(port).ok()),
        },
        enable_on_wired_access_devices: netflow.enable_on_wired_access_devices,
    }
}

fn telemetry(settings: &NetworkSettingsInput, current: &TelemetrySettings) -> TelemetrySettings {
    let application_visibility = match &settings.netflow_collector {
        Patch::Preserve => current.application_visibility.clone(),
        Patch::Clear => Some(collector(&NetflowInput::default())),
        Patch::Set(netflow) => Some(collector(netflow)),
    };
    TelemetrySettings {
        wired_data_collection: settings
            .wired_data_collection
            .clone()
            .map(|enabled| WiredDataCollection {
                enable_wired_data_collection: enabled,
            })
            .resolve_ref(current.wired_data_collection.as_ref())
            .or_else(|| {
                matches!(settings.wired_data_collection, Patch::Clear)
                    .then(WiredDataCollection::default)
            }),
        wireless_telemetry: settings
            .wireless_telemetry
            .clone()
            .map(|enabled| WirelessTelemetry {
                enable_wireless_telemetry: enabled,
            })
            .resolve_ref(current.wireless_telemetry.as_ref())
            .or_else(|| {
                matches!(settings.wireless_telemetry, Patch::Clear)
                    .then(WirelessTelemetry::default)
            }),
        snmp_traps: receivers(
            &settings.snmp_server,
            current.snmp_traps.as_ref(),
            |builtin, servers| SnmpTraps {
                use_builtin_trap_server: builtin,
                external_trap_servers: servers,
            },
        ),
        syslogs: receivers(
            &settings.syslog_server,
            current.syslogs.as_ref(),
            |builtin, servers| Syslogs {
                use_builtin_syslog_server: builtin,
                external_syslog_servers: servers,
            },
        ),
        application_visibility,
    }
}

fn legacy_value<T: DeserializeOwned>(entries: &[NetworkSettingEntry], key: &str) -> Option<T> {
    let value = entries.iter().find(|entry| entry.key == key)?.value.first()?;
    match serde_json::from_value(value.clone()) {
        Ok(decoded) => Some(decoded),
        Err(error) => {
            warn!(key, %error, "ignoring undecodable settings entry");
            None
        }
    }
}

fn legacy_list(entries: &[NetworkSettingEntry], key: &str) -> Option<Vec<String>> {
    entries.iter().find(|entry| entry.key == key).map(|entry| {
        entry
            .value
            .iter()
            .filter_map(|value| value.as_str().map(str::to_string))
            .collect()
    })
}

/// Decode the keyed entries of the combined settings document.
#[must_use]
pub fn legacy_settings(entries: &[NetworkSettingEntry]) -> LegacyNetworkSettings {
    LegacyNetworkSettings {
        dhcp_server: legacy_list(entries, keys::DHCP),
        dns_server: legacy_value(entries, keys::DNS),
        syslog_server: legacy_value(entries, keys::SYSLOG),
        snmp_server: legacy_value(entries, keys::SNMP),
        netflow_collector: legacy_value(entries, keys::NETFLOW),
        ntp_server: legacy_list(entries, keys::NTP),
        timezone: legacy_list(entries, keys::TIMEZONE).and_then(|zones| zones.into_iter().next()),
        message_of_theday: legacy_value(entries, keys::BANNER),
        network_aaa: legacy_value(entries, keys::NETWORK_AAA),
        client_and_endpoint_aaa: legacy_value(entries, keys::CLIENT_AAA),
    }
}

fn legacy_receivers(receivers: &ReceiversInput) -> LegacyReceivers {
    LegacyReceivers {
        ip_addresses: receivers.ip_addresses.clone(),
        configure_controller_ip: receivers.configure_controller_ip,
    }
}

fn legacy_aaa(aaa: &AaaInput) -> LegacyAaa {
    let (ip_address, network) = match &aaa.pan_address {
        Some(pan) => (pan.clone(), aaa.primary_server_address.clone()),
        None => (aaa.primary_server_address.clone().unwrap_or_default(), None),
    };
    LegacyAaa {
        servers: aaa.server_type.as_str().to_string(),
        ip_address,
        network,
        protocol: aaa.protocol.as_str().to_string(),
        shared_secret: aaa.shared_secret.clone(),
    }
}

/// Apply a patch whose `Clear` has no legacy spelling.
fn legacy_patch<I, T: Clone>(
    site: &str,
    field: &'static str,
    patch: &Patch<I>,
    current: Option<&T>,
    convert: impl FnOnce(&I) -> T,
) -> Option<T> {
    match patch {
        Patch::Preserve => current.cloned(),
        Patch::Set(value) => Some(convert(value)),
        Patch::Clear => {
            warn!(site, field, "cannot clear this setting on this controller release");
            current.cloned()
        }
    }
}

/// Merge the entry into the combined document.
fn legacy_desired(
    site: &str,
    settings: &NetworkSettingsInput,
    current: &LegacyNetworkSettings,
) -> LegacyNetworkSettings {
    if !(settings.wired_data_collection.is_preserve() && settings.wireless_telemetry.is_preserve())
    {
        warn!(site, "wired and wireless telemetry toggles need a newer controller, skipping");
    }

    LegacyNetworkSettings {
        dhcp_server: settings
            .dhcp_server
            .resolve_ref(current.dhcp_server.as_ref())
            .or_else(|| matches!(settings.dhcp_server, Patch::Clear).then(Vec::new)),
        dns_server: legacy_patch(
            site,
            "dns_server",
            &settings.dns_server,
            current.dns_server.as_ref(),
            |dns| {
                let have = current.dns_server.clone().unwrap_or_default();
                LegacyDns {
                    domain_name: dns.domain_name.clone().unwrap_or(have.domain_name),
                    primary_ip_address: dns
                        .primary_ip_address
                        .clone()
                        .unwrap_or(have.primary_ip_address),
                    secondary_ip_address: dns
                        .secondary_ip_address
                        .clone()
                        .or(have.secondary_ip_address),
                }
            },
        ),
        syslog_server: legacy_patch(
            site,
            "syslog_server",
            &settings.syslog_server,
            current.syslog_server.as_ref(),
            legacy_receivers,
        ),
        snmp_server: legacy_patch(
            site,
            "snmp_server",
            &settings.snmp_server,
            current.snmp_server.as_ref(),
            legacy_receivers,
        ),
        netflow_collector: legacy_patch(
            site,
            "netflow_collector",
            &settings.netflow_collector,
            current.netflow_collector.as_ref(),
            |netflow| LegacyNetflow {
                ip_address: netflow.ip_address.clone().unwrap_or_default(),
                port: netflow.port.and_then(|port| u16::try_from(port).ok()),
            },
        ),
        ntp_server: settings
            .ntp_server
            .resolve_ref(current.ntp_server.as_ref())
            .or_else(|| matches!(settings.ntp_server, Patch::Clear).then(Vec::new)),
        timezone: legacy_patch(
            site,
            "timezone",
            &settings.timezone,
            current.timezone.as_ref(),
            Clone::clone,
        ),
        message_of_theday: legacy_patch(
            site,
            "message_of_the_day",
            &settings.message_of_the_day,
            current.message_of_theday.as_ref(),
            |banner| LegacyBanner {
                banner_message: banner.banner_message.clone().unwrap_or_default(),
                retain_existing_banner: banner.retain_existing_banner,
            },
        ),
        network_aaa: legacy_patch(
            site,
            "network_aaa",
            &settings.network_aaa,
            current.network_aaa.as_ref(),
            legacy_aaa,
        ),
        client_and_endpoint_aaa: legacy_patch(
            site,
            "client_and_endpoint_aaa",
            &settings.client_and_endpoint_aaa,
            current.client_and_endpoint_aaa.as_ref(),
            legacy_aaa,
        ),
    }
}

fn legacy_aaa_key(aaa: Option<&LegacyAaa>) -> Option<(&str, &str, Option<&str>, &str)> {
    aaa.map(|aaa| {
        (
            aaa.servers.as_str(),
            aaa.ip_address.as_str(),
            aaa.network.as_deref(),
            aaa.protocol.as_str(),
        )
    })
}

fn same_list(a: Option<&Vec<String>>, b: Option<&Vec<String>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => same_servers(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// Changed keys between two combined documents. AAA secrets are not
/// compared.
fn legacy_differences(
    have: &LegacyNetworkSettings,
    want: &LegacyNetworkSettings,
) -> Vec<&'static str> {
    let checks = [
        ("dhcpServer", same_list(have.dhcp_server.as_ref(), want.dhcp_server.as_ref())),
        ("dnsServer", have.dns_server == want.dns_server),
        ("syslogServer", have.syslog_server == want.syslog_server),
        ("snmpServer", have.snmp_server == want.snmp_server),
        ("netflowcollector", have.netflow_collector == want.netflow_collector),
        ("ntpServer", same_list(have.ntp_server.as_ref(), want.ntp_server.as_ref())),
        ("timezone", have.timezone == want.timezone),
        ("messageOfTheday", have.message_of_theday == want.message_of_theday),
        (
            "network_aaa",
            legacy_aaa_key(have.network_aaa.as_ref())
                == legacy_aaa_key(want.network_aaa.as_ref()),
        ),
        (
            "clientAndEndpoint_aaa",
            legacy_aaa_key(have.client_and_endpoint_aaa.as_ref())
                == legacy_aaa_key(want.client_and_endpoint_aaa.as_ref()),
        ),
    ];
    checks
        .into_iter()
        .filter(|(_, same)| !same)
        .map(|(name, _)| name)
        .collect()
}

#[async_trait]
impl Family for NetworkServices<'_> {
    type Have = BTreeMap<String, SiteSettings>;
    type Payload = NetworkPayload;
    type Id = SiteId;

    fn group(&self) -> Group {
        Group::NetworkSettings
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    async fn fetch_current(&self, ctx: &Context<'_>) -> Result<Self::Have> {
        let mut have = BTreeMap::new();
        if ctx.deleting() {
            return Ok(have);
        }

        let per_aspect = ctx.api.supports(&methods::GET_DHCP);
        debug!(per_aspect, version = %ctx.api.version(), "network settings endpoints");
        let resolver = SiteResolver::new(ctx.api, ctx.pagination);

        for entry in self.entries {
            let name = Self::site_key(entry);
            let path = SitePath::parse(&name)?;
            let settings = match resolver.site_id(&path).await? {
                None => {
                    warn!(site = %name, "site does not exist");
                    SiteSettings::Missing
                }
                Some(id) if per_aspect => {
                    let state = read_aspects(ctx, &id, &entry.settings).await?;
                    SiteSettings::Aspects { id, state }
                }
                Some(id) => {
                    let entries = ctx.api.get_network_settings(&id).await?;
                    SiteSettings::Legacy {
                        id,
                        current: legacy_settings(&entries),
                    }
                }
            };
            have.insert(name, settings);
        }
        Ok(have)
    }

    async fn plan(&self, ctx: &Context<'_>, have: &Self::Have) -> Result<Plan<Self>> {
        if ctx.deleting() {
            return Ok(self
                .entries
                .iter()
                .map(|entry| {
                    let name = Self::site_key(entry);
                    warn!(site = %name, "network settings cannot be deleted, leaving them");
                    Planned::new(name, Action::NoChange)
                })
                .collect());
        }
        Ok(self
            .entries
            .iter()
            .map(|entry| Self::plan_entry(entry, have))
            .collect())
    }

    async fn execute(
        &self,
        ctx: &Context<'_>,
        name: &str,
        action: Action<NetworkPayload, SiteId>,
    ) -> Result<Outcome> {
        let payload = match action {
            Action::Create(payload) | Action::Update(payload) => payload,
            Action::NoChange => return Ok(Outcome::Unchanged),
            Action::Delete(_) => {
                return Err(Error::Unexpected(format!(
                    "network settings of {name} cannot be deleted"
                )))
            }
            Action::Blocked(error) => return Err(error),
        };

        match payload {
            NetworkPayload::Aspects { site_id, writes } => {
                for write in writes {
                    debug!(site = %name, aspect = write.name(), "writing aspect");
                    match &write {
                        AspectWrite::Dhcp(body) => ctx.api.set_dhcp(&site_id, body).await?,
                        AspectWrite::Dns(body) => ctx.api.set_dns(&site_id, body).await?,
                        AspectWrite::Ntp(body) => ctx.api.set_ntp(&site_id, body).await?,
                        AspectWrite::TimeZone(body) => ctx.api.set_timezone(&site_id, body).await?,
                        AspectWrite::Banner(body) => ctx.api.set_banner(&site_id, body).await?,
                        AspectWrite::Aaa(body) => ctx.api.set_aaa(&site_id, body).await?,
                        AspectWrite::Telemetry(body) => {
                            ctx.api.set_telemetry(&site_id, body).await?;
                        }
                    }
                }
            }
            NetworkPayload::Legacy { site_id, settings } => {
                ctx.api.update_network_settings(&site_id, &settings).await?;
            }
        }
        Ok(Outcome::Updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{AaaProtocol, AaaServerType, CollectorType};
    use pretty_assertions::assert_eq;
    use secrecy::SecretString;
    use serde_json::json;

    fn settings(yaml: &str) -> NetworkSettingsInput {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn only_touched_aspects_are_compared() {
        let input = settings("dhcp_server: [10.0.0.2]\nntp_server: [10.0.0.9]\n");
        let state = AspectState {
            dhcp: Some(DhcpSettings {
                servers: vec!["10.0.0.2".into()],
            }),
            ntp: Some(NtpSettings {
                servers: vec!["10.0.0.8".into()],
            }),
            ..AspectState::default()
        };

        let writes = aspect_writes(&input, &state);
        let names: Vec<_> = writes.iter().map(AspectWrite::name).collect();
        assert_eq!(names, vec!["ntpServer"]);
    }

    #[test]
    fn server_order_does_not_matter() {
        let input = settings("dhcp_server: [10.0.0.3, 10.0.0.2]\n");
        let state = AspectState {
            dhcp: Some(DhcpSettings {
                servers: vec!["10.0.0.2".into(), "10.0.0.3".into()],
            }),
            ..AspectState::default()
        };
        assert!(aspect_writes(&input, &state).is_empty());
    }

    #[test]
    fn null_clears_and_omitted_keeps() {
        let input = settings("timezone: null\n");
        let state = AspectState {
            timezone: Some(TimeZoneSettings {
                identifier: Some("GMT".into()),
            }),
            ..AspectState::default()
        };
        let writes = aspect_writes(&input, &state);
        assert!(matches!(
            writes.as_slice(),
            [AspectWrite::TimeZone(TimeZoneSettings { identifier: None })]
        ));
    }

    #[test]
    fn dns_keeps_unspecified_servers() {
        let current = DnsSettings {
            domain_name: Some("corp.example".into()),
            dns_servers: vec!["10.0.0.53".into(), "10.0.1.53".into()],
        };
        let desired = dns(
            &Patch::Set(DnsInput {
                primary_ip_address: Some("10.0.0.54".into()),
                ..DnsInput::default()
            }),
            &current,
        );
        assert_eq!(desired.domain_name.as_deref(), Some("corp.example"));
        assert_eq!(desired.dns_servers, vec!["10.0.0.54", "10.0.1.53"]);
    }

    #[test]
    fn aaa_secret_alone_is_not_a_change() {
        let aaa_input = AaaInput {
            server_type: AaaServerType::Ise,
            protocol: AaaProtocol::Radius,
            pan_address: Some("10.0.0.5".into()),
            primary_server_address: Some("10.0.0.6".into()),
            secondary_server_address: None,
            shared_secret: Some(SecretString::from("rotated")),
        };
        let input = NetworkSettingsInput {
            network_aaa: Patch::Set(aaa_input.clone()),
            ..NetworkSettingsInput::default()
        };
        let mut current = aaa_server(&aaa_input);
        current.shared_secret = None;
        let state = AspectState {
            aaa: Some(AaaSettings {
                aaa_network: Some(current),
                aaa_client: None,
            }),
            ..AspectState::default()
        };
        assert!(aspect_writes(&input, &state).is_empty());
    }

    #[test]
    fn telemetry_merges_onto_current() {
        let input = settings(
            "netflow_collector:\n  collector_type: TelemetryBrokerOrUDPDirector\n  ip_address: 10.8.8.8\n  port: 2055\n",
        );
        let current = TelemetrySettings {
            snmp_traps: Some(SnmpTraps {
                use_builtin_trap_server: true,
                external_trap_servers: vec![],
            }),
            ..TelemetrySettings::default()
        };
        let desired = telemetry(&input, &current);
        assert_eq!(desired.snmp_traps, current.snmp_traps);
        let collector = desired.application_visibility.unwrap().collector;
        assert_eq!(collector.collector_type, CollectorType::TelemetryBroker.as_str());
        assert_eq!(collector.port, Some(2055));
    }

    fn legacy_entries() -> Vec<NetworkSettingEntry> {
        serde_json::from_value(json!([
            {"key": "dhcp.server", "value": ["10.0.0.2"]},
            {"key": "ntp.server", "value": ["10.0.0.8"]},
            {"key": "timezone.site", "value": ["GMT"]},
            {"key": "dns.server", "value": [{"domainName": "corp.example", "primaryIpAddress": "10.0.0.53"}]},
            {"key": "syslog.server", "value": [{"ipAddresses": [], "configureDnacIP": true}]}
        ]))
        .unwrap()
    }

    #[test]
    fn legacy_document_decodes() {
        let current = legacy_settings(&legacy_entries());
        assert_eq!(current.dhcp_server, Some(vec!["10.0.0.2".to_string()]));
        assert_eq!(current.timezone.as_deref(), Some("GMT"));
        assert_eq!(
            current.dns_server.map(|dns| dns.primary_ip_address),
            Some("10.0.0.53".to_string())
        );
        assert_eq!(current.snmp_server, None);
    }

    #[test]
    fn legacy_merge_changes_only_named_keys() {
        let current = legacy_settings(&legacy_entries());
        let input = settings("ntp_server: [10.0.0.9]\nwired_data_collection: true\n");
        let desired = legacy_desired("Global", &input, &current);

        assert_eq!(legacy_differences(&current, &desired), vec!["ntpServer"]);
        assert_eq!(desired.dhcp_server, current.dhcp_server);
        assert_eq!(desired.ntp_server, Some(vec!["10.0.0.9".to_string()]));
    }

    #[test]
    fn legacy_no_op() {
        let current = legacy_settings(&legacy_entries());
        let input = settings("timezone: GMT\ndhcp_server: [10.0.0.2]\n");
        let desired = legacy_desired("Global", &input, &current);
        assert!(legacy_differences(&current, &desired).is_empty());
    }

    #[test]
    fn missing_site_blocks_the_entry() {
        let entry = NetworkInput {
            site_name: Some("Global/Nowhere".into()),
            settings: NetworkSettingsInput::default(),
        };
        let mut have = BTreeMap::new();
        have.insert("Global/Nowhere".to_string(), SiteSettings::Missing);
        let planned = NetworkServices::plan_entry(&entry, &have);
        assert!(matches!(planned.action, Action::Blocked(Error::NotFound(_))));
    }
}
