//! In-memory controller shared by the integration tests.
//!
//! Keeps just enough state to behave like a real controller across a run:
//! created resources show up in later listings, list endpoints page with
//! 1-based offsets, and methods above the configured release are refused the
//! way the client facade refuses them.

#![allow(dead_code)]

use async_trait::async_trait;
use netconv_client::methods::{self, MethodSpec};
use netconv_client::models::{
    AaaSettings, BannerSettings, DhcpSettings, DnsSettings, GlobalPool, GlobalPoolCreate,
    GlobalPoolUpdate, LegacyNetworkSettings, NetworkSettingEntry, NewRole, NewUser, NtpSettings,
    PoolType, ReservationContext, ReservationSubPool, ReservePoolRequest, Reservation,
    ResourceType, Role, RoleUpdate, Site, SiteDevice, SiteInfo, TelemetrySettings,
    TimeZoneSettings, User, UserUpdate,
};
use netconv_client::Controller;
use netconv_core::ids::{DeviceId, GlobalPoolId, ReservationId, RoleId, SiteId, UserId};
use netconv_core::types::{AddressSpace, GLOBAL_SITE};
use netconv_core::{ControllerVersion, Error, Result};
use netconv_engine::InputDocument;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

/// Release with the per-aspect settings endpoints and role deletion.
pub const CURRENT: &str = "2.3.7.6";
/// Oldest supported release; combined settings document only.
pub const LEGACY: &str = "2.3.5.3";

/// Per-aspect settings of one site.
#[derive(Debug, Clone, Default)]
pub struct Aspects {
    pub dhcp: DhcpSettings,
    pub dns: DnsSettings,
    pub ntp: NtpSettings,
    pub timezone: TimeZoneSettings,
    pub banner: BannerSettings,
    pub aaa: AaaSettings,
    pub telemetry: TelemetrySettings,
}

/// Everything the fake controller holds.
#[derive(Debug, Default)]
pub struct FakeState {
    pub global_pools: Vec<GlobalPool>,
    pub reservations: BTreeMap<SiteId, Vec<Reservation>>,
    pub sites: Vec<Site>,
    pub devices: BTreeMap<SiteId, Vec<SiteDevice>>,
    pub users: Vec<User>,
    pub roles: Vec<Role>,
    pub aspects: BTreeMap<SiteId, Aspects>,
    pub legacy: BTreeMap<SiteId, Vec<NetworkSettingEntry>>,
    /// Reservations that refuse to be released
    pub in_use: BTreeSet<String>,
    /// Reservations the controller refuses to create
    pub refused: BTreeSet<String>,
    /// Every call, by facade method name
    pub calls: Vec<String>,
    /// Global pool batch sizes, in submission order
    pub batches: Vec<usize>,
    /// Reservation requests, in submission order
    pub reserve_requests: Vec<ReservePoolRequest>,
    next_id: u32,
}

impl FakeState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }
}

pub struct FakeController {
    version: ControllerVersion,
    state: Mutex<FakeState>,
}

impl FakeController {
    /// Controller at `version` holding only the `Global` site.
    pub fn new(version: &str) -> Self {
        let fake = Self {
            version: ControllerVersion::parse(version).unwrap(),
            state: Mutex::new(FakeState::default()),
        };
        fake.add_site("site-global", GLOBAL_SITE, None);
        fake
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn add_site(&self, id: &str, hierarchy: &str, kind: Option<&str>) -> SiteId {
        let additional_info = kind
            .map(|kind| SiteInfo {
                name_space: "Location".into(),
                attributes: BTreeMap::from([("type".to_string(), kind.to_string())]),
            })
            .into_iter()
            .collect();
        let site = Site {
            id: SiteId::new(id),
            name: hierarchy.rsplit('/').next().unwrap_or_default().to_string(),
            site_name_hierarchy: hierarchy.to_string(),
            additional_info,
        };
        self.state().sites.push(site);
        SiteId::new(id)
    }

    pub fn add_global_pool(&self, name: &str, cidr: &str) -> GlobalPoolId {
        let mut state = self.state();
        let id = GlobalPoolId::new(state.next_id("gp"));
        state.global_pools.push(GlobalPool {
            id: id.clone(),
            ip_pool_name: name.to_string(),
            ip_pool_cidr: cidr.to_string(),
            gateways: Vec::new(),
            dhcp_server_ips: Vec::new(),
            dns_server_ips: Vec::new(),
            ipv6: cidr.contains(':'),
            ip_pool_type: Some(PoolType::Generic),
        });
        id
    }

    pub fn add_role(&self, id: &str, name: &str, role_type: &str, types: Vec<ResourceType>) {
        self.state().roles.push(Role {
            role_id: RoleId::new(id),
            name: name.to_string(),
            description: None,
            role_type: Some(role_type.to_string()),
            resource_types: types,
        });
    }

    pub fn add_device(&self, site: &SiteId, id: &str, hostname: &str) {
        self.state()
            .devices
            .entry(site.clone())
            .or_default()
            .push(SiteDevice {
                id: DeviceId::new(id),
                hostname: Some(hostname.to_string()),
                management_ip_address: None,
                platform_id: None,
                family: None,
                software_version: None,
                reachability_status: Some("Reachable".into()),
            });
    }

    pub fn mark_in_use(&self, reservation: &str) {
        self.state().in_use.insert(reservation.to_string());
    }

    pub fn refuse_reservation(&self, reservation: &str) {
        self.state().refused.insert(reservation.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.state().calls.iter().filter(|call| *call == method).count()
    }

    /// Calls that change controller state.
    pub fn writes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| !(call.starts_with("get_") || call.starts_with("list_")))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn reservation(&self, site: &SiteId, name: &str) -> Option<Reservation> {
        self.state()
            .reservations
            .get(site)
            .and_then(|pools| pools.iter().find(|pool| pool.group_name == name).cloned())
    }

    pub fn aspects(&self, site: &SiteId) -> Aspects {
        self.state().aspects.get(site).cloned().unwrap_or_default()
    }

    fn enter(&self, method: &MethodSpec) -> Result<MutexGuard<'_, FakeState>> {
        if !self.supports(method) {
            return Err(Error::UnsupportedVersion {
                method: method.name.to_string(),
                required: method.min_version.to_string(),
                actual: self.version.to_string(),
            });
        }
        let mut state = self.state();
        state.calls.push(method.name.to_string());
        Ok(state)
    }
}

pub fn doc(yaml: &str) -> InputDocument {
    InputDocument::from_yaml(yaml).unwrap()
}

fn page<T: Clone>(items: &[T], offset: u32, limit: u32) -> Vec<T> {
    items
        .iter()
        .skip(offset.saturating_sub(1) as usize)
        .take(limit as usize)
        .cloned()
        .collect()
}

fn host_count(prefix_length: Option<u8>, total_host: Option<u64>, bits: u32) -> Option<u64> {
    total_host.or_else(|| {
        prefix_length
            .filter(|len| u32::from(*len) <= bits && bits - u32::from(*len) < 64)
            .map(|len| 1_u64 << (bits - u32::from(len)))
    })
}

fn sub_pool(
    name: &str,
    ipv6: bool,
    subnet: Option<&str>,
    prefix_length: Option<u8>,
    total_host: Option<u64>,
    gateway: Option<&String>,
) -> ReservationSubPool {
    let bits = if ipv6 { 128 } else { 32 };
    ReservationSubPool {
        ip_pool_name: name.to_string(),
        ip_pool_cidr: match (subnet, prefix_length) {
            (Some(subnet), Some(len)) => format!("{subnet}/{len}"),
            _ => String::new(),
        },
        ipv6,
        gateways: gateway.filter(|gw| !gw.is_empty()).cloned().into_iter().collect(),
        total_ip_address_count: host_count(prefix_length, total_host, bits),
        ..ReservationSubPool::default()
    }
}

fn apply_servers(pool: &mut ReservationSubPool, dhcp: Option<&Vec<String>>, dns: Option<&Vec<String>>) {
    if let Some(dhcp) = dhcp {
        pool.dhcp_server_ips.clone_from(dhcp);
    }
    if let Some(dns) = dns {
        pool.dns_server_ips.clone_from(dns);
    }
}

fn set_slaac(pool: &mut ReservationSubPool, slaac: Option<bool>) {
    if let Some(slaac) = slaac {
        pool.context.retain(|entry| entry.context_key != "slaacSupport");
        pool.context.push(ReservationContext {
            context_key: "slaacSupport".into(),
            context_value: slaac.to_string(),
        });
    }
}

fn entry<T: serde::Serialize>(key: &str, value: &T) -> NetworkSettingEntry {
    let value = match serde_json::to_value(value).unwrap_or(Value::Null) {
        Value::Array(items) => items,
        single => vec![single],
    };
    NetworkSettingEntry {
        key: key.to_string(),
        value,
        inherited_group_uuid: None,
    }
}

fn legacy_entries(settings: &LegacyNetworkSettings) -> Vec<NetworkSettingEntry> {
    use netconv_engine::network::keys;

    let mut entries = Vec::new();
    if let Some(value) = &settings.dhcp_server {
        entries.push(entry(keys::DHCP, value));
    }
    if let Some(value) = &settings.dns_server {
        entries.push(entry(keys::DNS, value));
    }
    if let Some(value) = &settings.ntp_server {
        entries.push(entry(keys::NTP, value));
    }
    if let Some(value) = &settings.timezone {
        entries.push(entry(keys::TIMEZONE, value));
    }
    if let Some(value) = &settings.message_of_theday {
        entries.push(entry(keys::BANNER, value));
    }
    if let Some(value) = &settings.syslog_server {
        entries.push(entry(keys::SYSLOG, value));
    }
    if let Some(value) = &settings.snmp_server {
        entries.push(entry(keys::SNMP, value));
    }
    if let Some(value) = &settings.netflow_collector {
        entries.push(entry(keys::NETFLOW, value));
    }
    let mut secretless = |key: &str, aaa: &Option<netconv_client::models::LegacyAaa>| {
        if let Some(aaa) = aaa {
            let mut aaa = aaa.clone();
            aaa.shared_secret = None;
            entries.push(entry(key, &aaa));
        }
    };
    secretless(keys::NETWORK_AAA, &settings.network_aaa);
    secretless(keys::CLIENT_AAA, &settings.client_and_endpoint_aaa);
    entries
}

/// Overlay the keys a legacy write carries onto the stored document.
fn merge_legacy(stored: &mut Vec<NetworkSettingEntry>, written: Vec<NetworkSettingEntry>) {
    for entry in written {
        stored.retain(|existing| existing.key != entry.key);
        stored.push(entry);
    }
}

#[async_trait]
impl Controller for FakeController {
    fn version(&self) -> &ControllerVersion {
        &self.version
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.enter(&methods::LIST_USERS)?.users.clone())
    }

    async fn list_roles(&self) -> Result<Vec<Role>> {
        Ok(self.enter(&methods::LIST_ROLES)?.roles.clone())
    }

    async fn add_user(&self, user: &NewUser) -> Result<()> {
        let mut state = self.enter(&methods::ADD_USER)?;
        if state.users.iter().any(|u| u.username == user.username) {
            return Err(Error::Conflict(format!("user {} exists", user.username)));
        }
        let id = UserId::new(state.next_id("user"));
        state.users.push(User {
            user_id: id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            role_list: user.role_list.clone(),
            auth_source: Some("internal".into()),
        });
        Ok(())
    }

    async fn update_user(&self, update: &UserUpdate) -> Result<()> {
        let mut state = self.enter(&methods::UPDATE_USER)?;
        let user = state
            .users
            .iter_mut()
            .find(|user| user.user_id == update.user_id)
            .ok_or_else(|| Error::NotFound(format!("user {}", update.user_id)))?;
        if update.first_name.is_some() {
            user.first_name.clone_from(&update.first_name);
        }
        if update.last_name.is_some() {
            user.last_name.clone_from(&update.last_name);
        }
        if update.email.is_some() {
            user.email.clone_from(&update.email);
        }
        user.role_list.clone_from(&update.role_list);
        Ok(())
    }

    async fn delete_user(&self, id: &UserId) -> Result<()> {
        let mut state = self.enter(&methods::DELETE_USER)?;
        let before = state.users.len();
        state.users.retain(|user| &user.user_id != id);
        if state.users.len() == before {
            return Err(Error::NotFound(format!("user {id}")));
        }
        Ok(())
    }

    async fn add_role(&self, role: &NewRole) -> Result<()> {
        let mut state = self.enter(&methods::ADD_ROLE)?;
        let id = RoleId::new(state.next_id("role"));
        state.roles.push(Role {
            role_id: id,
            name: role.role.clone(),
            description: Some(role.description.clone()),
            role_type: Some("custom".into()),
            resource_types: role.resource_types.clone(),
        });
        Ok(())
    }

    async fn update_role(&self, update: &RoleUpdate) -> Result<()> {
        let mut state = self.enter(&methods::UPDATE_ROLE)?;
        let role = state
            .roles
            .iter_mut()
            .find(|role| role.role_id == update.id)
            .ok_or_else(|| Error::NotFound(format!("role {}", update.id)))?;
        role.description = Some(update.description.clone());
        role.resource_types.clone_from(&update.resource_types);
        Ok(())
    }

    async fn delete_role(&self, id: &RoleId) -> Result<()> {
        let mut state = self.enter(&methods::DELETE_ROLE)?;
        let before = state.roles.len();
        state.roles.retain(|role| &role.role_id != id);
        if state.roles.len() == before {
            return Err(Error::NotFound(format!("role {id}")));
        }
        Ok(())
    }

    async fn list_global_pools(&self, offset: u32, limit: u32) -> Result<Vec<GlobalPool>> {
        let state = self.enter(&methods::LIST_GLOBAL_POOLS)?;
        Ok(page(&state.global_pools, offset, limit))
    }

    async fn create_global_pool(&self, pools: &[GlobalPoolCreate]) -> Result<()> {
        let mut state = self.enter(&methods::CREATE_GLOBAL_POOL)?;
        state.batches.push(pools.len());
        for pool in pools {
            if state.global_pools.iter().any(|p| p.ip_pool_name == pool.ip_pool_name) {
                return Err(Error::Conflict(format!("{} exists", pool.ip_pool_name)));
            }
            let id = GlobalPoolId::new(state.next_id("gp"));
            state.global_pools.push(GlobalPool {
                id,
                ip_pool_name: pool.ip_pool_name.clone(),
                ip_pool_cidr: pool.ip_pool_cidr.clone(),
                gateways: pool.gateway.clone().into_iter().collect(),
                dhcp_server_ips: pool.dhcp_server_ips.clone(),
                dns_server_ips: pool.dns_server_ips.clone(),
                ipv6: pool.ip_address_space == AddressSpace::V6,
                ip_pool_type: Some(pool.pool_type),
            });
        }
        Ok(())
    }

    async fn update_global_pool(&self, pools: &[GlobalPoolUpdate]) -> Result<()> {
        let mut state = self.enter(&methods::UPDATE_GLOBAL_POOL)?;
        for update in pools {
            let pool = state
                .global_pools
                .iter_mut()
                .find(|pool| pool.id == update.id)
                .ok_or_else(|| Error::NotFound(format!("global pool {}", update.id)))?;
            pool.ip_pool_name.clone_from(&update.ip_pool_name);
            pool.gateways = update.gateway.clone().into_iter().collect();
            pool.dhcp_server_ips.clone_from(&update.dhcp_server_ips);
            pool.dns_server_ips.clone_from(&update.dns_server_ips);
        }
        Ok(())
    }

    async fn delete_global_pool(&self, id: &GlobalPoolId) -> Result<()> {
        let mut state = self.enter(&methods::DELETE_GLOBAL_POOL)?;
        let before = state.global_pools.len();
        state.global_pools.retain(|pool| &pool.id != id);
        if state.global_pools.len() == before {
            return Err(Error::NotFound(format!("global pool {id}")));
        }
        Ok(())
    }

    async fn list_reserved_pools(
        &self,
        site_id: &SiteId,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<Reservation>> {
        let state = self.enter(&methods::LIST_RESERVED_POOLS)?;
        Ok(state
            .reservations
            .get(site_id)
            .map(|pools| page(pools, offset, limit))
            .unwrap_or_default())
    }

    async fn reserve_pool(&self, site_id: &SiteId, request: &ReservePoolRequest) -> Result<()> {
        let mut state = self.enter(&methods::RESERVE_POOL)?;
        let taken = state
            .reservations
            .get(site_id)
            .is_some_and(|pools| pools.iter().any(|pool| pool.group_name == request.name));
        if taken {
            return Err(Error::Conflict(format!("{} exists", request.name)));
        }
        if state.refused.contains(&request.name) {
            return Err(Error::Conflict(format!("{} overlaps another range", request.name)));
        }
        state.reserve_requests.push(request.clone());

        let mut v4 = sub_pool(
            &request.name,
            false,
            request.ipv4_subnet.as_deref(),
            request.ipv4_prefix_length,
            request.ipv4_total_host,
            request.ipv4_gateway.as_ref(),
        );
        apply_servers(
            &mut v4,
            request.ipv4_dhcp_servers.as_ref(),
            request.ipv4_dns_servers.as_ref(),
        );
        let mut ip_pools = vec![v4];
        if request.ipv6_address_space {
            let mut v6 = sub_pool(
                &request.name,
                true,
                request.ipv6_subnet.as_deref(),
                request.ipv6_prefix_length,
                request.ipv6_total_host,
                request.ipv6_gateway.as_ref(),
            );
            apply_servers(
                &mut v6,
                request.ipv6_dhcp_servers.as_ref(),
                request.ipv6_dns_servers.as_ref(),
            );
            set_slaac(&mut v6, Some(request.slaac_support.unwrap_or(true)));
            // The controller lists the v6 half first.
            ip_pools.insert(0, v6);
        }

        let id = ReservationId::new(state.next_id("rp"));
        state
            .reservations
            .entry(site_id.clone())
            .or_default()
            .push(Reservation {
                id,
                group_name: request.name.clone(),
                site_id: Some(site_id.clone()),
                site_hierarchy: None,
                pool_type: request.pool_type.clone(),
                ip_pools,
            });
        Ok(())
    }

    async fn update_reserved_pool(
        &self,
        site_id: &SiteId,
        id: &ReservationId,
        request: &ReservePoolRequest,
    ) -> Result<()> {
        let mut state = self.enter(&methods::UPDATE_RESERVED_POOL)?;
        let reservation = state
            .reservations
            .get_mut(site_id)
            .and_then(|pools| pools.iter_mut().find(|pool| &pool.id == id))
            .ok_or_else(|| Error::NotFound(format!("reservation {id}")))?;

        reservation.group_name.clone_from(&request.name);
        if request.ipv6_address_space && reservation.v6().is_none() {
            reservation.ip_pools.push(sub_pool(
                &request.name,
                true,
                request.ipv6_subnet.as_deref(),
                request.ipv6_prefix_length,
                request.ipv6_total_host,
                None,
            ));
        }
        for pool in &mut reservation.ip_pools {
            pool.ip_pool_name.clone_from(&request.name);
            let (gateway, dhcp, dns) = if pool.ipv6 {
                (
                    request.ipv6_gateway.as_ref(),
                    request.ipv6_dhcp_servers.as_ref(),
                    request.ipv6_dns_servers.as_ref(),
                )
            } else {
                (
                    request.ipv4_gateway.as_ref(),
                    request.ipv4_dhcp_servers.as_ref(),
                    request.ipv4_dns_servers.as_ref(),
                )
            };
            pool.gateways = gateway.filter(|gw| !gw.is_empty()).cloned().into_iter().collect();
            apply_servers(pool, dhcp, dns);
            if pool.ipv6 {
                set_slaac(pool, request.slaac_support);
            }
        }
        Ok(())
    }

    async fn release_reserved_pool(&self, id: &ReservationId) -> Result<()> {
        let mut state = self.enter(&methods::RELEASE_RESERVED_POOL)?;
        let name = state
            .reservations
            .values()
            .flatten()
            .find(|pool| &pool.id == id)
            .map(|pool| pool.group_name.clone())
            .ok_or_else(|| Error::NotFound(format!("reservation {id}")))?;
        if state.in_use.contains(&name) {
            return Err(Error::Conflict(format!("{name} has addresses in use")));
        }
        for pools in state.reservations.values_mut() {
            pools.retain(|pool| &pool.id != id);
        }
        Ok(())
    }

    async fn get_site(&self, path: &str) -> Result<Vec<Site>> {
        let state = self.enter(&methods::GET_SITE)?;
        let sites = match path.strip_suffix("/.*") {
            Some(base) => {
                let prefix = format!("{base}/");
                state
                    .sites
                    .iter()
                    .filter(|site| site.site_name_hierarchy.starts_with(&prefix))
                    .cloned()
                    .collect()
            }
            None => state
                .sites
                .iter()
                .filter(|site| site.site_name_hierarchy == path)
                .cloned()
                .collect(),
        };
        Ok(sites)
    }

    async fn list_devices_at_site(
        &self,
        site_id: &SiteId,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<SiteDevice>> {
        let state = self.enter(&methods::LIST_DEVICES_AT_SITE)?;
        Ok(state
            .devices
            .get(site_id)
            .map(|devices| page(devices, offset, limit))
            .unwrap_or_default())
    }

    async fn get_dhcp(&self, site_id: &SiteId) -> Result<DhcpSettings> {
        let state = self.enter(&methods::GET_DHCP)?;
        Ok(state.aspects.get(site_id).cloned().unwrap_or_default().dhcp)
    }

    async fn set_dhcp(&self, site_id: &SiteId, settings: &DhcpSettings) -> Result<()> {
        let mut state = self.enter(&methods::SET_DHCP)?;
        state.aspects.entry(site_id.clone()).or_default().dhcp = settings.clone();
        Ok(())
    }

    async fn get_dns(&self, site_id: &SiteId) -> Result<DnsSettings> {
        let state = self.enter(&methods::GET_DNS)?;
        Ok(state.aspects.get(site_id).cloned().unwrap_or_default().dns)
    }

    async fn set_dns(&self, site_id: &SiteId, settings: &DnsSettings) -> Result<()> {
        let mut state = self.enter(&methods::SET_DNS)?;
        state.aspects.entry(site_id.clone()).or_default().dns = settings.clone();
        Ok(())
    }

    async fn get_ntp(&self, site_id: &SiteId) -> Result<NtpSettings> {
        let state = self.enter(&methods::GET_NTP)?;
        Ok(state.aspects.get(site_id).cloned().unwrap_or_default().ntp)
    }

    async fn set_ntp(&self, site_id: &SiteId, settings: &NtpSettings) -> Result<()> {
        let mut state = self.enter(&methods::SET_NTP)?;
        state.aspects.entry(site_id.clone()).or_default().ntp = settings.clone();
        Ok(())
    }

    async fn get_timezone(&self, site_id: &SiteId) -> Result<TimeZoneSettings> {
        let state = self.enter(&methods::GET_TIMEZONE)?;
        Ok(state.aspects.get(site_id).cloned().unwrap_or_default().timezone)
    }

    async fn set_timezone(&self, site_id: &SiteId, settings: &TimeZoneSettings) -> Result<()> {
        let mut state = self.enter(&methods::SET_TIMEZONE)?;
        state.aspects.entry(site_id.clone()).or_default().timezone = settings.clone();
        Ok(())
    }

    async fn get_banner(&self, site_id: &SiteId) -> Result<BannerSettings> {
        let state = self.enter(&methods::GET_BANNER)?;
        Ok(state.aspects.get(site_id).cloned().unwrap_or_default().banner)
    }

    async fn set_banner(&self, site_id: &SiteId, settings: &BannerSettings) -> Result<()> {
        let mut state = self.enter(&methods::SET_BANNER)?;
        state.aspects.entry(site_id.clone()).or_default().banner = settings.clone();
        Ok(())
    }

    async fn get_aaa(&self, site_id: &SiteId) -> Result<AaaSettings> {
        let state = self.enter(&methods::GET_AAA)?;
        let mut aaa = state.aspects.get(site_id).cloned().unwrap_or_default().aaa;
        for server in [aaa.aaa_network.as_mut(), aaa.aaa_client.as_mut()]
            .into_iter()
            .flatten()
        {
            server.shared_secret = None;
        }
        Ok(aaa)
    }

    async fn set_aaa(&self, site_id: &SiteId, settings: &AaaSettings) -> Result<()> {
        let mut state = self.enter(&methods::SET_AAA)?;
        state.aspects.entry(site_id.clone()).or_default().aaa = settings.clone();
        Ok(())
    }

    async fn get_telemetry(&self, site_id: &SiteId) -> Result<TelemetrySettings> {
        let state = self.enter(&methods::GET_TELEMETRY)?;
        Ok(state.aspects.get(site_id).cloned().unwrap_or_default().telemetry)
    }

    async fn set_telemetry(&self, site_id: &SiteId, settings: &TelemetrySettings) -> Result<()> {
        let mut state = self.enter(&methods::SET_TELEMETRY)?;
        state.aspects.entry(site_id.clone()).or_default().telemetry = settings.clone();
        Ok(())
    }

    async fn get_network_settings(&self, site_id: &SiteId) -> Result<Vec<NetworkSettingEntry>> {
        let state = self.enter(&methods::GET_NETWORK_SETTINGS)?;
        Ok(state.legacy.get(site_id).cloned().unwrap_or_default())
    }

    async fn update_network_settings(
        &self,
        site_id: &SiteId,
        settings: &LegacyNetworkSettings,
    ) -> Result<()> {
        let mut state = self.enter(&methods::UPDATE_NETWORK_SETTINGS)?;
        let written = legacy_entries(settings);
        merge_legacy(state.legacy.entry(site_id.clone()).or_default(), written);
        Ok(())
    }
}
