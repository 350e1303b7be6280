//! Reserved sub-pool reconciliation.
//!
//! The controller returns a reservation as one or two sub-pools in no fixed
//! order. Both sides are normalized into [`ReservedRecord`], with explicit
//! v4 and v6 fields, before comparing.

use crate::diff::{differences, Action, Field, FieldValue, Planned};
use crate::family::{carry_out, record, Context, Family, Plan};
use crate::input::{ReservedPoolInput, ReservedPoolType};
use crate::report::{Group, GroupSummary, Outcome};
use crate::site::SiteResolver;
use async_trait::async_trait;
use netconv_client::models::{GlobalPool, ReservePoolRequest, Reservation};
use netconv_client::pagination::{drain, find_first};
use netconv_core::ids::{ReservationId, SiteId};
use netconv_core::types::SitePath;
use netconv_core::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Normalized reservation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservedRecord {
    /// Reservation name
    pub name: Option<String>,
    /// Usage type
    pub pool_type: Option<String>,
    /// Carries a v6 half
    pub ipv6_address_space: Option<bool>,
    /// v4 gateway; empty when unset
    pub ipv4_gateway: Option<String>,
    /// v4 DHCP servers
    pub ipv4_dhcp_servers: Option<Vec<String>>,
    /// v4 DNS servers
    pub ipv4_dns_servers: Option<Vec<String>>,
    /// v6 gateway; empty when unset
    pub ipv6_gateway: Option<String>,
    /// v6 DHCP servers
    pub ipv6_dhcp_servers: Option<Vec<String>>,
    /// v6 DNS servers
    pub ipv6_dns_servers: Option<Vec<String>>,
    /// v4 host count
    pub ipv4_total_host: Option<u64>,
    /// SLAAC on the v6 half
    pub slaac_support: Option<bool>,
}

impl From<&Reservation> for ReservedRecord {
    fn from(reservation: &Reservation) -> Self {
        let v4 = reservation.v4();
        let v6 = reservation.v6();
        Self {
            name: Some(reservation.group_name.clone()),
            pool_type: reservation.pool_type.clone(),
            ipv6_address_space: Some(v6.is_some()),
            ipv4_gateway: Some(v4.map_or("", |pool| pool.gateway()).to_string()),
            ipv4_dhcp_servers: v4.map(|pool| pool.dhcp_server_ips.clone()),
            ipv4_dns_servers: v4.map(|pool| pool.dns_server_ips.clone()),
            ipv6_gateway: Some(v6.map_or("", |pool| pool.gateway()).to_string()),
            ipv6_dhcp_servers: v6.map(|pool| pool.dhcp_server_ips.clone()),
            ipv6_dns_servers: v6.map(|pool| pool.dns_server_ips.clone()),
            ipv4_total_host: v4.and_then(|pool| pool.total_ip_address_count),
            slaac_support: v6.map(|pool| pool.slaac_support()),
        }
    }
}

impl From<&ReservedPoolInput> for ReservedRecord {
    fn from(input: &ReservedPoolInput) -> Self {
        Self {
            name: input.name.clone(),
            pool_type: input.pool_type.map(|kind| kind.as_str().to_string()),
            ipv6_address_space: input.ipv6_address_space,
            ipv4_gateway: input.ipv4_gateway.clone(),
            ipv4_dhcp_servers: input.ipv4_dhcp_servers.clone(),
            ipv4_dns_servers: input.ipv4_dns_servers.clone(),
            ipv6_gateway: input.ipv6_gateway.clone(),
            ipv6_dhcp_servers: input.ipv6_dhcp_servers.clone(),
            ipv6_dns_servers: input.ipv6_dns_servers.clone(),
            ipv4_total_host: input.ipv4_total_host,
            slaac_support: input.slaac_support,
        }
    }
}

type F = Field<ReservedRecord>;

/// Fields that decide whether a reservation needs an update.
pub const COMPARISON: &[F] = &[
    F::new("name", |r| FieldValue::text(r.name.as_deref())),
    F::new("type", |r| FieldValue::text(r.pool_type.as_deref())),
    F::new("ipv6AddressSpace", |r| FieldValue::flag(r.ipv6_address_space)),
    F::new("ipv4GateWay", |r| FieldValue::text(r.ipv4_gateway.as_deref())),
    F::new("ipv4DhcpServers", |r| FieldValue::set(r.ipv4_dhcp_servers.as_deref())),
    F::new("ipv4DnsServers", |r| FieldValue::set(r.ipv4_dns_servers.as_deref())),
    F::new("ipv6GateWay", |r| FieldValue::text(r.ipv6_gateway.as_deref())),
    F::new("ipv6DhcpServers", |r| FieldValue::set(r.ipv6_dhcp_servers.as_deref())),
    F::new("ipv6DnsServers", |r| FieldValue::set(r.ipv6_dns_servers.as_deref())),
    F::new("ipv4TotalHost", |r| FieldValue::number(r.ipv4_total_host)),
    F::new("slaacSupport", |r| FieldValue::flag(r.slaac_support)),
];

/// Reservations at one site.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteReservations {
    /// Site identifier, `None` when the site does not exist
    pub id: Option<SiteId>,
    /// Reservations carved at the site
    pub pools: Vec<Reservation>,
}

/// Create or update body with its target.
#[derive(Debug, Clone, PartialEq)]
pub struct ReservedPayload {
    /// Owning site
    pub site_id: SiteId,
    /// Existing reservation, for updates
    pub id: Option<ReservationId>,
    /// Request body
    pub request: ReservePoolRequest,
}

/// The reserved pool family.
#[derive(Debug)]
pub struct ReservedPools<'a> {
    entries: &'a [ReservedPoolInput],
    parents: Mutex<BTreeMap<String, String>>,
}

impl<'a> ReservedPools<'a> {
    /// Family over the input entries.
    #[must_use]
    pub fn new(entries: &'a [ReservedPoolInput]) -> Self {
        Self {
            entries,
            parents: Mutex::new(BTreeMap::new()),
        }
    }

    fn site_key(entry: &ReservedPoolInput) -> String {
        entry.site_name.clone().unwrap_or_default()
    }

    /// CIDR of a parent global pool given by CIDR or by name.
    ///
    /// Names are looked up page by page, stopping at the first match, and
    /// remembered for the rest of the run.
    async fn parent(
        &self,
        ctx: &Context<'_>,
        cidr: Option<&str>,
        name: Option<&str>,
        path: String,
    ) -> Result<Option<String>> {
        if let Some(cidr) = cidr {
            return Ok(Some(cidr.to_string()));
        }
        let Some(name) = name else {
            return Ok(None);
        };
        let cached = self
            .parents
            .lock()
            .ok()
            .and_then(|parents| parents.get(name).cloned());
        if let Some(cidr) = cached {
            return Ok(Some(cidr));
        }

        let found: Option<GlobalPool> = find_first(
            ctx.pagination,
            |offset, limit| ctx.api.list_global_pools(offset, limit),
            |pool: &GlobalPool| pool.ip_pool_name == name,
        )
        .await?;
        let pool = found
            .ok_or_else(|| Error::input(path, format!("global pool `{name}` does not exist")))?;

        debug!(pool = %name, cidr = %pool.ip_pool_cidr, "parent pool resolved");
        if let Ok(mut parents) = self.parents.lock() {
            parents.insert(name.to_string(), pool.ip_pool_cidr.clone());
        }
        Ok(Some(pool.ip_pool_cidr))
    }

    /// Full request for a new reservation.
    async fn create_request(
        &self,
        ctx: &Context<'_>,
        path: &str,
        entry: &ReservedPoolInput,
    ) -> Result<ReservePoolRequest> {
        let v4_parent = self
            .parent(
                ctx,
                entry.ipv4_global_pool.as_deref(),
                entry.ipv4_global_pool_name.as_deref(),
                format!("{path}.ipv4_global_pool_name"),
            )
            .await?
            .ok_or_else(|| {
                Error::input(
                    format!("{path}.ipv4_global_pool"),
                    "a parent v4 global pool is required to create a reservation",
                )
            })?;
        range(path, "ipv4", entry.ipv4_prefix_length, entry.ipv4_total_host)?;

        let with_v6 = entry.ipv6_address_space.unwrap_or(false);
        let v6_parent = if with_v6 {
            range(path, "ipv6", entry.ipv6_prefix_length, entry.ipv6_total_host)?;
            Some(self.v6_parent(ctx, path, entry).await?)
        } else {
            None
        };

        Ok(request(entry, Some(v4_parent), v6_parent))
    }

    async fn v6_parent(
        &self,
        ctx: &Context<'_>,
        path: &str,
        entry: &ReservedPoolInput,
    ) -> Result<String> {
        self.parent(
            ctx,
            entry.ipv6_global_pool.as_deref(),
            entry.ipv6_global_pool_name.as_deref(),
            format!("{path}.ipv6_global_pool_name"),
        )
        .await?
        .ok_or_else(|| {
            Error::input(
                format!("{path}.ipv6_global_pool"),
                "a parent v6 global pool is required for the IPv6 half",
            )
        })
    }

    async fn plan_merge(
        &self,
        ctx: &Context<'_>,
        index: usize,
        entry: &ReservedPoolInput,
        have: &BTreeMap<String, SiteReservations>,
    ) -> Result<Planned<ReservedPayload, ReservationId>> {
        let path = format!("reserve_pool_details[{index}]");
        let name = entry.name.clone().unwrap_or_default();
        let site_key = Self::site_key(entry);
        let Some((site_id, pools)) = have
            .get(&site_key)
            .and_then(|site| site.id.clone().map(|id| (id, &site.pools)))
        else {
            return Ok(Planned::new(
                name,
                Action::Blocked(Error::NotFound(format!("site {site_key}"))),
            ));
        };

        let existing = find(pools, &name).or_else(|| {
            entry
                .prev_name
                .as_deref()
                .and_then(|prev| find(pools, prev))
        });

        let Some(current) = existing else {
            let request = self.create_request(ctx, &path, entry).await?;
            let payload = ReservedPayload {
                site_id,
                id: None,
                request,
            };
            return Ok(Planned::new(name, Action::Create(payload)));
        };

        fixed(&path, entry, current)?;
        let have_record = ReservedRecord::from(current);
        let want_record = ReservedRecord::from(entry);
        let changed = differences(&have_record, &want_record, COMPARISON);
        if changed.is_empty() {
            return Ok(Planned::new(name, Action::NoChange));
        }

        let adding_v6 = entry.ipv6_address_space == Some(true) && current.v6().is_none();
        let v6_parent = if adding_v6 {
            range(&path, "ipv6", entry.ipv6_prefix_length, entry.ipv6_total_host)?;
            Some(self.v6_parent(ctx, &path, entry).await?)
        } else {
            None
        };
        let mut update = request(entry, None, v6_parent);
        fill_unspecified(&mut update, &have_record);
        debug!(pool = %name, site = %site_key, ?changed, "reservation differs");

        let payload = ReservedPayload {
            site_id,
            id: Some(current.id.clone()),
            request: update.into_update(adding_v6),
        };
        Ok(Planned::new(name, Action::Update(payload)).with_changed_fields(changed))
    }

    fn plan_delete(&self, have: &BTreeMap<String, SiteReservations>) -> Plan<Self> {
        let mut plan = Vec::new();
        let mut planned_ids = BTreeSet::new();

        for entry in self.entries {
            let site_key = Self::site_key(entry);
            let pools = have.get(&site_key).map_or(&[][..], |site| site.pools.as_slice());

            match entry.name.as_deref().filter(|name| !name.is_empty()) {
                Some(name) => match find(pools, name) {
                    Some(pool) if planned_ids.insert(pool.id.clone()) => {
                        plan.push(Planned::new(name, Action::Delete(pool.id.clone())));
                    }
                    Some(_) => {}
                    None => plan.push(Planned::not_found(name)),
                },
                None => {
                    info!(site = %site_key, count = pools.len(), "sweeping every reservation");
                    for pool in pools {
                        if planned_ids.insert(pool.id.clone()) {
                            plan.push(Planned::new(
                                pool.group_name.clone(),
                                Action::Delete(pool.id.clone()),
                            ));
                        }
                    }
                }
            }
        }
        plan
    }

    /// Reserves one chunk in order. The first refusal fails that pool and
    /// every pool after it in the chunk, which is left unsubmitted.
    async fn submit_batch(
        ctx: &Context<'_>,
        batch: &mut Vec<(String, ReservedPayload)>,
        summary: &mut GroupSummary,
    ) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        debug!(count = batch.len(), "submitting reservation batch");

        let mut pending = batch.drain(..);
        while let Some((name, payload)) = pending.next() {
            match ctx.api.reserve_pool(&payload.site_id, &payload.request).await {
                Ok(()) => record(summary, name, Outcome::Created),
                Err(error) if error.is_fatal() => return Err(error),
                Err(error) => {
                    warn!(pool = %name, %error, "reservation batch refused");
                    record(summary, name, Outcome::Failed(error.clone()));
                    for (name, _) in pending.by_ref() {
                        record(summary, name, Outcome::Failed(error.clone()));
                    }
                }
            }
        }
        Ok(())
    }
}

fn find<'p>(pools: &'p [Reservation], name: &str) -> Option<&'p Reservation> {
    pools.iter().find(|pool| pool.group_name == name)
}

/// A new range needs either a prefix length or a host count.
fn range(
    path: &str,
    space: &str,
    prefix_length: Option<u8>,
    total_host: Option<u64>,
) -> Result<()> {
    if prefix_length.is_none() && total_host.is_none() {
        return Err(Error::input(
            format!("{path}.{space}_prefix_length"),
            format!("{space}_prefix_length or {space}_total_host is required"),
        ));
    }
    Ok(())
}

/// Type, v4 range size and an existing v6 half cannot change after creation.
fn fixed(path: &str, entry: &ReservedPoolInput, current: &Reservation) -> Result<()> {
    if let Some(kind) = entry.pool_type {
        if current.pool_type.as_deref() != Some(kind.as_str()) {
            return Err(Error::input(
                format!("{path}.pool_type"),
                format!(
                    "reservation `{}` is {}; its type cannot change",
                    current.group_name,
                    current.pool_type.as_deref().unwrap_or("untyped")
                ),
            ));
        }
    }
    if let Some(hosts) = entry.ipv4_total_host {
        let existing = current.v4().and_then(|pool| pool.total_ip_address_count);
        if existing != Some(hosts) {
            let held = existing.map_or_else(|| "an unknown number of".into(), |n| n.to_string());
            return Err(Error::input(
                format!("{path}.ipv4_total_host"),
                format!(
                    "reservation `{}` holds {held} v4 addresses; its range cannot change",
                    current.group_name
                ),
            ));
        }
    }
    if entry.ipv6_address_space == Some(false) && current.v6().is_some() {
        return Err(Error::input(
            format!("{path}.ipv6_address_space"),
            format!(
                "reservation `{}` has an IPv6 half, which cannot be removed",
                current.group_name
            ),
        ));
    }
    Ok(())
}

fn request(
    entry: &ReservedPoolInput,
    v4_parent: Option<String>,
    v6_parent: Option<String>,
) -> ReservePoolRequest {
    let with_v6 = v6_parent.is_some();
    let mut request = ReservePoolRequest {
        name: entry.name.clone().unwrap_or_default(),
        pool_type: Some(
            entry
                .pool_type
                .unwrap_or(ReservedPoolType::Generic)
                .as_str()
                .to_string(),
        ),
        ipv6_address_space: entry.ipv6_address_space.unwrap_or(false),
        ipv4_global_pool: v4_parent,
        ipv4_prefix: Some(
            entry
                .ipv4_prefix
                .unwrap_or(entry.ipv4_prefix_length.is_some()),
        ),
        ipv4_prefix_length: entry.ipv4_prefix_length,
        ipv4_subnet: entry.ipv4_subnet.clone(),
        ipv4_total_host: entry.ipv4_total_host,
        ipv4_gateway: entry.ipv4_gateway.clone(),
        ipv4_dhcp_servers: entry.ipv4_dhcp_servers.clone(),
        ipv4_dns_servers: entry.ipv4_dns_servers.clone(),
        ipv6_gateway: entry.ipv6_gateway.clone(),
        ipv6_dhcp_servers: entry.ipv6_dhcp_servers.clone(),
        ipv6_dns_servers: entry.ipv6_dns_servers.clone(),
        slaac_support: entry.slaac_support,
        ..ReservePoolRequest::default()
    };
    if with_v6 {
        request.ipv6_global_pool = v6_parent;
        request.ipv6_prefix = Some(
            entry
                .ipv6_prefix
                .unwrap_or(entry.ipv6_prefix_length.is_some()),
        );
        request.ipv6_prefix_length = entry.ipv6_prefix_length;
        request.ipv6_subnet = entry.ipv6_subnet.clone();
        request.ipv6_total_host = entry.ipv6_total_host;
    }
    request
}

/// Keep the controller's value for fields the input leaves out.
fn fill_unspecified(request: &mut ReservePoolRequest, have: &ReservedRecord) {
    fn gateway(value: &mut Option<String>, current: Option<&String>) {
        if value.is_none() {
            *value = current.filter(|gateway| !gateway.is_empty()).cloned();
        }
    }
    fn servers(value: &mut Option<Vec<String>>, current: Option<&Vec<String>>) {
        if value.is_none() {
            *value = current.cloned();
        }
    }

    gateway(&mut request.ipv4_gateway, have.ipv4_gateway.as_ref());
    gateway(&mut request.ipv6_gateway, have.ipv6_gateway.as_ref());
    servers(&mut request.ipv4_dhcp_servers, have.ipv4_dhcp_servers.as_ref());
    servers(&mut request.ipv4_dns_servers, have.ipv4_dns_servers.as_ref());
    servers(&mut request.ipv6_dhcp_servers, have.ipv6_dhcp_servers.as_ref());
    servers(&mut request.ipv6_dns_servers, have.ipv6_dns_servers.as_ref());
    if request.slaac_support.is_none() {
        request.slaac_support = have.slaac_support;
    }
    if have.ipv6_address_space == Some(true) {
        request.ipv6_address_space = true;
    }
}

#[async_trait]
impl Family for ReservedPools<'_> {
    type Have = BTreeMap<String, SiteReservations>;
    type Payload = ReservedPayload;
    type Id = ReservationId;

    fn group(&self) -> Group {
        Group::ReservedPools
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    async fn fetch_current(&self, ctx: &Context<'_>) -> Result<Self::Have> {
        let resolver = SiteResolver::new(ctx.api, ctx.pagination);
        let mut have = BTreeMap::new();

        for entry in self.entries {
            let site_key = Self::site_key(entry);
            if have.contains_key(&site_key) {
                continue;
            }
            let path = SitePath::parse(&site_key)?;
            let id = resolver.site_id(&path).await?;
            let pools = match &id {
                Some(id) => {
                    drain(ctx.pagination, |offset, limit| {
                        ctx.api.list_reserved_pools(id, offset, limit)
                    })
                    .await?
                }
                None => {
                    warn!(site = %site_key, "site does not exist");
                    Vec::new()
                }
            };
            debug!(site = %site_key, count = pools.len(), "reservations fetched");
            have.insert(site_key, SiteReservations { id, pools });
        }
        Ok(have)
    }

    async fn plan(&self, ctx: &Context<'_>, have: &Self::Have) -> Result<Plan<Self>> {
        if ctx.deleting() {
            return Ok(self.plan_delete(have));
        }
        let mut plan = Vec::with_capacity(self.entries.len());
        for (index, entry) in self.entries.iter().enumerate() {
            plan.push(self.plan_merge(ctx, index, entry, have).await?);
        }
        Ok(plan)
    }

    async fn execute(
        &self,
        ctx: &Context<'_>,
        name: &str,
        action: Action<ReservedPayload, ReservationId>,
    ) -> Result<Outcome> {
        match action {
            Action::Create(payload) => {
                ctx.api.reserve_pool(&payload.site_id, &payload.request).await?;
                Ok(Outcome::Created)
            }
            Action::Update(payload) => {
                let id = payload
                    .id
                    .ok_or_else(|| Error::Unexpected(format!("reservation `{name}` has no id")))?;
                ctx.api
                    .update_reserved_pool(&payload.site_id, &id, &payload.request)
                    .await?;
                Ok(Outcome::Updated)
            }
            Action::Delete(id) => {
                ctx.api.release_reserved_pool(&id).await?;
                Ok(Outcome::Deleted)
            }
            Action::NoChange => Ok(Outcome::Unchanged),
            Action::Blocked(error) => Err(error),
        }
    }

    /// Creates are gathered into batches of `batch_size`, submitted in input
    /// order. Any other action flushes the pending batch first.
    async fn apply(
        &self,
        ctx: &Context<'_>,
        plan: Plan<Self>,
        summary: &mut GroupSummary,
    ) -> Result<()> {
        let batch_size = ctx.batch_size.max(1);
        let mut batch = Vec::with_capacity(batch_size);

        for planned in plan {
            ctx.checkpoint()?;
            if let Action::Create(payload) = planned.action {
                batch.push((planned.name, payload));
                if batch.len() >= batch_size {
                    Self::submit_batch(ctx, &mut batch, summary).await?;
                }
                continue;
            }
            Self::submit_batch(ctx, &mut batch, summary).await?;
            let (name, outcome) = carry_out(self, ctx, planned).await?;
            record(summary, name, outcome);
        }
        Self::submit_batch(ctx, &mut batch, summary).await
    }
}
