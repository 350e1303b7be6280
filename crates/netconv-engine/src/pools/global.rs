//! Global pool reconciliation.

use crate::diff::{differences, Action, Field, FieldValue, Planned};
use crate::family::{carry_out, record, Context, Family, Plan};
use crate::input::GlobalPoolInput;
use crate::report::{Group, GroupSummary, Outcome};
use async_trait::async_trait;
use netconv_client::models::{GlobalPool, GlobalPoolCreate, GlobalPoolUpdate, PoolType};
use netconv_client::pagination::drain;
use netconv_core::ids::GlobalPoolId;
use netconv_core::types::{AddressSpace, Cidr};
use netconv_core::{Error, Result};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Normalized global pool, shared by the controller and input sides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolRecord {
    /// Pool name
    pub name: Option<String>,
    /// Address space
    pub address_space: Option<AddressSpace>,
    /// Gateway; empty when the pool has none
    pub gateway: Option<String>,
    /// DHCP servers
    pub dhcp_server_ips: Option<Vec<String>>,
    /// DNS servers
    pub dns_server_ips: Option<Vec<String>>,
}

impl From<&GlobalPool> for PoolRecord {
    fn from(pool: &GlobalPool) -> Self {
        Self {
            name: Some(pool.ip_pool_name.clone()),
            address_space: Some(pool.address_space()),
            gateway: Some(pool.gateway().to_string()),
            dhcp_server_ips: Some(pool.dhcp_server_ips.clone()),
            dns_server_ips: Some(pool.dns_server_ips.clone()),
        }
    }
}

impl From<&GlobalPoolInput> for PoolRecord {
    fn from(input: &GlobalPoolInput) -> Self {
        Self {
            name: input.name.clone(),
            address_space: input.ip_address_space,
            gateway: input.gateway.clone(),
            dhcp_server_ips: input.dhcp_server_ips.clone(),
            dns_server_ips: input.dns_server_ips.clone(),
        }
    }
}

type F = Field<PoolRecord>;

/// Fields that decide whether a global pool needs an update.
pub const COMPARISON: &[F] = &[
    F::new("ipPoolName", |r| FieldValue::text(r.name.as_deref())),
    F::new("IpAddressSpace", |r| {
        FieldValue::text(r.address_space.as_ref().map(AddressSpace::name))
    }),
    F::new("dhcpServerIps", |r| FieldValue::set(r.dhcp_server_ips.as_deref())),
    F::new("dnsServerIps", |r| FieldValue::set(r.dns_server_ips.as_deref())),
    F::new("gateway", |r| FieldValue::text(r.gateway.as_deref())),
];

/// Create or update body.
#[derive(Debug, Clone, PartialEq)]
pub enum GlobalPayload {
    /// New pool
    Create(GlobalPoolCreate),
    /// Changed pool
    Update(GlobalPoolUpdate),
}

/// The global pool family.
#[derive(Debug)]
pub struct GlobalPools<'a> {
    entries: &'a [GlobalPoolInput],
}

impl<'a> GlobalPools<'a> {
    /// Family over the input entries.
    #[must_use]
    pub const fn new(entries: &'a [GlobalPoolInput]) -> Self {
        Self { entries }
    }

    fn plan_merge(
        index: usize,
        entry: &GlobalPoolInput,
        have: &[GlobalPool],
    ) -> Result<Planned<GlobalPayload, GlobalPoolId>> {
        let path = format!("global_pool_details.settings.ip_pool[{index}]");
        let name = entry.name.clone().unwrap_or_default();
        let existing = find(have, &name).or_else(|| {
            entry
                .prev_name
                .as_deref()
                .and_then(|prev| find(have, prev))
        });

        let Some(current) = existing else {
            let body = create_body(&path, &name, entry)?;
            return Ok(Planned::new(name, Action::Create(GlobalPayload::Create(body))));
        };

        immutable(&path, entry, current)?;
        let have_record = PoolRecord::from(current);
        let want_record = PoolRecord::from(entry);
        let changed = differences(&have_record, &want_record, COMPARISON);
        if changed.is_empty() {
            return Ok(Planned::new(name, Action::NoChange));
        }

        let update = GlobalPoolUpdate {
            id: current.id.clone(),
            ip_pool_name: name.clone(),
            gateway: want_record
                .gateway
                .or(have_record.gateway)
                .filter(|gateway| !gateway.is_empty()),
            dhcp_server_ips: want_record
                .dhcp_server_ips
                .unwrap_or_else(|| current.dhcp_server_ips.clone()),
            dns_server_ips: want_record
                .dns_server_ips
                .unwrap_or_else(|| current.dns_server_ips.clone()),
        };
        debug!(pool = %name, ?changed, "global pool differs");
        Ok(Planned::new(name, Action::Update(GlobalPayload::Update(update)))
            .with_changed_fields(changed))
    }

    fn plan_delete(&self, have: &[GlobalPool]) -> Plan<Self> {
        let mut plan = Vec::new();
        let mut planned_ids = BTreeSet::new();

        for entry in self.entries {
            match entry.name.as_deref().filter(|name| !name.is_empty()) {
                Some(name) => match find(have, name) {
                    Some(pool) if planned_ids.insert(pool.id.clone()) => {
                        plan.push(Planned::new(name, Action::Delete(pool.id.clone())));
                    }
                    Some(_) => {}
                    None => plan.push(Planned::not_found(name)),
                },
                None => {
                    info!(count = have.len(), "sweeping every global pool");
                    for pool in have {
                        if planned_ids.insert(pool.id.clone()) {
                            plan.push(Planned::new(
                                pool.ip_pool_name.clone(),
                                Action::Delete(pool.id.clone()),
                            ));
                        }
                    }
                }
            }
        }
        plan
    }

    async fn submit_batch(
        ctx: &Context<'_>,
        batch: &mut Vec<(String, GlobalPoolCreate)>,
        summary: &mut GroupSummary,
    ) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let (names, bodies): (Vec<String>, Vec<GlobalPoolCreate>) = batch.drain(..).unzip();
        debug!(count = bodies.len(), "submitting global pool batch");

        match ctx.api.create_global_pool(&bodies).await {
            Ok(()) => {
                for name in names {
                    record(summary, name, Outcome::Created);
                }
            }
            Err(error) if error.is_fatal() => return Err(error),
            Err(error) => {
                for name in names {
                    record(summary, name, Outcome::Failed(error.clone()));
                }
            }
        }
        Ok(())
    }
}

fn find<'p>(pools: &'p [GlobalPool], name: &str) -> Option<&'p GlobalPool> {
    pools.iter().find(|pool| pool.ip_pool_name == name)
}

fn create_body(path: &str, name: &str, entry: &GlobalPoolInput) -> Result<GlobalPoolCreate> {
    let cidr = entry.cidr.clone().ok_or_else(|| {
        Error::input(
            format!("{path}.cidr"),
            format!("cidr is required to create `{name}`"),
        )
    })?;
    let space = match entry.ip_address_space {
        Some(space) => space,
        None => Cidr::parse(&cidr)
            .map_err(|err| Error::input(format!("{path}.cidr"), err.to_string()))?
            .space(),
    };

    Ok(GlobalPoolCreate {
        ip_pool_name: name.to_string(),
        pool_type: entry.pool_type.unwrap_or(PoolType::Generic),
        ip_pool_cidr: cidr,
        gateway: entry.gateway.clone().filter(|gateway| !gateway.is_empty()),
        dhcp_server_ips: entry.dhcp_server_ips.clone().unwrap_or_default(),
        dns_server_ips: entry.dns_server_ips.clone().unwrap_or_default(),
        ip_address_space: space,
    })
}

/// A pool's range and address space cannot change after creation.
fn immutable(path: &str, entry: &GlobalPoolInput, current: &GlobalPool) -> Result<()> {
    if let Some(cidr) = entry.cidr.as_deref() {
        let same = match (Cidr::parse(cidr), Cidr::parse(&current.ip_pool_cidr)) {
            (Ok(wanted), Ok(existing)) => wanted == existing,
            _ => cidr == current.ip_pool_cidr,
        };
        if !same {
            return Err(Error::input(
                format!("{path}.cidr"),
                format!(
                    "pool `{}` already covers {}; a pool's range cannot change",
                    current.ip_pool_name, current.ip_pool_cidr
                ),
            ));
        }
    }
    if let Some(space) = entry.ip_address_space {
        if space != current.address_space() {
            return Err(Error::input(
                format!("{path}.ip_address_space"),
                format!("pool `{}` is {}", current.ip_pool_name, current.address_space()),
            ));
        }
    }
    Ok(())
}

#[async_trait]
impl Family for GlobalPools<'_> {
    type Have = Vec<GlobalPool>;
    type Payload = GlobalPayload;
    type Id = GlobalPoolId;

    fn group(&self) -> Group {
        Group::GlobalPools
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    async fn fetch_current(&self, ctx: &Context<'_>) -> Result<Vec<GlobalPool>> {
        let pools = drain(ctx.pagination, |offset, limit| {
            ctx.api.list_global_pools(offset, limit)
        })
        .await?;
        debug!(count = pools.len(), "global pools fetched");
        Ok(pools)
    }

    async fn plan(&self, ctx: &Context<'_>, have: &Vec<GlobalPool>) -> Result<Plan<Self>> {
        if ctx.deleting() {
            return Ok(self.plan_delete(have));
        }
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| Self::plan_merge(index, entry, have))
            .collect()
    }

    async fn execute(
        &self,
        ctx: &Context<'_>,
        _name: &str,
        action: Action<GlobalPayload, GlobalPoolId>,
    ) -> Result<Outcome> {
        match action {
            Action::Create(GlobalPayload::Create(body))
            | Action::Update(GlobalPayload::Create(body)) => {
                ctx.api.create_global_pool(&[body]).await?;
                Ok(Outcome::Created)
            }
            Action::Create(GlobalPayload::Update(body))
            | Action::Update(GlobalPayload::Update(body)) => {
                ctx.api.update_global_pool(&[body]).await?;
                Ok(Outcome::Updated)
            }
            Action::Delete(id) => {
                ctx.api.delete_global_pool(&id).await?;
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
            if let Action::Create(GlobalPayload::Create(body)) = planned.action {
                batch.push((planned.name, body));
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

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn pool(name: &str, cidr: &str) -> GlobalPool {
        serde_json::from_value(json!({
            "id": format!("gp-{name}"),
            "ipPoolName": name,
            "ipPoolCidr": cidr,
            "gateways": ["10.0.0.1"],
            "dhcpServerIps": ["10.0.0.2", "10.0.0.3"],
            "dnsServerIps": [],
            "ipv6": false
        }))
        .unwrap()
    }

    fn entry(name: &str) -> GlobalPoolInput {
        GlobalPoolInput {
            name: Some(name.into()),
            ..GlobalPoolInput::default()
        }
    }

    #[test]
    fn record_survives_a_controller_round_trip() {
        let original = pool("lab", "10.0.0.0/16");
        let decoded: GlobalPool =
            serde_json::from_value(serde_json::to_value(&original).unwrap()).unwrap();

        assert_eq!(decoded, original);
        assert_eq!(PoolRecord::from(&decoded), PoolRecord::from(&original));
        assert_eq!(
            PoolRecord::from(&decoded),
            PoolRecord {
                name: Some("lab".into()),
                address_space: Some(AddressSpace::V4),
                gateway: Some("10.0.0.1".into()),
                dhcp_server_ips: Some(vec!["10.0.0.2".into(), "10.0.0.3".into()]),
                dns_server_ips: Some(vec![]),
            }
        );
    }

    #[test]
    fn matching_pool_needs_nothing() {
        let have = vec![pool("lab", "10.0.0.0/16")];
        let mut want = entry("lab");
        want.cidr = Some("10.0.0.0/16".into());
        want.ip_address_space = Some(AddressSpace::V4);
        want.dhcp_server_ips = Some(vec!["10.0.0.3".into(), "10.0.0.2".into()]);
        want.gateway = Some("10.0.0.1".into());

        let planned = GlobalPools::plan_merge(0, &want, &have).unwrap();
        assert_eq!(planned.action, Action::NoChange);
    }

    #[test]
    fn empty_server_list_is_a_change() {
        let have = vec![pool("lab", "10.0.0.0/16")];
        let mut want = entry("lab");
        want.dhcp_server_ips = Some(vec![]);

        let planned = GlobalPools::plan_merge(0, &want, &have).unwrap();
        assert_eq!(planned.changed_fields, vec!["dhcpServerIps"]);
        let Action::Update(GlobalPayload::Update(body)) = planned.action else {
            panic!("expected update");
        };
        assert!(body.dhcp_server_ips.is_empty());
        assert_eq!(body.gateway.as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn rename_updates_by_previous_name() {
        let have = vec![pool("A", "10.0.0.0/16")];
        let mut want = entry("B");
        want.prev_name = Some("A".into());

        let planned = GlobalPools::plan_merge(0, &want, &have).unwrap();
        assert_eq!(planned.name, "B");
        let Action::Update(GlobalPayload::Update(body)) = planned.action else {
            panic!("expected update");
        };
        assert_eq!(body.id.as_str(), "gp-A");
        assert_eq!(body.ip_pool_name, "B");
    }

    #[test]
    fn create_requires_cidr() {
        let err = GlobalPools::plan_merge(2, &entry("new"), &[]).unwrap_err();
        assert_eq!(
            err,
            Error::input(
                "global_pool_details.settings.ip_pool[2].cidr",
                "cidr is required to create `new`"
            )
        );
    }

    #[test]
    fn range_change_is_rejected() {
        let have = vec![pool("lab", "10.0.0.0/16")];
        let mut want = entry("lab");
        want.cidr = Some("10.1.0.0/16".into());
        assert!(matches!(
            GlobalPools::plan_merge(0, &want, &have),
            Err(Error::InputInvalid { .. })
        ));
    }

    #[test]
    fn create_body_defaults() {
        let mut want = entry("lab-v6");
        want.cidr = Some("2001:db8::/48".into());
        let body = create_body("p", "lab-v6", &want).unwrap();
        assert_eq!(body.ip_address_space, AddressSpace::V6);
        assert_eq!(body.pool_type, PoolType::Generic);
        assert_eq!(body.gateway, None);
    }

    #[test]
    fn delete_plans_named_sweep_and_missing() {
        let have = vec![pool("a", "10.0.0.0/16"), pool("b", "10.1.0.0/16")];
        let sweep = GlobalPoolInput {
            name: Some(String::new()),
            force_delete: true,
            ..GlobalPoolInput::default()
        };
        let entries = vec![entry("a"), entry("zzz"), sweep];
        let family = GlobalPools::new(&entries);

        let plan = family.plan_delete(&have);
        let labels: Vec<(&str, &str, bool)> = plan
            .iter()
            .map(|p| (p.name.as_str(), p.action.label(), p.missing))
            .collect();
        assert_eq!(
            labels,
            vec![
                ("a", "delete", false),
                ("zzz", "no_change", true),
                ("b", "delete", false),
            ]
        );
    }
}
