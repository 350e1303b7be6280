//! Role reconciliation.
//!
//! Input roles are compiled into resource-type grants ([`compile`]) and
//! compared with the controller's list as `(type, operations)` sets.

pub mod compile;
pub mod schema;

use crate::diff::{Action, Planned};
use crate::family::{Context, Family, Plan};
use crate::input::RoleInput;
use crate::report::{Group, Outcome};
use async_trait::async_trait;
use compile::{compile, permission_set, Mode};
use netconv_client::models::{NewRole, Role, RoleUpdate};
use netconv_core::ids::RoleId;
use netconv_core::{Error, Result};
use tracing::debug;

/// Create or update body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RolePayload {
    /// New role
    Create(NewRole),
    /// Changed role
    Update(RoleUpdate),
}

/// The role family.
#[derive(Debug)]
pub struct Roles<'a> {
    entries: &'a [RoleInput],
}

impl<'a> Roles<'a> {
    /// Family over the input entries.
    #[must_use]
    pub const fn new(entries: &'a [RoleInput]) -> Self {
        Self { entries }
    }

    fn plan_merge(entry: &RoleInput, have: &[Role]) -> Planned<RolePayload, RoleId> {
        let name = entry.role_name.clone().unwrap_or_default();
        let Some(current) = find(have, &name) else {
            let role = NewRole {
                role: name.clone(),
                description: entry.description.clone().unwrap_or_default(),
                resource_types: compile(entry, Mode::Create).into_resource_types(),
            };
            return Planned::new(name, Action::Create(RolePayload::Create(role)));
        };

        if current.is_builtin() {
            return Planned::new(
                name.clone(),
                Action::Blocked(Error::Conflict(format!("`{name}` is a built-in role"))),
            );
        }

        let merged = compile(entry, Mode::Update).merge_onto(&current.resource_types);
        let current_description = current.description.clone().unwrap_or_default();
        let mut changed = Vec::new();
        if entry
            .description
            .as_ref()
            .is_some_and(|description| *description != current_description)
        {
            changed.push("description");
        }
        if permission_set(&merged) != permission_set(&current.resource_types) {
            changed.push("resourceTypes");
        }
        if changed.is_empty() {
            return Planned::new(name, Action::NoChange);
        }

        debug!(role = %name, ?changed, "role differs");
        let update = RoleUpdate {
            id: current.role_id.clone(),
            role: name.clone(),
            description: entry.description.clone().unwrap_or(current_description),
            resource_types: merged,
        };
        Planned::new(name, Action::Update(RolePayload::Update(update))).with_changed_fields(changed)
    }

    fn plan_delete(&self, have: &[Role]) -> Plan<Self> {
        self.entries
            .iter()
            .map(|entry| {
                let name = entry.role_name.clone().unwrap_or_default();
                match find(have, &name) {
                    Some(role) if role.is_builtin() => Planned::new(
                        name.clone(),
                        Action::Blocked(Error::Conflict(format!(
                            "`{name}` is a built-in role"
                        ))),
                    ),
                    Some(role) => Planned::new(name, Action::Delete(role.role_id.clone())),
                    None => Planned::not_found(name),
                }
            })
            .collect()
    }
}

fn find<'r>(roles: &'r [Role], name: &str) -> Option<&'r Role> {
    roles.iter().find(|role| role.name == name)
}

#[async_trait]
impl Family for Roles<'_> {
    type Have = Vec<Role>;
    type Payload = RolePayload;
    type Id = RoleId;

    fn group(&self) -> Group {
        Group::Roles
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    async fn fetch_current(&self, ctx: &Context<'_>) -> Result<Vec<Role>> {
        let roles = ctx.api.list_roles().await?;
        debug!(count = roles.len(), "roles fetched");
        Ok(roles)
    }

    async fn plan(&self, ctx: &Context<'_>, have: &Vec<Role>) -> Result<Plan<Self>> {
        if ctx.deleting() {
            return Ok(self.plan_delete(have));
        }
        Ok(self
            .entries
            .iter()
            .map(|entry| Self::plan_merge(entry, have))
            .collect())
    }

    async fn execute(
        &self,
        ctx: &Context<'_>,
        _name: &str,
        action: Action<RolePayload, RoleId>,
    ) -> Result<Outcome> {
        match action {
            Action::Create(RolePayload::Create(role))
            | Action::Update(RolePayload::Create(role)) => {
                ctx.api.add_role(&role).await?;
                Ok(Outcome::Created)
            }
            Action::Create(RolePayload::Update(role))
            | Action::Update(RolePayload::Update(role)) => {
                ctx.api.update_role(&role).await?;
                Ok(Outcome::Updated)
            }
            Action::Delete(id) => {
                ctx.api.delete_role(&id).await?;
                Ok(Outcome::Deleted)
            }
            Action::NoChange => Ok(Outcome::Unchanged),
            Action::Blocked(error) => Err(error),
        }
    }
}
