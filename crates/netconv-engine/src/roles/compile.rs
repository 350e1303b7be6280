//! Expansion of the nested permission tree into resource-type grants.

use super::schema::{emission_rank, SubResource, OVERALL, SCHEMA, SYSTEM_BASIC};
use crate::input::{OneOrList, Permission, PermissionBlock, PermissionNode, RoleInput};
use netconv_client::models::{Operation, ResourceType};
use std::collections::{BTreeMap, BTreeSet};

/// Whether the role is being created or updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Unmentioned resources take their schema default
    Create,
    /// Unmentioned resources keep the controller's value
    Update,
}

/// Operations granted by a permission level.
#[must_use]
pub fn operations_for(permission: Permission) -> Vec<Operation> {
    match permission {
        Permission::Deny => Vec::new(),
        Permission::Read => vec![Operation::Read],
        Permission::Write => Operation::ALL.to_vec(),
    }
}

/// Result of compiling one role entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Compiled {
    grants: Vec<ResourceType>,
    revoked: BTreeSet<&'static str>,
}

impl Compiled {
    /// Granted resource types, in schema order.
    #[must_use]
    pub fn resource_types(&self) -> &[ResourceType] {
        &self.grants
    }

    /// Consume into the granted resource types.
    #[must_use]
    pub fn into_resource_types(self) -> Vec<ResourceType> {
        self.grants
    }

    /// Type paths the input denies.
    #[must_use]
    pub const fn revoked(&self) -> &BTreeSet<&'static str> {
        &self.revoked
    }

    fn revokes(&self, type_path: &str) -> bool {
        self.revoked
            .iter()
            .any(|revoked| revoked.eq_ignore_ascii_case(type_path))
    }

    fn grants_type(&self, type_path: &str) -> bool {
        self.grants
            .iter()
            .any(|grant| grant.type_path.eq_ignore_ascii_case(type_path))
    }

    /// Apply the grants and denials on top of a role's current list.
    ///
    /// Types the input does not mention keep their current operations.
    #[must_use]
    pub fn merge_onto(&self, current: &[ResourceType]) -> Vec<ResourceType> {
        let mut merged: Vec<ResourceType> = current
            .iter()
            .filter(|rt| !self.revokes(&rt.type_path) && !self.grants_type(&rt.type_path))
            .cloned()
            .collect();
        merged.extend(self.grants.iter().cloned());
        merged.sort_by_key(|rt| emission_rank(&rt.type_path));
        merged
    }
}

/// Compile a role entry.
#[must_use]
pub fn compile(role: &RoleInput, mode: Mode) -> Compiled {
    let mut compiled = Compiled::default();

    for category in SCHEMA {
        let block = role.category(category.key).and_then(OneOrList::first);
        for resource in category.resources {
            let level = block.and_then(|block| resolve(block, resource)).or(match mode {
                Mode::Create => Some(resource.default),
                Mode::Update => None,
            });
            match level {
                Some(Permission::Deny) => {
                    compiled.revoked.insert(resource.type_path);
                }
                Some(level) => compiled
                    .grants
                    .push(ResourceType::new(resource.type_path, operations_for(level))),
                None => {}
            }
        }
    }

    if mode == Mode::Create {
        compiled
            .grants
            .push(ResourceType::new(SYSTEM_BASIC, Operation::ALL.to_vec()));
    }

    let denied = explicit_denials(role);
    compiled
        .grants
        .retain(|grant| !denied.contains(grant.type_path.as_str()));
    compiled.revoked.extend(denied);
    compiled
}

/// The most specific level the block sets for one resource.
fn resolve(block: &PermissionBlock, resource: &SubResource) -> Option<Permission> {
    let own = match resource.group {
        Some(group) => match block.get(group) {
            Some(PermissionNode::Level(level)) => Some(*level),
            Some(PermissionNode::Nested(nested)) => nested
                .first()
                .and_then(|inner| inner.get(resource.key).or_else(|| inner.get(OVERALL)))
                .copied(),
            None => None,
        },
        None => match block.get(resource.key) {
            Some(PermissionNode::Level(level)) => Some(*level),
            _ => None,
        },
    };

    own.or_else(|| match block.get(OVERALL) {
        Some(PermissionNode::Level(level)) => Some(*level),
        _ => None,
    })
}

/// Type paths named by a `deny` on a sub-resource key.
fn explicit_denials(role: &RoleInput) -> BTreeSet<&'static str> {
    let mut denied = BTreeSet::new();

    for category in SCHEMA {
        let Some(block) = role.category(category.key).and_then(OneOrList::first) else {
            continue;
        };
        for (key, node) in block {
            match node {
                PermissionNode::Level(Permission::Deny) if key != OVERALL => {
                    denied.extend(
                        category
                            .resources
                            .iter()
                            .filter(|res| res.group.unwrap_or(res.key) == key.as_str())
                            .map(|res| res.type_path),
                    );
                }
                PermissionNode::Nested(nested) => {
                    let Some(inner) = nested.first() else {
                        continue;
                    };
                    for (inner_key, level) in inner {
                        if *level != Permission::Deny || inner_key == OVERALL {
                            continue;
                        }
                        denied.extend(
                            category
                                .resources
                                .iter()
                                .filter(|res| {
                                    res.group == Some(key.as_str()) && res.key == inner_key.as_str()
                                })
                                .map(|res| res.type_path),
                        );
                    }
                }
                PermissionNode::Level(_) => {}
            }
        }
    }

    denied
}

/// Resource types keyed by path, with operations as a set.
#[must_use]
pub fn permission_set(types: &[ResourceType]) -> BTreeMap<&str, BTreeSet<Operation>> {
    types
        .iter()
        .map(|rt| (rt.type_path.as_str(), rt.operations.iter().copied().collect()))
        .collect()
}
