//! Role and permission records.

use netconv_core::ids::RoleId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A permission verb on a resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Operation {
    /// Read access
    #[serde(rename = "gRead")]
    Read,
    /// Modify access
    #[serde(rename = "gUpdate")]
    Update,
    /// Create access
    #[serde(rename = "gCreate")]
    Create,
    /// Delete access
    #[serde(rename = "gRemove")]
    Remove,
}

impl Operation {
    /// All four verbs, in wire order.
    pub const ALL: [Self; 4] = [Self::Read, Self::Update, Self::Create, Self::Remove];

    /// Wire spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "gRead",
            Self::Update => "gUpdate",
            Self::Create => "gCreate",
            Self::Remove => "gRemove",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `{type, operations}` permission entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceType {
    /// Dotted resource path, e.g. `Network Design.Network Settings`
    #[serde(rename = "type")]
    pub type_path: String,
    /// Granted verbs
    #[serde(default)]
    pub operations: Vec<Operation>,
}

impl ResourceType {
    /// Build an entry.
    #[must_use]
    pub fn new(type_path: impl Into<String>, operations: Vec<Operation>) -> Self {
        Self {
            type_path: type_path.into(),
            operations,
        }
    }
}

/// A role as the controller reports it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    /// Controller identifier
    pub role_id: RoleId,
    /// Role name
    pub name: String,
    /// Free text
    #[serde(default)]
    pub description: Option<String>,
    /// `default` for built-in roles, `custom` otherwise
    #[serde(rename = "type", default)]
    pub role_type: Option<String>,
    /// Permission entries
    #[serde(default)]
    pub resource_types: Vec<ResourceType>,
}

impl Role {
    /// Returns true for roles shipped with the controller.
    #[must_use]
    pub fn is_builtin(&self) -> bool {
        self.role_type
            .as_deref()
            .is_some_and(|kind| {
                kind.eq_ignore_ascii_case("default") || kind.eq_ignore_ascii_case("system")
            })
    }
}

/// `{"roles": [...]}` body of the role listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleList {
    /// Roles
    #[serde(default)]
    pub roles: Vec<Role>,
}

/// Create request for a role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewRole {
    /// Role name
    pub role: String,
    /// Free text
    pub description: String,
    /// Permission entries
    pub resource_types: Vec<ResourceType>,
}

/// Update request for a role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoleUpdate {
    /// Role being updated
    pub id: RoleId,
    /// Role name
    pub role: String,
    /// Free text
    pub description: String,
    /// Full replacement permission list
    pub resource_types: Vec<ResourceType>,
}
