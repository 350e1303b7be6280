//! The compiled-in role permission schema.
//!
//! Every resource type a role can grant is listed here with the input key
//! that addresses it and the permission it gets on create when the input
//! says nothing. Type paths are the controller's exact strings.

use crate::input::Permission;

/// Input key of the nested sub-category under `network_provision`.
pub const INVENTORY_MANAGEMENT: &str = "inventory_management";

/// Input key that applies to every sub-resource of its block.
pub const OVERALL: &str = "overall";

/// Type emitted on every create with full access.
pub const SYSTEM_BASIC: &str = "System.Basic";

/// One grantable resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubResource {
    /// Input key inside the category (or sub-category) block
    pub key: &'static str,
    /// Sub-category key, for resources nested one level deeper
    pub group: Option<&'static str>,
    /// Controller type path
    pub type_path: &'static str,
    /// Permission applied on create when nothing covers this resource
    pub default: Permission,
}

/// One permission category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    /// Input key
    pub key: &'static str,
    /// Resources, in emission order
    pub resources: &'static [SubResource],
}

impl Category {
    /// Returns true if `key` may appear directly in this category's block.
    #[must_use]
    pub fn accepts(&self, key: &str) -> bool {
        key == OVERALL
            || self
                .resources
                .iter()
                .any(|res| res.group.unwrap_or(res.key) == key)
    }

    /// Returns true if `key` names a sub-category of this block.
    #[must_use]
    pub fn has_group(&self, key: &str) -> bool {
        self.resources.iter().any(|res| res.group == Some(key))
    }

    /// Returns true if `key` may appear inside the sub-category `group`.
    #[must_use]
    pub fn group_accepts(&self, group: &str, key: &str) -> bool {
        key == OVERALL
            || self
                .resources
                .iter()
                .any(|res| res.group == Some(group) && res.key == key)
    }
}

const fn res(key: &'static str, type_path: &'static str) -> SubResource {
    SubResource {
        key,
        group: None,
        type_path,
        default: Permission::Read,
    }
}

const fn inventory(key: &'static str, type_path: &'static str) -> SubResource {
    SubResource {
        key,
        group: Some(INVENTORY_MANAGEMENT),
        type_path,
        default: Permission::Read,
    }
}

const fn with_default(resource: SubResource, default: Permission) -> SubResource {
    SubResource {
        default,
        ..resource
    }
}

/// Every category, in emission order.
pub const SCHEMA: &[Category] = &[
    Category {
        key: "assurance",
        resources: &[
            res("monitoring_and_troubleshooting", "Assurance.Monitoring and Troubleshooting"),
            res("monitoring_settings", "Assurance.Monitoring Settings"),
            res("troubleshooting_tools", "Assurance.Troubleshooting Tools"),
        ],
    },
    Category {
        key: "network_analytics",
        resources: &[res("data_access", "Network Analytics.Data Access")],
    },
    Category {
        key: "network_design",
        resources: &[
            res("advanced_network_settings", "Network Design.Advanced Network Settings"),
            res("image_repository", "Network Design.Image Repository"),
            res("network_hierarchy", "Network Design.Network Hierarchy"),
            res("network_profiles", "Network Design.Network Profiles"),
            res("network_settings", "Network Design.Network Settings"),
            res("virtual_network", "Network Design.Virtual Network"),
        ],
    },
    Category {
        key: "network_provision",
        resources: &[
            res("compliance", "Network Provision.Compliance"),
            res("eox", "Network Provision.EoX"),
            res("image_update", "Network Provision.Image Update"),
            inventory(
                "device_configuration",
                "Network Provision.Inventory Management.Device Configuration",
            ),
            inventory("discovery", "Network Provision.Inventory Management.Discovery"),
            inventory(
                "network_device",
                "Network Provision.Inventory Management.Network Device",
            ),
            inventory(
                "port_management",
                "Network Provision.Inventory Management.Port Management",
            ),
            inventory("topology", "Network Provision.Inventory Management.Topology"),
            res("license", "Network Provision.License"),
            res("network_telemetry", "Network Provision.Network Telemetry"),
            res("pnp", "Network Provision.PnP"),
            res("provision", "Network Provision.Provision"),
        ],
    },
    Category {
        key: "network_services",
        resources: &[
            res("app_hosting", "Network Services.App Hosting"),
            res("bonjour", "Network Services.Bonjour"),
            res("stealthwatch", "Network Services.Stealthwatch"),
            res("umbrella", "Network Services.Umbrella"),
        ],
    },
    Category {
        key: "platform",
        resources: &[
            with_default(res("apis", "Platform.APIs"), Permission::Deny),
            with_default(res("bundles", "Platform.Bundles"), Permission::Deny),
            with_default(res("events", "Platform.Events"), Permission::Deny),
            with_default(res("reports", "Platform.Reports"), Permission::Deny),
        ],
    },
    Category {
        key: "security",
        resources: &[
            res("group_based_policy", "Security.Group-Based Policy"),
            res("ip_based_access_control", "Security.IP Based Access Control"),
            res("security_advisories", "Security.Security Advisories"),
        ],
    },
    Category {
        key: "system",
        resources: &[
            res("machine_reasoning", "System.Machine Reasoning"),
            res("system_management", "System.System Management"),
        ],
    },
    Category {
        key: "utilities",
        resources: &[
            res("audit_log", "Utilities.Audit Log"),
            res("event_viewer", "Utilities.Event Viewer"),
            res("network_reasoner", "Utilities.Network Reasoner"),
            res("remote_device_support", "Utilities.Remote Device Support"),
            with_default(res("scheduler", "Utilities.Scheduler"), Permission::Write),
            res("search", "Utilities.Search"),
        ],
    },
];

/// Category by input key.
#[must_use]
pub fn category(key: &str) -> Option<&'static Category> {
    SCHEMA.iter().find(|category| category.key == key)
}

/// Position of a type path in emission order; unknown paths sort last.
#[must_use]
pub fn emission_rank(type_path: &str) -> usize {
    SCHEMA
        .iter()
        .flat_map(|category| category.resources.iter())
        .map(|res| res.type_path)
        .chain(std::iter::once(SYSTEM_BASIC))
        .position(|known| known.eq_ignore_ascii_case(type_path))
        .unwrap_or(usize::MAX)
}
