//! Site hierarchy records.

use netconv_core::ids::SiteId;
use netconv_core::types::{SiteKind, GLOBAL_SITE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A site as the controller reports it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    /// Controller identifier
    pub id: SiteId,
    /// Leaf name
    #[serde(default)]
    pub name: String,
    /// Full slash-delimited path
    pub site_name_hierarchy: String,
    /// Namespaced attribute bags
    #[serde(default)]
    pub additional_info: Vec<SiteInfo>,
}

/// One namespaced attribute bag on a site.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SiteInfo {
    /// Namespace, e.g. `Location`
    pub name_space: String,
    /// Attribute values
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl Site {
    /// Kind of site, read from the `Location` namespace.
    ///
    /// The root carries no location type and is recognised by its path.
    #[must_use]
    pub fn kind(&self) -> Option<SiteKind> {
        if self.site_name_hierarchy == GLOBAL_SITE {
            return Some(SiteKind::Global);
        }
        self.additional_info
            .iter()
            .filter(|info| info.name_space == "Location")
            .find_map(|info| info.attributes.get("type"))
            .and_then(|kind| kind.parse().ok())
    }
}
