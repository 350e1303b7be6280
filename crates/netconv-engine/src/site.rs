//! Site hierarchy resolution.

use netconv_client::models::{Site, SiteDevice};
use netconv_client::pagination::drain;
use netconv_client::Controller;
use netconv_core::client::PaginationPolicy;
use netconv_core::ids::SiteId;
use netconv_core::types::{SiteKind, SitePath};
use netconv_core::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Mutex;
use tracing::{debug, warn};

/// Maps site paths to controller identifiers.
///
/// Exact-path lookups are cached for the lifetime of the resolver, which is
/// one run.
pub struct SiteResolver<'a> {
    api: &'a dyn Controller,
    pagination: PaginationPolicy,
    ids: Mutex<BTreeMap<String, Option<SiteId>>>,
}

impl<'a> SiteResolver<'a> {
    /// Resolver over a controller.
    #[must_use]
    pub fn new(api: &'a dyn Controller, pagination: PaginationPolicy) -> Self {
        Self {
            api,
            pagination,
            ids: Mutex::new(BTreeMap::new()),
        }
    }

    async fn site(&self, path: &SitePath) -> Result<Option<Site>> {
        let wanted = path.base().to_string();
        let sites = self.api.get_site(&wanted).await?;
        Ok(sites
            .into_iter()
            .find(|site| site.site_name_hierarchy == wanted))
    }

    /// Identifier of exactly this site, if it exists.
    ///
    /// # Errors
    ///
    /// Returns any controller error other than "not found".
    pub async fn site_id(&self, path: &SitePath) -> Result<Option<SiteId>> {
        let key = path.base().to_string();
        if let Some(cached) = self.cached(&key) {
            return Ok(cached);
        }
        let id = self.site(path).await?.map(|site| site.id);
        debug!(site = %key, found = id.is_some(), "site looked up");
        if let Ok(mut ids) = self.ids.lock() {
            ids.insert(key, id.clone());
        }
        Ok(id)
    }

    /// Identifier of exactly this site.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the controller has no such site.
    pub async fn require(&self, path: &SitePath) -> Result<SiteId> {
        self.site_id(path)
            .await?
            .ok_or_else(|| Error::NotFound(format!("site {path}")))
    }

    fn cached(&self, key: &str) -> Option<Option<SiteId>> {
        self.ids.lock().ok().and_then(|ids| ids.get(key).cloned())
    }

    /// The site and, depending on its kind, its descendants.
    ///
    /// Buildings include their floors. Areas and `Global` resolve to their
    /// descendants, or to themselves when they have none. Floors resolve to
    /// themselves. A site of unknown kind resolves to nothing.
    ///
    /// # Errors
    ///
    /// Returns any controller error other than "not found".
    pub async fn resolve(&self, path: &SitePath) -> Result<BTreeMap<String, SiteId>> {
        let mut resolved = BTreeMap::new();
        let Some(site) = self.site(path).await? else {
            warn!(site = %path, "site does not exist");
            return Ok(resolved);
        };

        match site.kind() {
            Some(SiteKind::Building) => {
                let floors = self.api.get_site(&path.descendants().to_string()).await?;
                resolved.insert(site.site_name_hierarchy, site.id);
                resolved.extend(
                    floors
                        .into_iter()
                        .map(|floor| (floor.site_name_hierarchy, floor.id)),
                );
            }
            Some(SiteKind::Area | SiteKind::Global) => {
                let below = self.api.get_site(&path.descendants().to_string()).await?;
                if below.is_empty() {
                    resolved.insert(site.site_name_hierarchy, site.id);
                } else {
                    resolved.extend(
                        below
                            .into_iter()
                            .map(|child| (child.site_name_hierarchy, child.id)),
                    );
                }
            }
            Some(SiteKind::Floor) => {
                resolved.insert(site.site_name_hierarchy, site.id);
            }
            None => warn!(site = %path, "site has no recognised type, skipping"),
        }

        debug!(site = %path, count = resolved.len(), "site resolved");
        Ok(resolved)
    }

    /// Every device assigned to the resolved sites, in site-name order.
    ///
    /// # Errors
    ///
    /// Returns the first controller error.
    pub async fn devices_at(&self, path: &SitePath) -> Result<Vec<SiteDevice>> {
        let mut devices = Vec::new();
        for (name, id) in self.resolve(path).await? {
            let found = drain(self.pagination, |offset, limit| {
                self.api.list_devices_at_site(&id, offset, limit)
            })
            .await?;
            debug!(site = %name, count = found.len(), "devices listed");
            devices.extend(found);
        }
        Ok(devices)
    }
}
