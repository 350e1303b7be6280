//! The controller method surface.
//!
//! The engine only talks to the controller through [`Controller`]. The
//! production implementation is [`crate::ControllerClient`]; tests substitute
//! an in-memory controller.

use crate::methods::MethodSpec;
use crate::models::{
    AaaSettings, BannerSettings, DhcpSettings, DnsSettings, GlobalPool, GlobalPoolCreate,
    GlobalPoolUpdate, LegacyNetworkSettings, NetworkSettingEntry, NewRole, NewUser, NtpSettings,
    ReservePoolRequest, Reservation, Role, RoleUpdate, Site, SiteDevice, TelemetrySettings,
    TimeZoneSettings, User, UserUpdate,
};
use crate::Result;
use async_trait::async_trait;
use netconv_core::ids::{GlobalPoolId, ReservationId, RoleId, SiteId, UserId};
use netconv_core::ControllerVersion;

/// Operations the reconciler needs from the controller.
///
/// List methods return one page; callers drain them with
/// [`crate::pagination`]. Mutations return once the controller has accepted
/// the request.
#[async_trait]
pub trait Controller: Send + Sync {
    /// Release of the connected controller.
    fn version(&self) -> &ControllerVersion;

    /// Returns true if the connected controller serves `method`.
    fn supports(&self, method: &MethodSpec) -> bool {
        method.supported_by(self.version())
    }

    /// All user accounts.
    async fn list_users(&self) -> Result<Vec<User>>;
    /// All roles.
    async fn list_roles(&self) -> Result<Vec<Role>>;
    /// Create a user.
    async fn add_user(&self, user: &NewUser) -> Result<()>;
    /// Update a user.
    async fn update_user(&self, user: &UserUpdate) -> Result<()>;
    /// Delete a user.
    async fn delete_user(&self, id: &UserId) -> Result<()>;
    /// Create a role.
    async fn add_role(&self, role: &NewRole) -> Result<()>;
    /// Replace a role's description and permissions.
    async fn update_role(&self, role: &RoleUpdate) -> Result<()>;
    /// Delete a role.
    async fn delete_role(&self, id: &RoleId) -> Result<()>;

    /// One page of global pools.
    async fn list_global_pools(&self, offset: u32, limit: u32) -> Result<Vec<GlobalPool>>;
    /// Create a batch of global pools.
    async fn create_global_pool(&self, pools: &[GlobalPoolCreate]) -> Result<()>;
    /// Update a batch of global pools.
    async fn update_global_pool(&self, pools: &[GlobalPoolUpdate]) -> Result<()>;
    /// Delete a global pool.
    async fn delete_global_pool(&self, id: &GlobalPoolId) -> Result<()>;

    /// One page of reservations at a site.
    async fn list_reserved_pools(
        &self,
        site_id: &SiteId,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<Reservation>>;
    /// Reserve a sub-pool at a site.
    async fn reserve_pool(&self, site_id: &SiteId, request: &ReservePoolRequest) -> Result<()>;
    /// Update a reservation.
    async fn update_reserved_pool(
        &self,
        site_id: &SiteId,
        id: &ReservationId,
        request: &ReservePoolRequest,
    ) -> Result<()>;
    /// Release a reservation.
    async fn release_reserved_pool(&self, id: &ReservationId) -> Result<()>;

    /// Sites matching a path; a trailing `/.*` selects all descendants.
    ///
    /// An unknown path yields an empty list.
    async fn get_site(&self, path: &str) -> Result<Vec<Site>>;
    /// One page of devices assigned to a site.
    async fn list_devices_at_site(
        &self,
        site_id: &SiteId,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<SiteDevice>>;

    /// DHCP settings of a site.
    async fn get_dhcp(&self, site_id: &SiteId) -> Result<DhcpSettings>;
    /// Write DHCP settings of a site.
    async fn set_dhcp(&self, site_id: &SiteId, settings: &DhcpSettings) -> Result<()>;
    /// DNS settings of a site.
    async fn get_dns(&self, site_id: &SiteId) -> Result<DnsSettings>;
    /// Write DNS settings of a site.
    async fn set_dns(&self, site_id: &SiteId, settings: &DnsSettings) -> Result<()>;
    /// NTP settings of a site.
    async fn get_ntp(&self, site_id: &SiteId) -> Result<NtpSettings>;
    /// Write NTP settings of a site.
    async fn set_ntp(&self, site_id: &SiteId, settings: &NtpSettings) -> Result<()>;
    /// Time zone of a site.
    async fn get_timezone(&self, site_id: &SiteId) -> Result<TimeZoneSettings>;
    /// Write the time zone of a site.
    async fn set_timezone(&self, site_id: &SiteId, settings: &TimeZoneSettings) -> Result<()>;
    /// Banner of a site.
    async fn get_banner(&self, site_id: &SiteId) -> Result<BannerSettings>;
    /// Write the banner of a site.
    async fn set_banner(&self, site_id: &SiteId, settings: &BannerSettings) -> Result<()>;
    /// AAA settings of a site.
    async fn get_aaa(&self, site_id: &SiteId) -> Result<AaaSettings>;
    /// Write AAA settings of a site.
    async fn set_aaa(&self, site_id: &SiteId, settings: &AaaSettings) -> Result<()>;
    /// Telemetry settings of a site.
    async fn get_telemetry(&self, site_id: &SiteId) -> Result<TelemetrySettings>;
    /// Write telemetry settings of a site.
    async fn set_telemetry(&self, site_id: &SiteId, settings: &TelemetrySettings) -> Result<()>;

    /// Combined settings document of a site (controllers before 2.3.7.6).
    async fn get_network_settings(&self, site_id: &SiteId) -> Result<Vec<NetworkSettingEntry>>;
    /// Write the combined settings document of a site.
    async fn update_network_settings(
        &self,
        site_id: &SiteId,
        settings: &LegacyNetworkSettings,
    ) -> Result<()>;
}
