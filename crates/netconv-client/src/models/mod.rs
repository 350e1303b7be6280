//! Wire models for the controller REST API.
//!
//! Field names are camelCase on the wire and snake_case in Rust; serde does
//! the renaming here so nothing above the client crate sees wire spelling.

pub mod device;
pub mod pool;
pub mod reserved;
pub mod role;
pub mod settings;
pub mod site;
pub mod user;

use serde::{Deserialize, Serialize};

pub use device::SiteDevice;
pub use pool::{GlobalPool, GlobalPoolCreate, GlobalPoolUpdate, PoolSettings, PoolType};
pub use reserved::{ReservationContext, ReservePoolRequest, Reservation, ReservationSubPool};
pub use role::{NewRole, Operation, ResourceType, Role, RoleList, RoleUpdate};
pub use settings::{
    AaaServer, AaaSettings, ApplicationVisibility, BannerSettings, DhcpSettings, DnsSettings,
    LegacyAaa, LegacyBanner, LegacyDns, LegacyNetflow, LegacyNetworkSettings, LegacyReceivers,
    NetflowCollector, NetworkSettingEntry, NtpSettings, SnmpTraps, Syslogs, TelemetrySettings,
    TimeZoneSettings, WiredDataCollection, WirelessTelemetry,
};
pub use site::{Site, SiteInfo};
pub use user::{NewUser, User, UserList, UserUpdate};

/// The `{"response": ...}` wrapper every controller reply carries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope<T> {
    /// Wrapped payload
    pub response: T,
}

/// Asynchronous task handle returned by mutating endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskHandle {
    /// Task identifier, when the endpoint schedules a task
    #[serde(default)]
    pub task_id: Option<String>,
    /// Status URL for the task
    #[serde(default)]
    pub url: Option<String>,
}
