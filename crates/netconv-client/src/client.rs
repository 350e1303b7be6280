//! Version-gated, retrying controller client.

use crate::controller::Controller;
use crate::methods::{self, MethodSpec};
use crate::models::role::RoleList;
use crate::models::user::UserList;
use crate::models::{
    AaaSettings, BannerSettings, DhcpSettings, DnsSettings, GlobalPool, GlobalPoolCreate,
    GlobalPoolUpdate, LegacyNetworkSettings, NetworkSettingEntry, NewRole, NewUser, NtpSettings,
    PoolSettings, ReservePoolRequest, Reservation, Role, RoleUpdate, Site, SiteDevice,
    TelemetrySettings, TimeZoneSettings, User, UserUpdate,
};
use crate::transport::{ApiRequest, Transport};
use crate::Result;
use async_trait::async_trait;
use netconv_core::client::RetryPolicy;
use netconv_core::ids::{GlobalPoolId, ReservationId, RoleId, SiteId, UserId};
use netconv_core::query::QueryParams;
use netconv_core::version::MINIMUM_SUPPORTED;
use netconv_core::{ControllerVersion, Error};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::future::Future;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

const USER_PATH: &str = "/dna/system/api/v1/user";
const ROLES_PATH: &str = "/dna/system/api/v1/roles";
const ROLE_PATH: &str = "/dna/system/api/v1/role";
const GLOBAL_POOL_PATH: &str = "/dna/intent/api/v1/global-pool";
const RESERVED_POOL_PATH: &str = "/dna/intent/api/v1/reserve-ip-subpool";
const SITE_PATH: &str = "/dna/intent/api/v1/site";
const MEMBERSHIP_PATH: &str = "/dna/intent/api/v1/membership";
const SITES_PATH: &str = "/dna/intent/api/v1/sites";
const NETWORK_PATH: &str = "/dna/intent/api/v1/network";

/// Controller facade over a [`Transport`].
///
/// Every call is checked against [`methods::METHODS`], retried on transport
/// failures within the [`RetryPolicy`] budget, and unwrapped from the
/// controller's `{"response": ...}` envelope.
pub struct ControllerClient<T> {
    transport: T,
    retry: RetryPolicy,
    version: ControllerVersion,
}

impl<T: Transport> ControllerClient<T> {
    /// Read the controller release and refuse releases below the supported
    /// minimum.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedVersion`] for an old controller, or the
    /// transport error if the release cannot be read.
    pub async fn connect(transport: T, retry: RetryPolicy) -> Result<Self> {
        let raw = retrying(retry, "controller_version", || transport.controller_version()).await?;
        let version = ControllerVersion::parse(&raw)?;

        if !version.at_least(&ControllerVersion::minimum_supported()) {
            return Err(Error::UnsupportedVersion {
                method: "connect".to_string(),
                required: MINIMUM_SUPPORTED.to_string(),
                actual: version.to_string(),
            });
        }

        info!(%version, "connected to controller");
        Ok(Self::with_version(transport, retry, version))
    }

    /// Build a client for a release that is already known.
    #[must_use]
    pub const fn with_version(
        transport: T,
        retry: RetryPolicy,
        version: ControllerVersion,
    ) -> Self {
        Self {
            transport,
            retry,
            version,
        }
    }

    fn gate(&self, spec: &MethodSpec) -> Result<()> {
        if spec.supported_by(&self.version) {
            Ok(())
        } else {
            Err(Error::UnsupportedVersion {
                method: spec.name.to_string(),
                required: spec.min_version.to_string(),
                actual: self.version.to_string(),
            })
        }
    }

    async fn call(&self, spec: &MethodSpec, request: ApiRequest) -> Result<Value> {
        self.gate(spec)?;
        debug!(method = spec.name, path = %request.path, "controller call");
        retrying(self.retry, spec.name, || self.transport.send(request.clone())).await
    }

    async fn fetch<R>(&self, spec: &MethodSpec, request: ApiRequest) -> Result<R>
    where
        R: DeserializeOwned + Default,
    {
        let body = self.call(spec, request).await?;
        decode_response(spec, body)
    }

    async fn submit<B>(&self, spec: &MethodSpec, request: ApiRequest, body: &B) -> Result<()>
    where
        B: Serialize + ?Sized + Sync,
    {
        let body = serde_json::to_value(body)?;
        self.call(spec, request.with_body(body)).await.map(|_| ())
    }

    async fn get_aspect<R>(
        &self,
        spec: &MethodSpec,
        site_id: &SiteId,
        aspect: &str,
        key: Option<&str>,
    ) -> Result<R>
    where
        R: DeserializeOwned + Default,
    {
        let path = format!("{SITES_PATH}/{site_id}/{aspect}");
        let body = self.call(spec, ApiRequest::get(path)).await?;
        let response = take_response(body);
        let inner = match key {
            Some(key) => match response {
                Value::Object(mut map) => map.remove(key).unwrap_or(Value::Null),
                _ => Value::Null,
            },
            None => response,
        };
        decode_value(spec, inner)
    }

    async fn set_aspect<B>(
        &self,
        spec: &MethodSpec,
        site_id: &SiteId,
        aspect: &str,
        key: Option<&str>,
        settings: &B,
    ) -> Result<()>
    where
        B: Serialize + Sync,
    {
        let path = format!("{SITES_PATH}/{site_id}/{aspect}");
        let value = serde_json::to_value(settings)?;
        let body = match key {
            Some(key) => json!({ key: value }),
            None => value,
        };
        self.call(spec, ApiRequest::put(path, body)).await.map(|_| ())
    }
}

#[async_trait]
impl<T: Transport> Controller for ControllerClient<T> {
    fn version(&self) -> &ControllerVersion {
        &self.version
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let request = ApiRequest::get(USER_PATH)
            .with_query(QueryParams::new().with("invokeSource", "external"));
        let list: UserList = self.fetch(&methods::LIST_USERS, request).await?;
        Ok(list.users)
    }

    async fn list_roles(&self) -> Result<Vec<Role>> {
        let list: RoleList = self.fetch(&methods::LIST_ROLES, ApiRequest::get(ROLES_PATH)).await?;
        Ok(list.roles)
    }

    async fn add_user(&self, user: &NewUser) -> Result<()> {
        self.submit(&methods::ADD_USER, ApiRequest::new(reqwest::Method::POST, USER_PATH), user)
            .await
    }

    async fn update_user(&self, user: &UserUpdate) -> Result<()> {
        self.submit(&methods::UPDATE_USER, ApiRequest::new(reqwest::Method::PUT, USER_PATH), user)
            .await
    }

    async fn delete_user(&self, id: &UserId) -> Result<()> {
        let path = format!("{USER_PATH}/{id}");
        self.call(&methods::DELETE_USER, ApiRequest::delete(path))
            .await
            .map(|_| ())
    }

    async fn add_role(&self, role: &NewRole) -> Result<()> {
        self.submit(&methods::ADD_ROLE, ApiRequest::new(reqwest::Method::POST, ROLE_PATH), role)
            .await
    }

    async fn update_role(&self, role: &RoleUpdate) -> Result<()> {
        self.submit(&methods::UPDATE_ROLE, ApiRequest::new(reqwest::Method::PUT, ROLE_PATH), role)
            .await
    }

    async fn delete_role(&self, id: &RoleId) -> Result<()> {
        let path = format!("{ROLE_PATH}/{id}");
        self.call(&methods::DELETE_ROLE, ApiRequest::delete(path))
            .await
            .map(|_| ())
    }

    async fn list_global_pools(&self, offset: u32, limit: u32) -> Result<Vec<GlobalPool>> {
        let request =
            ApiRequest::get(GLOBAL_POOL_PATH).with_query(QueryParams::page(offset, limit));
        self.fetch(&methods::LIST_GLOBAL_POOLS, request).await
    }

    async fn create_global_pool(&self, pools: &[GlobalPoolCreate]) -> Result<()> {
        let body = PoolSettings::new(pools.to_vec());
        self.submit(
            &methods::CREATE_GLOBAL_POOL,
            ApiRequest::new(reqwest::Method::POST, GLOBAL_POOL_PATH),
            &body,
        )
        .await
    }

    async fn update_global_pool(&self, pools: &[GlobalPoolUpdate]) -> Result<()> {
        let body = PoolSettings::new(pools.to_vec());
        self.submit(
            &methods::UPDATE_GLOBAL_POOL,
            ApiRequest::new(reqwest::Method::PUT, GLOBAL_POOL_PATH),
            &body,
        )
        .await
    }

    async fn delete_global_pool(&self, id: &GlobalPoolId) -> Result<()> {
        let path = format!("{GLOBAL_POOL_PATH}/{id}");
        self.call(&methods::DELETE_GLOBAL_POOL, ApiRequest::delete(path))
            .await
            .map(|_| ())
    }

    async fn list_reserved_pools(
        &self,
        site_id: &SiteId,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<Reservation>> {
        let request = ApiRequest::get(RESERVED_POOL_PATH)
            .with_query(QueryParams::page(offset, limit).with("siteId", site_id));
        self.fetch(&methods::LIST_RESERVED_POOLS, request).await
    }

    async fn reserve_pool(&self, site_id: &SiteId, request: &ReservePoolRequest) -> Result<()> {
        let path = format!("{RESERVED_POOL_PATH}/{site_id}");
        self.submit(
            &methods::RESERVE_POOL,
            ApiRequest::new(reqwest::Method::POST, path),
            request,
        )
        .await
    }

    async fn update_reserved_pool(
        &self,
        site_id: &SiteId,
        id: &ReservationId,
        request: &ReservePoolRequest,
    ) -> Result<()> {
        let path = format!("{RESERVED_POOL_PATH}/{site_id}");
        let api = ApiRequest::new(reqwest::Method::PUT, path)
            .with_query(QueryParams::new().with("id", id));
        self.submit(&methods::UPDATE_RESERVED_POOL, api, request).await
    }

    async fn release_reserved_pool(&self, id: &ReservationId) -> Result<()> {
        let path = format!("{RESERVED_POOL_PATH}/{id}");
        self.call(&methods::RELEASE_RESERVED_POOL, ApiRequest::delete(path))
            .await
            .map(|_| ())
    }

    async fn get_site(&self, path: &str) -> Result<Vec<Site>> {
        let request = ApiRequest::get(SITE_PATH).with_query(QueryParams::new().with("name", path));
        match self.fetch(&methods::GET_SITE, request).await {
            Err(Error::NotFound(_)) => Ok(Vec::new()),
            other => other,
        }
    }

    async fn list_devices_at_site(
        &self,
        site_id: &SiteId,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<SiteDevice>> {
        #[derive(serde::Deserialize, Default)]
        struct Membership {
            #[serde(default)]
            device: Vec<DeviceGroup>,
        }
        #[derive(serde::Deserialize, Default)]
        struct DeviceGroup {
            #[serde(default)]
            response: Vec<SiteDevice>,
        }

        let path = format!("{MEMBERSHIP_PATH}/{site_id}");
        let request = ApiRequest::get(path).with_query(QueryParams::page(offset, limit));
        let body = self.call(&methods::LIST_DEVICES_AT_SITE, request).await?;
        let membership: Membership = decode_value(&methods::LIST_DEVICES_AT_SITE, body)?;
        Ok(membership
            .device
            .into_iter()
            .flat_map(|group| group.response)
            .collect())
    }

    async fn get_dhcp(&self, site_id: &SiteId) -> Result<DhcpSettings> {
        self.get_aspect(&methods::GET_DHCP, site_id, "dhcpSettings", Some("dhcp"))
            .await
    }

    async fn set_dhcp(&self, site_id: &SiteId, settings: &DhcpSettings) -> Result<()> {
        self.set_aspect(&methods::SET_DHCP, site_id, "dhcpSettings", Some("dhcp"), settings)
            .await
    }

    async fn get_dns(&self, site_id: &SiteId) -> Result<DnsSettings> {
        self.get_aspect(&methods::GET_DNS, site_id, "dnsSettings", Some("dns"))
            .await
    }

    async fn set_dns(&self, site_id: &SiteId, settings: &DnsSettings) -> Result<()> {
        self.set_aspect(&methods::SET_DNS, site_id, "dnsSettings", Some("dns"), settings)
            .await
    }

    async fn get_ntp(&self, site_id: &SiteId) -> Result<NtpSettings> {
        self.get_aspect(&methods::GET_NTP, site_id, "ntpSettings", Some("ntp"))
            .await
    }

    async fn set_ntp(&self, site_id: &SiteId, settings: &NtpSettings) -> Result<()> {
        self.set_aspect(&methods::SET_NTP, site_id, "ntpSettings", Some("ntp"), settings)
            .await
    }

    async fn get_timezone(&self, site_id: &SiteId) -> Result<TimeZoneSettings> {
        self.get_aspect(&methods::GET_TIMEZONE, site_id, "timeZoneSettings", Some("timeZone"))
            .await
    }

    async fn set_timezone(&self, site_id: &SiteId, settings: &TimeZoneSettings) -> Result<()> {
        self.set_aspect(
            &methods::SET_TIMEZONE,
            site_id,
            "timeZoneSettings",
            Some("timeZone"),
            settings,
        )
        .await
    }

    async fn get_banner(&self, site_id: &SiteId) -> Result<BannerSettings> {
        self.get_aspect(&methods::GET_BANNER, site_id, "bannerSettings", Some("banner"))
            .await
    }

    async fn set_banner(&self, site_id: &SiteId, settings: &BannerSettings) -> Result<()> {
        self.set_aspect(&methods::SET_BANNER, site_id, "bannerSettings", Some("banner"), settings)
            .await
    }

    async fn get_aaa(&self, site_id: &SiteId) -> Result<AaaSettings> {
        self.get_aspect(&methods::GET_AAA, site_id, "aaaSettings", None)
            .await
    }

    async fn set_aaa(&self, site_id: &SiteId, settings: &AaaSettings) -> Result<()> {
        self.set_aspect(&methods::SET_AAA, site_id, "aaaSettings", None, settings)
            .await
    }

    async fn get_telemetry(&self, site_id: &SiteId) -> Result<TelemetrySettings> {
        self.get_aspect(&methods::GET_TELEMETRY, site_id, "telemetrySettings", None)
            .await
    }

    async fn set_telemetry(&self, site_id: &SiteId, settings: &TelemetrySettings) -> Result<()> {
        self.set_aspect(&methods::SET_TELEMETRY, site_id, "telemetrySettings", None, settings)
            .await
    }

    async fn get_network_settings(&self, site_id: &SiteId) -> Result<Vec<NetworkSettingEntry>> {
        let request =
            ApiRequest::get(NETWORK_PATH).with_query(QueryParams::new().with("siteId", site_id));
        self.fetch(&methods::GET_NETWORK_SETTINGS, request).await
    }

    async fn update_network_settings(
        &self,
        site_id: &SiteId,
        settings: &LegacyNetworkSettings,
    ) -> Result<()> {
        let path = format!("{NETWORK_PATH}/{site_id}");
        let body = json!({ "settings": serde_json::to_value(settings)? });
        self.call(&methods::UPDATE_NETWORK_SETTINGS, ApiRequest::put(path, body))
            .await
            .map(|_| ())
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy's retry or time budget is spent.
///
/// Each attempt is bounded by the time left in the budget. A `Forbidden`
/// error is re-tagged with `method`.
async fn retrying<R, F, Fut>(policy: RetryPolicy, method: &'static str, mut op: F) -> Result<R>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<R>>,
{
    let started = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let remaining = policy.timeout.saturating_sub(started.elapsed());
        let outcome = match timeout(remaining, op()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(Error::Timeout(format!(
                "`{method}` did not complete within {}s",
                policy.timeout.as_secs()
            ))),
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(Error::Forbidden { message, .. }) => {
                return Err(Error::Forbidden {
                    method: method.to_string(),
                    message,
                })
            }
            Err(err)
                if err.is_retryable() && policy.allows_another(attempts, started.elapsed()) =>
            {
                warn!(method, attempt = attempts, error = %err, "retrying controller call");
                sleep(policy.interval).await;
            }
            Err(err) => return Err(err),
        }
    }
}

fn take_response(body: Value) -> Value {
    match body {
        Value::Object(mut map) => map.remove("response").unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn decode_response<R>(spec: &MethodSpec, body: Value) -> Result<R>
where
    R: DeserializeOwned + Default,
{
    decode_value(spec, take_response(body))
}

fn decode_value<R>(spec: &MethodSpec, value: Value) -> Result<R>
where
    R: DeserializeOwned + Default,
{
    if value.is_null() {
        return Ok(R::default());
    }
    serde_json::from_value(value)
        .map_err(|err| Error::Parse(format!("`{}` returned an unexpected body: {err}", spec.name)))
}
