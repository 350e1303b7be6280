//! Minimum controller release per facade method.
//!
//! Every method the facade exposes has one entry here. The facade refuses a
//! call below the listed release before touching the network.

use netconv_core::version::MINIMUM_SUPPORTED;
use netconv_core::ControllerVersion;

/// Release that introduced the per-aspect site settings endpoints.
pub const SITE_SETTINGS_RELEASE: &str = "2.3.7.6";

/// A facade method and the oldest release that serves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodSpec {
    /// Facade method name, used in errors and logs
    pub name: &'static str,
    /// Oldest release serving the method
    pub min_version: &'static str,
}

impl MethodSpec {
    const fn baseline(name: &'static str) -> Self {
        Self {
            name,
            min_version: MINIMUM_SUPPORTED,
        }
    }

    const fn since(name: &'static str, min_version: &'static str) -> Self {
        Self { name, min_version }
    }

    /// Returns true if `version` serves this method.
    #[must_use]
    pub fn supported_by(&self, version: &ControllerVersion) -> bool {
        version.at_least_str(self.min_version)
    }
}

macro_rules! methods {
    ($($(#[$meta:meta])* $ident:ident = $spec:expr;)*) => {
        $(
            $(#[$meta])*
            pub const $ident: MethodSpec = $spec;
        )*

        /// Every facade method, in declaration order.
        pub const METHODS: &[MethodSpec] = &[$($ident),*];
    };
}

methods! {
    /// List user accounts
    LIST_USERS = MethodSpec::baseline("list_users");
    /// List roles
    LIST_ROLES = MethodSpec::baseline("list_roles");
    /// Create a user
    ADD_USER = MethodSpec::baseline("add_user");
    /// Update a user
    UPDATE_USER = MethodSpec::baseline("update_user");
    /// Delete a user
    DELETE_USER = MethodSpec::baseline("delete_user");
    /// Create a role
    ADD_ROLE = MethodSpec::baseline("add_role");
    /// Update a role
    UPDATE_ROLE = MethodSpec::baseline("update_role");
    /// Delete a role
    DELETE_ROLE = MethodSpec::since("delete_role", "2.3.7.6");
    /// List one page of global pools
    LIST_GLOBAL_POOLS = MethodSpec::baseline("list_global_pools");
    /// Create global pools
    CREATE_GLOBAL_POOL = MethodSpec::baseline("create_global_pool");
    /// Update global pools
    UPDATE_GLOBAL_POOL = MethodSpec::baseline("update_global_pool");
    /// Delete a global pool
    DELETE_GLOBAL_POOL = MethodSpec::baseline("delete_global_pool");
    /// List one page of a site's reservations
    LIST_RESERVED_POOLS = MethodSpec::baseline("list_reserved_pools");
    /// Reserve a sub-pool at a site
    RESERVE_POOL = MethodSpec::baseline("reserve_pool");
    /// Update a reservation
    UPDATE_RESERVED_POOL = MethodSpec::baseline("update_reserved_pool");
    /// Release a reservation
    RELEASE_RESERVED_POOL = MethodSpec::baseline("release_reserved_pool");
    /// Look up sites by path
    GET_SITE = MethodSpec::baseline("get_site");
    /// List one page of a site's devices
    LIST_DEVICES_AT_SITE = MethodSpec::baseline("list_devices_at_site");
    /// Read DHCP settings
    GET_DHCP = MethodSpec::since("get_dhcp", SITE_SETTINGS_RELEASE);
    /// Write DHCP settings
    SET_DHCP = MethodSpec::since("set_dhcp", SITE_SETTINGS_RELEASE);
    /// Read DNS settings
    GET_DNS = MethodSpec::since("get_dns", SITE_SETTINGS_RELEASE);
    /// Write DNS settings
    SET_DNS = MethodSpec::since("set_dns", SITE_SETTINGS_RELEASE);
    /// Read NTP settings
    GET_NTP = MethodSpec::since("get_ntp", SITE_SETTINGS_RELEASE);
    /// Write NTP settings
    SET_NTP = MethodSpec::since("set_ntp", SITE_SETTINGS_RELEASE);
    /// Read time zone settings
    GET_TIMEZONE = MethodSpec::since("get_timezone", SITE_SETTINGS_RELEASE);
    /// Write time zone settings
    SET_TIMEZONE = MethodSpec::since("set_timezone", SITE_SETTINGS_RELEASE);
    /// Read banner settings
    GET_BANNER = MethodSpec::since("get_banner", SITE_SETTINGS_RELEASE);
    /// Write banner settings
    SET_BANNER = MethodSpec::since("set_banner", SITE_SETTINGS_RELEASE);
    /// Read AAA settings
    GET_AAA = MethodSpec::since("get_aaa", SITE_SETTINGS_RELEASE);
    /// Write AAA settings
    SET_AAA = MethodSpec::since("set_aaa", SITE_SETTINGS_RELEASE);
    /// Read telemetry settings
    GET_TELEMETRY = MethodSpec::since("get_telemetry", SITE_SETTINGS_RELEASE);
    /// Write telemetry settings
    SET_TELEMETRY = MethodSpec::since("set_telemetry", SITE_SETTINGS_RELEASE);
    /// Read the combined settings document
    GET_NETWORK_SETTINGS = MethodSpec::baseline("get_network_settings");
    /// Write the combined settings document
    UPDATE_NETWORK_SETTINGS = MethodSpec::baseline("update_network_settings");
}

/// Look a method up by name.
#[must_use]
pub fn lookup(name: &str) -> Option<&'static MethodSpec> {
    METHODS.iter().find(|spec| spec.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_are_unique() {
        let names: HashSet<_> = METHODS.iter().map(|spec| spec.name).collect();
        assert_eq!(names.len(), METHODS.len());
    }

    #[test]
    fn every_minimum_parses_and_is_at_least_baseline() {
        let baseline = ControllerVersion::minimum_supported();
        for spec in METHODS {
            let version = ControllerVersion::parse(spec.min_version).unwrap();
            assert!(version >= baseline, "{} below baseline", spec.name);
        }
    }

    #[test]
    fn role_deletion_needs_newer_release() {
        let old = ControllerVersion::parse("2.3.5.3").unwrap();
        let new = ControllerVersion::parse("2.3.7.6").unwrap();
        assert!(!DELETE_ROLE.supported_by(&old));
        assert!(DELETE_ROLE.supported_by(&new));
        assert!(ADD_ROLE.supported_by(&old));
        assert_eq!(lookup("get_dhcp"), Some(&GET_DHCP));
        assert_eq!(lookup("nope"), None);
    }
}
