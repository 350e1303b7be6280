//! Input validation and normalization.
//!
//! Runs once, before anything touches the controller. Every failure is an
//! [`Error::InputInvalid`] carrying the dotted path of the offending field,
//! which makes the whole run fatal. Passwords are strength-checked here and
//! sealed immediately; nothing downstream sees them in plaintext.

use crate::input::{
    AaaInput, AaaServerType, CollectorType, GlobalPoolInput, InputDocument, NetworkInput,
    PermissionNode, ReservedPoolInput, RoleInput, State, UserInput,
};
use crate::roles::schema::SCHEMA;
use crate::secret::SecretManager;
use netconv_core::types::{AddressSpace, Cidr, SitePath, GLOBAL_SITE};
use netconv_core::{Error, Result};
use secrecy::ExposeSecret;
use std::collections::BTreeSet;
use std::net::IpAddr;
use std::sync::LazyLock;
use tracing::debug;
use validator::Validate;

static POOL_NAME: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[A-Za-z0-9._/-]+$").expect("POOL_NAME is a valid regex pattern")
});

static ROLE_NAME: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[A-Za-z0-9._-]+$").expect("ROLE_NAME is a valid regex pattern")
});

static USERNAME: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[A-Za-z0-9@._-]+$").expect("USERNAME is a valid regex pattern")
});

const PASSWORD_MIN: usize = 9;
const PASSWORD_MAX: usize = 20;
const PASSWORD_CLASSES: usize = 3;
const SHARED_SECRET_MIN: usize = 4;

/// Validate and normalize a document.
///
/// Normalization fills a global pool's address space from its CIDR, defaults
/// a network entry's site to `Global`, and replaces plaintext passwords with
/// sealed ones.
///
/// # Errors
///
/// Returns [`Error::InputInvalid`] for the first invalid field, or
/// [`Error::Crypto`] if a password cannot be sealed.
pub fn validate(mut doc: InputDocument, secrets: &dyn SecretManager) -> Result<InputDocument> {
    let state = doc.state;
    let config = &mut doc.config;

    if let Some(details) = config.global_pool_details.as_mut() {
        global_pools(&mut details.settings.ip_pool, state)?;
    }
    reserved_pools(&config.reserve_pool_details, state)?;
    network(&mut config.network_management_details)?;
    roles(&config.role_details)?;
    users(&mut config.user_details, secrets)?;

    debug!(
        %state,
        global_pools = config.global_pools().len(),
        reserved_pools = config.reserve_pool_details.len(),
        network = config.network_management_details.len(),
        roles = config.role_details.len(),
        users = config.user_details.len(),
        "input validated"
    );
    Ok(doc)
}

/// Run derive-based field checks, reporting the first failing field.
fn fields<T: Validate>(record: &T, path: &str) -> Result<()> {
    let Err(errors) = record.validate() else {
        return Ok(());
    };
    let mut failures: Vec<(String, String)> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errors)| {
            errors
                .iter()
                .map(move |error| (field.to_string(), format!("failed `{}` check", error.code)))
        })
        .collect();
    failures.sort();
    let (field, message) = failures
        .into_iter()
        .next()
        .unwrap_or_else(|| ("config".to_string(), errors.to_string()));
    Err(Error::input(format!("{path}.{field}"), message))
}

fn pool_name(name: &str, path: &str) -> Result<()> {
    if POOL_NAME.is_match(name) {
        Ok(())
    } else {
        Err(Error::input(
            path,
            format!("`{name}` may only contain letters, digits and `-_./`"),
        ))
    }
}

fn cidr(value: &str, space: AddressSpace, path: &str) -> Result<Cidr> {
    let parsed = Cidr::parse(value).map_err(|err| Error::input(path, err.to_string()))?;
    if parsed.space() == space {
        Ok(parsed)
    } else {
        Err(Error::input(path, format!("`{value}` is not an {space} block")))
    }
}

fn ip_address(value: &str, path: &str) -> Result<IpAddr> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::input(path, format!("`{value}` is not an IP address")))
}

fn ip_in(value: &str, space: AddressSpace, path: &str) -> Result<()> {
    let address = ip_address(value, path)?;
    if address.is_ipv6() == space.is_v6() {
        Ok(())
    } else {
        Err(Error::input(path, format!("`{value}` is not an {space} address")))
    }
}

fn ip_list(values: Option<&[String]>, path: &str) -> Result<()> {
    for (index, value) in values.unwrap_or_default().iter().enumerate() {
        ip_address(value, &format!("{path}[{index}]"))?;
    }
    Ok(())
}

fn site(value: Option<&str>, path: &str) -> Result<SitePath> {
    let value = value
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| Error::input(path, "site_name is required"))?;
    let parsed = SitePath::parse(value).map_err(|err| match err {
        Error::InputInvalid { message, .. } => Error::input(path, message),
        other => other,
    })?;
    if parsed.selects_descendants() {
        return Err(Error::input(path, "a single site is required here"));
    }
    Ok(parsed)
}

/// Name of an entry, empty only for a deleted-state sweep.
fn entry_name<'a>(
    name: Option<&'a str>,
    force_delete: bool,
    state: State,
    path: &str,
) -> Result<Option<&'a str>> {
    match name.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => {
            pool_name(name, path)?;
            Ok(Some(name))
        }
        None if state == State::Deleted && force_delete => Ok(None),
        None => Err(Error::input(path, "name is required")),
    }
}

fn global_pools(pools: &mut [GlobalPoolInput], state: State) -> Result<()> {
    let mut seen = BTreeSet::new();

    for (index, pool) in pools.iter_mut().enumerate() {
        let path = format!("global_pool_details.settings.ip_pool[{index}]");
        fields(&*pool, &path)?;

        let name_path = format!("{path}.name");
        if let Some(name) = entry_name(pool.name.as_deref(), pool.force_delete, state, &name_path)? {
            if !seen.insert(name.to_string()) {
                return Err(Error::input(name_path, format!("`{name}` is listed twice")));
            }
        }
        if let Some(prev) = pool.prev_name.as_deref() {
            pool_name(prev, &format!("{path}.prev_name"))?;
        }

        if let Some(value) = pool.cidr.as_deref() {
            let parsed = Cidr::parse(value)
                .map_err(|err| Error::input(format!("{path}.cidr"), err.to_string()))?;
            match pool.ip_address_space {
                Some(space) if space != parsed.space() => {
                    return Err(Error::input(
                        format!("{path}.ip_address_space"),
                        format!("`{value}` is not an {space} block"),
                    ));
                }
                Some(_) => {}
                None => pool.ip_address_space = Some(parsed.space()),
            }
        }

        if let Some(gateway) = pool.gateway.as_deref().filter(|gw| !gw.is_empty()) {
            ip_address(gateway, &format!("{path}.gateway"))?;
        }
        ip_list(pool.dhcp_server_ips.as_deref(), &format!("{path}.dhcp_server_ips"))?;
        ip_list(pool.dns_server_ips.as_deref(), &format!("{path}.dns_server_ips"))?;
    }
    Ok(())
}

fn reserved_pools(pools: &[ReservedPoolInput], state: State) -> Result<()> {
    let mut seen = BTreeSet::new();

    for (index, pool) in pools.iter().enumerate() {
        let path = format!("reserve_pool_details[{index}]");
        fields(pool, &path)?;

        let site_path = site(pool.site_name.as_deref(), &format!("{path}.site_name"))?;
        let name_path = format!("{path}.name");
        if let Some(name) = entry_name(pool.name.as_deref(), pool.force_delete, state, &name_path)? {
            if !seen.insert((site_path.to_string(), name.to_string())) {
                return Err(Error::input(
                    name_path,
                    format!("`{name}` is listed twice for {site_path}"),
                ));
            }
        }
        if let Some(prev) = pool.prev_name.as_deref() {
            pool_name(prev, &format!("{path}.prev_name"))?;
        }

        half(
            &path,
            "ipv4",
            AddressSpace::V4,
            pool.ipv4_global_pool.as_deref(),
            pool.ipv4_global_pool_name.as_deref(),
            pool.ipv4_prefix,
            pool.ipv4_prefix_length,
            pool.ipv4_total_host,
            pool.ipv4_subnet.as_deref(),
            pool.ipv4_gateway.as_deref(),
        )?;
        ip_list(pool.ipv4_dhcp_servers.as_deref(), &format!("{path}.ipv4_dhcp_servers"))?;
        ip_list(pool.ipv4_dns_servers.as_deref(), &format!("{path}.ipv4_dns_servers"))?;

        half(
            &path,
            "ipv6",
            AddressSpace::V6,
            pool.ipv6_global_pool.as_deref(),
            pool.ipv6_global_pool_name.as_deref(),
            pool.ipv6_prefix,
            pool.ipv6_prefix_length,
            pool.ipv6_total_host,
            pool.ipv6_subnet.as_deref(),
            pool.ipv6_gateway.as_deref(),
        )?;
        ip_list(pool.ipv6_dhcp_servers.as_deref(), &format!("{path}.ipv6_dhcp_servers"))?;
        ip_list(pool.ipv6_dns_servers.as_deref(), &format!("{path}.ipv6_dns_servers"))?;
    }
    Ok(())
}

/// Checks one address-space half of a reservation.
#[allow(clippy::too_many_arguments)]
fn half(
    path: &str,
    prefix: &str,
    space: AddressSpace,
    parent: Option<&str>,
    parent_name: Option<&str>,
    by_prefix: Option<bool>,
    prefix_length: Option<u8>,
    total_host: Option<u64>,
    subnet: Option<&str>,
    gateway: Option<&str>,
) -> Result<()> {
    if parent.is_some() && parent_name.is_some() {
        return Err(Error::input(
            format!("{path}.{prefix}_global_pool_name"),
            format!("set either {prefix}_global_pool or {prefix}_global_pool_name, not both"),
        ));
    }
    if let Some(parent) = parent {
        cidr(parent, space, &format!("{path}.{prefix}_global_pool"))?;
    }
    match by_prefix {
        Some(true) if prefix_length.is_none() => {
            return Err(Error::input(
                format!("{path}.{prefix}_prefix_length"),
                format!("required when {prefix}_prefix is true"),
            ));
        }
        Some(false) if total_host.is_none() => {
            return Err(Error::input(
                format!("{path}.{prefix}_total_host"),
                format!("required when {prefix}_prefix is false"),
            ));
        }
        _ => {}
    }
    if let Some(subnet) = subnet {
        ip_in(subnet, space, &format!("{path}.{prefix}_subnet"))?;
    }
    if let Some(gateway) = gateway.filter(|gw| !gw.is_empty()) {
        ip_in(gateway, space, &format!("{path}.{prefix}_gateway"))?;
    }
    Ok(())
}

fn network(entries: &mut [NetworkInput]) -> Result<()> {
    let mut seen = BTreeSet::new();

    for (index, entry) in entries.iter_mut().enumerate() {
        let path = format!("network_management_details[{index}]");
        let site_name = entry.site_name.get_or_insert_with(|| GLOBAL_SITE.to_string());
        let site_path = site(Some(site_name.as_str()), &format!("{path}.site_name"))?;
        if !seen.insert(site_path.to_string()) {
            return Err(Error::input(
                format!("{path}.site_name"),
                format!("{site_path} is listed twice"),
            ));
        }

        let settings = &entry.settings;
        let path = format!("{path}.settings");

        if let Some(servers) = settings.dhcp_server.as_set() {
            ip_list(Some(servers), &format!("{path}.dhcp_server"))?;
        }
        if let Some(dns) = settings.dns_server.as_set() {
            if let Some(primary) = dns.primary_ip_address.as_deref() {
                ip_address(primary, &format!("{path}.dns_server.primary_ip_address"))?;
            }
            if let Some(secondary) = dns.secondary_ip_address.as_deref() {
                ip_address(secondary, &format!("{path}.dns_server.secondary_ip_address"))?;
            }
        }
        if let Some(servers) = settings.ntp_server.as_set() {
            if let Some(index) = servers.iter().position(|server| server.trim().is_empty()) {
                return Err(Error::input(
                    format!("{path}.ntp_server[{index}]"),
                    "server must not be empty",
                ));
            }
        }
        if let Some(timezone) = settings.timezone.as_set() {
            if timezone.trim().is_empty() {
                return Err(Error::input(format!("{path}.timezone"), "must not be empty"));
            }
        }
        if let Some(banner) = settings.message_of_the_day.as_set() {
            if !banner.retain_existing_banner && banner.banner_message.is_none() {
                return Err(Error::input(
                    format!("{path}.message_of_the_day.banner_message"),
                    "required unless retain_existing_banner is true",
                ));
            }
        }
        if let Some(snmp) = settings.snmp_server.as_set() {
            ip_list(Some(&snmp.ip_addresses), &format!("{path}.snmp_server.ip_addresses"))?;
        }
        if let Some(syslog) = settings.syslog_server.as_set() {
            ip_list(
                Some(&syslog.ip_addresses),
                &format!("{path}.syslog_server.ip_addresses"),
            )?;
        }
        if let Some(netflow) = settings.netflow_collector.as_set() {
            let netflow_path = format!("{path}.netflow_collector");
            if let Some(port) = netflow.port {
                if !(1..=65535).contains(&port) {
                    return Err(Error::input(
                        format!("{netflow_path}.port"),
                        format!("{port} is outside 1-65535"),
                    ));
                }
            }
            if let Some(address) = netflow.ip_address.as_deref() {
                ip_address(address, &format!("{netflow_path}.ip_address"))?;
            }
            if netflow.collector_type == CollectorType::TelemetryBroker
                && (netflow.ip_address.is_none() || netflow.port.is_none())
            {
                return Err(Error::input(
                    netflow_path,
                    "an external collector needs ip_address and port",
                ));
            }
        }

        let network_aaa = settings.network_aaa.as_set();
        let client_aaa = settings.client_and_endpoint_aaa.as_set();
        if let Some(aaa) = network_aaa {
            aaa_server(aaa, &format!("{path}.network_aaa"))?;
        }
        if let Some(aaa) = client_aaa {
            aaa_server(aaa, &format!("{path}.client_and_endpoint_aaa"))?;
        }
        if let (Some(network), Some(client)) = (
            network_aaa.and_then(|aaa| aaa.shared_secret.as_ref()),
            client_aaa.and_then(|aaa| aaa.shared_secret.as_ref()),
        ) {
            if network.expose_secret() != client.expose_secret() {
                return Err(Error::input(
                    format!("{path}.client_and_endpoint_aaa.shared_secret"),
                    "must match network_aaa.shared_secret",
                ));
            }
        }
    }
    Ok(())
}

fn aaa_server(aaa: &AaaInput, path: &str) -> Result<()> {
    match aaa.server_type {
        AaaServerType::Ise if aaa.pan_address.is_none() => {
            return Err(Error::input(
                format!("{path}.pan_address"),
                "required for ISE servers",
            ));
        }
        AaaServerType::Aaa if aaa.primary_server_address.is_none() => {
            return Err(Error::input(
                format!("{path}.primary_server_address"),
                "required for AAA servers",
            ));
        }
        _ => {}
    }
    for (field, value) in [
        ("pan_address", aaa.pan_address.as_deref()),
        ("primary_server_address", aaa.primary_server_address.as_deref()),
        ("secondary_server_address", aaa.secondary_server_address.as_deref()),
    ] {
        if let Some(value) = value {
            ip_address(value, &format!("{path}.{field}"))?;
        }
    }
    if let Some(secret) = aaa.shared_secret.as_ref() {
        if secret.expose_secret().chars().count() < SHARED_SECRET_MIN {
            return Err(Error::input(
                format!("{path}.shared_secret"),
                format!("must be at least {SHARED_SECRET_MIN} characters"),
            ));
        }
    }
    Ok(())
}

fn roles(entries: &[RoleInput]) -> Result<()> {
    let mut seen = BTreeSet::new();

    for (index, role) in entries.iter().enumerate() {
        let path = format!("role_details[{index}]");
        fields(role, &path)?;

        let name = role
            .role_name
            .as_deref()
            .ok_or_else(|| Error::input(format!("{path}.role_name"), "role_name is required"))?;
        if !ROLE_NAME.is_match(name) {
            return Err(Error::input(
                format!("{path}.role_name"),
                format!("`{name}` may only contain letters, digits and `._-`"),
            ));
        }
        if !seen.insert(name) {
            return Err(Error::input(
                format!("{path}.role_name"),
                format!("`{name}` is listed twice"),
            ));
        }

        for category in SCHEMA {
            let Some(blocks) = role.category(category.key) else {
                continue;
            };
            let category_path = format!("{path}.{}", category.key);
            if blocks.len() > 1 {
                return Err(Error::input(category_path, "expects a single object"));
            }
            let Some(block) = blocks.first() else {
                continue;
            };
            for (key, node) in block {
                let key_path = format!("{category_path}.{key}");
                if !category.accepts(key) {
                    return Err(Error::input(key_path, "unknown permission key"));
                }
                let PermissionNode::Nested(nested) = node else {
                    continue;
                };
                if !category.has_group(key) {
                    return Err(Error::input(key_path, "expects read, write or deny"));
                }
                if nested.len() > 1 {
                    return Err(Error::input(key_path, "expects a single object"));
                }
                if let Some(inner) = nested.first() {
                    if let Some(unknown) =
                        inner.keys().find(|inner_key| !category.group_accepts(key, inner_key))
                    {
                        return Err(Error::input(
                            format!("{key_path}.{unknown}"),
                            "unknown permission key",
                        ));
                    }
                }
            }
        }
    }
    Ok(())
}

fn users(entries: &mut [UserInput], secrets: &dyn SecretManager) -> Result<()> {
    let mut seen = BTreeSet::new();

    for (index, user) in entries.iter_mut().enumerate() {
        let path = format!("user_details[{index}]");
        fields(&*user, &path)?;

        match user.username.as_deref() {
            Some(username) => {
                if !USERNAME.is_match(username) {
                    return Err(Error::input(
                        format!("{path}.username"),
                        format!("`{username}` may only contain letters, digits and `@._-`"),
                    ));
                }
                if !seen.insert(username.to_string()) {
                    return Err(Error::input(
                        format!("{path}.username"),
                        format!("`{username}` is listed twice"),
                    ));
                }
            }
            None if user.email.is_none() => {
                return Err(Error::input(
                    format!("{path}.username"),
                    "username or email is required",
                ));
            }
            None => {}
        }

        if let Some(roles) = user.role_list.as_deref() {
            if let Some(index) = roles.iter().position(|role| role.trim().is_empty()) {
                return Err(Error::input(
                    format!("{path}.role_list[{index}]"),
                    "role name must not be empty",
                ));
            }
        }

        if user.password_update && user.password.is_none() {
            return Err(Error::input(
                format!("{path}.password"),
                "required when password_update is true",
            ));
        }
        if let Some(password) = user.password.take() {
            password_strength(password.expose_secret(), &format!("{path}.password"))?;
            user.sealed_password = Some(secrets.encrypt(&password)?);
        }
    }
    Ok(())
}

/// Checks a plaintext password. The password never appears in the error.
pub fn password_strength(password: &str, path: &str) -> Result<()> {
    let chars: Vec<char> = password.chars().collect();
    if !(PASSWORD_MIN..=PASSWORD_MAX).contains(&chars.len()) {
        return Err(Error::input(
            path,
            format!("must be {PASSWORD_MIN} to {PASSWORD_MAX} characters"),
        ));
    }

    let classes = [
        chars.iter().any(|c| c.is_lowercase()),
        chars.iter().any(|c| c.is_uppercase()),
        chars.iter().any(|c| c.is_numeric()),
        chars.iter().any(|c| !c.is_alphanumeric()),
    ]
    .into_iter()
    .filter(|present| *present)
    .count();
    if classes < PASSWORD_CLASSES {
        return Err(Error::input(
            path,
            "must mix at least three of lowercase, uppercase, digits and symbols",
        ));
    }

    let steps: Vec<i64> = chars
        .windows(2)
        .map(|pair| i64::from(u32::from(pair[1])) - i64::from(u32::from(pair[0])))
        .collect();
    if steps.iter().all(|step| *step == 0) {
        return Err(Error::input(path, "must not repeat a single character"));
    }
    if steps.iter().all(|step| *step == 1) || steps.iter().all(|step| *step == -1) {
        return Err(Error::input(path, "must not be a plain sequence"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::SessionCipher;
    use secrecy::ExposeSecret;

    fn run(yaml: &str) -> Result<InputDocument> {
        validate(InputDocument::from_yaml(yaml)?, &SessionCipher::new())
    }

    fn invalid_path(yaml: &str) -> String {
        match run(yaml) {
            Err(Error::InputInvalid { path, .. }) => path,
            other => panic!("expected InputInvalid, got {other:?}"),
        }
    }

    #[test]
    fn global_pool_space_is_derived_from_cidr() {
        let doc = run(
            "config:\n  global_pool_details:\n    settings:\n      ip_pool:\n        - name: lab-v6\n          cidr: 2001:db8::/48\n",
        )
        .unwrap();
        assert_eq!(
            doc.config.global_pools()[0].ip_address_space,
            Some(AddressSpace::V6)
        );
    }

    #[test]
    fn global_pool_rejections() {
        assert_eq!(
            invalid_path("config:\n  global_pool_details:\n    settings:\n      ip_pool:\n        - name: has space\n"),
            "global_pool_details.settings.ip_pool[0].name"
        );
        assert_eq!(
            invalid_path("config:\n  global_pool_details:\n    settings:\n      ip_pool:\n        - name: a\n          cidr: 10.0.0.0/33\n"),
            "global_pool_details.settings.ip_pool[0].cidr"
        );
        assert_eq!(
            invalid_path("config:\n  global_pool_details:\n    settings:\n      ip_pool:\n        - name: a\n          ip_address_space: IPv6\n          cidr: 10.0.0.0/8\n"),
            "global_pool_details.settings.ip_pool[0].ip_address_space"
        );
        assert_eq!(
            invalid_path("config:\n  global_pool_details:\n    settings:\n      ip_pool:\n        - name: a\n        - name: a\n"),
            "global_pool_details.settings.ip_pool[1].name"
        );
        assert_eq!(
            invalid_path("config:\n  global_pool_details:\n    settings:\n      ip_pool:\n        - name: a\n          dhcp_server_ips: [10.0.0.1, nope]\n"),
            "global_pool_details.settings.ip_pool[0].dhcp_server_ips[1]"
        );
    }

    #[test]
    fn empty_name_only_for_force_delete() {
        assert!(run("state: deleted\nconfig:\n  global_pool_details:\n    settings:\n      ip_pool:\n        - name: ''\n          force_delete: true\n").is_ok());
        assert_eq!(
            invalid_path("state: merged\nconfig:\n  global_pool_details:\n    settings:\n      ip_pool:\n        - name: ''\n          force_delete: true\n"),
            "global_pool_details.settings.ip_pool[0].name"
        );
    }

    #[test]
    fn reserved_pool_rules() {
        assert_eq!(
            invalid_path("config:\n  reserve_pool_details:\n    - name: r\n"),
            "reserve_pool_details[0].site_name"
        );
        assert_eq!(
            invalid_path("config:\n  reserve_pool_details:\n    - name: r\n      site_name: Global/HQ/.*\n"),
            "reserve_pool_details[0].site_name"
        );
        assert_eq!(
            invalid_path("config:\n  reserve_pool_details:\n    - name: r\n      site_name: Global/HQ\n      ipv4_global_pool: 10.0.0.0/8\n      ipv4_global_pool_name: lab\n"),
            "reserve_pool_details[0].ipv4_global_pool_name"
        );
        assert_eq!(
            invalid_path("config:\n  reserve_pool_details:\n    - name: r\n      site_name: Global/HQ\n      ipv4_prefix: true\n"),
            "reserve_pool_details[0].ipv4_prefix_length"
        );
        assert_eq!(
            invalid_path("config:\n  reserve_pool_details:\n    - name: r\n      site_name: Global/HQ\n      ipv6_subnet: 10.0.0.0\n"),
            "reserve_pool_details[0].ipv6_subnet"
        );
        assert_eq!(
            invalid_path("config:\n  reserve_pool_details:\n    - name: r\n      site_name: Global/HQ\n      ipv4_prefix_length: 40\n"),
            "reserve_pool_details[0].ipv4_prefix_length"
        );
    }

    #[test]
    fn network_defaults_site_and_checks_aaa() {
        let doc = run("config:\n  network_management_details:\n    - settings:\n        timezone: GMT\n").unwrap();
        assert_eq!(
            doc.config.network_management_details[0].site_name.as_deref(),
            Some("Global")
        );

        assert_eq!(
            invalid_path("config:\n  network_management_details:\n    - settings:\n        network_aaa:\n          server_type: ISE\n          primary_server_address: 10.0.0.5\n"),
            "network_management_details[0].settings.network_aaa.pan_address"
        );
        assert_eq!(
            invalid_path("config:\n  network_management_details:\n    - settings:\n        network_aaa:\n          server_type: AAA\n          primary_server_address: 10.0.0.5\n          shared_secret: abc\n"),
            "network_management_details[0].settings.network_aaa.shared_secret"
        );
        assert_eq!(
            invalid_path("config:\n  network_management_details:\n    - settings:\n        network_aaa:\n          server_type: AAA\n          primary_server_address: 10.0.0.5\n          shared_secret: secret-one\n        client_and_endpoint_aaa:\n          server_type: AAA\n          primary_server_address: 10.0.0.6\n          shared_secret: secret-two\n"),
            "network_management_details[0].settings.client_and_endpoint_aaa.shared_secret"
        );
    }

    #[test]
    fn netflow_rules() {
        assert_eq!(
            invalid_path("config:\n  network_management_details:\n    - site_name: Global/HQ\n      settings:\n        netflow_collector:\n          collector_type: TelemetryBrokerOrUDPDirector\n          ip_address: 10.0.0.9\n"),
            "network_management_details[0].settings.netflow_collector"
        );
        assert_eq!(
            invalid_path("config:\n  network_management_details:\n    - site_name: Global/HQ\n      settings:\n        netflow_collector:\n          collector_type: Builtin\n          port: 70000\n"),
            "network_management_details[0].settings.netflow_collector.port"
        );
    }

    #[test]
    fn role_rules() {
        assert_eq!(
            invalid_path("config:\n  role_details:\n    - role_name: 'bad name'\n"),
            "role_details[0].role_name"
        );
        assert_eq!(
            invalid_path("config:\n  role_details:\n    - role_name: abcdefghijklmnopqrstuvwxyz\n"),
            "role_details[0].role_name"
        );
        assert_eq!(
            invalid_path("config:\n  role_details:\n    - role_name: ops\n      assurance:\n        bogus: read\n"),
            "role_details[0].assurance.bogus"
        );
        assert_eq!(
            invalid_path("config:\n  role_details:\n    - role_name: ops\n      assurance:\n        - overall: read\n        - overall: write\n"),
            "role_details[0].assurance"
        );
        assert_eq!(
            invalid_path("config:\n  role_details:\n    - role_name: ops\n      network_provision:\n        inventory_management:\n          - pnp: read\n"),
            "role_details[0].network_provision.inventory_management.pnp"
        );
        assert!(run("config:\n  role_details:\n    - role_name: ops.team_1\n      network_provision:\n        inventory_management: deny\n").is_ok());
    }

    #[test]
    fn password_is_sealed() {
        let cipher = SessionCipher::new();
        let doc = InputDocument::from_yaml(
            "config:\n  user_details:\n    - username: alice\n      email: alice@example.com\n      password: Str0ng!Pass\n",
        )
        .unwrap();
        let doc = validate(doc, &cipher).unwrap();
        let user = &doc.config.user_details[0];

        assert!(user.password.is_none());
        let sealed = user.sealed_password.as_ref().unwrap();
        assert_eq!(cipher.decrypt(sealed).unwrap().expose_secret(), "Str0ng!Pass");
    }

    #[test]
    fn user_rules() {
        assert_eq!(
            invalid_path("config:\n  user_details:\n    - username: 'al ice'\n"),
            "user_details[0].username"
        );
        assert_eq!(
            invalid_path("config:\n  user_details:\n    - first_name: Al\n"),
            "user_details[0].username"
        );
        assert_eq!(
            invalid_path("config:\n  user_details:\n    - username: alice\n      email: not-an-email\n"),
            "user_details[0].email"
        );
        assert_eq!(
            invalid_path("config:\n  user_details:\n    - username: alice\n      password_update: true\n"),
            "user_details[0].password"
        );
    }

    #[test]
    fn password_strength_rules() {
        assert!(password_strength("Str0ng!Pass", "p").is_ok());
        assert!(password_strength("Sh0rt!", "p").is_err());
        assert!(password_strength("alllowercase1", "p").is_err());
        assert!(password_strength("WayTooLong!Password123", "p").is_err());
        assert!(password_strength("Abcdefghijk1", "p").is_ok());

        let err = password_strength("aaaaaaaaaa", "user_details[0].password").unwrap_err();
        assert!(!err.to_string().contains("aaaaaaaaaa"));
    }

    #[test]
    fn accented_letters_are_letters() {
        assert!(password_strength("motdepasseé1", "p").is_err());
        assert!(password_strength("Motdepasseé1", "p").is_ok());
        assert!(password_strength("ÉtéÀlaplage", "p").is_err());
        assert!(password_strength("Ünïcödé!pw", "p").is_ok());
    }
}
