//! Core domain types.
//!
//! This module provides the primitive types the engine reasons about: site
//! paths in the controller hierarchy, site kinds, IP address spaces and CIDR
//! blocks.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Root segment of every site path.
pub const GLOBAL_SITE: &str = "Global";

/// Suffix that selects every descendant of a site.
pub const DESCENDANTS_SUFFIX: &str = "/.*";

/// Slash-delimited site path rooted at `Global`.
///
/// Paths are case-sensitive. A trailing `/.*` selects all descendants at any
/// depth.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SitePath {
    segments: Vec<String>,
    descendants: bool,
}

impl SitePath {
    /// Parses a site path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InputInvalid`] if the path is empty, does not start
    /// at `Global`, or has an empty segment.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let (base, descendants) = match trimmed.strip_suffix(DESCENDANTS_SUFFIX) {
            Some(base) => (base, true),
            None => (trimmed, false),
        };

        let segments: Vec<String> = base.split('/').map(str::to_string).collect();
        if segments.first().map(String::as_str) != Some(GLOBAL_SITE) {
            return Err(Error::input(
                "site_name",
                format!("site path `{input}` must start with `{GLOBAL_SITE}`"),
            ));
        }
        if segments.iter().any(|segment| segment.trim().is_empty()) {
            return Err(Error::input(
                "site_name",
                format!("site path `{input}` has an empty segment"),
            ));
        }

        Ok(Self {
            segments,
            descendants,
        })
    }

    /// The `Global` root.
    #[must_use]
    pub fn global() -> Self {
        Self {
            segments: vec![GLOBAL_SITE.to_string()],
            descendants: false,
        }
    }

    /// Name segments from the root down.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Last segment.
    #[must_use]
    pub fn leaf(&self) -> &str {
        self.segments.last().map_or(GLOBAL_SITE, String::as_str)
    }

    /// Returns true for the `/.*` form.
    #[must_use]
    pub const fn selects_descendants(&self) -> bool {
        self.descendants
    }

    /// Returns true if this is the bare `Global` root.
    #[must_use]
    pub fn is_global(&self) -> bool {
        self.segments.len() == 1 && !self.descendants
    }

    /// The same site without the descendant selector.
    #[must_use]
    pub fn base(&self) -> Self {
        Self {
            segments: self.segments.clone(),
            descendants: false,
        }
    }

    /// The `/.*` form of this site.
    #[must_use]
    pub fn descendants(&self) -> Self {
        Self {
            segments: self.segments.clone(),
            descendants: true,
        }
    }

    /// Parent site, if any.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        (self.segments.len() > 1).then(|| Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
            descendants: false,
        })
    }

    /// Returns true if `other` lies strictly below this site.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        other.segments.len() > self.segments.len()
            && other.segments[..self.segments.len()] == self.segments[..]
    }
}

impl fmt::Display for SitePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))?;
        if self.descendants {
            f.write_str(DESCENDANTS_SUFFIX)?;
        }
        Ok(())
    }
}

impl FromStr for SitePath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SitePath {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<SitePath> for String {
    fn from(path: SitePath) -> Self {
        path.to_string()
    }
}

/// Kind of node in the site hierarchy, as reported by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteKind {
    /// The `Global` root
    Global,
    /// Administrative area
    Area,
    /// Building
    Building,
    /// Floor inside a building
    Floor,
}

impl SiteKind {
    /// Returns the kind name as the controller spells it.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Area => "area",
            Self::Building => "building",
            Self::Floor => "floor",
        }
    }
}

impl FromStr for SiteKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "global" => Ok(Self::Global),
            "area" => Ok(Self::Area),
            "building" => Ok(Self::Building),
            "floor" => Ok(Self::Floor),
            _ => Err(Error::Parse(format!("Unknown site type: {s}"))),
        }
    }
}

impl fmt::Display for SiteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// IP address space of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AddressSpace {
    /// IPv4
    #[serde(rename = "IPv4", alias = "ipv4", alias = "IPV4")]
    V4,
    /// IPv6
    #[serde(rename = "IPv6", alias = "ipv6", alias = "IPV6")]
    V6,
}

impl AddressSpace {
    /// Returns the canonical spelling.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::V4 => "IPv4",
            Self::V6 => "IPv6",
        }
    }

    /// Returns true for IPv6.
    #[must_use]
    pub const fn is_v6(&self) -> bool {
        matches!(self, Self::V6)
    }

    /// Maximum prefix length for this space.
    #[must_use]
    pub const fn max_prefix(&self) -> u8 {
        match self {
            Self::V4 => 32,
            Self::V6 => 128,
        }
    }
}

impl FromStr for AddressSpace {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ipv4" | "v4" => Ok(Self::V4),
            "ipv6" | "v6" => Ok(Self::V6),
            _ => Err(Error::Parse(format!("Unknown address space: {s}"))),
        }
    }
}

impl fmt::Display for AddressSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Textual `address/prefix-length` block, checked syntactically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cidr {
    address: IpAddr,
    prefix: u8,
}

impl Cidr {
    /// Parses `address/prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if either half is malformed or the prefix is
    /// too long for the address family.
    pub fn parse(input: &str) -> Result<Self> {
        let (address, prefix) = input
            .trim()
            .split_once('/')
            .ok_or_else(|| Error::Parse(format!("CIDR `{input}` is missing a prefix length")))?;

        let address: IpAddr = address
            .parse()
            .map_err(|_| Error::Parse(format!("CIDR `{input}` has an invalid address")))?;
        let prefix: u8 = prefix
            .parse()
            .map_err(|_| Error::Parse(format!("CIDR `{input}` has an invalid prefix length")))?;

        let cidr = Self { address, prefix };
        if prefix > cidr.space().max_prefix() {
            return Err(Error::Parse(format!(
                "CIDR `{input}` prefix exceeds {}",
                cidr.space().max_prefix()
            )));
        }
        Ok(cidr)
    }

    /// Network address.
    #[must_use]
    pub const fn address(&self) -> IpAddr {
        self.address
    }

    /// Prefix length.
    #[must_use]
    pub const fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Address space the block belongs to.
    #[must_use]
    pub const fn space(&self) -> AddressSpace {
        match self.address {
            IpAddr::V4(_) => AddressSpace::V4,
            IpAddr::V6(_) => AddressSpace::V6,
        }
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix)
    }
}

impl FromStr for Cidr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Cidr {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Cidr> for String {
    fn from(cidr: Cidr) -> Self {
        cidr.to_string()
    }
}
