//! Controller release versions.
//!
//! Releases are dotted numeric strings (`2.3.7.6`). Comparison is
//! component-wise with missing trailing components treated as zero, so
//! `2.3.7` equals `2.3.7.0`.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Oldest controller release the engine will run against.
pub const MINIMUM_SUPPORTED: &str = "2.3.5.3";

/// A parsed controller release.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ControllerVersion {
    parts: Vec<u32>,
}

impl ControllerVersion {
    /// Parses a release string.
    ///
    /// Anything after the first character that is neither a digit nor a dot
    /// (build suffixes such as `-70001`) is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if no numeric component can be read.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let end = trimmed
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(trimmed.len());
        let core = trimmed[..end].trim_end_matches('.');

        if core.is_empty() {
            return Err(Error::Config(format!(
                "Unrecognised controller version `{input}`"
            )));
        }

        let parts = core
            .split('.')
            .map(|part| {
                part.parse::<u32>().map_err(|_| {
                    Error::Config(format!("Unrecognised controller version `{input}`"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { parts })
    }

    /// The oldest release the engine supports.
    #[must_use]
    pub fn minimum_supported() -> Self {
        Self {
            parts: vec![2, 3, 5, 3],
        }
    }

    /// Returns true if this release is at least `other`.
    #[must_use]
    pub fn at_least(&self, other: &Self) -> bool {
        self >= other
    }

    /// Returns true if this release is at least the release spelled `other`.
    ///
    /// Unparseable input is treated as unsatisfiable.
    #[must_use]
    pub fn at_least_str(&self, other: &str) -> bool {
        Self::parse(other).is_ok_and(|other| self.at_least(&other))
    }

    /// Numeric components.
    #[must_use]
    pub fn parts(&self) -> &[u32] {
        &self.parts
    }

    fn component(&self, index: usize) -> u32 {
        self.parts.get(index).copied().unwrap_or(0)
    }
}

impl PartialEq for ControllerVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Ord for ControllerVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        (0..len)
            .map(|i| self.component(i).cmp(&other.component(i)))
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for ControllerVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for ControllerVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ControllerVersion {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ControllerVersion> for String {
    fn from(version: ControllerVersion) -> Self {
        version.to_string()
    }
}

impl fmt::Display for ControllerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self
            .parts
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".");
        f.write_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_plain_release() {
        let version = ControllerVersion::parse("2.3.7.6").unwrap();
        assert_eq!(version.parts(), &[2, 3, 7, 6]);
        assert_eq!(version.to_string(), "2.3.7.6");
    }

    #[test]
    fn parse_ignores_build_suffix() {
        let version = ControllerVersion::parse("2.3.7.9-70301").unwrap();
        assert_eq!(version.parts(), &[2, 3, 7, 9]);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(ControllerVersion::parse("").is_err());
        assert!(ControllerVersion::parse("latest").is_err());
    }

    #[test]
    fn ordering_is_component_wise() {
        let older = ControllerVersion::parse("2.3.5.3").unwrap();
        let newer = ControllerVersion::parse("2.3.7.6").unwrap();
        let much_newer = ControllerVersion::parse("2.3.10").unwrap();

        assert!(older < newer);
        assert!(newer < much_newer);
        assert!(newer.at_least(&older));
        assert!(!older.at_least(&newer));
    }

    #[test]
    fn missing_components_are_zero() {
        let short = ControllerVersion::parse("2.3.7").unwrap();
        let long = ControllerVersion::parse("2.3.7.0").unwrap();
        assert_eq!(short, long);
    }

    #[test]
    fn minimum_supported_matches_constant() {
        assert_eq!(
            ControllerVersion::minimum_supported(),
            ControllerVersion::parse(MINIMUM_SUPPORTED).unwrap()
        );
        assert!(ControllerVersion::parse("2.3.7.6")
            .unwrap()
            .at_least_str(MINIMUM_SUPPORTED));
        assert!(!ControllerVersion::parse("2.2.3.0")
            .unwrap()
            .at_least_str(MINIMUM_SUPPORTED));
    }

    #[test]
    fn serde_uses_string_form() {
        let version: ControllerVersion = serde_json::from_str("\"2.3.7.6\"").unwrap();
        assert_eq!(serde_json::to_string(&version).unwrap(), "\"2.3.7.6\"");
    }
}
