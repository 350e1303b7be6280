//! Strongly-typed identifiers for controller resources.
//!
//! The controller assigns opaque string identifiers. Wrapping them keeps a
//! site id from being passed where a pool id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Macro to generate strongly-typed identifier wrappers.
macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $doc:expr) => {
        $(#[$meta])*
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a controller-assigned identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Parses an identifier, rejecting blank input.
            ///
            /// # Errors
            ///
            /// Returns an error if the string is empty or whitespace.
            pub fn parse_str(input: &str) -> Result<Self> {
                let trimmed = input.trim();
                if trimmed.is_empty() {
                    return Err(Error::Parse(format!(
                        "empty {} identifier",
                        stringify!($name)
                    )));
                }
                Ok(Self(trimmed.to_string()))
            }

            /// Returns the identifier text.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

id_type!(GlobalPoolId, "Global IP pool identifier");
id_type!(ReservationId, "Reserved sub-pool identifier");
id_type!(SiteId, "Site identifier");
id_type!(RoleId, "Role identifier");
id_type!(UserId, "User identifier");
id_type!(DeviceId, "Network device identifier");

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn parse_trims_and_rejects_blank() {
        assert_eq!(SiteId::parse_str(" abc ").unwrap().as_str(), "abc");
        assert!(SiteId::parse_str("   ").is_err());
    }

    #[test]
    fn display_and_serde_are_transparent() {
        let id = RoleId::new("role-1");
        assert_eq!(id.to_string(), "role-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"role-1\"");
        let back: RoleId = serde_json::from_str("\"role-1\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn ids_hash_by_value() {
        let mut set = HashSet::new();
        set.insert(UserId::from("u1"));
        set.insert(UserId::from("u1".to_string()));
        assert_eq!(set.len(), 1);
    }
}
