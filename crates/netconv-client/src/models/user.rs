//! User account records.

use netconv_core::ids::{RoleId, UserId};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};

/// A user as the controller reports it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Controller identifier
    pub user_id: UserId,
    /// Login name
    pub username: String,
    /// Given name
    #[serde(default)]
    pub first_name: Option<String>,
    /// Family name
    #[serde(default)]
    pub last_name: Option<String>,
    /// Mail address
    #[serde(default)]
    pub email: Option<String>,
    /// Assigned roles
    #[serde(default)]
    pub role_list: Vec<RoleId>,
    /// Where the account is authenticated (`internal`, `external`)
    #[serde(default)]
    pub auth_source: Option<String>,
}

/// `{"users": [...]}` body of the user listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserList {
    /// Accounts
    #[serde(default)]
    pub users: Vec<User>,
}

/// Create request for a user.
///
/// The password is only exposed while the body is serialized.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    /// Given name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Family name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Login name
    pub username: String,
    /// Plaintext password
    #[serde(serialize_with = "expose_secret")]
    pub password: SecretString,
    /// Mail address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Assigned roles
    pub role_list: Vec<RoleId>,
}

/// Update request for a user. The login name cannot change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    /// Account being updated
    pub user_id: UserId,
    /// Login name
    pub username: String,
    /// Given name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Family name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Mail address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Assigned roles
    pub role_list: Vec<RoleId>,
}

fn expose_secret<S>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(secret.expose_secret())
}
