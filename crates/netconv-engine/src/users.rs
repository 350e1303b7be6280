//! User account reconciliation.
//!
//! Accounts are matched by username, falling back to email. The login name
//! of an existing account never changes. A password is only rotated when the
//! entry asks for it, by deleting the account and creating it again.

use crate::diff::{differences, Action, Field, FieldValue, Planned};
use crate::family::{Context, Family, Plan};
use crate::input::UserInput;
use crate::report::{Group, Outcome};
use crate::secret::{Sealed, SecretManager};
use async_trait::async_trait;
use netconv_client::models::{NewUser, Role, User, UserUpdate};
use netconv_core::ids::{RoleId, UserId};
use netconv_core::{Error, Result};
use tracing::{debug, info};

/// Role assigned when an entry names none.
pub const DEFAULT_ROLE: &str = "OBSERVER-ROLE";

/// Accounts and the roles they can reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsersHave {
    /// Existing accounts
    pub users: Vec<User>,
    /// Existing roles, for name lookup
    pub roles: Vec<Role>,
}

/// Normalized account fields that can be updated in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserRecord {
    /// Given name
    pub first_name: Option<String>,
    /// Family name
    pub last_name: Option<String>,
    /// Mail address
    pub email: Option<String>,
    /// Role identifiers
    pub role_list: Option<Vec<String>>,
}

impl From<&User> for UserRecord {
    fn from(user: &User) -> Self {
        Self {
            first_name: Some(user.first_name.clone().unwrap_or_default()),
            last_name: Some(user.last_name.clone().unwrap_or_default()),
            email: Some(user.email.clone().unwrap_or_default()),
            role_list: Some(user.role_list.iter().map(|id| id.to_string()).collect()),
        }
    }
}

type F = Field<UserRecord>;

/// Fields that decide whether an account needs an update.
pub const COMPARISON: &[F] = &[
    F::new("firstName", |r| FieldValue::text(r.first_name.as_deref())),
    F::new("lastName", |r| FieldValue::text(r.last_name.as_deref())),
    F::new("email", |r| FieldValue::text(r.email.as_deref())),
    F::new("roleList", |r| FieldValue::set(r.role_list.as_deref())),
];

/// A new account whose password is still sealed.
#[derive(Debug, Clone, PartialEq)]
pub struct UserDraft {
    /// Login name
    pub username: String,
    /// Given name
    pub first_name: Option<String>,
    /// Family name
    pub last_name: Option<String>,
    /// Mail address
    pub email: Option<String>,
    /// Sealed password
    pub password: Sealed,
    /// Role identifiers
    pub role_list: Vec<RoleId>,
}

impl UserDraft {
    /// Unseal the password into a request body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Crypto`] if the password cannot be unsealed.
    pub fn into_new_user(self, secrets: &dyn SecretManager) -> Result<NewUser> {
        Ok(NewUser {
            first_name: self.first_name,
            last_name: self.last_name,
            username: self.username,
            password: secrets.decrypt(&self.password)?,
            email: self.email,
            role_list: self.role_list,
        })
    }
}

/// What a planned user action sends.
#[derive(Debug, Clone, PartialEq)]
pub enum UserPayload {
    /// New account
    Create(UserDraft),
    /// Changed account
    Update(UserUpdate),
    /// Password rotation: delete `0`, then create `1`
    Rotate(UserId, UserDraft),
}

/// The user family.
#[derive(Debug)]
pub struct Users<'a> {
    entries: &'a [UserInput],
}

impl<'a> Users<'a> {
    /// Family over the input entries.
    #[must_use]
    pub const fn new(entries: &'a [UserInput]) -> Self {
        Self { entries }
    }

    fn label(entry: &UserInput) -> String {
        entry
            .username
            .clone()
            .or_else(|| entry.email.clone())
            .unwrap_or_default()
    }

    fn plan_merge(
        index: usize,
        entry: &UserInput,
        have: &UsersHave,
    ) -> Result<Planned<UserPayload, UserId>> {
        let path = format!("user_details[{index}]");
        let current = find(&have.users, entry);
        let name = current.map_or_else(|| Self::label(entry), |user| user.username.clone());

        if let (Some(user), Some(username)) = (current, entry.username.as_deref()) {
            if user.username != username {
                return Err(Error::input(
                    format!("{path}.username"),
                    format!(
                        "`{}` already belongs to `{}`; a username cannot change",
                        user.email.as_deref().unwrap_or_default(),
                        user.username
                    ),
                ));
            }
        }

        let wanted_roles = match &entry.role_list {
            Some(names) => Some(names.clone()),
            None if current.is_none() => Some(vec![DEFAULT_ROLE.to_string()]),
            None => None,
        };
        let resolved = wanted_roles
            .map(|names| role_ids(&have.roles, &names))
            .transpose();
        let role_list = match resolved {
            Ok(ids) => ids,
            Err(error) => return Ok(Planned::new(name, Action::Blocked(error))),
        };

        let Some(current) = current else {
            let username = entry.username.clone().ok_or_else(|| {
                Error::input(
                    format!("{path}.username"),
                    "username is required to create a user",
                )
            })?;
            let draft = new_draft(&path, &username, entry, None, role_list.unwrap_or_default())?;
            return Ok(Planned::new(name, Action::Create(UserPayload::Create(draft))));
        };

        let have_record = UserRecord::from(current);
        let want_record = UserRecord {
            first_name: entry.first_name.clone(),
            last_name: entry.last_name.clone(),
            email: entry.email.clone(),
            role_list: role_list
                .as_ref()
                .map(|ids| ids.iter().map(ToString::to_string).collect()),
        };
        let mut changed = differences(&have_record, &want_record, COMPARISON);
        let role_list = role_list.unwrap_or_else(|| current.role_list.clone());

        if entry.password_update {
            changed.push("password");
            let draft = new_draft(&path, &current.username, entry, Some(current), role_list)?;
            info!(user = %name, "password rotation planned");
            let payload = UserPayload::Rotate(current.user_id.clone(), draft);
            return Ok(Planned::new(name, Action::Update(payload)).with_changed_fields(changed));
        }
        if changed.is_empty() {
            return Ok(Planned::new(name, Action::NoChange));
        }

        debug!(user = %name, ?changed, "user differs");
        let update = UserUpdate {
            user_id: current.user_id.clone(),
            username: current.username.clone(),
            first_name: entry.first_name.clone().or_else(|| current.first_name.clone()),
            last_name: entry.last_name.clone().or_else(|| current.last_name.clone()),
            email: entry.email.clone().or_else(|| current.email.clone()),
            role_list,
        };
        Ok(Planned::new(name, Action::Update(UserPayload::Update(update)))
            .with_changed_fields(changed))
    }

    fn plan_delete(&self, have: &UsersHave) -> Plan<Self> {
        self.entries
            .iter()
            .map(|entry| match find(&have.users, entry) {
                Some(user) => {
                    Planned::new(user.username.clone(), Action::Delete(user.user_id.clone()))
                }
                None => Planned::not_found(Self::label(entry)),
            })
            .collect()
    }
}

fn find<'u>(users: &'u [User], entry: &UserInput) -> Option<&'u User> {
    let by_name = entry
        .username
        .as_deref()
        .and_then(|username| users.iter().find(|user| user.username == username));
    by_name.or_else(|| {
        entry.email.as_deref().and_then(|email| {
            users.iter().find(|user| {
                user.email
                    .as_deref()
                    .is_some_and(|have| have.eq_ignore_ascii_case(email))
            })
        })
    })
}

/// Resolve role names to identifiers.
fn role_ids(roles: &[Role], names: &[String]) -> Result<Vec<RoleId>> {
    names
        .iter()
        .map(|name| {
            roles
                .iter()
                .find(|role| role.name.eq_ignore_ascii_case(name))
                .map(|role| role.role_id.clone())
                .ok_or_else(|| Error::NotFound(format!("role {name}")))
        })
        .collect()
}

fn new_draft(
    path: &str,
    username: &str,
    entry: &UserInput,
    current: Option<&User>,
    role_list: Vec<RoleId>,
) -> Result<UserDraft> {
    let password = entry.sealed_password.clone().ok_or_else(|| {
        Error::input(
            format!("{path}.password"),
            format!("password is required to create `{username}`"),
        )
    })?;
    Ok(UserDraft {
        username: username.to_string(),
        first_name: entry
            .first_name
            .clone()
            .or_else(|| current.and_then(|user| user.first_name.clone())),
        last_name: entry
            .last_name
            .clone()
            .or_else(|| current.and_then(|user| user.last_name.clone())),
        email: entry
            .email
            .clone()
            .or_else(|| current.and_then(|user| user.email.clone())),
        password,
        role_list,
    })
}

#[async_trait]
impl Family for Users<'_> {
    type Have = UsersHave;
    type Payload = UserPayload;
    type Id = UserId;

    fn group(&self) -> Group {
        Group::Users
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    async fn fetch_current(&self, ctx: &Context<'_>) -> Result<UsersHave> {
        let users = ctx.api.list_users().await?;
        let roles = ctx.api.list_roles().await?;
        debug!(users = users.len(), roles = roles.len(), "accounts fetched");
        Ok(UsersHave { users, roles })
    }

    async fn plan(&self, ctx: &Context<'_>, have: &UsersHave) -> Result<Plan<Self>> {
        if ctx.deleting() {
            return Ok(self.plan_delete(have));
        }
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| Self::plan_merge(index, entry, have))
            .collect()
    }

    /// A requested rotation re-plans as a rotation every time.
    fn settled(&self, planned: &Planned<UserPayload, UserId>) -> bool {
        !planned.action.is_change() || planned.changed_fields == ["password"]
    }

    async fn execute(
        &self,
        ctx: &Context<'_>,
        name: &str,
        action: Action<UserPayload, UserId>,
    ) -> Result<Outcome> {
        match action {
            Action::Create(UserPayload::Create(draft))
            | Action::Update(UserPayload::Create(draft)) => {
                let user = draft.into_new_user(ctx.secrets)?;
                ctx.api.add_user(&user).await?;
                Ok(Outcome::Created)
            }
            Action::Create(UserPayload::Update(update))
            | Action::Update(UserPayload::Update(update)) => {
                ctx.api.update_user(&update).await?;
                Ok(Outcome::Updated)
            }
            Action::Create(UserPayload::Rotate(id, draft))
            | Action::Update(UserPayload::Rotate(id, draft)) => {
                let user = draft.into_new_user(ctx.secrets)?;
                debug!(user = %name, "deleting account for password rotation");
                ctx.api.delete_user(&id).await?;
                ctx.api.add_user(&user).await?;
                Ok(Outcome::Updated)
            }
            Action::Delete(id) => {
                ctx.api.delete_user(&id).await?;
                Ok(Outcome::Deleted)
            }
            Action::NoChange => Ok(Outcome::Unchanged),
            Action::Blocked(error) => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::SessionCipher;
    use pretty_assertions::assert_eq;
    use secrecy::{ExposeSecret, SecretString};

    fn alice() -> User {
        User {
            user_id: UserId::new("u-1"),
            username: "alice".into(),
            first_name: Some("Alice".into()),
            last_name: None,
            email: Some("alice@example.com".into()),
            role_list: vec![RoleId::new("r-observer")],
            auth_source: Some("internal".into()),
        }
    }

    fn role(id: &str, name: &str) -> Role {
        Role {
            role_id: RoleId::new(id),
            name: name.into(),
            description: None,
            role_type: Some("default".into()),
            resource_types: vec![],
        }
    }

    fn have() -> UsersHave {
        UsersHave {
            users: vec![alice()],
            roles: vec![
                role("r-observer", "OBSERVER-ROLE"),
                role("r-admin", "SUPER-ADMIN-ROLE"),
            ],
        }
    }

    fn sealed(secrets: &SessionCipher, password: &str) -> Sealed {
        secrets.encrypt(&SecretString::from(password)).unwrap()
    }

    #[test]
    fn unchanged_account() {
        let entry = UserInput {
            username: Some("alice".into()),
            first_name: Some("Alice".into()),
            ..UserInput::default()
        };
        let planned = Users::plan_merge(0, &entry, &have()).unwrap();
        assert_eq!(planned.action, Action::NoChange);
    }

    #[test]
    fn role_change_updates_in_place() {
        let entry = UserInput {
            username: Some("alice".into()),
            role_list: Some(vec!["super-admin-role".into()]),
            ..UserInput::default()
        };
        let planned = Users::plan_merge(0, &entry, &have()).unwrap();
        assert_eq!(planned.changed_fields, vec!["roleList"]);
        let Action::Update(UserPayload::Update(update)) = planned.action else {
            panic!("expected update");
        };
        assert_eq!(update.username, "alice");
        assert_eq!(update.role_list, vec![RoleId::new("r-admin")]);
        assert_eq!(update.email.as_deref(), Some("alice@example.com"));
    }

    #[test]
    fn new_account_defaults_to_observer() {
        let secrets = SessionCipher::new();
        let entry = UserInput {
            username: Some("bob".into()),
            sealed_password: Some(sealed(&secrets, "Str0ng!Pass")),
            ..UserInput::default()
        };
        let planned = Users::plan_merge(0, &entry, &have()).unwrap();
        let Action::Create(UserPayload::Create(draft)) = planned.action else {
            panic!("expected create");
        };
        assert_eq!(draft.role_list, vec![RoleId::new("r-observer")]);

        let user = draft.into_new_user(&secrets).unwrap();
        assert_eq!(user.password.expose_secret(), "Str0ng!Pass");
    }

    #[test]
    fn new_account_needs_a_password() {
        let entry = UserInput {
            username: Some("bob".into()),
            ..UserInput::default()
        };
        let err = Users::plan_merge(3, &entry, &have()).unwrap_err();
        assert!(
            matches!(err, Error::InputInvalid { ref path, .. } if path == "user_details[3].password")
        );
    }

    #[test]
    fn username_change_for_same_email_is_rejected() {
        let entry = UserInput {
            username: Some("alicia".into()),
            email: Some("alice@example.com".into()),
            ..UserInput::default()
        };
        let err = Users::plan_merge(0, &entry, &have()).unwrap_err();
        assert!(
            matches!(err, Error::InputInvalid { ref path, .. } if path == "user_details[0].username")
        );
    }

    #[test]
    fn unknown_role_blocks_only_that_user() {
        let entry = UserInput {
            username: Some("alice".into()),
            role_list: Some(vec!["NOPE".into()]),
            ..UserInput::default()
        };
        let planned = Users::plan_merge(0, &entry, &have()).unwrap();
        assert_eq!(planned.action, Action::Blocked(Error::NotFound("role NOPE".into())));
    }

    #[test]
    fn password_update_rotates() {
        let secrets = SessionCipher::new();
        let entry = UserInput {
            username: Some("alice".into()),
            sealed_password: Some(sealed(&secrets, "N3w!Passw0rd")),
            password_update: true,
            ..UserInput::default()
        };
        let planned = Users::plan_merge(0, &entry, &have()).unwrap();
        assert_eq!(planned.changed_fields, vec!["password"]);
        let Action::Update(UserPayload::Rotate(id, draft)) = planned.action else {
            panic!("expected rotation");
        };
        assert_eq!(id.as_str(), "u-1");
        assert_eq!(draft.username, "alice");
        assert_eq!(draft.email.as_deref(), Some("alice@example.com"));
        assert_eq!(draft.role_list, vec![RoleId::new("r-observer")]);
    }

    #[test]
    fn delete_matches_by_email() {
        let entries = vec![
            UserInput {
                email: Some("ALICE@example.com".into()),
                ..UserInput::default()
            },
            UserInput {
                username: Some("ghost".into()),
                ..UserInput::default()
            },
        ];
        let plan = Users::new(&entries).plan_delete(&have());
        assert_eq!(plan[0].name, "alice");
        assert_eq!(plan[0].action, Action::Delete(UserId::new("u-1")));
        assert!(plan[1].missing);
    }
}
