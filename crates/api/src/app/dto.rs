use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};

use orgusers_core::{DomainError, DomainResult, FieldErrors, GroupId, OrganizationId, OrganizationUserId, PermissionId};
use orgusers_directory::validate::{BLANK, REQUIRED};
use orgusers_directory::{
    EmailAddress, EmailChanges, Group, GroupChanges, MembershipInput, Organization,
    OrganizationChanges, OrganizationOwner, OrganizationUser, PermissionCatalog, User, UserChanges,
};

use crate::app::gate::FieldSet;

/// Decode a JSON body into a request DTO; shape errors become a 400.
pub fn decode<T: DeserializeOwned>(body: Value) -> DomainResult<T> {
    serde_json::from_value(body).map_err(|e| DomainError::validation(e.to_string()))
}

/// `Some(None)` for an explicit `null`, `None` when the key is absent.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// -------------------------
// Request DTOs
// -------------------------

/// A single object or a list of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(v) => vec![v],
            OneOrMany::Many(v) => v,
        }
    }
}

/// A permission given by id or by its `"<id>: <model> | <name>"` form.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PermissionRef {
    Id(i64),
    Display(String),
}

impl PermissionRef {
    fn resolve(&self, catalog: &PermissionCatalog, field: &str) -> DomainResult<PermissionId> {
        let resolved = match self {
            PermissionRef::Id(id) => catalog.ensure_known(PermissionId::new(*id)),
            PermissionRef::Display(s) => catalog.resolve_reference(s),
        };
        resolved.map_err(|_| {
            let shown = match self {
                PermissionRef::Id(id) => id.to_string(),
                PermissionRef::Display(s) => s.clone(),
            };
            DomainError::field(field, format!("Invalid pk \"{shown}\" - object does not exist."))
        })
    }
}

fn resolve_permissions(
    refs: Option<Vec<PermissionRef>>,
    field: &str,
) -> DomainResult<Option<BTreeSet<PermissionId>>> {
    let Some(refs) = refs else {
        return Ok(None);
    };
    let catalog = PermissionCatalog::global();
    refs.iter()
        .map(|r| r.resolve(catalog, field))
        .collect::<DomainResult<BTreeSet<_>>>()
        .map(Some)
}

#[derive(Debug, Clone, Deserialize)]
pub struct MembershipRequest {
    pub organization: OrganizationId,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub url: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub phone_number: Option<Option<String>>,
    #[serde(deserialize_with = "nullable")]
    pub birth_date: Option<Option<NaiveDate>>,
    pub notes: Option<String>,
    pub is_active: Option<bool>,
    pub is_staff: Option<bool>,
    pub is_superuser: Option<bool>,
    pub groups: Option<Vec<GroupId>>,
    pub user_permissions: Option<Vec<PermissionRef>>,
    pub organization_users: Option<OneOrMany<MembershipRequest>>,
}

/// A user write split into its parts.
#[derive(Debug, Clone, Default)]
pub struct UserInput {
    pub changes: UserChanges,
    pub password: Option<String>,
    pub memberships: Option<Vec<MembershipInput>>,
}

impl UserRequest {
    pub fn into_input(self) -> DomainResult<UserInput> {
        let user_permissions = resolve_permissions(self.user_permissions, "user_permissions")?;
        let changes = UserChanges {
            username: self.username,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            bio: self.bio,
            url: self.url,
            company: self.company,
            location: self.location,
            phone_number: self.phone_number,
            birth_date: self.birth_date,
            notes: self.notes,
            is_active: self.is_active,
            is_staff: self.is_staff,
            is_superuser: self.is_superuser,
            groups: self.groups.map(|g| g.into_iter().collect()),
            user_permissions,
        };
        let memberships = self.organization_users.map(|m| {
            m.into_vec()
                .into_iter()
                .map(|r| MembershipInput {
                    organization: r.organization,
                    is_admin: r.is_admin,
                })
                .collect()
        });

        Ok(UserInput {
            changes,
            password: self.password,
            memberships,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct OwnerRequest {
    #[serde(default, deserialize_with = "nullable")]
    pub organization_user: Option<Option<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OrganizationRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub is_active: Option<bool>,
    pub description: Option<String>,
    pub email: Option<String>,
    pub url: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub owner: Option<Option<OwnerRequest>>,
}

impl OrganizationRequest {
    /// Field changes plus the owner request: `None` leaves the owner alone,
    /// `Some(None)` clears it (`owner: null`, or a null or empty
    /// `organization_user`). An owner object without `organization_user`
    /// is rejected.
    pub fn into_parts(self) -> DomainResult<(OrganizationChanges, Option<Option<OrganizationUserId>>)> {
        let owner = match self.owner {
            None => None,
            Some(None) => Some(None),
            Some(Some(OwnerRequest { organization_user })) => match organization_user {
                None => return Err(DomainError::field("owner.organization_user", REQUIRED)),
                Some(None) => Some(None),
                Some(Some(raw)) if raw.trim().is_empty() => Some(None),
                Some(Some(raw)) => {
                    let id = raw.trim().parse::<OrganizationUserId>().map_err(|_| {
                        DomainError::field(
                            "owner.organization_user",
                            format!("Invalid pk \"{raw}\" - object does not exist."),
                        )
                    })?;
                    Some(Some(id))
                }
            },
        };

        let changes = OrganizationChanges {
            name: self.name,
            slug: self.slug,
            is_active: self.is_active,
            description: self.description,
            email: self.email,
            url: self.url,
        };
        Ok((changes, owner))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GroupRequest {
    pub name: Option<String>,
    pub permissions: Option<Vec<PermissionRef>>,
}

impl GroupRequest {
    pub fn into_changes(self) -> DomainResult<GroupChanges> {
        Ok(GroupChanges {
            name: self.name,
            permissions: resolve_permissions(self.permissions, "permissions")?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EmailRequest {
    pub email: Option<String>,
    pub verified: Option<bool>,
    pub primary: Option<bool>,
}

impl From<EmailRequest> for EmailChanges {
    fn from(req: EmailRequest) -> Self {
        EmailChanges {
            email: req.email,
            verified: req.verified,
            primary: req.primary,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChangePasswordRequest {
    pub old_password: Option<String>,
    pub new_password: Option<String>,
}

impl ChangePasswordRequest {
    /// `(old, new)` once both are present and non-blank.
    pub fn into_pair(self) -> DomainResult<(String, String)> {
        let mut errors = FieldErrors::new();
        let mut take = |field: &str, value: Option<String>| match value {
            None => {
                errors.add(field, REQUIRED);
                String::new()
            }
            Some(v) if v.is_empty() => {
                errors.add(field, BLANK);
                v
            }
            Some(v) => v,
        };
        let old = take("old_password", self.old_password);
        let new = take("new_password", self.new_password);
        errors.into_result()?;
        Ok((old, new))
    }
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn list_to_json(results: Vec<Value>) -> Value {
    json!({
        "count": results.len(),
        "results": results,
    })
}

pub fn organization_to_json(org: &Organization, owner: Option<&OrganizationOwner>) -> Value {
    json!({
        "id": org.id.to_string(),
        "name": org.name,
        "slug": org.slug,
        "is_active": org.is_active,
        "description": org.description,
        "email": org.email,
        "url": org.url,
        "created": org.created.to_rfc3339(),
        "modified": org.modified.to_rfc3339(),
        "owner": owner.map(|o| json!({ "organization_user": o.organization_user_id.to_string() })),
    })
}

pub fn membership_to_json(m: &OrganizationUser) -> Value {
    json!({
        "id": m.id.to_string(),
        "organization": m.organization_id.to_string(),
        "is_admin": m.is_admin,
    })
}

/// User representation; `fields` decides which privileged fields and
/// memberships the caller gets to see.
pub fn user_to_json(user: &User, memberships: &[OrganizationUser], fields: &FieldSet) -> Value {
    let mut out = json!({
        "id": user.id.to_string(),
        "username": user.username,
        "email": user.email,
        "first_name": user.first_name,
        "last_name": user.last_name,
        "bio": user.bio,
        "url": user.url,
        "company": user.company,
        "location": user.location,
        "phone_number": user.phone_number,
        "birth_date": user.birth_date.map(|d| d.to_string()),
        "notes": user.notes,
        "is_active": user.is_active,
        "is_staff": user.is_staff,
        "last_login": user.last_login.map(|t| t.to_rfc3339()),
        "date_joined": user.date_joined.to_rfc3339(),
        "groups": user.groups.iter().map(GroupId::get).collect::<Vec<_>>(),
        "organization_users": fields
            .visible_memberships(memberships)
            .map(membership_to_json)
            .collect::<Vec<_>>(),
    });

    if fields.is_full() {
        out["is_superuser"] = json!(user.is_superuser);
        out["user_permissions"] = json!(user
            .user_permissions
            .iter()
            .map(PermissionId::get)
            .collect::<Vec<_>>());
    }
    out
}

pub fn group_to_json(group: &Group) -> Value {
    let catalog = PermissionCatalog::global();
    json!({
        "id": group.id.get(),
        "name": group.name,
        "permissions": group
            .permissions
            .iter()
            .filter_map(|id| catalog.get(*id))
            .map(|entry| entry.display())
            .collect::<Vec<_>>(),
    })
}

pub fn email_to_json(address: Option<&EmailAddress>) -> Value {
    match address {
        Some(a) => json!({
            "email": a.email,
            "verified": a.verified,
            "primary": a.primary,
        }),
        None => json!({ "email": "Email not found" }),
    }
}
