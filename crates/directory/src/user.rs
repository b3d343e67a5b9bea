//! User accounts.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};

use orgusers_core::{Entity, FieldErrors, GroupId, PermissionId, UserId};

use crate::validate::{self, WriteMode};

pub const USERNAME_MAX: usize = 150;

/// A user account.
///
/// `password_hash` is opaque here; producing and checking it is the job of
/// `orgusers_auth::PasswordHasher`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub url: String,
    pub company: String,
    pub location: String,
    pub phone_number: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub notes: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub groups: BTreeSet<GroupId>,
    pub user_permissions: BTreeSet<PermissionId>,
    pub password_hash: String,
    pub last_login: Option<DateTime<Utc>>,
    pub date_joined: DateTime<Utc>,
}

impl User {
    /// An active, unprivileged account with empty profile fields.
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: UserId::new(),
            username: username.into(),
            email: email.into(),
            first_name: String::new(),
            last_name: String::new(),
            bio: String::new(),
            url: String::new(),
            company: String::new(),
            location: String::new(),
            phone_number: None,
            birth_date: None,
            notes: String::new(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
            groups: BTreeSet::new(),
            user_permissions: BTreeSet::new(),
            password_hash: password_hash.into(),
            last_login: None,
            date_joined: now,
        }
    }

    /// Build a new account from validated changes.
    pub fn create(changes: UserChanges, password_hash: String, now: DateTime<Utc>) -> Self {
        let mut user = User::new(String::new(), String::new(), password_hash, now);
        changes.apply_to(&mut user);
        user
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.date_joined
    }
}

/// Field changes for create, replace and partial update.
///
/// `None` means "not supplied". Nullable columns use a nested option so a
/// client can clear them explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub url: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub phone_number: Option<Option<String>>,
    pub birth_date: Option<Option<NaiveDate>>,
    pub notes: Option<String>,
    pub is_active: Option<bool>,
    pub is_staff: Option<bool>,
    pub is_superuser: Option<bool>,
    pub groups: Option<BTreeSet<GroupId>>,
    pub user_permissions: Option<BTreeSet<PermissionId>>,
}

impl UserChanges {
    /// Check formats and, for create/replace, presence of required fields.
    pub fn validate(&self, mode: WriteMode) -> FieldErrors {
        let mut errors = FieldErrors::new();

        validate::required_text(&mut errors, "username", self.username.as_deref(), mode);
        validate::max_length(&mut errors, "username", self.username.as_deref(), USERNAME_MAX);
        if let Some(username) = self.username.as_deref() {
            if !username.trim().is_empty() && !validate::is_valid_username(username) {
                errors.add(
                    "username",
                    "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
                );
            }
        }

        validate::required_text(&mut errors, "email", self.email.as_deref(), mode);
        if let Some(email) = self.email.as_deref() {
            if !email.trim().is_empty() && !validate::is_valid_email(email) {
                errors.add("email", validate::INVALID_EMAIL);
            }
        }

        validate::optional_url(&mut errors, "url", self.url.as_deref());
        validate::max_length(&mut errors, "first_name", self.first_name.as_deref(), 150);
        validate::max_length(&mut errors, "last_name", self.last_name.as_deref(), 150);
        validate::max_length(&mut errors, "company", self.company.as_deref(), 30);
        validate::max_length(&mut errors, "location", self.location.as_deref(), 128);

        errors
    }

    /// Whether these changes touch the email column.
    pub fn changes_email(&self, current: &User) -> bool {
        self.email
            .as_deref()
            .is_some_and(|e| !e.eq_ignore_ascii_case(&current.email))
    }

    pub fn apply_to(self, user: &mut User) {
        if let Some(v) = self.username {
            user.username = v.trim().to_string();
        }
        if let Some(v) = self.email {
            user.email = v.trim().to_lowercase();
        }
        if let Some(v) = self.first_name {
            user.first_name = v;
        }
        if let Some(v) = self.last_name {
            user.last_name = v;
        }
        if let Some(v) = self.bio {
            user.bio = v;
        }
        if let Some(v) = self.url {
            user.url = v;
        }
        if let Some(v) = self.company {
            user.company = v;
        }
        if let Some(v) = self.location {
            user.location = v;
        }
        if let Some(v) = self.phone_number {
            user.phone_number = v.filter(|p| !p.trim().is_empty());
        }
        if let Some(v) = self.birth_date {
            user.birth_date = v;
        }
        if let Some(v) = self.notes {
            user.notes = v;
        }
        if let Some(v) = self.is_active {
            user.is_active = v;
        }
        if let Some(v) = self.is_staff {
            user.is_staff = v;
        }
        if let Some(v) = self.is_superuser {
            user.is_superuser = v;
        }
        if let Some(v) = self.groups {
            user.groups = v;
        }
        if let Some(v) = self.user_permissions {
            user.user_permissions = v;
        }
    }
}
