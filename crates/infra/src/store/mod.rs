//! Directory persistence.
//!
//! A `DirectoryStore` owns users, organizations, memberships, owners, groups
//! and email addresses. Composite writes (a user with its membership plan, an
//! organization with its owner change) are single calls so that every backend
//! can apply them atomically.

use std::collections::BTreeSet;
use std::sync::Arc;

use thiserror::Error;

use orgusers_core::{GroupId, OrganizationId, PermissionId, UserId};
use orgusers_directory::{
    EmailAddress, Group, MembershipPlan, Organization, OrganizationFilter, OrganizationOwner,
    OrganizationUser, OwnerChange, User, UserChanges, UserFilter,
};

pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use in_memory::InMemoryDirectoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresDirectoryStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage failure.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("{entity} with this {field} already exists")]
    Duplicate {
        entity: &'static str,
        field: &'static str,
    },

    /// The record targeted by an update or delete does not exist.
    #[error("record not found")]
    NotFound,

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn duplicate(entity: &'static str, field: &'static str) -> Self {
        Self::Duplicate { entity, field }
    }
}

/// A user row plus the nested records written with it.
#[derive(Debug, Clone)]
pub struct UserWrite {
    pub user: User,
    pub memberships: MembershipPlan,
    /// Upserted as the user's primary address; other addresses lose the
    /// primary flag.
    pub primary_email: Option<EmailAddress>,
}

impl UserWrite {
    pub fn new(user: User) -> Self {
        Self {
            user,
            memberships: MembershipPlan::default(),
            primary_email: None,
        }
    }
}

/// Field changes for an existing user plus the nested records written with
/// them. The store applies `changes` to the row it holds under its write
/// lock or transaction; the password hash is never part of an update.
#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub id: UserId,
    pub changes: UserChanges,
    pub memberships: MembershipPlan,
    pub primary_email: Option<EmailAddress>,
}

impl UserUpdate {
    pub fn new(id: UserId, changes: UserChanges) -> Self {
        Self {
            id,
            changes,
            memberships: MembershipPlan::default(),
            primary_email: None,
        }
    }
}

#[async_trait::async_trait]
pub trait DirectoryStore: Send + Sync {
    // ───────────────────────── users ─────────────────────────

    /// Users matching `filter`, newest `date_joined` first.
    async fn list_users(&self, filter: &UserFilter) -> StoreResult<Vec<User>>;

    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// Insert a user together with its memberships and primary address.
    async fn insert_user(&self, write: UserWrite) -> StoreResult<User>;

    /// Apply field changes to the current row and the membership plan in
    /// one write. Deleting a membership that owns its organization clears
    /// that ownership.
    async fn update_user(&self, update: UserUpdate) -> StoreResult<User>;

    /// Delete a user with its memberships, ownerships and addresses.
    async fn delete_user(&self, id: UserId) -> StoreResult<()>;

    async fn set_password(&self, id: UserId, password_hash: String) -> StoreResult<()>;

    // ────────────────────── memberships ──────────────────────

    async fn memberships_of_user(&self, user: UserId) -> StoreResult<Vec<OrganizationUser>>;

    async fn memberships_in(&self, organization: OrganizationId) -> StoreResult<Vec<OrganizationUser>>;

    // ───────────────────── organizations ─────────────────────

    /// Organizations matching `filter`, newest `created` first.
    async fn list_organizations(&self, filter: &OrganizationFilter) -> StoreResult<Vec<Organization>>;

    async fn get_organization(&self, id: OrganizationId) -> StoreResult<Option<Organization>>;

    async fn owner_of(&self, organization: OrganizationId) -> StoreResult<Option<OrganizationOwner>>;

    async fn insert_organization(&self, organization: Organization) -> StoreResult<Organization>;

    /// Replace an organization row and apply the owner change.
    async fn update_organization(
        &self,
        organization: Organization,
        owner: OwnerChange,
    ) -> StoreResult<Organization>;

    /// Delete an organization with its memberships and owner.
    async fn delete_organization(&self, id: OrganizationId) -> StoreResult<()>;

    // ──────────────────────── groups ─────────────────────────

    /// All groups by ascending id.
    async fn list_groups(&self) -> StoreResult<Vec<Group>>;

    async fn get_group(&self, id: GroupId) -> StoreResult<Option<Group>>;

    /// Insert a group under the next free id.
    async fn insert_group(
        &self,
        name: String,
        permissions: BTreeSet<PermissionId>,
    ) -> StoreResult<Group>;

    async fn update_group(&self, group: Group) -> StoreResult<Group>;

    /// Delete a group and remove it from every user.
    async fn delete_group(&self, id: GroupId) -> StoreResult<()>;

    // ───────────────────── email addresses ───────────────────

    async fn email_addresses(&self, user: UserId) -> StoreResult<Vec<EmailAddress>>;

    /// Upsert an address. A primary address demotes the user's other
    /// addresses and becomes `User.email`.
    async fn save_email_address(&self, address: EmailAddress) -> StoreResult<EmailAddress>;

    async fn delete_email_addresses(&self, user: UserId) -> StoreResult<()>;
}

/// Shared handle used by the API layer.
pub type SharedStore = Arc<dyn DirectoryStore>;
