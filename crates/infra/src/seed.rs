//! Startup data: the default groups and an optional bootstrap superuser.

use std::collections::BTreeSet;

use chrono::Utc;
use thiserror::Error;

use orgusers_auth::{PasswordError, PasswordHasher};
use orgusers_core::PermissionId;
use orgusers_directory::{EmailAddress, PermissionCatalog, User};

use crate::store::{DirectoryStore, StoreError, UserWrite};

pub const OPERATOR_GROUP: &str = "Operator";
pub const ADMINISTRATOR_GROUP: &str = "Administrator";

#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Password(#[from] PasswordError),
}

/// Permissions granted to the `Administrator` group: full control over
/// users, memberships and email addresses, plus view/change on
/// organizations.
pub fn administrator_permissions() -> BTreeSet<PermissionId> {
    const CODENAMES: [&str; 14] = [
        "add_emailaddress",
        "change_emailaddress",
        "delete_emailaddress",
        "view_emailaddress",
        "change_organization",
        "view_organization",
        "add_organizationuser",
        "change_organizationuser",
        "delete_organizationuser",
        "view_organizationuser",
        "add_user",
        "change_user",
        "delete_user",
        "view_user",
    ];
    let catalog = PermissionCatalog::global();
    CODENAMES
        .iter()
        .filter_map(|c| catalog.by_codename(c))
        .map(|entry| entry.id)
        .collect()
}

/// Create `Operator` and `Administrator` (in that order) when missing.
pub async fn ensure_default_groups(store: &dyn DirectoryStore) -> Result<(), SeedError> {
    let existing: BTreeSet<String> = store
        .list_groups()
        .await?
        .into_iter()
        .map(|g| g.name)
        .collect();

    if !existing.contains(OPERATOR_GROUP) {
        store
            .insert_group(OPERATOR_GROUP.to_string(), BTreeSet::new())
            .await?;
    }
    if !existing.contains(ADMINISTRATOR_GROUP) {
        store
            .insert_group(ADMINISTRATOR_GROUP.to_string(), administrator_permissions())
            .await?;
    }
    Ok(())
}

/// Credentials of the first superuser.
#[derive(Debug, Clone)]
pub struct BootstrapSuperuser {
    pub username: String,
    pub password: String,
    pub email: String,
}

/// Return the named superuser, creating it when no user has that username.
pub async fn ensure_superuser(
    store: &dyn DirectoryStore,
    hasher: &dyn PasswordHasher,
    bootstrap: &BootstrapSuperuser,
) -> Result<User, SeedError> {
    if let Some(user) = store.find_user_by_username(&bootstrap.username).await? {
        return Ok(user);
    }

    let mut user = User::new(
        bootstrap.username.clone(),
        bootstrap.email.trim().to_lowercase(),
        hasher.hash(&bootstrap.password)?,
        Utc::now(),
    );
    user.is_staff = true;
    user.is_superuser = true;

    let mut write = UserWrite::new(user.clone());
    if !user.email.is_empty() {
        write.primary_email = Some(EmailAddress::new(user.id, user.email.clone(), true, true));
    }
    let user = store.insert_user(write).await?;
    tracing::info!(user_id = %user.id, username = %user.username, "bootstrap superuser created");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use orgusers_auth::Argon2Hasher;
    use orgusers_core::GroupId;

    use super::*;
    use crate::store::InMemoryDirectoryStore;

    #[tokio::test]
    async fn default_groups_are_created_once() {
        let store = InMemoryDirectoryStore::new();
        ensure_default_groups(&store).await.unwrap();
        ensure_default_groups(&store).await.unwrap();

        let groups = store.list_groups().await.unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].id, GroupId::new(1));
        assert_eq!(groups[0].name, OPERATOR_GROUP);
        assert!(groups[0].permissions.is_empty());
        assert_eq!(groups[1].id, GroupId::new(2));
        assert_eq!(groups[1].permissions.len(), 14);
    }

    #[tokio::test]
    async fn bootstrap_superuser_is_idempotent() {
        let store = InMemoryDirectoryStore::new();
        let hasher = Argon2Hasher::with_cost(1024, 1, 1).unwrap();
        let bootstrap = BootstrapSuperuser {
            username: "admin".into(),
            password: "tester".into(),
            email: "Admin@Test.com".into(),
        };

        let first = ensure_superuser(&store, &hasher, &bootstrap).await.unwrap();
        let second = ensure_superuser(&store, &hasher, &bootstrap).await.unwrap();

        assert_eq!(first.id, second.id);
        assert!(first.is_superuser);
        assert_eq!(first.email, "admin@test.com");
        assert!(hasher.verify("tester", &first.password_hash));
        let addresses = store.email_addresses(first.id).await.unwrap();
        assert!(addresses[0].primary && addresses[0].verified);
    }
}
