//! Directory services used by the HTTP handlers.
//!
//! Every operation takes the resolved caller and applies access scope before
//! touching records; model permissions are checked earlier by the handlers.

use std::collections::BTreeSet;
use std::sync::Arc;

use orgusers_auth::{Argon2Hasher, AuthzError, PasswordHasher, Principal};
use orgusers_core::{OrganizationId, PermissionId, UserId};
use orgusers_directory::{CallerScope, OrganizationOwner, Organization, OrganizationUser, PermissionCatalog, User};
use orgusers_infra::{ensure_default_groups, ensure_superuser, InMemoryDirectoryStore, SharedStore};

use crate::app::errors::ApiError;
use crate::config::ApiConfig;
use crate::context::CallerContext;

pub mod emails;
pub mod groups;
pub mod organizations;
pub mod passwords;
pub mod users;

/// A user with its memberships.
#[derive(Debug, Clone)]
pub struct UserView {
    pub user: User,
    pub memberships: Vec<OrganizationUser>,
}

/// An organization with its owner, if any.
#[derive(Debug, Clone)]
pub struct OrganizationView {
    pub organization: Organization,
    pub owner: Option<OrganizationOwner>,
}

pub struct AppServices {
    store: SharedStore,
    hasher: Arc<dyn PasswordHasher>,
}

impl AppServices {
    pub fn new(store: SharedStore, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { store, hasher }
    }

    /// Pick the store for `config`, then seed the default groups and the
    /// bootstrap superuser.
    pub async fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        let store = build_store(config).await?;
        let services = Self::new(store, Arc::new(Argon2Hasher::new()));
        services.seed(config).await?;
        Ok(services)
    }

    pub async fn seed(&self, config: &ApiConfig) -> Result<(), ApiError> {
        ensure_default_groups(self.store.as_ref()).await?;
        if let Some(bootstrap) = &config.bootstrap {
            ensure_superuser(self.store.as_ref(), self.hasher.as_ref(), bootstrap).await?;
        }
        Ok(())
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Resolve a token subject into the request caller.
    ///
    /// Unknown subjects are unauthenticated; inactive accounts are rejected.
    pub async fn resolve_caller(&self, user_id: UserId) -> Result<CallerContext, ApiError> {
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or(ApiError::Unauthenticated)?;
        if !user.is_active {
            return Err(AuthzError::Inactive.into());
        }

        let memberships = self.store.memberships_of_user(user.id).await?;
        let scope = CallerScope::resolve(&user, &memberships);

        let mut granted: BTreeSet<PermissionId> = user.user_permissions.clone();
        for group_id in &user.groups {
            if let Some(group) = self.store.get_group(*group_id).await? {
                granted.extend(group.permissions);
            }
        }
        let principal = Principal::new(user.id, user.is_superuser, user.is_active)
            .with_permissions(PermissionCatalog::global().permissions_for(&granted));

        Ok(CallerContext::new(principal, scope, user.username))
    }

    /// Organizations the caller may reference in nested writes.
    async fn editable_organizations(&self, caller: &CallerContext) -> Result<BTreeSet<OrganizationId>, ApiError> {
        Ok(self
            .store
            .list_organizations(&caller.scope().organization_filter())
            .await?
            .into_iter()
            .map(|o| o.id)
            .collect())
    }
}

#[cfg(not(feature = "postgres"))]
async fn build_store(_config: &ApiConfig) -> Result<SharedStore, ApiError> {
    tracing::info!("using in-memory directory store");
    Ok(InMemoryDirectoryStore::arc())
}

#[cfg(feature = "postgres")]
async fn build_store(config: &ApiConfig) -> Result<SharedStore, ApiError> {
    match config.database_url.as_deref() {
        Some(url) => {
            let store = orgusers_infra::PostgresDirectoryStore::connect(url).await?;
            tracing::info!("using postgres directory store");
            Ok(Arc::new(store))
        }
        None => {
            tracing::info!("DATABASE_URL not set; using in-memory directory store");
            Ok(InMemoryDirectoryStore::arc())
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    pub fn services() -> AppServices {
        let hasher = Argon2Hasher::with_cost(1024, 1, 1).unwrap();
        AppServices::new(InMemoryDirectoryStore::arc(), Arc::new(hasher))
    }

    pub async fn caller(services: &AppServices, user: &User) -> CallerContext {
        services.resolve_caller(user.id).await.unwrap()
    }
}
