use std::collections::BTreeSet;

use orgusers_core::UserId;

use crate::Permission;

/// A fully resolved caller for authorization decisions.
///
/// Construction is decoupled from storage and transport: the API derives it
/// from the token subject plus the stored account (flags, direct permissions,
/// and permissions inherited from groups).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub is_superuser: bool,
    pub is_active: bool,
    pub permissions: BTreeSet<Permission>,
}

impl Principal {
    pub fn new(user_id: UserId, is_superuser: bool, is_active: bool) -> Self {
        Self {
            user_id,
            is_superuser,
            is_active,
            permissions: BTreeSet::new(),
        }
    }

    pub fn with_permissions(mut self, permissions: impl IntoIterator<Item = Permission>) -> Self {
        self.permissions.extend(permissions);
        self
    }

    pub fn has_permission(&self, permission: &Permission) -> bool {
        self.is_superuser || self.permissions.contains(permission)
    }
}
