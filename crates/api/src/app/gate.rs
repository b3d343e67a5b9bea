//! Which user fields a caller may read and write.

use std::collections::BTreeSet;

use orgusers_core::OrganizationId;
use orgusers_directory::{OrganizationUser, UserChanges};

use crate::context::CallerContext;

/// Shape of the user resource for one caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSet {
    /// Superusers: every field and every membership.
    Full,
    /// Everyone else: no `is_superuser`/`user_permissions`, and only the
    /// memberships in these organizations.
    Restricted { organizations: BTreeSet<OrganizationId> },
}

impl FieldSet {
    pub fn for_caller(caller: &CallerContext) -> Self {
        if caller.is_superuser() {
            FieldSet::Full
        } else {
            FieldSet::Restricted {
                organizations: caller.scope().managed_organizations().clone(),
            }
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, FieldSet::Full)
    }

    pub fn visible_memberships<'a>(
        &'a self,
        memberships: &'a [OrganizationUser],
    ) -> impl Iterator<Item = &'a OrganizationUser> + 'a {
        memberships.iter().filter(move |m| match self {
            FieldSet::Full => true,
            FieldSet::Restricted { organizations } => organizations.contains(&m.organization_id),
        })
    }

    /// Drop writes to fields this caller only gets to read.
    pub fn strip_read_only(&self, changes: &mut UserChanges) {
        if !self.is_full() {
            changes.is_superuser = None;
            changes.user_permissions = None;
        }
    }
}
