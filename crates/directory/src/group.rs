//! Groups: named permission bundles assigned to users.

use std::collections::BTreeSet;

use orgusers_core::{FieldErrors, GroupId, PermissionId};

use crate::validate::{self, WriteMode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub permissions: BTreeSet<PermissionId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupChanges {
    pub name: Option<String>,
    pub permissions: Option<BTreeSet<PermissionId>>,
}

impl GroupChanges {
    pub fn validate(&self, mode: WriteMode) -> FieldErrors {
        let mut errors = FieldErrors::new();
        validate::required_text(&mut errors, "name", self.name.as_deref(), mode);
        validate::max_length(&mut errors, "name", self.name.as_deref(), 150);
        errors
    }

    pub fn apply_to(self, group: &mut Group) {
        if let Some(v) = self.name {
            group.name = v.trim().to_string();
        }
        if let Some(v) = self.permissions {
            group.permissions = v;
        }
    }
}
