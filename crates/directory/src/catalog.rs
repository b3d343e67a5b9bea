//! Fixed catalog of model permissions.
//!
//! Every model gets `add`, `change`, `delete` and `view`; ids are assigned
//! sequentially in model order, then action order, starting at 1.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use orgusers_auth::{ModelAction, Permission};
use orgusers_core::{DomainError, DomainResult, PermissionId};

/// Models known to the catalog with their human readable names.
pub const MODELS: [(&str, &str); 6] = [
    ("emailaddress", "email address"),
    ("group", "group"),
    ("organization", "organization"),
    ("organizationowner", "organization owner"),
    ("organizationuser", "organization user"),
    ("user", "user"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionEntry {
    pub id: PermissionId,
    pub model: &'static str,
    pub action: ModelAction,
    pub codename: String,
    pub name: String,
}

impl PermissionEntry {
    /// `"<id>: <model> | <name>"`, the form clients see in group payloads.
    pub fn display(&self) -> String {
        format!("{}: {} | {}", self.id, self.model, self.name)
    }

    pub fn permission(&self) -> Permission {
        Permission::new(self.codename.clone())
    }
}

#[derive(Debug)]
pub struct PermissionCatalog {
    entries: Vec<PermissionEntry>,
}

impl PermissionCatalog {
    /// The process-wide catalog.
    pub fn global() -> &'static PermissionCatalog {
        static CATALOG: OnceLock<PermissionCatalog> = OnceLock::new();
        CATALOG.get_or_init(PermissionCatalog::build)
    }

    fn build() -> Self {
        let mut entries = Vec::with_capacity(MODELS.len() * ModelAction::ALL.len());
        let mut next = 1;
        for (model, verbose) in MODELS {
            for action in ModelAction::ALL {
                entries.push(PermissionEntry {
                    id: PermissionId::new(next),
                    model,
                    action,
                    codename: Permission::for_model(action, model).as_str().to_string(),
                    name: format!("Can {} {}", action.as_str(), verbose),
                });
                next += 1;
            }
        }
        Self { entries }
    }

    pub fn entries(&self) -> &[PermissionEntry] {
        &self.entries
    }

    pub fn get(&self, id: PermissionId) -> Option<&PermissionEntry> {
        let idx = usize::try_from(id.get()).ok()?.checked_sub(1)?;
        self.entries.get(idx)
    }

    pub fn by_codename(&self, codename: &str) -> Option<&PermissionEntry> {
        self.entries.iter().find(|e| e.codename == codename)
    }

    /// Resolve a client reference: a bare id (`"3"`) or the display form
    /// (`"3: emailaddress | Can delete email address"`). Only the leading id
    /// is significant.
    pub fn resolve_reference(&self, reference: &str) -> DomainResult<PermissionId> {
        let head = reference.split(':').next().unwrap_or_default();
        let id: PermissionId = head.parse().map_err(|_| {
            DomainError::field("permissions", format!("Invalid permission \"{reference}\"."))
        })?;
        self.ensure_known(id)
    }

    pub fn ensure_known(&self, id: PermissionId) -> DomainResult<PermissionId> {
        match self.get(id) {
            Some(_) => Ok(id),
            None => Err(DomainError::field(
                "permissions",
                format!("Invalid pk \"{id}\" - object does not exist."),
            )),
        }
    }

    /// Codenames for a set of permission ids (unknown ids are skipped).
    pub fn permissions_for<'a>(
        &self,
        ids: impl IntoIterator<Item = &'a PermissionId>,
    ) -> BTreeSet<Permission> {
        ids.into_iter()
            .filter_map(|id| self.get(*id))
            .map(PermissionEntry::permission)
            .collect()
    }
}
