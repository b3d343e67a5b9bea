use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are model permissions named by codename
/// (`<action>_<model>`, e.g. `"view_organization"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Permission required to perform `action` on `model`.
    pub fn for_model(action: ModelAction, model: &str) -> Self {
        Self(Cow::Owned(format!("{}_{}", action.as_str(), model)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The four actions every model permission is defined for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelAction {
    Add,
    Change,
    Delete,
    View,
}

impl ModelAction {
    /// Catalog order.
    pub const ALL: [ModelAction; 4] = [
        ModelAction::Add,
        ModelAction::Change,
        ModelAction::Delete,
        ModelAction::View,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelAction::Add => "add",
            ModelAction::Change => "change",
            ModelAction::Delete => "delete",
            ModelAction::View => "view",
        }
    }
}
