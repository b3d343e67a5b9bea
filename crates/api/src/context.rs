use orgusers_auth::Principal;
use orgusers_core::UserId;
use orgusers_directory::CallerScope;

/// The authenticated caller of a request.
///
/// Resolved once by the auth middleware and read by every handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    principal: Principal,
    scope: CallerScope,
    username: String,
}

impl CallerContext {
    pub fn new(principal: Principal, scope: CallerScope, username: impl Into<String>) -> Self {
        Self {
            principal,
            scope,
            username: username.into(),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.principal.user_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn is_superuser(&self) -> bool {
        self.principal.is_superuser
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn scope(&self) -> &CallerScope {
        &self.scope
    }
}
