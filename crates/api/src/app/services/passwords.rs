use orgusers_core::{DomainError, UserId};

use super::AppServices;
use crate::app::dto::ChangePasswordRequest;
use crate::app::errors::ApiError;
use crate::context::CallerContext;

pub const WRONG_PASSWORD: &str = "You have entered a wrong password.";

impl AppServices {
    /// Replace a user's password after checking the current one.
    ///
    /// The caller may target any user in scope, and always themself.
    pub async fn change_password(
        &self,
        caller: &CallerContext,
        id: UserId,
        body: ChangePasswordRequest,
    ) -> Result<(), ApiError> {
        let user = self
            .visible_user(id, &caller.scope().user_filter_including_self())
            .await?;
        let (old_password, new_password) = body.into_pair()?;

        if !self.hasher.verify(&old_password, &user.password_hash) {
            return Err(DomainError::field("old_password", WRONG_PASSWORD).into());
        }

        let hash = self.hasher.hash(&new_password)?;
        self.store.set_password(id, hash).await?;
        tracing::info!(user_id = %id, by = %caller.user_id(), "password changed");
        Ok(())
    }
}
