use orgusers_core::{DomainError, UserId};
use orgusers_directory::validate::REQUIRED;
use orgusers_directory::{EmailAddress, EmailChanges, WriteMode};

use super::AppServices;
use crate::app::dto::EmailRequest;
use crate::app::errors::ApiError;
use crate::context::CallerContext;

impl AppServices {
    /// The user's preferred address (primary, else the first), if any.
    pub async fn get_email(&self, caller: &CallerContext, id: UserId) -> Result<Option<EmailAddress>, ApiError> {
        self.visible_user(id, &caller.scope().user_filter_including_self())
            .await?;
        let addresses = self.store.email_addresses(id).await?;
        Ok(EmailAddress::preferred(&addresses).cloned())
    }

    /// Update the preferred address, creating it when the user has none.
    pub async fn save_email(
        &self,
        caller: &CallerContext,
        id: UserId,
        body: EmailRequest,
        mode: WriteMode,
    ) -> Result<EmailAddress, ApiError> {
        self.visible_user(id, &caller.scope().user_filter_including_self())
            .await?;
        let changes = EmailChanges::from(body);
        changes.validate(mode).into_result()?;

        let addresses = self.store.email_addresses(id).await?;
        let address = changes.into_address(id, EmailAddress::preferred(&addresses));
        if address.email.is_empty() {
            return Err(DomainError::field("email", REQUIRED).into());
        }

        let address = self.store.save_email_address(address).await?;
        tracing::info!(user_id = %id, by = %caller.user_id(), "email address saved");
        Ok(address)
    }

    pub async fn delete_email(&self, caller: &CallerContext, id: UserId) -> Result<(), ApiError> {
        self.visible_user(id, &caller.scope().user_filter_including_self())
            .await?;
        self.store.delete_email_addresses(id).await?;
        tracing::info!(user_id = %id, by = %caller.user_id(), "email addresses deleted");
        Ok(())
    }
}
