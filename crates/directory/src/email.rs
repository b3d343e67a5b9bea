//! Per-user email addresses.

use orgusers_core::{EmailAddressId, FieldErrors, UserId};

use crate::validate::{self, WriteMode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress {
    pub id: EmailAddressId,
    pub user_id: UserId,
    pub email: String,
    pub verified: bool,
    pub primary: bool,
}

impl EmailAddress {
    pub fn new(user_id: UserId, email: impl Into<String>, verified: bool, primary: bool) -> Self {
        Self {
            id: EmailAddressId::new(),
            user_id,
            email: email.into(),
            verified,
            primary,
        }
    }

    /// The address shown for a user: the primary one, else the first.
    pub fn preferred(addresses: &[EmailAddress]) -> Option<&EmailAddress> {
        addresses
            .iter()
            .find(|a| a.primary)
            .or_else(|| addresses.first())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailChanges {
    pub email: Option<String>,
    pub verified: Option<bool>,
    pub primary: Option<bool>,
}

impl EmailChanges {
    pub fn validate(&self, mode: WriteMode) -> FieldErrors {
        let mut errors = FieldErrors::new();
        validate::required_text(&mut errors, "email", self.email.as_deref(), mode);
        if let Some(email) = self.email.as_deref() {
            if !email.trim().is_empty() && !validate::is_valid_email(email) {
                errors.add("email", validate::INVALID_EMAIL);
            }
        }
        errors
    }

    /// Apply to an existing address, or build a new one for `user_id`.
    ///
    /// New addresses are unverified and non-primary unless stated otherwise.
    /// A primary address stays primary: `User.email` always mirrors one.
    pub fn into_address(self, user_id: UserId, existing: Option<&EmailAddress>) -> EmailAddress {
        let mut address = match existing {
            Some(a) => a.clone(),
            None => EmailAddress::new(user_id, String::new(), false, false),
        };
        if let Some(v) = self.email {
            address.email = v.trim().to_lowercase();
        }
        if let Some(v) = self.verified {
            address.verified = v;
        }
        if let Some(v) = self.primary {
            address.primary |= v;
        }
        address
    }
}
