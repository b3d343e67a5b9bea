//! Field-level validation shared by the entity modules.

use std::sync::LazyLock;

use regex::Regex;

use orgusers_core::FieldErrors;

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";
pub const INVALID_EMAIL: &str = "Enter a valid email address.";
pub const INVALID_URL: &str = "Enter a valid URL.";

/// How much of a resource a write carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// New record: required fields must be present.
    Create,
    /// Full replacement (PUT): required fields must be present.
    Replace,
    /// Partial update (PATCH): only the supplied fields are checked.
    Partial,
}

impl WriteMode {
    pub fn requires_all(&self) -> bool {
        !matches!(self, WriteMode::Partial)
    }
}

/// Check a required text field: missing (when the mode needs it) or blank.
pub fn required_text(errors: &mut FieldErrors, field: &str, value: Option<&str>, mode: WriteMode) {
    match value {
        None if mode.requires_all() => errors.add(field, REQUIRED),
        Some(v) if v.trim().is_empty() => errors.add(field, BLANK),
        _ => {}
    }
}

pub fn max_length(errors: &mut FieldErrors, field: &str, value: Option<&str>, max: usize) {
    if let Some(v) = value {
        if v.chars().count() > max {
            errors.add(field, format!("Ensure this field has no more than {max} characters."));
        }
    }
}

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@([A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z0-9-]{2,63}$",
    )
    .expect("email pattern compiles")
});

static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(https?|ftps?)://([a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?(\.[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?)*|localhost|\d{1,3}(\.\d{1,3}){3})(:\d{1,5})?([/?#]\S*)?$",
    )
    .expect("url pattern compiles")
});

pub fn is_valid_email(value: &str) -> bool {
    value.len() <= 254 && EMAIL.is_match(value)
}

pub fn is_valid_url(value: &str) -> bool {
    URL.is_match(value)
}

/// Optional email: blank is allowed, anything else must parse.
pub fn optional_email(errors: &mut FieldErrors, field: &str, value: Option<&str>) {
    if let Some(v) = value {
        if !v.is_empty() && !is_valid_email(v) {
            errors.add(field, INVALID_EMAIL);
        }
    }
}

/// Optional URL: blank is allowed, anything else must parse.
pub fn optional_url(errors: &mut FieldErrors, field: &str, value: Option<&str>) {
    if let Some(v) = value {
        if !v.is_empty() && !is_valid_url(v) {
            errors.add(field, INVALID_URL);
        }
    }
}

/// Letters, digits and `@ . + - _`.
pub fn is_valid_username(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}

/// Lowercase ASCII letters, digits, hyphens and underscores.
pub fn is_valid_slug(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}
