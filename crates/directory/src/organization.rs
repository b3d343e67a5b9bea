//! Organizations and their settings.

use chrono::{DateTime, Utc};

use orgusers_core::{Entity, FieldErrors, OrganizationId};

use crate::validate::{self, WriteMode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    pub slug: String,
    pub is_active: bool,
    pub description: String,
    pub email: String,
    pub url: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl Organization {
    pub fn new(name: impl Into<String>, slug: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: OrganizationId::new(),
            name: name.into(),
            slug: slug.into(),
            is_active: true,
            description: String::new(),
            email: String::new(),
            url: String::new(),
            created: now,
            modified: now,
        }
    }

    pub fn create(changes: OrganizationChanges, now: DateTime<Utc>) -> Self {
        let mut org = Organization::new(String::new(), String::new(), now);
        changes.apply_to(&mut org, now);
        org
    }
}

impl Entity for Organization {
    type Id = OrganizationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganizationChanges {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub is_active: Option<bool>,
    pub description: Option<String>,
    pub email: Option<String>,
    pub url: Option<String>,
}

impl OrganizationChanges {
    pub fn validate(&self, mode: WriteMode) -> FieldErrors {
        let mut errors = FieldErrors::new();

        validate::required_text(&mut errors, "name", self.name.as_deref(), mode);
        validate::max_length(&mut errors, "name", self.name.as_deref(), 200);

        validate::required_text(&mut errors, "slug", self.slug.as_deref(), mode);
        if let Some(slug) = self.slug.as_deref() {
            if !slug.trim().is_empty() && !validate::is_valid_slug(slug) {
                errors.add(
                    "slug",
                    "Enter a valid \"slug\" consisting of lowercase letters, numbers, underscores or hyphens.",
                );
            }
        }

        validate::optional_email(&mut errors, "email", self.email.as_deref());
        validate::optional_url(&mut errors, "url", self.url.as_deref());

        errors
    }

    pub fn apply_to(self, org: &mut Organization, now: DateTime<Utc>) {
        if let Some(v) = self.name {
            org.name = v.trim().to_string();
        }
        if let Some(v) = self.slug {
            org.slug = v;
        }
        if let Some(v) = self.is_active {
            org.is_active = v;
        }
        if let Some(v) = self.description {
            org.description = v;
        }
        if let Some(v) = self.email {
            org.email = v;
        }
        if let Some(v) = self.url {
            org.url = v;
        }
        org.modified = now;
    }
}
