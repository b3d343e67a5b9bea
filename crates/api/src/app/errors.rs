//! Error type of the HTTP layer and its JSON rendering.
//!
//! Body shape: `{"error": <code>, "message": <text>}` plus `"fields"` for
//! validation failures.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use orgusers_auth::{AuthzError, PasswordError};
use orgusers_core::{DomainError, FieldErrors};
use orgusers_infra::{SeedError, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Authz(#[from] AuthzError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    /// The request body was not a JSON document.
    #[error(transparent)]
    Body(#[from] JsonRejection),

    #[error("authentication required")]
    Unauthenticated,
}

impl ApiError {
    pub fn not_found() -> Self {
        Self::Domain(DomainError::NotFound)
    }
}

impl From<SeedError> for ApiError {
    fn from(err: SeedError) -> Self {
        match err {
            SeedError::Store(e) => Self::Store(e),
            SeedError::Password(e) => Self::Password(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Store(err) => store_error_to_response(err),
            ApiError::Authz(AuthzError::Inactive) => {
                json_error(StatusCode::UNAUTHORIZED, "unauthenticated", "account is inactive")
            }
            ApiError::Authz(err @ AuthzError::Forbidden(_)) => {
                json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string())
            }
            ApiError::Password(err) => {
                tracing::error!(error = %err, "password hashing failed");
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "password_error", "password could not be processed")
            }
            ApiError::Body(rejection) => {
                let status = rejection.status();
                let code = if status == StatusCode::UNSUPPORTED_MEDIA_TYPE {
                    "unsupported_media_type"
                } else {
                    "parse_error"
                };
                json_error(status, code, rejection.body_text())
            }
            ApiError::Unauthenticated => json_error(
                StatusCode::UNAUTHORIZED,
                "unauthenticated",
                "Authentication credentials were not provided or are invalid.",
            ),
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> Response {
    match err {
        DomainError::Validation(fields) => validation_error(fields),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "Not found."),
    }
}

pub fn store_error_to_response(err: StoreError) -> Response {
    match err {
        StoreError::Duplicate { entity, field } => {
            let mut fields = FieldErrors::new();
            fields.add(field, format!("{entity} with this {field} already exists."));
            validation_error(fields)
        }
        StoreError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "Not found."),
        StoreError::Backend(msg) => {
            tracing::error!(error = %msg, "directory store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", "internal storage error")
        }
    }
}

pub fn validation_error(fields: FieldErrors) -> Response {
    (
        StatusCode::BAD_REQUEST,
        axum::Json(json!({
            "error": "validation_error",
            "message": fields.to_string(),
            "fields": fields,
        })),
    )
        .into_response()
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
