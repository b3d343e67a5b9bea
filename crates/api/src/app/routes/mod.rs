use std::str::FromStr;

use axum::{http::Method, routing::get, Router};

use orgusers_directory::WriteMode;

use crate::app::errors::ApiError;

pub mod emails;
pub mod groups;
pub mod organizations;
pub mod system;
pub mod users;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest(
            "/user",
            Router::new()
                .merge(organizations::router())
                .merge(users::router())
                .merge(emails::router())
                .merge(groups::router()),
        )
}

/// Parse a path id; anything unparsable is simply not found.
pub(crate) fn parse_id<T: FromStr>(raw: &str) -> Result<T, ApiError> {
    raw.parse().map_err(|_| ApiError::not_found())
}

/// PUT replaces the resource, PATCH updates the supplied fields.
pub(crate) fn write_mode(method: &Method) -> WriteMode {
    if *method == Method::PUT {
        WriteMode::Replace
    } else {
        WriteMode::Partial
    }
}
