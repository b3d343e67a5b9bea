use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use crate::context::CallerContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(caller): Extension<CallerContext>) -> impl IntoResponse {
    Json(serde_json::json!({
        "id": caller.user_id().to_string(),
        "username": caller.username(),
        "is_superuser": caller.is_superuser(),
        "managed_organizations": caller
            .scope()
            .managed_organizations()
            .iter()
            .map(|o| o.to_string())
            .collect::<Vec<_>>(),
    }))
}
