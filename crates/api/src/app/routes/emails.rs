use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::Value;

use orgusers_core::UserId;

use super::{parse_id, write_mode};
use crate::app::dto;
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz::require_model_permission;
use crate::context::CallerContext;

const MODEL: &str = "emailaddress";

pub fn router() -> Router {
    Router::new().route(
        "/users/:id/email/",
        get(get_email).put(save_email).patch(save_email).delete(delete_email),
    )
}

pub async fn get_email(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    method: Method,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    require_model_permission(&caller, &method, MODEL)?;
    let id: UserId = parse_id(&id)?;
    let address = services.get_email(&caller, id).await?;
    Ok(Json(dto::email_to_json(address.as_ref())).into_response())
}

pub async fn save_email(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    method: Method,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    require_model_permission(&caller, &method, MODEL)?;
    let id: UserId = parse_id(&id)?;
    let address = services
        .save_email(&caller, id, dto::decode(body?.0)?, write_mode(&method))
        .await?;
    Ok(Json(dto::email_to_json(Some(&address))).into_response())
}

pub async fn delete_email(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    method: Method,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    require_model_permission(&caller, &method, MODEL)?;
    let id: UserId = parse_id(&id)?;
    services.delete_email(&caller, id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
