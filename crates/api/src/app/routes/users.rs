use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde_json::{json, Value};

use orgusers_core::UserId;

use super::{parse_id, write_mode};
use crate::app::dto;
use crate::app::errors::ApiError;
use crate::app::gate::FieldSet;
use crate::app::services::{AppServices, UserView};
use crate::authz::require_model_permission;
use crate::context::CallerContext;

const MODEL: &str = "user";

pub fn router() -> Router {
    Router::new()
        .route("/users/", get(list_users).post(create_user))
        .route(
            "/users/:id/",
            get(get_user).put(update_user).patch(update_user).delete(delete_user),
        )
        .route("/users/:id/changepassword/", put(change_password))
}

fn to_json(view: &UserView, fields: &FieldSet) -> Value {
    dto::user_to_json(&view.user, &view.memberships, fields)
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    method: Method,
) -> Result<Response, ApiError> {
    require_model_permission(&caller, &method, MODEL)?;
    let fields = FieldSet::for_caller(&caller);
    let views = services.list_users(&caller).await?;
    let results = views.iter().map(|v| to_json(v, &fields)).collect();
    Ok(Json(dto::list_to_json(results)).into_response())
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    method: Method,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    require_model_permission(&caller, &method, MODEL)?;
    let view = services.create_user(&caller, dto::decode(body?.0)?).await?;
    let fields = FieldSet::for_caller(&caller);
    Ok((StatusCode::CREATED, Json(to_json(&view, &fields))).into_response())
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    method: Method,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    require_model_permission(&caller, &method, MODEL)?;
    let id: UserId = parse_id(&id)?;
    let view = services.get_user(&caller, id).await?;
    Ok(Json(to_json(&view, &FieldSet::for_caller(&caller))).into_response())
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    method: Method,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    require_model_permission(&caller, &method, MODEL)?;
    let id: UserId = parse_id(&id)?;
    let view = services
        .update_user(&caller, id, dto::decode(body?.0)?, write_mode(&method))
        .await?;
    Ok(Json(to_json(&view, &FieldSet::for_caller(&caller))).into_response())
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    method: Method,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    require_model_permission(&caller, &method, MODEL)?;
    let id: UserId = parse_id(&id)?;
    services.delete_user(&caller, id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

pub async fn change_password(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    method: Method,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    require_model_permission(&caller, &method, MODEL)?;
    let id: UserId = parse_id(&id)?;
    services.change_password(&caller, id, dto::decode(body?.0)?).await?;
    Ok(Json(json!({
        "status": "success",
        "message": "Password updated successfully",
    }))
    .into_response())
}
