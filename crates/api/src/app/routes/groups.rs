use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::Value;

use orgusers_core::GroupId;

use super::{parse_id, write_mode};
use crate::app::dto;
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz::require_model_permission;
use crate::context::CallerContext;

const MODEL: &str = "group";

pub fn router() -> Router {
    Router::new()
        .route("/group/", get(list_groups).post(create_group))
        .route(
            "/group/:id/",
            get(get_group).put(update_group).patch(update_group).delete(delete_group),
        )
}

pub async fn list_groups(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    method: Method,
) -> Result<Response, ApiError> {
    require_model_permission(&caller, &method, MODEL)?;
    let groups = services.list_groups().await?;
    Ok(Json(dto::list_to_json(groups.iter().map(dto::group_to_json).collect())).into_response())
}

pub async fn create_group(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    method: Method,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    require_model_permission(&caller, &method, MODEL)?;
    let group = services.create_group(&caller, dto::decode(body?.0)?).await?;
    Ok((StatusCode::CREATED, Json(dto::group_to_json(&group))).into_response())
}

pub async fn get_group(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    method: Method,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    require_model_permission(&caller, &method, MODEL)?;
    let group = services.get_group(parse_id::<GroupId>(&id)?).await?;
    Ok(Json(dto::group_to_json(&group)).into_response())
}

pub async fn update_group(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    method: Method,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    require_model_permission(&caller, &method, MODEL)?;
    let id: GroupId = parse_id(&id)?;
    let group = services
        .update_group(&caller, id, dto::decode(body?.0)?, write_mode(&method))
        .await?;
    Ok(Json(dto::group_to_json(&group)).into_response())
}

pub async fn delete_group(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    method: Method,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    require_model_permission(&caller, &method, MODEL)?;
    let id: GroupId = parse_id(&id)?;
    services.delete_group(&caller, id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
