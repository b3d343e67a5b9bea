use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::Value;

use orgusers_core::OrganizationId;

use super::{parse_id, write_mode};
use crate::app::dto;
use crate::app::errors::ApiError;
use crate::app::services::{AppServices, OrganizationView};
use crate::authz::require_model_permission;
use crate::context::CallerContext;

const MODEL: &str = "organization";

pub fn router() -> Router {
    Router::new()
        .route("/organization/", get(list_organizations).post(create_organization))
        .route(
            "/organization/:id/",
            get(get_organization)
                .put(update_organization)
                .patch(update_organization)
                .delete(delete_organization),
        )
}

fn to_json(view: &OrganizationView) -> Value {
    dto::organization_to_json(&view.organization, view.owner.as_ref())
}

pub async fn list_organizations(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    method: Method,
) -> Result<Response, ApiError> {
    require_model_permission(&caller, &method, MODEL)?;
    let views = services.list_organizations(&caller).await?;
    Ok(Json(dto::list_to_json(views.iter().map(to_json).collect())).into_response())
}

pub async fn create_organization(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    method: Method,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    require_model_permission(&caller, &method, MODEL)?;
    let view = services.create_organization(&caller, dto::decode(body?.0)?).await?;
    Ok((StatusCode::CREATED, Json(to_json(&view))).into_response())
}

pub async fn get_organization(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    method: Method,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    require_model_permission(&caller, &method, MODEL)?;
    let id: OrganizationId = parse_id(&id)?;
    let view = services.get_organization(&caller, id).await?;
    Ok(Json(to_json(&view)).into_response())
}

pub async fn update_organization(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    method: Method,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    require_model_permission(&caller, &method, MODEL)?;
    let id: OrganizationId = parse_id(&id)?;
    let view = services
        .update_organization(&caller, id, dto::decode(body?.0)?, write_mode(&method))
        .await?;
    Ok(Json(to_json(&view)).into_response())
}

pub async fn delete_organization(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    method: Method,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    require_model_permission(&caller, &method, MODEL)?;
    let id: OrganizationId = parse_id(&id)?;
    services.delete_organization(&caller, id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
