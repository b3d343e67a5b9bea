//! API-side model permission guard.
//!
//! Every endpoint names the model it works on; the HTTP method picks the
//! action. The check runs before any record is looked up.

use axum::http::Method;

use orgusers_auth::{authorize, ModelAction, Permission};

use crate::app::errors::ApiError;
use crate::context::CallerContext;

/// Model action implied by an HTTP method.
pub fn action_for(method: &Method) -> ModelAction {
    match *method {
        Method::POST => ModelAction::Add,
        Method::PUT | Method::PATCH => ModelAction::Change,
        Method::DELETE => ModelAction::Delete,
        _ => ModelAction::View,
    }
}

/// Require `<action>_<model>` for the current request.
pub fn require_model_permission(
    caller: &CallerContext,
    method: &Method,
    model: &str,
) -> Result<(), ApiError> {
    let required = Permission::for_model(action_for(method), model);
    authorize(caller.principal(), &required)?;
    Ok(())
}
