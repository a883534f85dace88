use std::sync::Arc;

use axum::{
    extract::Extension,
    response::IntoResponse,
    Json,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::IdentityContext;

pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "welcome to expense submission tool" }))
}

pub async fn health(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "store": services.backend().as_str(),
    }))
}

pub async fn whoami(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<IdentityContext>,
) -> axum::response::Response {
    match services.mediator().principal(identity.username()).await {
        Ok(principal) => Json(dto::WhoAmIResponse::from(&principal)).into_response(),
        Err(e) => errors::mediator_error_to_response(e),
    }
}
