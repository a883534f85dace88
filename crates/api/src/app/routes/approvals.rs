//! Approver-side expense endpoints.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

use expensegate_core::ExpenseId;
use expensegate_expenses::View;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::IdentityContext;

pub fn router() -> Router {
    Router::new()
        .route("/approvals/me", get(list_my_approvals))
        .route("/approvals/me/:id", get(get_my_approval))
        .route("/approve/:id", post(approve_expense))
        .route("/reject/:id", post(reject_expense))
}

pub async fn list_my_approvals(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<IdentityContext>,
) -> axum::response::Response {
    match services.mediator().list_for_approval(identity.username()).await {
        Ok(expenses) => Json(dto::expenses_to_json(&expenses)).into_response(),
        Err(e) => errors::mediator_error_to_response(e),
    }
}

pub async fn get_my_approval(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<IdentityContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = ExpenseId::new(id);
    match services
        .mediator()
        .get_by_id(identity.username(), &id, View::Approver)
        .await
    {
        Ok(expense) => Json(dto::ExpenseResponse::from(&expense)).into_response(),
        Err(e) => errors::mediator_error_to_response(e),
    }
}

pub async fn approve_expense(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<IdentityContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = ExpenseId::new(id);
    match services
        .mediator()
        .accept(identity.username(), &id, Utc::now())
        .await
    {
        Ok(expense) => Json(dto::ExpenseResponse::from(&expense)).into_response(),
        Err(e) => errors::mediator_error_to_response(e),
    }
}

pub async fn reject_expense(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<IdentityContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::RejectExpenseRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::body_rejection(rejection),
    };

    let id = ExpenseId::new(id);
    match services
        .mediator()
        .reject(identity.username(), &id, &body.rejection_reason, Utc::now())
        .await
    {
        Ok(expense) => Json(dto::ExpenseResponse::from(&expense)).into_response(),
        Err(e) => errors::mediator_error_to_response(e),
    }
}
