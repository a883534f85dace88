//! Creator-side expense endpoints.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
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
        .route("/", post(create_expense))
        .route("/me", get(list_my_expenses))
        .route("/me/:id", get(get_my_expense))
        .route("/submit/:id", post(submit_expense))
        .route("/delete/:id", delete(delete_expense))
}

pub async fn create_expense(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<IdentityContext>,
    body: Result<Json<dto::CreateExpenseRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::body_rejection(rejection),
    };

    match services
        .mediator()
        .create(identity.username(), body.into(), Utc::now())
        .await
    {
        Ok(expense) => (StatusCode::CREATED, Json(dto::ExpenseResponse::from(&expense))).into_response(),
        Err(e) => errors::mediator_error_to_response(e),
    }
}

pub async fn list_my_expenses(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<IdentityContext>,
) -> axum::response::Response {
    match services.mediator().list_created_by(identity.username()).await {
        Ok(expenses) => Json(dto::expenses_to_json(&expenses)).into_response(),
        Err(e) => errors::mediator_error_to_response(e),
    }
}

pub async fn get_my_expense(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<IdentityContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = ExpenseId::new(id);
    match services
        .mediator()
        .get_by_id(identity.username(), &id, View::Creator)
        .await
    {
        Ok(expense) => Json(dto::ExpenseResponse::from(&expense)).into_response(),
        Err(e) => errors::mediator_error_to_response(e),
    }
}

pub async fn submit_expense(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<IdentityContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = ExpenseId::new(id);
    match services.mediator().submit(identity.username(), &id).await {
        Ok(expense) => Json(dto::ExpenseResponse::from(&expense)).into_response(),
        Err(e) => errors::mediator_error_to_response(e),
    }
}

pub async fn delete_expense(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<IdentityContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = ExpenseId::new(id);
    match services.mediator().delete(identity.username(), &id).await {
        Ok(removed) => Json(serde_json::json!({
            "message": "Expense deleted successfully",
            "expense_id": removed.expense_id.as_str(),
        }))
        .into_response(),
        Err(e) => errors::mediator_error_to_response(e),
    }
}
