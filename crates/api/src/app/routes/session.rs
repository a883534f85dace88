use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::HeaderMap,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use chrono::Utc;

use expensegate_core::Username;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::middleware::extract_bearer;

/// Login / logout. Both handle the bearer credential themselves.
pub fn router() -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::LoginRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::body_rejection(rejection),
    };

    let username = Username::new(body.username);
    match services
        .authenticator()
        .login(&username, &body.password, Utc::now())
        .await
    {
        Ok((_principal, token)) => Json(dto::LoginResponse::from(token)).into_response(),
        Err(e) => errors::access_error_to_response(e),
    }
}

pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
) -> axum::response::Response {
    match services
        .authenticator()
        .logout(extract_bearer(&headers), Utc::now())
        .await
    {
        Ok(username) => Json(serde_json::json!({ "username": username.as_str() })).into_response(),
        Err(e) => errors::logout_error_to_response(e),
    }
}
