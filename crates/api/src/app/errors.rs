//! Consistent JSON error responses.
//!
//! Missing, foreign and wrongly-staged expenses share one 404 response so the
//! body never reveals whether an expense exists.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::IntoResponse;
use serde_json::json;
use tracing::error;

use expensegate_auth::{AccessError, TokenError};
use expensegate_expenses::{LedgerError, MediatorError, ValidationError};

pub const EXPENSE_NOT_FOUND: &str = "Expense not found or not permitted";

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// 401 with a `WWW-Authenticate: Bearer` challenge.
fn unauthorized(code: &'static str, message: impl Into<String>) -> axum::response::Response {
    let mut res = json_error(StatusCode::UNAUTHORIZED, code, message);
    res.headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    res
}

pub fn validation_error(err: &ValidationError) -> axum::response::Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        axum::Json(json!({
            "error": "validation_error",
            "field": err.field,
            "message": err.to_string(),
        })),
    )
        .into_response()
}

/// Request body that could not be parsed into the expected shape.
pub fn body_rejection(rejection: axum::extract::rejection::JsonRejection) -> axum::response::Response {
    json_error(
        StatusCode::UNPROCESSABLE_ENTITY,
        "validation_error",
        rejection.body_text(),
    )
}

fn internal_error(detail: impl std::fmt::Display) -> axum::response::Response {
    error!(error = %detail, "request failed with an internal error");
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "internal server error",
    )
}

pub fn access_error_to_response(err: AccessError) -> axum::response::Response {
    match err {
        AccessError::NotAuthenticated => {
            json_error(StatusCode::FORBIDDEN, "not_authenticated", "Not authenticated")
        }
        AccessError::InvalidCredentials => {
            unauthorized("invalid_credentials", "Incorrect username or password")
        }
        AccessError::InvalidToken(TokenError::Revoked) => {
            unauthorized("invalid_token", "Invalid token or token blacklisted")
        }
        AccessError::InvalidToken(e) => unauthorized(
            "invalid_token",
            format!("Invalid token, please re-authenticate: {e}"),
        ),
        AccessError::UnknownPrincipal => json_error(StatusCode::NOT_FOUND, "not_found", "User not found"),
        AccessError::Internal(detail) => internal_error(detail),
    }
}

/// Logout reports an already-revoked token in its own words.
pub fn logout_error_to_response(err: AccessError) -> axum::response::Response {
    match err {
        AccessError::InvalidToken(TokenError::Revoked) => unauthorized(
            "invalid_token",
            "Invalid token or user is already logged out!",
        ),
        other => access_error_to_response(other),
    }
}

pub fn ledger_error_to_response(err: LedgerError) -> axum::response::Response {
    match err {
        LedgerError::Validation(v) => validation_error(&v),
        LedgerError::NotApprover => {
            json_error(StatusCode::NOT_FOUND, "not_approver", "User is not an approver!")
        }
        LedgerError::NoApprover(department) => json_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "no_approver",
            format!("No approver is configured for department {department}"),
        ),
        LedgerError::Repository(e) => internal_error(e),
        LedgerError::NotFound | LedgerError::NotAuthorized | LedgerError::InvalidTransition { .. } => {
            json_error(StatusCode::NOT_FOUND, "not_found", EXPENSE_NOT_FOUND)
        }
    }
}

pub fn mediator_error_to_response(err: MediatorError) -> axum::response::Response {
    match err {
        MediatorError::Access(e) => access_error_to_response(e),
        MediatorError::Ledger(e) => ledger_error_to_response(e),
    }
}
