use axum::{routing::get, Router};

pub mod approvals;
pub mod expenses;
pub mod session;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/expenses", expenses::router().merge(approvals::router()))
}
