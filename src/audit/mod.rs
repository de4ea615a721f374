//! Append-only audit trail: one row per login, page view, and admin
//! mutation. Writes never block or fail the triggering request.

use axum::Router;

use crate::state::AppState;

pub mod handlers;
pub mod middleware;
pub mod recorder;
pub mod repo;
pub mod repo_types;

pub fn router() -> Router<AppState> {
    handlers::admin_routes()
}
