use axum::Router;

use crate::state::AppState;

pub mod claims;
pub(crate) mod extractors;
pub mod handlers;
pub mod password;
pub mod session;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
