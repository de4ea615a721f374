use axum::{routing::get, Router};

use crate::state::AppState;

pub mod handlers;
pub mod layout;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::index))
        .route("/parque", get(handlers::parque))
        .route("/peticiones", get(handlers::peticiones))
        .route("/vales", get(handlers::vales))
        .route("/seguimiento", get(handlers::seguimiento))
        .route("/copiar", get(handlers::copiar))
}
