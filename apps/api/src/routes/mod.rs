pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::deletion::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/delete-account", post(handlers::handle_delete_account))
        .with_state(state)
}
