pub mod connectivity;
pub mod directions;

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/routes", post(directions::resolve_route))
        .route(
            "/routes/alternatives",
            post(directions::resolve_route_alternatives),
        )
        .route("/health", get(connectivity::health_check))
        .route("/connectivity", put(connectivity::update_connectivity))
        .with_state(state)
}
