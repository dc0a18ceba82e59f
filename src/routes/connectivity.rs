use crate::resilience::{ConnectionQuality, ConnectivityProbe};
use crate::AppState;
use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// GET /health - Configured providers and current connectivity
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let providers = state.resolver.provider_ids();
    let quality = state.resolver.connection_quality();

    let status = if providers.is_empty() { "degraded" } else { "ok" };

    Json(json!({
        "status": status,
        "providers": providers,
        "connection_quality": quality,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ConnectivityUpdate {
    pub quality: ConnectionQuality,
}

/// PUT /connectivity - Platform layer reports a network change
pub async fn update_connectivity(
    State(state): State<Arc<AppState>>,
    Json(update): Json<ConnectivityUpdate>,
) -> Json<Value> {
    state.connectivity.set(update.quality);

    Json(json!({
        "connection_quality": state.connectivity.current_quality(),
    }))
}
