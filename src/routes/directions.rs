use crate::error::Result;
use crate::models::route::{RouteAlternativesResponse, RouteRequest, RouteResponse};
use crate::AppState;
use axum::{extract::State, Json};
use std::sync::Arc;

fn log_request(kind: &str, request: &RouteRequest) {
    tracing::info!(
        origin = %request.origin,
        destination = %request.destination,
        waypoints = request.waypoints.len(),
        mode = %request.transport_mode,
        "{} request: {} -> {}, {} waypoints, mode={}",
        kind,
        request.origin,
        request.destination,
        request.waypoints.len(),
        request.transport_mode
    );
}

/// POST /routes
/// Resolve the single best route between pickup and dropoff
pub async fn resolve_route(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RouteRequest>,
) -> Result<Json<RouteResponse>> {
    log_request("Route", &request);

    // Dropping this future (client disconnect) cancels the resolution
    let route = state.resolver.resolve_route(&request).await?;

    Ok(Json(RouteResponse { route }))
}

/// POST /routes/alternatives
/// Resolve every alternative the first successful provider offers
pub async fn resolve_route_alternatives(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RouteRequest>,
) -> Result<Json<RouteAlternativesResponse>> {
    log_request("Alternatives", &request);

    let routes = state.resolver.resolve_route_alternatives(&request).await?;

    Ok(Json(RouteAlternativesResponse { routes }))
}
