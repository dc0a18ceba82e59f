use axum::Router;
use rideroute::config::Config;
use rideroute::resilience::SharedConnectivity;
use rideroute::services::RouteResolver;
use rideroute::AppState;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rideroute=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| format!("Failed to load configuration: {}", e))?;

    tracing::info!("Starting RideRoute API server");
    tracing::info!("Configuration loaded successfully");

    let providers = config.build_providers();
    if providers.is_empty() {
        tracing::warn!("No routing provider has credentials; every route request will fail");
    } else {
        tracing::info!(
            "Routing providers (fallback order): {}",
            providers
                .iter()
                .map(|p| p.id().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    let connectivity = Arc::new(SharedConnectivity::new(config.initial_connection_quality));
    tracing::info!(
        "Initial connection quality: {}",
        config.initial_connection_quality
    );

    let resolver = RouteResolver::new(
        providers,
        config.retry_policy.clone(),
        connectivity.clone(),
    );

    // Create application state
    let state = Arc::new(AppState {
        resolver,
        connectivity,
    });

    // Build router with CORS and tracing
    let app = Router::new()
        .nest("/api/v1", rideroute::routes::create_router(state))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = config.server_address();
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
