use crate::constants::*;
use crate::models::ProviderId;
use crate::resilience::{ConnectionQuality, RetryPolicy};
use crate::services::google::GoogleDirectionsClient;
use crate::services::graphhopper::GraphHopperClient;
use crate::services::mapbox::{AuthMode, MapboxClient};
use crate::services::ProviderClient;
use std::env;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Fallback order; providers without credentials are skipped at build time
    pub provider_order: Vec<ProviderId>,
    pub google: ProviderCredentials,
    pub mapbox: ProviderCredentials,
    pub graphhopper: ProviderCredentials,
    pub retry_policy: RetryPolicy,
    pub initial_connection_quality: ConnectionQuality,
}

#[derive(Debug, Clone, Default)]
pub struct ProviderCredentials {
    pub api_key: Option<String>,
    /// Overrides the public endpoint (proxies, tests)
    pub base_url: Option<String>,
}

impl ProviderCredentials {
    fn from_env(key_var: &str, url_var: &str) -> Self {
        ProviderCredentials {
            api_key: env::var(key_var).ok().filter(|k| !k.trim().is_empty()),
            base_url: env::var(url_var).ok().filter(|u| !u.trim().is_empty()),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        dotenv::dotenv().ok();

        let provider_order = parse_provider_order(
            &env::var("ROUTING_PROVIDERS").unwrap_or_else(|_| DEFAULT_PROVIDER_ORDER.to_string()),
        )?;

        let retry_policy = RetryPolicy::new(
            env::var("RETRY_MAX_ATTEMPTS")
                .unwrap_or_else(|_| DEFAULT_RETRY_MAX_ATTEMPTS.to_string())
                .parse()
                .map_err(|_| "Invalid RETRY_MAX_ATTEMPTS")?,
            Duration::from_millis(
                env::var("RETRY_INITIAL_DELAY_MS")
                    .unwrap_or_else(|_| DEFAULT_RETRY_INITIAL_DELAY_MS.to_string())
                    .parse()
                    .map_err(|_| "Invalid RETRY_INITIAL_DELAY_MS")?,
            ),
            Duration::from_millis(
                env::var("RETRY_MAX_DELAY_MS")
                    .unwrap_or_else(|_| DEFAULT_RETRY_MAX_DELAY_MS.to_string())
                    .parse()
                    .map_err(|_| "Invalid RETRY_MAX_DELAY_MS")?,
            ),
            env::var("RETRY_BACKOFF_MULTIPLIER")
                .unwrap_or_else(|_| DEFAULT_RETRY_BACKOFF_MULTIPLIER.to_string())
                .parse()
                .map_err(|_| "Invalid RETRY_BACKOFF_MULTIPLIER")?,
        )
        .map_err(|e| format!("Invalid retry policy: {}", e))?;

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_PORT.to_string())
                .parse()
                .map_err(|_| "Invalid PORT")?,
            provider_order,
            google: ProviderCredentials::from_env(
                "GOOGLE_MAPS_API_KEY",
                "GOOGLE_DIRECTIONS_BASE_URL",
            ),
            mapbox: ProviderCredentials::from_env("MAPBOX_API_KEY", "MAPBOX_DIRECTIONS_BASE_URL"),
            graphhopper: ProviderCredentials::from_env(
                "GRAPHHOPPER_API_KEY",
                "GRAPHHOPPER_ROUTE_BASE_URL",
            ),
            retry_policy,
            initial_connection_quality: env::var("CONNECTION_QUALITY")
                .unwrap_or_else(|_| "wifi".to_string())
                .parse()?,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Construct provider clients in configured order. Providers without an
    /// API key are skipped.
    pub fn build_providers(&self) -> Vec<Arc<dyn ProviderClient>> {
        let mut providers: Vec<Arc<dyn ProviderClient>> = Vec::new();

        for id in &self.provider_order {
            let credentials = match id {
                ProviderId::Google => &self.google,
                ProviderId::Mapbox => &self.mapbox,
                ProviderId::GraphHopper => &self.graphhopper,
            };
            let Some(api_key) = credentials.api_key.clone() else {
                tracing::warn!(provider = %id, "No API key for {}, skipping provider", id);
                continue;
            };

            let client: Arc<dyn ProviderClient> = match (id, credentials.base_url.clone()) {
                (ProviderId::Google, Some(url)) => {
                    Arc::new(GoogleDirectionsClient::with_base_url(api_key, url))
                }
                (ProviderId::Google, None) => Arc::new(GoogleDirectionsClient::new(api_key)),
                (ProviderId::Mapbox, Some(url)) => Arc::new(MapboxClient::with_config(
                    api_key,
                    url,
                    AuthMode::BearerHeader,
                )),
                (ProviderId::Mapbox, None) => Arc::new(MapboxClient::new(api_key)),
                (ProviderId::GraphHopper, Some(url)) => {
                    Arc::new(GraphHopperClient::with_base_url(api_key, url))
                }
                (ProviderId::GraphHopper, None) => Arc::new(GraphHopperClient::new(api_key)),
            };
            providers.push(client);
        }

        providers
    }
}

/// Parse a comma-separated provider list, keeping first occurrence order.
pub fn parse_provider_order(value: &str) -> Result<Vec<ProviderId>, String> {
    let mut order = Vec::new();
    for name in value.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        let id: ProviderId = name.parse()?;
        if !order.contains(&id) {
            order.push(id);
        }
    }
    Ok(order)
}
