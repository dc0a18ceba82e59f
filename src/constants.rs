//! Stable application-wide constants.
//!
//! Values here are provider endpoints and default fallbacks for env-var-based
//! configuration. They should rarely change; see
//! [`Config`](crate::config::Config) for the runtime knobs.

// --- Server defaults (used when HOST / PORT env vars are absent) ---

/// Default bind address for the HTTP server.
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Default port for the HTTP server.
pub const DEFAULT_PORT: &str = "3000";

// --- Provider endpoints (overridable per provider) ---

pub const GOOGLE_DIRECTIONS_BASE_URL: &str =
    "https://maps.googleapis.com/maps/api/directions/json";
pub const MAPBOX_DIRECTIONS_BASE_URL: &str = "https://api.mapbox.com/directions/v5/mapbox";
pub const GRAPHHOPPER_ROUTE_BASE_URL: &str = "https://graphhopper.com/api/1/route";

/// Provider order used when `ROUTING_PROVIDERS` is absent.
pub const DEFAULT_PROVIDER_ORDER: &str = "google,mapbox";

// --- Retry defaults (overridden by RETRY_* env vars) ---

pub const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_INITIAL_DELAY_MS: u64 = 1_000;
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 10_000;
pub const DEFAULT_RETRY_BACKOFF_MULTIPLIER: f64 = 2.0;

// --- Per-call HTTP timeouts by connection quality (seconds) ---
// Poorer links get more time; offline fails fast.

pub const TIMEOUT_WIFI_SECONDS: u64 = 10;
pub const TIMEOUT_CELLULAR_GOOD_SECONDS: u64 = 15;
pub const TIMEOUT_CELLULAR_POOR_SECONDS: u64 = 25;
pub const TIMEOUT_POOR_SECONDS: u64 = 30;
pub const TIMEOUT_OFFLINE_SECONDS: u64 = 5;
