use async_trait::async_trait;
use rideroute::models::{Coordinate, ProviderId, RouteRequest, TransportMode};
use rideroute::resilience::{
    ConnectionQuality, ConnectivityProbe, RetryPolicy, SharedConnectivity, TransportFailure,
};
use rideroute::services::{DirectionsQuery, ProviderClient, ProviderRoute, RouteResolver};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Three-point reference geometry: (38.5,-120.2) (40.7,-120.95) (43.252,-126.453)
#[allow(dead_code)]
pub const REFERENCE_POLYLINE: &str = "_p~iF~ps|U_ulLnnqC_mqNvxq`@";

/// Scripted provider. Each call pops the next response; the last one repeats.
#[allow(dead_code)]
pub struct FakeProvider {
    id: ProviderId,
    script: Mutex<VecDeque<Result<String, TransportFailure>>>,
    last: Mutex<Option<Result<String, TransportFailure>>>,
    calls: AtomicU32,
    timeouts: Mutex<Vec<Duration>>,
    latency: Option<Duration>,
}

#[allow(dead_code)]
impl FakeProvider {
    pub fn new(id: ProviderId, responses: Vec<Result<String, TransportFailure>>) -> Self {
        FakeProvider {
            id,
            script: Mutex::new(responses.into()),
            last: Mutex::new(None),
            calls: AtomicU32::new(0),
            timeouts: Mutex::new(Vec::new()),
            latency: None,
        }
    }

    /// Always answers with one route over the reference geometry.
    pub fn healthy(id: ProviderId) -> Self {
        Self::new(id, vec![Ok(routes_body(&[REFERENCE_POLYLINE]))])
    }

    /// Always fails with an HTTP status.
    pub fn failing(id: ProviderId, status: u16) -> Self {
        Self::new(id, vec![Err(http_failure(status))])
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Per-call timeouts the resolver handed to this provider.
    pub fn timeouts(&self) -> Vec<Duration> {
        self.timeouts.lock().unwrap().clone()
    }

    fn next_response(&self) -> Result<String, TransportFailure> {
        let mut script = self.script.lock().unwrap();
        let mut last = self.last.lock().unwrap();
        if let Some(response) = script.pop_front() {
            *last = Some(response.clone());
            return response;
        }
        last.clone()
            .unwrap_or_else(|| Err(TransportFailure::Other("empty script".to_string())))
    }
}

#[async_trait]
impl ProviderClient for FakeProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    fn mode_token(&self, mode: TransportMode, _use_traffic: bool) -> &'static str {
        match mode {
            TransportMode::Car | TransportMode::Motorcycle => "drive",
            TransportMode::Bicycle => "bike",
            TransportMode::Walking => "walk",
        }
    }

    async fn fetch_directions(
        &self,
        _query: &DirectionsQuery<'_>,
        timeout: Duration,
    ) -> Result<String, TransportFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.timeouts.lock().unwrap().push(timeout);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.next_response()
    }

    fn parse_routes(
        &self,
        body: &str,
        _query: &DirectionsQuery<'_>,
    ) -> Result<Vec<ProviderRoute>, TransportFailure> {
        let value: Value =
            serde_json::from_str(body).map_err(|e| TransportFailure::Parse(e.to_string()))?;
        let routes = value["routes"]
            .as_array()
            .ok_or_else(|| TransportFailure::Parse("missing routes".to_string()))?;

        Ok(routes
            .iter()
            .map(|route| ProviderRoute {
                encoded_polyline: route["polyline"].as_str().unwrap_or_default().to_string(),
                distance_meters: route["distance"].as_f64().unwrap_or_default(),
                duration_seconds: route["duration"].as_u64().unwrap_or_default(),
                start_address: Some("Pickup".to_string()),
                end_address: Some("Dropoff".to_string()),
                instructions: Vec::new(),
                traffic_enabled: false,
            })
            .collect())
    }
}

/// Fake provider body with one route per polyline. Distances grow by 1 km per route.
#[allow(dead_code)]
pub fn routes_body(polylines: &[&str]) -> String {
    let routes: Vec<Value> = polylines
        .iter()
        .enumerate()
        .map(|(i, polyline)| {
            json!({
                "polyline": polyline,
                "distance": 1000.0 * (i as f64 + 1.0),
                "duration": 120 * (i as u64 + 1),
            })
        })
        .collect();
    json!({ "routes": routes }).to_string()
}

#[allow(dead_code)]
pub fn http_failure(status: u16) -> TransportFailure {
    TransportFailure::Http {
        status,
        body: format!("HTTP {}", status),
    }
}

#[allow(dead_code)]
pub fn test_request() -> RouteRequest {
    RouteRequest::new(
        Coordinate::new(38.5, -120.2).unwrap(),
        Coordinate::new(43.252, -126.453).unwrap(),
    )
}

/// Retry policy with the default shape: 3 attempts, 1s doubling to 10s.
#[allow(dead_code)]
pub fn test_policy() -> RetryPolicy {
    RetryPolicy::default()
}

/// Policy with millisecond delays for tests that run on the real clock.
#[allow(dead_code)]
pub fn fast_policy() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(5), Duration::from_millis(20), 2.0).unwrap()
}

#[allow(dead_code)]
pub fn connectivity(quality: ConnectionQuality) -> Arc<SharedConnectivity> {
    Arc::new(SharedConnectivity::new(quality))
}

#[allow(dead_code)]
pub fn resolver(
    providers: Vec<Arc<FakeProvider>>,
    policy: RetryPolicy,
    probe: Arc<dyn ConnectivityProbe>,
) -> RouteResolver {
    let providers: Vec<Arc<dyn ProviderClient>> = providers
        .into_iter()
        .map(|p| p as Arc<dyn ProviderClient>)
        .collect();
    RouteResolver::new(providers, policy, probe)
}

/// Serve `app` on an ephemeral local port and return its base URL.
#[allow(dead_code)]
pub async fn spawn_mock_server(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Check if we should skip real API tests
#[allow(dead_code)]
pub fn should_skip_real_api_tests() -> bool {
    std::env::var("SKIP_REAL_API_TESTS").is_ok()
}
