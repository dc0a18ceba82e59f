use crate::constants::GOOGLE_DIRECTIONS_BASE_URL;
use crate::models::{Coordinate, ProviderId, TransportMode};
use crate::resilience::TransportFailure;
use crate::services::provider::{
    parse_json, send, strip_html, DirectionsQuery, InstructionAnchor, ProviderClient,
    ProviderInstruction, ProviderRoute,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

#[derive(Clone)]
pub struct GoogleDirectionsClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GoogleDirectionsClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, GOOGLE_DIRECTIONS_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        GoogleDirectionsClient {
            client: Client::new(),
            api_key,
            base_url,
        }
    }
}

#[async_trait]
impl ProviderClient for GoogleDirectionsClient {
    fn id(&self) -> ProviderId {
        ProviderId::Google
    }

    fn mode_token(&self, mode: TransportMode, _use_traffic: bool) -> &'static str {
        match mode {
            TransportMode::Car => "driving",
            TransportMode::Bicycle => "bicycling",
            TransportMode::Walking => "walking",
            // No motorcycle mode; drive instead
            TransportMode::Motorcycle => "driving",
        }
    }

    async fn fetch_directions(
        &self,
        query: &DirectionsQuery<'_>,
        timeout: Duration,
    ) -> Result<String, TransportFailure> {
        let mode = self.mode_token(query.mode, query.use_traffic);
        let mut params: Vec<(&str, String)> = vec![
            ("origin", query.origin.to_lat_lng_string()),
            ("destination", query.destination.to_lat_lng_string()),
            ("mode", mode.to_string()),
            ("alternatives", query.alternatives.to_string()),
            ("key", self.api_key.clone()),
        ];

        if !query.waypoints.is_empty() {
            let waypoints = query
                .waypoints
                .iter()
                .map(Coordinate::to_lat_lng_string)
                .collect::<Vec<_>>()
                .join("|");
            params.push(("waypoints", waypoints));
        }
        if query.avoid_tolls {
            params.push(("avoid", "tolls".to_string()));
        }
        if query.use_traffic && mode == "driving" {
            params.push(("departure_time", "now".to_string()));
            params.push(("traffic_model", "best_guess".to_string()));
        }

        tracing::debug!(
            provider = "google",
            mode,
            waypoints = query.waypoints.len(),
            alternatives = query.alternatives,
            "Google Directions request: mode {}, {} waypoints",
            mode,
            query.waypoints.len()
        );

        let request = self
            .client
            .get(&self.base_url)
            .query(&params)
            .timeout(timeout);

        let body = send(ProviderId::Google, request).await?;

        // Status errors arrive as HTTP 200; fail the attempt so they are retried
        if let Ok(envelope) = serde_json::from_str::<GoogleStatus>(&body) {
            check_status(&envelope)?;
        }

        Ok(body)
    }

    fn parse_routes(
        &self,
        body: &str,
        query: &DirectionsQuery<'_>,
    ) -> Result<Vec<ProviderRoute>, TransportFailure> {
        let response: GoogleDirectionsResponse = parse_json(ProviderId::Google, body)?;

        let traffic_requested =
            query.use_traffic && self.mode_token(query.mode, query.use_traffic) == "driving";

        let routes = response
            .routes
            .into_iter()
            .filter(|route| !route.legs.is_empty())
            .map(|route| convert_route(route, traffic_requested))
            .collect();

        Ok(routes)
    }
}

/// Google reports most failures as HTTP 200 with a status string.
fn check_status(response: &GoogleStatus) -> Result<(), TransportFailure> {
    let status = match response.status.as_str() {
        "OK" | "ZERO_RESULTS" | "NOT_FOUND" => return Ok(()),
        "REQUEST_DENIED" => 403,
        "OVER_QUERY_LIMIT" | "OVER_DAILY_LIMIT" => 429,
        "INVALID_REQUEST" | "MAX_WAYPOINTS_EXCEEDED" | "MAX_ROUTE_LENGTH_EXCEEDED" => 400,
        _ => 500,
    };

    let message = response
        .error_message
        .clone()
        .unwrap_or_else(|| response.status.clone());
    tracing::warn!(
        provider = "google",
        status = %response.status,
        "Google Directions returned {}: {}",
        response.status,
        message
    );

    Err(TransportFailure::Http {
        status,
        body: message,
    })
}

fn convert_route(route: GoogleRoute, traffic_requested: bool) -> ProviderRoute {
    let first_leg = route.legs.first();
    let last_leg = route.legs.last();
    let start_address = first_leg.and_then(|leg| leg.start_address.clone());
    let end_address = last_leg.and_then(|leg| leg.end_address.clone());

    let mut distance_meters = 0.0;
    let mut duration_seconds = 0.0;
    let mut traffic_enabled = traffic_requested;
    let mut instructions = Vec::new();

    for leg in route.legs {
        distance_meters += leg.distance.value;
        match (traffic_requested, leg.duration_in_traffic) {
            (true, Some(in_traffic)) => duration_seconds += in_traffic.value,
            _ => {
                // Google omits traffic durations for some legs
                traffic_enabled = false;
                duration_seconds += leg.duration.value;
            }
        }

        instructions.extend(leg.steps.into_iter().map(|step| ProviderInstruction {
            text: strip_html(&step.html_instructions),
            distance_meters: step.distance.value,
            duration_seconds: step.duration.value.max(0.0).round() as u64,
            maneuver: step.maneuver,
            anchor: step
                .start_location
                .and_then(|loc| Coordinate::new(loc.lat, loc.lng).ok())
                .map(InstructionAnchor::Location),
        }));
    }

    ProviderRoute {
        encoded_polyline: route.overview_polyline.points,
        distance_meters,
        duration_seconds: duration_seconds.max(0.0).round() as u64,
        start_address,
        end_address,
        instructions,
        traffic_enabled,
    }
}

// Google Directions API response types

#[derive(Debug, Deserialize)]
struct GoogleStatus {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleDirectionsResponse {
    #[serde(default)]
    routes: Vec<GoogleRoute>,
}

#[derive(Debug, Deserialize)]
struct GoogleRoute {
    overview_polyline: GooglePolyline,
    #[serde(default)]
    legs: Vec<GoogleLeg>,
}

#[derive(Debug, Deserialize)]
struct GooglePolyline {
    points: String,
}

#[derive(Debug, Deserialize)]
struct GoogleLeg {
    distance: GoogleValue, // meters
    duration: GoogleValue, // seconds
    #[serde(default)]
    duration_in_traffic: Option<GoogleValue>,
    #[serde(default)]
    start_address: Option<String>,
    #[serde(default)]
    end_address: Option<String>,
    #[serde(default)]
    steps: Vec<GoogleStep>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
struct GoogleValue {
    value: f64,
}

#[derive(Debug, Deserialize)]
struct GoogleStep {
    #[serde(default)]
    html_instructions: String,
    distance: GoogleValue,
    duration: GoogleValue,
    #[serde(default)]
    maneuver: Option<String>,
    #[serde(default)]
    start_location: Option<GoogleLatLng>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
struct GoogleLatLng {
    lat: f64,
    lng: f64,
}
