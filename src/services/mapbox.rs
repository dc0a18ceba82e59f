use crate::constants::MAPBOX_DIRECTIONS_BASE_URL;
use crate::models::{Coordinate, ProviderId, TransportMode};
use crate::resilience::TransportFailure;
use crate::services::provider::{
    parse_json, send, DirectionsQuery, InstructionAnchor, ProviderClient, ProviderInstruction,
    ProviderRoute,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// How the client authenticates with the directions API.
#[derive(Clone, Debug)]
pub enum AuthMode {
    /// Send `access_token` query param (direct Mapbox).
    DirectToken,
    /// Proxy mode: send `Authorization: Bearer` header.
    BearerHeader,
}

#[derive(Clone)]
pub struct MapboxClient {
    client: Client,
    api_key: String,
    base_url: String,
    auth_mode: AuthMode,
}

impl MapboxClient {
    pub fn new(api_key: String) -> Self {
        MapboxClient {
            client: Client::new(),
            api_key,
            base_url: MAPBOX_DIRECTIONS_BASE_URL.to_string(),
            auth_mode: AuthMode::DirectToken,
        }
    }

    pub fn with_config(api_key: String, base_url: String, auth_mode: AuthMode) -> Self {
        MapboxClient {
            client: Client::new(),
            api_key,
            base_url,
            auth_mode,
        }
    }
}

#[async_trait]
impl ProviderClient for MapboxClient {
    fn id(&self) -> ProviderId {
        ProviderId::Mapbox
    }

    fn mode_token(&self, mode: TransportMode, use_traffic: bool) -> &'static str {
        match mode {
            TransportMode::Car if use_traffic => "driving-traffic",
            TransportMode::Car => "driving",
            // No motorcycle profile; drive instead
            TransportMode::Motorcycle => "driving",
            TransportMode::Bicycle => "cycling",
            TransportMode::Walking => "walking",
        }
    }

    async fn fetch_directions(
        &self,
        query: &DirectionsQuery<'_>,
        timeout: Duration,
    ) -> Result<String, TransportFailure> {
        let profile = self.mode_token(query.mode, query.use_traffic);

        // Mapbox takes "lng,lat;lng,lat;..." in the path
        let coordinates_str = query
            .stops()
            .iter()
            .map(Coordinate::to_lng_lat_string)
            .collect::<Vec<_>>()
            .join(";");

        let url = format!("{}/{}/{}", self.base_url, profile, coordinates_str);

        tracing::debug!(
            provider = "mapbox",
            waypoints = query.waypoints.len(),
            profile,
            "Mapbox API request: {} waypoints, profile {}",
            query.waypoints.len(),
            profile
        );

        let mut request = self
            .client
            .get(&url)
            .query(&[
                ("geometries", "polyline"),
                ("overview", "full"),
                ("steps", "true"),
                ("alternatives", if query.alternatives { "true" } else { "false" }),
            ])
            .timeout(timeout);

        if query.avoid_tolls {
            request = request.query(&[("exclude", "toll")]);
        }

        match self.auth_mode {
            AuthMode::DirectToken => {
                request = request.query(&[("access_token", &self.api_key)]);
            }
            AuthMode::BearerHeader => {
                request = request.bearer_auth(&self.api_key);
            }
        }

        send(ProviderId::Mapbox, request).await
    }

    fn parse_routes(
        &self,
        body: &str,
        query: &DirectionsQuery<'_>,
    ) -> Result<Vec<ProviderRoute>, TransportFailure> {
        let directions: MapboxDirectionsApiResponse = parse_json(ProviderId::Mapbox, body)?;

        match directions.code.as_str() {
            "Ok" => {}
            "NoRoute" | "NoSegment" => {
                tracing::warn!(
                    provider = "mapbox",
                    code = %directions.code,
                    "Mapbox returned no route ({})",
                    directions.code
                );
                return Ok(Vec::new());
            }
            other => {
                return Err(TransportFailure::Http {
                    status: 422,
                    body: directions.message.unwrap_or_else(|| other.to_string()),
                });
            }
        }

        let traffic_enabled = self.mode_token(query.mode, query.use_traffic) == "driving-traffic";
        let start_address = directions.waypoints.first().and_then(waypoint_name);
        let end_address = directions.waypoints.last().and_then(waypoint_name);

        let routes = directions
            .routes
            .into_iter()
            .filter(|route| !route.legs.is_empty())
            .map(|route| {
                tracing::debug!(
                    distance_km = %format!("{:.2}", route.distance / 1000.0),
                    duration_min = %format!("{:.0}", route.duration / 60.0),
                    "Mapbox response: {:.2}km, {:.0}min",
                    route.distance / 1000.0,
                    route.duration / 60.0
                );
                ProviderRoute {
                    encoded_polyline: route.geometry,
                    distance_meters: route.distance,
                    duration_seconds: route.duration.max(0.0).round() as u64,
                    start_address: start_address.clone(),
                    end_address: end_address.clone(),
                    instructions: route
                        .legs
                        .into_iter()
                        .flat_map(|leg| leg.steps)
                        .map(convert_step)
                        .collect(),
                    traffic_enabled,
                }
            })
            .collect();

        Ok(routes)
    }
}

fn waypoint_name(waypoint: &MapboxWaypoint) -> Option<String> {
    Some(waypoint.name.trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

fn convert_step(step: MapboxStep) -> ProviderInstruction {
    let maneuver = match (&step.maneuver.maneuver_type, &step.maneuver.modifier) {
        (kind, Some(modifier)) => format!("{} {}", kind, modifier),
        (kind, None) => kind.clone(),
    };

    ProviderInstruction {
        text: step.maneuver.instruction,
        distance_meters: step.distance,
        duration_seconds: step.duration.max(0.0).round() as u64,
        maneuver: Some(maneuver),
        anchor: Coordinate::from_lng_lat(step.maneuver.location)
            .ok()
            .map(InstructionAnchor::Location),
    }
}

// Mapbox API response types

#[derive(Debug, Deserialize)]
struct MapboxDirectionsApiResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<MapboxRoute>,
    #[serde(default)]
    waypoints: Vec<MapboxWaypoint>,
}

#[derive(Debug, Deserialize)]
struct MapboxRoute {
    distance: f64, // meters
    duration: f64, // seconds
    geometry: String,
    #[serde(default)]
    legs: Vec<MapboxLeg>,
}

#[derive(Debug, Deserialize)]
struct MapboxLeg {
    #[serde(default)]
    steps: Vec<MapboxStep>,
}

#[derive(Debug, Deserialize)]
struct MapboxStep {
    distance: f64,
    duration: f64,
    maneuver: MapboxManeuver,
}

#[derive(Debug, Deserialize)]
struct MapboxManeuver {
    #[serde(default)]
    instruction: String,
    #[serde(rename = "type")]
    maneuver_type: String,
    #[serde(default)]
    modifier: Option<String>,
    location: [f64; 2], // [lng, lat]
}

#[derive(Debug, Deserialize)]
struct MapboxWaypoint {
    #[serde(default)]
    name: String,
}
