use crate::constants::GRAPHHOPPER_ROUTE_BASE_URL;
use crate::models::{ProviderId, TransportMode};
use crate::resilience::TransportFailure;
use crate::services::provider::{
    parse_json, send, DirectionsQuery, InstructionAnchor, ProviderClient, ProviderInstruction,
    ProviderRoute,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Upper bound on alternative paths requested.
const MAX_ALTERNATIVE_PATHS: &str = "3";

#[derive(Clone)]
pub struct GraphHopperClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GraphHopperClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, GRAPHHOPPER_ROUTE_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        GraphHopperClient {
            client: Client::new(),
            api_key,
            base_url,
        }
    }
}

#[async_trait]
impl ProviderClient for GraphHopperClient {
    fn id(&self) -> ProviderId {
        ProviderId::GraphHopper
    }

    fn mode_token(&self, mode: TransportMode, _use_traffic: bool) -> &'static str {
        match mode {
            TransportMode::Car => "car",
            // The motorcycle profile is not on the standard plans
            TransportMode::Motorcycle => "car",
            TransportMode::Bicycle => "bike",
            TransportMode::Walking => "foot",
        }
    }

    async fn fetch_directions(
        &self,
        query: &DirectionsQuery<'_>,
        timeout: Duration,
    ) -> Result<String, TransportFailure> {
        let profile = self.mode_token(query.mode, query.use_traffic);

        let mut params: Vec<(&str, String)> = query
            .stops()
            .iter()
            .map(|stop| ("point", stop.to_lat_lng_string()))
            .collect();
        params.extend([
            ("profile", profile.to_string()),
            ("points_encoded", "true".to_string()),
            ("instructions", "true".to_string()),
            ("locale", "en".to_string()),
            ("key", self.api_key.clone()),
        ]);
        if query.alternatives {
            params.push(("algorithm", "alternative_route".to_string()));
            params.push((
                "alternative_route.max_paths",
                MAX_ALTERNATIVE_PATHS.to_string(),
            ));
        }
        if query.avoid_tolls || query.use_traffic {
            tracing::debug!(
                provider = "graphhopper",
                "GraphHopper ignores toll avoidance and live traffic"
            );
        }

        tracing::debug!(
            provider = "graphhopper",
            profile,
            points = query.waypoints.len() + 2,
            "GraphHopper request: profile {}, {} points",
            profile,
            query.waypoints.len() + 2
        );

        let request = self
            .client
            .get(&self.base_url)
            .query(&params)
            .timeout(timeout);

        send(ProviderId::GraphHopper, request).await
    }

    fn parse_routes(
        &self,
        body: &str,
        _query: &DirectionsQuery<'_>,
    ) -> Result<Vec<ProviderRoute>, TransportFailure> {
        let response: GraphHopperResponse = parse_json(ProviderId::GraphHopper, body)?;

        response
            .paths
            .into_iter()
            .map(|path| {
                let points = match path.points {
                    GraphHopperPoints::Encoded(points) => points,
                    GraphHopperPoints::Unencoded(_) => {
                        return Err(TransportFailure::Parse(
                            "graphhopper response: expected encoded points".to_string(),
                        ))
                    }
                };

                Ok(ProviderRoute {
                    encoded_polyline: points,
                    distance_meters: path.distance,
                    duration_seconds: millis_to_seconds(path.time),
                    start_address: None,
                    end_address: None,
                    instructions: path.instructions.into_iter().map(convert_instruction).collect(),
                    traffic_enabled: false,
                })
            })
            .collect()
    }
}

fn millis_to_seconds(millis: u64) -> u64 {
    (millis + 500) / 1000
}

fn convert_instruction(instruction: GraphHopperInstruction) -> ProviderInstruction {
    ProviderInstruction {
        text: instruction.text,
        distance_meters: instruction.distance,
        duration_seconds: millis_to_seconds(instruction.time),
        maneuver: sign_to_maneuver(instruction.sign).map(str::to_string),
        anchor: instruction
            .interval
            .map(|[start, _end]| InstructionAnchor::PathIndex(start)),
    }
}

fn sign_to_maneuver(sign: i32) -> Option<&'static str> {
    let maneuver = match sign {
        -98 | -8 | 8 => "u-turn",
        -7 => "keep-left",
        -3 => "turn-sharp-left",
        -2 => "turn-left",
        -1 => "turn-slight-left",
        0 => "continue",
        1 => "turn-slight-right",
        2 => "turn-right",
        3 => "turn-sharp-right",
        4 => "arrive",
        5 => "via-reached",
        6 => "roundabout",
        7 => "keep-right",
        _ => return None,
    };
    Some(maneuver)
}

// GraphHopper routing API response types

#[derive(Debug, Deserialize)]
struct GraphHopperResponse {
    #[serde(default)]
    paths: Vec<GraphHopperPath>,
}

#[derive(Debug, Deserialize)]
struct GraphHopperPath {
    distance: f64, // meters
    time: u64,     // milliseconds
    points: GraphHopperPoints,
    #[serde(default)]
    instructions: Vec<GraphHopperInstruction>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GraphHopperPoints {
    Encoded(String),
    Unencoded(serde_json::Value),
}

#[derive(Debug, Deserialize)]
struct GraphHopperInstruction {
    #[serde(default)]
    text: String,
    distance: f64,
    time: u64,
    #[serde(default)]
    sign: i32,
    #[serde(default)]
    interval: Option<[usize; 2]>,
}
