use crate::models::{Coordinate, ProviderId, RouteRequest, TransportMode};
use crate::resilience::TransportFailure;
use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Longest error body kept in a transport failure.
const MAX_ERROR_BODY_CHARS: usize = 512;

/// What the resolver asks a provider for on each attempt.
#[derive(Debug, Clone)]
pub struct DirectionsQuery<'a> {
    pub origin: Coordinate,
    pub destination: Coordinate,
    pub waypoints: &'a [Coordinate],
    pub mode: TransportMode,
    pub avoid_tolls: bool,
    pub use_traffic: bool,
    pub alternatives: bool,
}

impl<'a> DirectionsQuery<'a> {
    pub fn from_request(request: &'a RouteRequest, alternatives: bool) -> Self {
        DirectionsQuery {
            origin: request.origin,
            destination: request.destination,
            waypoints: &request.waypoints,
            mode: request.transport_mode,
            avoid_tolls: request.avoid_tolls,
            use_traffic: request.use_traffic,
            alternatives,
        }
    }

    /// Origin, waypoints, destination in travel order.
    pub fn stops(&self) -> Vec<Coordinate> {
        let mut stops = Vec::with_capacity(self.waypoints.len() + 2);
        stops.push(self.origin);
        stops.extend_from_slice(self.waypoints);
        stops.push(self.destination);
        stops
    }
}

/// Where an instruction happens, in whatever form the provider reports it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InstructionAnchor {
    Location(Coordinate),
    /// Index into the route's decoded geometry
    PathIndex(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderInstruction {
    pub text: String,
    pub distance_meters: f64,
    pub duration_seconds: u64,
    pub maneuver: Option<String>,
    pub anchor: Option<InstructionAnchor>,
}

/// One route from a provider response, in meters and seconds, with its
/// geometry still polyline-encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRoute {
    pub encoded_polyline: String,
    pub distance_meters: f64,
    pub duration_seconds: u64,
    pub start_address: Option<String>,
    pub end_address: Option<String>,
    pub instructions: Vec<ProviderInstruction>,
    pub traffic_enabled: bool,
}

/// An external directions API.
///
/// `fetch_directions` performs exactly one HTTP call and is what gets
/// retried. `parse_routes` turns the raw body into provider-neutral routes;
/// provider-specific response types never leave the implementation.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    fn id(&self) -> ProviderId;

    /// The provider's profile/mode token for `mode`.
    fn mode_token(&self, mode: TransportMode, use_traffic: bool) -> &'static str;

    async fn fetch_directions(
        &self,
        query: &DirectionsQuery<'_>,
        timeout: Duration,
    ) -> Result<String, TransportFailure>;

    /// Routes in provider order. An empty list means the provider found no route.
    fn parse_routes(
        &self,
        body: &str,
        query: &DirectionsQuery<'_>,
    ) -> Result<Vec<ProviderRoute>, TransportFailure>;
}

/// Send a request and return the body of a 2xx response.
pub(crate) async fn send(
    provider: ProviderId,
    request: RequestBuilder,
) -> Result<String, TransportFailure> {
    let response = request.send().await.map_err(|e| {
        tracing::debug!(provider = %provider, "{} request failed: {}", provider, e);
        TransportFailure::from(e)
    })?;

    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        tracing::warn!(
            provider = %provider,
            status = %status,
            "{} API HTTP error {}: {}",
            provider,
            status,
            truncate(&body)
        );
        return Err(TransportFailure::Http {
            status: status.as_u16(),
            body: truncate(&body),
        });
    }

    Ok(body)
}

pub(crate) fn parse_json<T: DeserializeOwned>(
    provider: ProviderId,
    body: &str,
) -> Result<T, TransportFailure> {
    serde_json::from_str(body)
        .map_err(|e| TransportFailure::Parse(format!("{} response: {}", provider, e)))
}

fn truncate(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY_CHARS).collect()
}

/// Drop markup from instruction text.
pub(crate) fn strip_html(text: &str) -> String {
    let mut plain = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => {
                in_tag = true;
                // Block-level tags separate sentences
                if !plain.ends_with(' ') && !plain.is_empty() {
                    plain.push(' ');
                }
            }
            '>' => in_tag = false,
            _ if !in_tag => plain.push(c),
            _ => {}
        }
    }
    plain
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
