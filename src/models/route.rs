use crate::models::Coordinate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    #[default]
    Car,
    Bicycle,
    Walking,
    Motorcycle,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportMode::Car => write!(f, "car"),
            TransportMode::Bicycle => write!(f, "bicycle"),
            TransportMode::Walking => write!(f, "walking"),
            TransportMode::Motorcycle => write!(f, "motorcycle"),
        }
    }
}

impl FromStr for TransportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "car" | "driving" => Ok(TransportMode::Car),
            "bicycle" | "bike" | "cycling" => Ok(TransportMode::Bicycle),
            "walking" | "walk" | "foot" => Ok(TransportMode::Walking),
            "motorcycle" | "moto" => Ok(TransportMode::Motorcycle),
            _ => Err(format!("Invalid transport mode: '{}'", s)),
        }
    }
}

/// Identity of an external directions provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Google,
    Mapbox,
    GraphHopper,
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderId::Google => write!(f, "google"),
            ProviderId::Mapbox => write!(f, "mapbox"),
            ProviderId::GraphHopper => write!(f, "graphhopper"),
        }
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "google" => Ok(ProviderId::Google),
            "mapbox" => Ok(ProviderId::Mapbox),
            "graphhopper" | "gh" => Ok(ProviderId::GraphHopper),
            _ => Err(format!("Unknown routing provider: '{}'", s)),
        }
    }
}

/// One routing call. Built by the caller, consumed by the resolver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteRequest {
    pub origin: Coordinate,
    pub destination: Coordinate,
    #[serde(default)]
    pub waypoints: Vec<Coordinate>,
    #[serde(default)]
    pub transport_mode: TransportMode,
    #[serde(default)]
    pub avoid_tolls: bool,
    #[serde(default)]
    pub use_traffic: bool,
}

impl RouteRequest {
    pub fn new(origin: Coordinate, destination: Coordinate) -> Self {
        RouteRequest {
            origin,
            destination,
            waypoints: Vec::new(),
            transport_mode: TransportMode::default(),
            avoid_tolls: false,
            use_traffic: false,
        }
    }

    pub fn with_waypoints(mut self, waypoints: Vec<Coordinate>) -> Self {
        self.waypoints = waypoints;
        self
    }

    pub fn with_mode(mut self, mode: TransportMode) -> Self {
        self.transport_mode = mode;
        self
    }

    pub fn avoiding_tolls(mut self) -> Self {
        self.avoid_tolls = true;
        self
    }

    pub fn with_traffic(mut self) -> Self {
        self.use_traffic = true;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteInstruction {
    pub text: String,
    pub distance_meters: f64,
    pub duration_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maneuver: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Coordinate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RouteSummary {
    pub start_address: Option<String>,
    pub end_address: Option<String>,
    pub instructions: Vec<RouteInstruction>,
    pub traffic_enabled: bool,
}

/// A resolved route, normalized across providers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Route {
    /// Decoded path, in travel order
    pub coordinates: Vec<Coordinate>,
    pub encoded_polyline: String,
    pub distance_meters: f64,
    pub duration_seconds: u64,
    pub summary: RouteSummary,
    pub provider: ProviderId,
}

impl Route {
    pub fn distance_km(&self) -> f64 {
        self.distance_meters / 1000.0
    }

    pub fn duration_minutes(&self) -> u64 {
        self.duration_seconds / 60
    }
}

#[derive(Debug, Serialize)]
pub struct RouteResponse {
    pub route: Route,
}

#[derive(Debug, Serialize)]
pub struct RouteAlternativesResponse {
    pub routes: Vec<Route>,
}
