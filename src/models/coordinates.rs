use serde::{Deserialize, Serialize};
use std::fmt;

/// A WGS84 position. Fields are private so every value goes through
/// [`Coordinate::new`] (or serde), which keeps both axes finite and in range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    lat: f64,
    lng: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    lat: f64,
    lng: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = String;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Coordinate::new(raw.lat, raw.lng)
    }
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Result<Self, String> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(format!(
                "Invalid latitude: {} (must be between -90 and 90)",
                lat
            ));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(format!(
                "Invalid longitude: {} (must be between -180 and 180)",
                lng
            ));
        }
        Ok(Coordinate { lat, lng })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }

    /// Build from a `[lng, lat]` pair, the order GeoJSON-style providers use.
    pub fn from_lng_lat(pair: [f64; 2]) -> Result<Self, String> {
        Coordinate::new(pair[1], pair[0])
    }

    /// `lat,lng` query-string form.
    pub fn to_lat_lng_string(&self) -> String {
        format!("{},{}", self.lat, self.lng)
    }

    /// `lng,lat` path form.
    pub fn to_lng_lat_string(&self) -> String {
        format!("{},{}", self.lng, self.lat)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.5}, {:.5})", self.lat, self.lng)
    }
}
