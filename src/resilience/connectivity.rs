use crate::constants::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

/// Network quality tier, worst first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionQuality {
    None,
    Poor,
    CellularPoor,
    CellularGood,
    Wifi,
}

impl ConnectionQuality {
    pub fn is_reachable(&self) -> bool {
        !matches!(self, ConnectionQuality::None)
    }

    fn to_u8(self) -> u8 {
        match self {
            ConnectionQuality::None => 0,
            ConnectionQuality::Poor => 1,
            ConnectionQuality::CellularPoor => 2,
            ConnectionQuality::CellularGood => 3,
            ConnectionQuality::Wifi => 4,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectionQuality::None,
            1 => ConnectionQuality::Poor,
            2 => ConnectionQuality::CellularPoor,
            3 => ConnectionQuality::CellularGood,
            _ => ConnectionQuality::Wifi,
        }
    }
}

impl fmt::Display for ConnectionQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionQuality::None => "none",
            ConnectionQuality::Poor => "poor",
            ConnectionQuality::CellularPoor => "cellular_poor",
            ConnectionQuality::CellularGood => "cellular_good",
            ConnectionQuality::Wifi => "wifi",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for ConnectionQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "offline" => Ok(ConnectionQuality::None),
            "poor" => Ok(ConnectionQuality::Poor),
            "cellular_poor" => Ok(ConnectionQuality::CellularPoor),
            "cellular_good" | "cellular" => Ok(ConnectionQuality::CellularGood),
            "wifi" => Ok(ConnectionQuality::Wifi),
            _ => Err(format!("Invalid connection quality: '{}'", s)),
        }
    }
}

/// Source of live network quality. Owned by the platform layer; this crate
/// only reads it.
pub trait ConnectivityProbe: Send + Sync {
    fn current_quality(&self) -> ConnectionQuality;

    fn is_reachable(&self) -> bool {
        self.current_quality().is_reachable()
    }
}

/// A probe that always reports the same quality.
#[derive(Debug, Clone, Copy)]
pub struct StaticConnectivity(pub ConnectionQuality);

impl ConnectivityProbe for StaticConnectivity {
    fn current_quality(&self) -> ConnectionQuality {
        self.0
    }
}

/// Probe whose value is pushed in by whoever observes the network.
#[derive(Debug)]
pub struct SharedConnectivity {
    quality: AtomicU8,
}

impl SharedConnectivity {
    pub fn new(initial: ConnectionQuality) -> Self {
        SharedConnectivity {
            quality: AtomicU8::new(initial.to_u8()),
        }
    }

    pub fn set(&self, quality: ConnectionQuality) {
        let previous = self.quality.swap(quality.to_u8(), Ordering::Relaxed);
        if previous != quality.to_u8() {
            tracing::info!(
                from = %ConnectionQuality::from_u8(previous),
                to = %quality,
                "Connection quality changed"
            );
        }
    }
}

impl ConnectivityProbe for SharedConnectivity {
    fn current_quality(&self) -> ConnectionQuality {
        ConnectionQuality::from_u8(self.quality.load(Ordering::Relaxed))
    }
}

/// Per-HTTP-call timeout budget keyed by connection quality.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeoutPolicy {
    pub wifi: Duration,
    pub cellular_good: Duration,
    pub cellular_poor: Duration,
    pub poor: Duration,
    pub offline: Duration,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        TimeoutPolicy {
            wifi: Duration::from_secs(TIMEOUT_WIFI_SECONDS),
            cellular_good: Duration::from_secs(TIMEOUT_CELLULAR_GOOD_SECONDS),
            cellular_poor: Duration::from_secs(TIMEOUT_CELLULAR_POOR_SECONDS),
            poor: Duration::from_secs(TIMEOUT_POOR_SECONDS),
            offline: Duration::from_secs(TIMEOUT_OFFLINE_SECONDS),
        }
    }
}

impl TimeoutPolicy {
    pub fn for_quality(&self, quality: ConnectionQuality) -> Duration {
        match quality {
            ConnectionQuality::Wifi => self.wifi,
            ConnectionQuality::CellularGood => self.cellular_good,
            ConnectionQuality::CellularPoor => self.cellular_poor,
            ConnectionQuality::Poor => self.poor,
            ConnectionQuality::None => self.offline,
        }
    }
}
