use crate::module::tle::TleRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Ground observer on the WGS-84 ellipsoid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observer {
    /// Geodetic latitude, degrees
    pub latitude: f64,
    /// Longitude, degrees east
    pub longitude: f64,
    /// Height above the ellipsoid, meters
    pub altitude: f64,
}

impl Observer {
    pub fn new(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
        }
    }
}

/// Observer-relative view of a satellite at one instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Look {
    /// Degrees above the local horizon
    pub elevation: f64,
    /// Compass bearing in [0, 360)
    pub azimuth: f64,
    /// Meters
    pub range: f64,
    /// Meters per second, positive when receding
    pub range_rate: f64,
}

/// Rise, peak, set or a detail sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassEvent {
    pub time: DateTime<Utc>,
    pub elevation: f64,
    pub azimuth: f64,
    pub range: f64,
    pub range_rate: f64,
}

impl PassEvent {
    pub fn new(time: DateTime<Utc>, look: Look) -> Self {
        Self {
            time,
            elevation: look.elevation,
            azimuth: look.azimuth,
            range: look.range,
            range_rate: look.range_rate,
        }
    }
}

/// One visibility pass
#[derive(Debug, Clone)]
pub struct SatellitePass {
    pub tle: Arc<TleRecord>,
    pub search_start: DateTime<Utc>,
    pub rise: PassEvent,
    pub peak: PassEvent,
    pub set: PassEvent,
    /// Detail samples between rise and set; empty unless sampled
    pub samples: Vec<PassEvent>,
}

impl SatellitePass {
    /// set - rise
    pub fn duration(&self) -> chrono::Duration {
        self.set.time - self.rise.time
    }

    /// rise - search start
    pub fn wait(&self) -> chrono::Duration {
        self.rise.time - self.search_start
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrbitError {
    #[error("cannot initialise propagator: {0}")]
    Elements(String),

    #[error("propagation failed at {at}: {reason}")]
    Propagation { at: DateTime<Utc>, reason: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PassSearchError {
    /// Not exactly rise, peak and set inside the window. Expected whenever the
    /// threshold is unreachable or the window ends mid-pass.
    #[error("no pass found in window ({events_found} events found)")]
    WrongEventCount { events_found: usize },

    #[error(transparent)]
    Orbit(#[from] OrbitError),
}

/// What the enumerator does when one search in the sequence fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnumerationPolicy {
    /// Stop and return the passes found so far
    #[default]
    Strict,
    /// Skip one search window and keep going
    Lenient,
}

impl EnumerationPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnumerationPolicy::Strict => "strict",
            EnumerationPolicy::Lenient => "lenient",
        }
    }
}

impl fmt::Display for EnumerationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EnumerationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(EnumerationPolicy::Strict),
            "lenient" => Ok(EnumerationPolicy::Lenient),
            _ => Err(format!("Unknown enumeration policy: {}", s)),
        }
    }
}
