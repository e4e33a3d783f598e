use serde::{Deserialize, Serialize};

/// Round a value to a number of decimal places (half away from zero)
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

/// A single observer-relative sample: rise, peak, set or a detail step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassEventEntry {
    /// Instant, RFC 3339 UTC with millisecond precision
    pub t: String,
    /// Azimuth, degrees clockwise from north
    pub az: f64,
    /// Elevation, degrees
    pub el: f64,
    /// Distance, in meters
    pub dst: f64,
    /// Range rate in m/s (positive = receding), used as the Doppler proxy
    pub dop: f64,
}

impl PassEventEntry {
    /// Build an entry, rounding angles to 2 places and distances to whole units
    pub fn rounded(t: String, az: f64, el: f64, dst: f64, dop: f64) -> Self {
        Self {
            t,
            az: round_to(az, 2),
            el: round_to(el, 2),
            dst: round_to(dst, 0),
            dop: round_to(dop, 0),
        }
    }
}

/// Event data for a satellite pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SatellitePassResponse {
    /// TLE used for propagation, rendered as text
    pub tle: String,
    /// Search start
    pub now: String,
    /// Wait time for the rise event (rise - now), in seconds
    pub wait: f64,
    pub rise_point: PassEventEntry,
    pub mid_point: PassEventEntry,
    pub set_point: PassEventEntry,
    /// Pass duration, in seconds
    pub duration: f64,
    pub event_details: Vec<PassEventEntry>,
}

/// Sub-satellite point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionResponse {
    pub lat: f64,
    pub lon: f64,
}

/// Pass prediction request carrying its own element set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomPassRequest {
    #[serde(default)]
    pub name: Option<String>,
    pub line1: String,
    pub line2: String,
    pub lat: f64,
    pub lon: f64,
    pub alt: f64,
    pub min_el: f64,
    /// Detail resolution in seconds; no samples when absent
    #[serde(default)]
    pub step: Option<f64>,
}

/// API error response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}
