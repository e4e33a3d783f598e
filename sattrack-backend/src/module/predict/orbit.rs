///! Orbit model: propagation plus the observer-relative transform
///!
///! The search engine only sees the `OrbitModel` trait. `Sgp4OrbitModel` runs
///! SGP4/SDP4 on the element lines, rotates TEME into Earth-fixed coordinates
///! through GMST and projects onto the observer's East/North/Up frame.
use super::types::{Look, Observer, OrbitError};
use crate::module::tle::TleRecord;
use chrono::{DateTime, NaiveDateTime, Utc};
use sgp4::{Constants, Elements, MinutesSinceEpoch};
use std::sync::{Arc, Mutex, PoisonError};

const WGS84_EQUATORIAL_RADIUS_KM: f64 = 6378.137;
const WGS84_FLATTENING: f64 = 1.0 / 298.257223563;
const EARTH_ROTATION_RAD_PER_SEC: f64 = 7.292115146706979e-5;
const UNIX_EPOCH_JULIAN_DATE: f64 = 2_440_587.5;
const J2000_JULIAN_DATE: f64 = 2_451_545.0;

/// Observer-relative position of a satellite as a function of time.
///
/// Must be deterministic and continuous in `at` for a fixed element set and
/// observer.
pub trait OrbitModel {
    fn look(&self, tle: &TleRecord, observer: &Observer, at: DateTime<Utc>)
        -> Result<Look, OrbitError>;
}

/// SGP4-backed orbit model.
///
/// Keeps the most recently initialised propagator, so repeated calls for the
/// same element set skip re-initialisation.
#[derive(Default)]
pub struct Sgp4OrbitModel {
    cached: Mutex<Option<Arc<Propagator>>>,
}

struct Propagator {
    line1: String,
    line2: String,
    epoch: NaiveDateTime,
    constants: Constants,
}

impl Propagator {
    fn new(tle: &TleRecord) -> Result<Self, OrbitError> {
        let elements = Elements::from_tle(
            tle.name().map(str::to_string),
            tle.line1().as_bytes(),
            tle.line2().as_bytes(),
        )
        .map_err(|e| OrbitError::Elements(format!("{:?}", e)))?;
        // Element sets are fitted with WGS-72
        let constants = Constants::from_elements_afspc_compatibility_mode(&elements)
            .map_err(|e| OrbitError::Elements(format!("{:?}", e)))?;

        Ok(Self {
            line1: tle.line1().to_string(),
            line2: tle.line2().to_string(),
            epoch: elements.datetime,
            constants,
        })
    }

    fn matches(&self, tle: &TleRecord) -> bool {
        self.line1 == tle.line1() && self.line2 == tle.line2()
    }

    /// TEME position (km) and velocity (km/s)
    fn propagate(&self, at: DateTime<Utc>) -> Result<([f64; 3], [f64; 3]), OrbitError> {
        let nanos = (at.naive_utc() - self.epoch)
            .num_nanoseconds()
            .ok_or_else(|| OrbitError::Propagation {
                at,
                reason: "instant too far from epoch".to_string(),
            })?;
        let minutes = nanos as f64 / 60e9;

        let prediction = self
            .constants
            .propagate_afspc_compatibility_mode(MinutesSinceEpoch(minutes))
            .map_err(|e| OrbitError::Propagation {
                at,
                reason: format!("{:?}", e),
            })?;

        Ok((prediction.position, prediction.velocity))
    }
}

impl Sgp4OrbitModel {
    pub fn new() -> Self {
        Self::default()
    }

    fn propagator(&self, tle: &TleRecord) -> Result<Arc<Propagator>, OrbitError> {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(propagator) = cached.as_ref().filter(|p| p.matches(tle)) {
            return Ok(propagator.clone());
        }

        let propagator = Arc::new(Propagator::new(tle)?);
        *cached = Some(propagator.clone());
        Ok(propagator)
    }

    /// TEME position (km) and velocity (km/s)
    pub fn teme_state(
        &self,
        tle: &TleRecord,
        at: DateTime<Utc>,
    ) -> Result<([f64; 3], [f64; 3]), OrbitError> {
        self.propagator(tle)?.propagate(at)
    }

    /// Earth-fixed position (km) and velocity (km/s)
    pub fn ecef_state(
        &self,
        tle: &TleRecord,
        at: DateTime<Utc>,
    ) -> Result<([f64; 3], [f64; 3]), OrbitError> {
        let (position, velocity) = self.teme_state(tle, at)?;
        Ok(teme_to_ecef(position, velocity, gmst_radians(at)))
    }

    /// Sub-satellite point as (latitude, longitude) in degrees
    pub fn subpoint(&self, tle: &TleRecord, at: DateTime<Utc>) -> Result<(f64, f64), OrbitError> {
        let (position, _) = self.ecef_state(tle, at)?;
        Ok(ecef_to_geodetic(position))
    }
}

impl OrbitModel for Sgp4OrbitModel {
    fn look(
        &self,
        tle: &TleRecord,
        observer: &Observer,
        at: DateTime<Utc>,
    ) -> Result<Look, OrbitError> {
        let (position, velocity) = self.ecef_state(tle, at)?;
        Ok(topocentric_look(observer, position, velocity))
    }
}

/// Greenwich mean sidereal time (IAU 1982), radians
pub fn gmst_radians(at: DateTime<Utc>) -> f64 {
    let unix_seconds = at.timestamp() as f64 + at.timestamp_subsec_nanos() as f64 * 1e-9;
    let julian_date = unix_seconds / 86_400.0 + UNIX_EPOCH_JULIAN_DATE;
    let t = (julian_date - J2000_JULIAN_DATE) / 36_525.0;

    let seconds = 67_310.548_41 + (876_600.0 * 3_600.0 + 8_640_184.812_866) * t
        + 0.093_104 * t * t
        - 6.2e-6 * t * t * t;

    (seconds.rem_euclid(86_400.0) / 240.0).to_radians()
}

/// Rotate a TEME state into the Earth-fixed frame
pub fn teme_to_ecef(position: [f64; 3], velocity: [f64; 3], gmst: f64) -> ([f64; 3], [f64; 3]) {
    let (sin, cos) = gmst.sin_cos();
    let [x, y, z] = position;
    let [vx, vy, vz] = velocity;

    let ecef_position = [cos * x + sin * y, -sin * x + cos * y, z];
    // Remove the frame's own rotation from the velocity
    let ecef_velocity = [
        cos * vx + sin * vy + EARTH_ROTATION_RAD_PER_SEC * ecef_position[1],
        -sin * vx + cos * vy - EARTH_ROTATION_RAD_PER_SEC * ecef_position[0],
        vz,
    ];

    (ecef_position, ecef_velocity)
}

fn eccentricity_squared() -> f64 {
    WGS84_FLATTENING * (2.0 - WGS84_FLATTENING)
}

/// Observer position in the Earth-fixed frame, km
pub fn observer_ecef(observer: &Observer) -> [f64; 3] {
    let latitude = observer.latitude.to_radians();
    let longitude = observer.longitude.to_radians();
    let height = observer.altitude / 1000.0;
    let e2 = eccentricity_squared();

    let (sin_lat, cos_lat) = latitude.sin_cos();
    let (sin_lon, cos_lon) = longitude.sin_cos();
    let n = WGS84_EQUATORIAL_RADIUS_KM / (1.0 - e2 * sin_lat * sin_lat).sqrt();

    [
        (n + height) * cos_lat * cos_lon,
        (n + height) * cos_lat * sin_lon,
        (n * (1.0 - e2) + height) * sin_lat,
    ]
}

/// Project an Earth-fixed satellite state onto the observer's horizon
pub fn topocentric_look(observer: &Observer, position: [f64; 3], velocity: [f64; 3]) -> Look {
    let site = observer_ecef(observer);
    let rho = [
        position[0] - site[0],
        position[1] - site[1],
        position[2] - site[2],
    ];

    let (sin_lat, cos_lat) = observer.latitude.to_radians().sin_cos();
    let (sin_lon, cos_lon) = observer.longitude.to_radians().sin_cos();

    let east = -sin_lon * rho[0] + cos_lon * rho[1];
    let north = -sin_lat * cos_lon * rho[0] - sin_lat * sin_lon * rho[1] + cos_lat * rho[2];
    let up = cos_lat * cos_lon * rho[0] + cos_lat * sin_lon * rho[1] + sin_lat * rho[2];

    let range = (rho[0] * rho[0] + rho[1] * rho[1] + rho[2] * rho[2]).sqrt();
    let range_rate = (rho[0] * velocity[0] + rho[1] * velocity[1] + rho[2] * velocity[2]) / range;

    Look {
        elevation: (up / range).clamp(-1.0, 1.0).asin().to_degrees(),
        azimuth: normalize_azimuth(east.atan2(north).to_degrees()),
        range: range * 1000.0,
        range_rate: range_rate * 1000.0,
    }
}

/// Wrap into [0, 360); tiny negative angles would otherwise round to 360
pub fn normalize_azimuth(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Earth-fixed position (km) to geodetic (latitude, longitude) in degrees
pub fn ecef_to_geodetic(position: [f64; 3]) -> (f64, f64) {
    let [x, y, z] = position;
    let e2 = eccentricity_squared();
    let p = (x * x + y * y).sqrt();

    let longitude = y.atan2(x);
    let mut latitude = z.atan2(p * (1.0 - e2));
    for _ in 0..10 {
        let sin_lat = latitude.sin();
        let n = WGS84_EQUATORIAL_RADIUS_KM / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        latitude = (z + e2 * n * sin_lat).atan2(p);
    }

    (latitude.to_degrees(), longitude.to_degrees())
}
