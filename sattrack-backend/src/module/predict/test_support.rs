///! Deterministic orbit models for exercising the search logic
use super::orbit::{OrbitModel, normalize_azimuth};
use super::types::{Look, Observer, OrbitError};
use crate::module::tle::TleRecord;
use crate::module::tle::fixtures::{ISS_LINE1, ISS_LINE2};
use chrono::{DateTime, TimeZone, Utc};
use std::f64::consts::PI;
use std::sync::Arc;

pub(crate) const SINE_PERIOD: f64 = 5400.0;
pub(crate) const SINE_AMPLITUDE: f64 = 50.0;
pub(crate) const SINE_OFFSET: f64 = -20.0;

/// Elevation given by a closed-form curve of seconds since `reference`
pub(crate) struct CurveModel<F> {
    reference: DateTime<Utc>,
    curve: F,
}

impl<F: Fn(f64) -> f64> CurveModel<F> {
    pub(crate) fn new(reference: DateTime<Utc>, curve: F) -> Self {
        Self { reference, curve }
    }
}

impl<F: Fn(f64) -> f64> OrbitModel for CurveModel<F> {
    fn look(&self, _tle: &TleRecord, _observer: &Observer, at: DateTime<Utc>) -> Result<Look, OrbitError> {
        let seconds = (at - self.reference).num_nanoseconds().unwrap_or(0) as f64 / 1e9;
        let elevation = (self.curve)(seconds);

        Ok(Look {
            elevation,
            azimuth: normalize_azimuth(seconds * 0.1),
            range: 500_000.0 + 20_000.0 * (90.0 - elevation),
            range_rate: -elevation * 10.0,
        })
    }
}

pub(crate) fn reference_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
}

/// One pass per 90 minutes, peaking at 30 degrees
pub(crate) fn sine_model() -> CurveModel<impl Fn(f64) -> f64> {
    CurveModel::new(reference_time(), |s| {
        SINE_AMPLITUDE * (2.0 * PI * s / SINE_PERIOD).sin() + SINE_OFFSET
    })
}

/// Seconds after the reference of the k-th sine pass rise and set (threshold 0)
pub(crate) fn sine_crossings(k: u32) -> (f64, f64) {
    let angle = (-SINE_OFFSET / SINE_AMPLITUDE).asin();
    let base = k as f64 * SINE_PERIOD;
    (
        base + angle / (2.0 * PI) * SINE_PERIOD,
        base + (PI - angle) / (2.0 * PI) * SINE_PERIOD,
    )
}

pub(crate) fn seconds_after(reference: DateTime<Utc>, at: DateTime<Utc>) -> f64 {
    (at - reference).num_nanoseconds().unwrap_or(0) as f64 / 1e9
}

pub(crate) fn iss_record() -> Arc<TleRecord> {
    Arc::new(TleRecord::new(Some("ISS (ZARYA)"), ISS_LINE1, ISS_LINE2).unwrap())
}

pub(crate) fn zagreb() -> Observer {
    Observer::new(45.815, 15.9819, 400.0)
}
