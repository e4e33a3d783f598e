///! Pass prediction module
///!
///! Finds when a satellite is above an observer's minimum elevation and
///! describes the pass at fine resolution.
///!
///! ## Main Components
///! - `OrbitModel`: observer-relative look angles at an instant (`Sgp4OrbitModel`)
///! - `PassSearchEngine`: next rise/culmination/set inside a bounded window
///! - `PassSampler`: fixed-step walk between rise and set
///! - `PassEnumerator`: the next N passes with a rolling search start

// ============ Core Data Structures ============
mod types;
pub use types::*;

mod params;
pub use params::{
    ParamError, validate_count, validate_identifier, validate_min_elevation, validate_observer,
    validate_step, MAX_ALTITUDE_METERS, MAX_IDENTIFIER_LENGTH, MAX_PASS_COUNT, MIN_IDENTIFIER_LENGTH,
    MIN_SAMPLE_STEP_SECONDS,
};

// ============ Orbit Model ============
mod orbit;
pub use orbit::{OrbitModel, Sgp4OrbitModel, normalize_azimuth};

// ============ Search, Sampling and Enumeration ============
mod search;
pub use search::{PassSearchEngine, COARSE_STEP_SECONDS, CROSSING_TOLERANCE_MILLIS};

mod sampler;
pub use sampler::{PassSampler, PassSamples};

mod enumerator;
pub use enumerator::{PassEnumerator, DEFAULT_HORIZON_HOURS};

#[cfg(test)]
pub(crate) mod test_support;
