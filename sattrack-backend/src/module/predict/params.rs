///! Request parameter validation, applied before any search starts
use super::types::Observer;
use thiserror::Error;

pub const MIN_IDENTIFIER_LENGTH: usize = 5;
pub const MAX_IDENTIFIER_LENGTH: usize = 11;
/// Upper bound for the number of enumerated passes
pub const MAX_PASS_COUNT: u32 = 20;
pub const MAX_ALTITUDE_METERS: f64 = i32::MAX as f64;
/// Smallest detail sampling step, seconds
pub const MIN_SAMPLE_STEP_SECONDS: f64 = 0.01;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamError {
    #[error("latitude {0} is outside [-90, 90]")]
    Latitude(f64),

    #[error("longitude {0} is outside [-180, 180]")]
    Longitude(f64),

    #[error("altitude {0} is outside [0, {}] meters", MAX_ALTITUDE_METERS)]
    Altitude(f64),

    #[error("minimum elevation {0} is outside [0, 90]")]
    MinElevation(f64),

    #[error("step {0} is below the minimum of {} seconds", MIN_SAMPLE_STEP_SECONDS)]
    Step(f64),

    #[error("pass count {count} is outside [1, {max}]")]
    Count { count: u32, max: u32 },

    #[error(
        "identifier '{0}' must have between {} and {} characters",
        MIN_IDENTIFIER_LENGTH,
        MAX_IDENTIFIER_LENGTH
    )]
    Identifier(String),
}

pub fn validate_observer(latitude: f64, longitude: f64, altitude: f64) -> Result<Observer, ParamError> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(ParamError::Latitude(latitude));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(ParamError::Longitude(longitude));
    }
    if !(0.0..=MAX_ALTITUDE_METERS).contains(&altitude) {
        return Err(ParamError::Altitude(altitude));
    }
    Ok(Observer::new(latitude, longitude, altitude))
}

pub fn validate_min_elevation(min_elevation: f64) -> Result<f64, ParamError> {
    if (0.0..=90.0).contains(&min_elevation) {
        Ok(min_elevation)
    } else {
        Err(ParamError::MinElevation(min_elevation))
    }
}

pub fn validate_step(step: f64) -> Result<f64, ParamError> {
    if step.is_finite() && step >= MIN_SAMPLE_STEP_SECONDS {
        Ok(step)
    } else {
        Err(ParamError::Step(step))
    }
}

pub fn validate_count(count: u32, max: u32) -> Result<usize, ParamError> {
    if (1..=max).contains(&count) {
        Ok(count as usize)
    } else {
        Err(ParamError::Count { count, max })
    }
}

pub fn validate_identifier(identifier: &str) -> Result<&str, ParamError> {
    let length = identifier.chars().count();
    if (MIN_IDENTIFIER_LENGTH..=MAX_IDENTIFIER_LENGTH).contains(&length) {
        Ok(identifier)
    } else {
        Err(ParamError::Identifier(identifier.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observer_ranges() {
        assert!(validate_observer(45.815, 15.9819, 400.0).is_ok());
        assert!(validate_observer(-90.0, 180.0, 0.0).is_ok());
        assert_eq!(validate_observer(90.5, 0.0, 0.0), Err(ParamError::Latitude(90.5)));
        assert_eq!(validate_observer(0.0, -180.1, 0.0), Err(ParamError::Longitude(-180.1)));
        assert_eq!(validate_observer(0.0, 0.0, -1.0), Err(ParamError::Altitude(-1.0)));
        assert!(validate_observer(f64::NAN, 0.0, 0.0).is_err());
        assert!(validate_observer(0.0, 0.0, MAX_ALTITUDE_METERS + 1.0).is_err());
    }

    #[test]
    fn test_min_elevation_and_step() {
        assert_eq!(validate_min_elevation(0.0), Ok(0.0));
        assert_eq!(validate_min_elevation(90.0), Ok(90.0));
        assert!(validate_min_elevation(-0.5).is_err());
        assert!(validate_min_elevation(91.0).is_err());

        assert_eq!(validate_step(0.01), Ok(0.01));
        assert!(validate_step(0.009).is_err());
        assert!(validate_step(0.0).is_err());
        assert!(validate_step(f64::INFINITY).is_err());
    }

    #[test]
    fn test_count_and_identifier() {
        assert_eq!(validate_count(1, 20), Ok(1));
        assert_eq!(validate_count(20, 20), Ok(20));
        assert_eq!(validate_count(0, 20), Err(ParamError::Count { count: 0, max: 20 }));
        assert!(validate_count(21, 20).is_err());

        assert!(validate_identifier("25544").is_ok());
        assert!(validate_identifier("1998-067A").is_ok());
        assert!(validate_identifier("2544").is_err());
        assert!(validate_identifier("123456789012").is_err());
    }
}
