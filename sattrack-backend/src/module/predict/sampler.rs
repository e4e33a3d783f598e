///! Dense sampling of a found pass at a fixed step
use super::orbit::OrbitModel;
use super::params::{ParamError, validate_step};
use super::types::{Observer, OrbitError, PassEvent, SatellitePass};
use crate::module::tle::TleRecord;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Re-walks [rise, set] at a fixed step
pub struct PassSampler<'a, M: OrbitModel + ?Sized> {
    model: &'a M,
    observer: Observer,
    step_nanos: i64,
}

impl<'a, M: OrbitModel + ?Sized> PassSampler<'a, M> {
    pub fn new(model: &'a M, observer: Observer, step_seconds: f64) -> Result<Self, ParamError> {
        let step = validate_step(step_seconds)?;
        Ok(Self {
            model,
            observer,
            step_nanos: (step * 1e9).round() as i64,
        })
    }

    /// Lazily evaluate `rise + k * step` for every k that does not pass the set time
    pub fn samples(&self, pass: &SatellitePass) -> PassSamples<'a, M> {
        let span = (pass.set.time - pass.rise.time).num_nanoseconds().unwrap_or(0);
        let count = if span < 0 { 0 } else { span / self.step_nanos + 1 };

        PassSamples {
            model: self.model,
            tle: pass.tle.clone(),
            observer: self.observer,
            start: pass.rise.time,
            step_nanos: self.step_nanos,
            count,
            next: 0,
        }
    }

    /// Replace the pass's samples with a fresh walk
    pub fn sample(&self, pass: &mut SatellitePass) -> Result<(), OrbitError> {
        pass.samples = self.samples(pass).collect::<Result<Vec<_>, _>>()?;
        Ok(())
    }
}

/// Finite, restartable sequence of pass samples
pub struct PassSamples<'a, M: OrbitModel + ?Sized> {
    model: &'a M,
    tle: Arc<TleRecord>,
    observer: Observer,
    start: DateTime<Utc>,
    step_nanos: i64,
    count: i64,
    next: i64,
}

impl<M: OrbitModel + ?Sized> Iterator for PassSamples<'_, M> {
    type Item = Result<PassEvent, OrbitError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.count {
            return None;
        }
        // Offsets are computed from the start, never accumulated
        let at = self.start + Duration::nanoseconds(self.next * self.step_nanos);
        self.next += 1;

        Some(
            self.model
                .look(&self.tle, &self.observer, at)
                .map(|look| PassEvent::new(at, look)),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.count - self.next).max(0) as usize;
        (remaining, Some(remaining))
    }
}

impl<M: OrbitModel + ?Sized> ExactSizeIterator for PassSamples<'_, M> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::predict::test_support::*;
    use crate::module::predict::{PassSearchEngine, Sgp4OrbitModel};

    fn sine_pass<M: OrbitModel>(model: &M) -> SatellitePass {
        let start = reference_time();
        PassSearchEngine::new(model, iss_record(), zagreb(), 0.0)
            .find_next_pass(start, start + Duration::hours(3))
            .unwrap()
    }

    #[test]
    fn test_sample_count_and_spacing() {
        let model = sine_model();
        let mut pass = sine_pass(&model);
        let sampler = PassSampler::new(&model, zagreb(), 7.5).unwrap();
        sampler.sample(&mut pass).unwrap();

        let span = (pass.set.time - pass.rise.time).num_nanoseconds().unwrap();
        let expected = (span / 7_500_000_000 + 1) as usize;
        assert_eq!(pass.samples.len(), expected);

        assert_eq!(pass.samples[0].time, pass.rise.time);
        assert!(pass.samples.last().unwrap().time <= pass.set.time);
        for pair in pass.samples.windows(2) {
            assert_eq!(pair[1].time - pair[0].time, Duration::milliseconds(7500));
        }
    }

    #[test]
    fn test_sampling_is_idempotent() {
        let model = sine_model();
        let pass = sine_pass(&model);
        let sampler = PassSampler::new(&model, zagreb(), 0.37).unwrap();

        let first: Vec<PassEvent> = sampler.samples(&pass).map(Result::unwrap).collect();
        let second: Vec<PassEvent> = sampler.samples(&pass).map(Result::unwrap).collect();
        assert_eq!(first, second);
        assert_eq!(sampler.samples(&pass).len(), first.len());
    }

    #[test]
    fn test_endpoints_on_step_boundary() {
        let model = sine_model();
        let mut pass = sine_pass(&model);
        // Force a span that is an exact multiple of the step
        pass.set.time = pass.rise.time + Duration::seconds(100);

        let sampler = PassSampler::new(&model, zagreb(), 10.0).unwrap();
        let samples: Vec<PassEvent> = sampler.samples(&pass).map(Result::unwrap).collect();

        assert_eq!(samples.len(), 11);
        assert_eq!(samples.last().unwrap().time, pass.set.time);
    }

    #[test]
    fn test_rejects_tiny_step() {
        let model = sine_model();
        assert!(matches!(
            PassSampler::new(&model, zagreb(), 0.001),
            Err(ParamError::Step(_))
        ));
        assert!(PassSampler::new(&model, zagreb(), -1.0).is_err());
    }

    #[test]
    fn test_iss_samples_have_valid_azimuth() {
        let model = Sgp4OrbitModel::new();
        let tle = iss_record();
        let start = tle.epoch();
        let mut pass = PassSearchEngine::new(&model, tle, zagreb(), 1.0)
            .find_next_pass(start, start + Duration::hours(72))
            .unwrap();

        PassSampler::new(&model, zagreb(), 1.0)
            .unwrap()
            .sample(&mut pass)
            .unwrap();

        assert!(!pass.samples.is_empty());
        for sample in &pass.samples {
            assert!((0.0..360.0).contains(&sample.azimuth));
            assert!(sample.elevation >= 0.99);
        }
    }
}
