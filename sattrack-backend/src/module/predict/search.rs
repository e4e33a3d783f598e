///! Next-pass search: threshold crossings and culmination over an orbit model
use super::orbit::OrbitModel;
use super::types::{Look, Observer, OrbitError, PassEvent, PassSearchError, SatellitePass};
use crate::module::tle::TleRecord;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Coarse walk interval, in seconds
pub const COARSE_STEP_SECONDS: i64 = 30;
/// Rise and set instants are refined to this tolerance, in milliseconds
pub const CROSSING_TOLERANCE_MILLIS: i64 = 1;
/// Culmination is refined to this tolerance, in seconds
const PEAK_TOLERANCE_SECONDS: f64 = 0.01;

const INVERSE_GOLDEN_RATIO: f64 = 0.618_033_988_749_895;

/// Search progress while walking the window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Waiting for a rise. `armed` once a sample below the threshold was seen,
    /// so a pass already in progress at the window start is skipped.
    Searching { armed: bool },
    Risen,
    Culminated,
    Set,
}

/// Elevations from rise onwards, with slope sign changes tracked as they arrive
#[derive(Debug, Default)]
struct ElevationProfile {
    points: Vec<(DateTime<Utc>, f64)>,
    last_slope: i8,
    /// Start of the most recent rising segment
    rising_from: usize,
    /// Index brackets around each local maximum
    maxima: Vec<(usize, usize)>,
    minima: usize,
}

impl ElevationProfile {
    fn push(&mut self, time: DateTime<Utc>, elevation: f64) {
        if let Some(&(last_time, last)) = self.points.last() {
            if time <= last_time {
                return;
            }
            let index = self.points.len();
            if elevation > last {
                if self.last_slope < 0 {
                    self.minima += 1;
                }
                self.rising_from = index - 1;
                self.last_slope = 1;
            } else if elevation < last {
                if self.last_slope > 0 {
                    self.maxima.push((self.rising_from, index));
                }
                self.last_slope = -1;
            }
        }
        self.points.push((time, elevation));
    }

    fn extrema(&self) -> usize {
        self.maxima.len() + self.minima
    }

    fn bracket(&self, (start, end): (usize, usize)) -> (DateTime<Utc>, DateTime<Utc>) {
        (self.points[start].0, self.points[end].0)
    }
}

/// Finds the next rise/peak/set triple of one satellite over one observer
pub struct PassSearchEngine<'a, M: OrbitModel + ?Sized> {
    model: &'a M,
    tle: Arc<TleRecord>,
    observer: Observer,
    min_elevation: f64,
}

impl<'a, M: OrbitModel + ?Sized> PassSearchEngine<'a, M> {
    pub fn new(model: &'a M, tle: Arc<TleRecord>, observer: Observer, min_elevation: f64) -> Self {
        Self {
            model,
            tle,
            observer,
            min_elevation,
        }
    }

    pub fn tle(&self) -> &Arc<TleRecord> {
        &self.tle
    }

    /// Search `[from, to]` for the first complete pass.
    ///
    /// Succeeds only with exactly one rise, one culmination and one set inside
    /// the window. Anything else is `WrongEventCount` with the number of events
    /// seen; samples are left empty.
    pub fn find_next_pass(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<SatellitePass, PassSearchError> {
        let result = self.search(from, to);
        if let Err(PassSearchError::WrongEventCount { events_found }) = &result {
            tracing::debug!(
                "No pass of {} between {} and {} ({} events found)",
                self.tle.catalog_number(),
                from,
                to,
                events_found
            );
        }
        result
    }

    fn search(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<SatellitePass, PassSearchError> {
        if to <= from {
            return Err(PassSearchError::WrongEventCount { events_found: 0 });
        }

        let mut phase = Phase::Searching { armed: false };
        let mut profile = ElevationProfile::default();
        let mut rise: Option<PassEvent> = None;
        let mut set: Option<PassEvent> = None;
        let step = Duration::seconds(COARSE_STEP_SECONDS);
        let mut previous = from;
        let mut t = from;

        loop {
            let elevation = self.look(t)?.elevation;
            let above = elevation >= self.min_elevation;

            match phase {
                Phase::Searching { armed } => {
                    if !above {
                        phase = Phase::Searching { armed: true };
                    } else if armed {
                        let rise_time = self.refine_crossing(previous, t)?;
                        let event = self.event(rise_time)?;
                        profile.push(rise_time, event.elevation);
                        profile.push(t, elevation);
                        rise = Some(event);
                        phase = Phase::Risen;
                    }
                }
                Phase::Risen | Phase::Culminated => {
                    if above {
                        profile.push(t, elevation);
                    } else {
                        let set_time = self.refine_crossing(t, previous)?;
                        let event = self.event(set_time)?;
                        profile.push(set_time, event.elevation);
                        set = Some(event);
                        phase = Phase::Set;
                    }
                }
                Phase::Set => {}
            }

            if phase == Phase::Risen && !profile.maxima.is_empty() {
                phase = Phase::Culminated;
            }
            if phase == Phase::Set || t >= to {
                break;
            }

            previous = t;
            t = (t + step).min(to);
        }

        let (rise, set) = match (phase, rise, set) {
            (Phase::Set, Some(rise), Some(set)) => (rise, set),
            (Phase::Risen | Phase::Culminated, _, _) => {
                return Err(PassSearchError::WrongEventCount {
                    events_found: 1 + profile.extrema(),
                });
            }
            _ => return Err(PassSearchError::WrongEventCount { events_found: 0 }),
        };

        let events_found = 2 + profile.extrema();
        if events_found != 3 || profile.maxima.len() != 1 {
            return Err(PassSearchError::WrongEventCount { events_found });
        }

        let (start, end) = profile.bracket(profile.maxima[0]);
        let peak = self.refine_peak(start, end)?;
        if !(rise.time < peak.time && peak.time < set.time) {
            return Err(PassSearchError::WrongEventCount { events_found: 2 });
        }

        Ok(SatellitePass {
            tle: self.tle.clone(),
            search_start: from,
            rise,
            peak,
            set,
            samples: Vec::new(),
        })
    }

    fn look(&self, at: DateTime<Utc>) -> Result<Look, OrbitError> {
        self.model.look(&self.tle, &self.observer, at)
    }

    fn event(&self, at: DateTime<Utc>) -> Result<PassEvent, OrbitError> {
        Ok(PassEvent::new(at, self.look(at)?))
    }

    /// Bisect between a sample below the threshold and one at or above it.
    /// Returns the side at or above, so rise and set both lie inside the pass.
    fn refine_crossing(
        &self,
        mut below: DateTime<Utc>,
        mut above: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, OrbitError> {
        let tolerance = Duration::milliseconds(CROSSING_TOLERANCE_MILLIS);
        while (above - below).abs() > tolerance {
            let mid = below + (above - below) / 2;
            if self.look(mid)?.elevation >= self.min_elevation {
                above = mid;
            } else {
                below = mid;
            }
        }
        Ok(above)
    }

    /// Golden-section search for the elevation maximum inside a bracket
    fn refine_peak(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<PassEvent, OrbitError> {
        let at = |seconds: f64| start + Duration::nanoseconds((seconds * 1e9).round() as i64);
        let elevation = |seconds: f64| -> Result<f64, OrbitError> { Ok(self.look(at(seconds))?.elevation) };

        let mut lo = 0.0;
        let mut hi = (end - start).num_milliseconds() as f64 / 1000.0;
        let mut x1 = hi - INVERSE_GOLDEN_RATIO * (hi - lo);
        let mut x2 = lo + INVERSE_GOLDEN_RATIO * (hi - lo);
        let mut f1 = elevation(x1)?;
        let mut f2 = elevation(x2)?;

        while hi - lo > PEAK_TOLERANCE_SECONDS {
            if f1 < f2 {
                lo = x1;
                x1 = x2;
                f1 = f2;
                x2 = lo + INVERSE_GOLDEN_RATIO * (hi - lo);
                f2 = elevation(x2)?;
            } else {
                hi = x2;
                x2 = x1;
                f2 = f1;
                x1 = hi - INVERSE_GOLDEN_RATIO * (hi - lo);
                f1 = elevation(x1)?;
            }
        }

        self.event(at((lo + hi) / 2.0))
    }
}
