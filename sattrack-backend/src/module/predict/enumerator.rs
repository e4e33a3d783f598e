///! Consecutive passes by re-running the search with a rolling start
use super::orbit::OrbitModel;
use super::search::PassSearchEngine;
use super::types::{EnumerationPolicy, Observer, OrbitError, PassSearchError, SatellitePass};
use crate::module::tle::TleRecord;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Default single-pass search window
pub const DEFAULT_HORIZON_HOURS: i64 = 72;
/// Gap between a set and the start of the next search
const POST_SET_EPSILON_SECONDS: i64 = 1;

pub struct PassEnumerator<'a, M: OrbitModel + ?Sized> {
    engine: PassSearchEngine<'a, M>,
    horizon: Duration,
    policy: EnumerationPolicy,
}

impl<'a, M: OrbitModel + ?Sized> PassEnumerator<'a, M> {
    pub fn new(
        model: &'a M,
        tle: Arc<TleRecord>,
        observer: Observer,
        min_elevation: f64,
        policy: EnumerationPolicy,
    ) -> Self {
        Self {
            engine: PassSearchEngine::new(model, tle, observer, min_elevation),
            horizon: Duration::hours(DEFAULT_HORIZON_HOURS),
            policy,
        }
    }

    pub fn with_horizon(mut self, horizon: Duration) -> Self {
        self.horizon = horizon;
        self
    }

    /// Up to `count` passes after `start`, strictly ordered and non-overlapping.
    ///
    /// `Strict` stops at the first window without a pass; `Lenient` moves on by
    /// one window and spends that iteration. A propagation failure ends the
    /// sequence; it is an error only if nothing was found before it.
    pub fn next_passes(
        &self,
        start: DateTime<Utc>,
        count: usize,
    ) -> Result<Vec<SatellitePass>, OrbitError> {
        let mut passes = Vec::new();
        let mut search_start = start;

        for iteration in 0..count {
            match self.engine.find_next_pass(search_start, search_start + self.horizon) {
                Ok(pass) => {
                    search_start = pass.set.time + Duration::seconds(POST_SET_EPSILON_SECONDS);
                    passes.push(pass);
                }
                Err(PassSearchError::WrongEventCount { events_found }) => match self.policy {
                    EnumerationPolicy::Strict => {
                        tracing::debug!(
                            "Stopping enumeration after {} of {} passes ({} events in window)",
                            passes.len(),
                            count,
                            events_found
                        );
                        break;
                    }
                    EnumerationPolicy::Lenient => {
                        tracing::debug!("Skipping empty window in iteration {}", iteration + 1);
                        search_start += self.horizon;
                    }
                },
                Err(PassSearchError::Orbit(e)) => {
                    if passes.is_empty() {
                        return Err(e);
                    }
                    tracing::warn!(
                        "Propagation failed after {} passes of {}: {}",
                        passes.len(),
                        self.engine.tle().catalog_number(),
                        e
                    );
                    break;
                }
            }
        }

        Ok(passes)
    }
}
