///! Request-level facade over the catalog and the prediction engine
use std::sync::Arc;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use thiserror::Error;

use sattrack_common::{
    CustomPassRequest, PassEventEntry, PositionResponse, SatellitePassResponse, round_to,
};

use crate::config::PredictionConfig;
use crate::module::predict::{
    Observer, OrbitError, ParamError, PassEnumerator, PassEvent, PassSampler, PassSearchEngine,
    PassSearchError, SatellitePass, Sgp4OrbitModel, validate_count, validate_identifier,
    validate_min_elevation, validate_observer, validate_step,
};
use crate::module::tle::{TleCatalogManager, TleError, TleRecord};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("satellite '{0}' not found")]
    NotFound(String),

    #[error("invalid TLE: {0}")]
    InvalidTle(#[from] TleError),

    #[error("invalid parameters: {0}")]
    InvalidParams(#[from] ParamError),

    #[error("orbit computation failed: {0}")]
    Orbit(#[from] OrbitError),

    #[error("prediction task failed: {0}")]
    Internal(String),
}

/// Observer location and elevation threshold, as received
#[derive(Debug, Clone, Copy)]
pub struct PassQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub min_elevation: f64,
}

impl PassQuery {
    fn validate(&self) -> Result<(Observer, f64), ParamError> {
        let observer = validate_observer(self.latitude, self.longitude, self.altitude)?;
        let min_elevation = validate_min_elevation(self.min_elevation)?;
        Ok((observer, min_elevation))
    }
}

pub struct SatTrackService {
    catalog: Arc<TleCatalogManager>,
    prediction: PredictionConfig,
    clock: fn() -> DateTime<Utc>,
}

impl SatTrackService {
    pub fn new(catalog: Arc<TleCatalogManager>, prediction: PredictionConfig) -> Self {
        Self {
            catalog,
            prediction,
            clock: Utc::now,
        }
    }

    /// Replace the source of "now" used as the search start
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    fn horizon(&self) -> Duration {
        Duration::hours(i64::from(self.prediction.search_horizon_hours))
    }

    async fn find_record(&self, id: &str) -> Result<Arc<TleRecord>, ServiceError> {
        let id = validate_identifier(id)?;
        self.catalog
            .lookup(id)
            .await
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))
    }

    /// Element set in its three-line text form
    pub async fn tle(&self, id: &str) -> Result<String, ServiceError> {
        Ok(self.find_record(id).await?.render())
    }

    /// Current sub-satellite point
    pub async fn position(&self, id: &str) -> Result<PositionResponse, ServiceError> {
        let tle = self.find_record(id).await?;
        let now = (self.clock)();

        let (lat, lon) = run_blocking(move || {
            Sgp4OrbitModel::new()
                .subpoint(&tle, now)
                .map_err(ServiceError::from)
        })
        .await?;

        Ok(PositionResponse {
            lat: round_to(lat, 4),
            lon: round_to(lon, 4),
        })
    }

    /// Next pass from now, sampled when `step` is given; `None` if no pass qualifies
    pub async fn next_pass(
        &self,
        id: &str,
        query: PassQuery,
        step: Option<f64>,
    ) -> Result<Option<SatellitePassResponse>, ServiceError> {
        let (observer, min_elevation) = query.validate()?;
        let step = step.map(validate_step).transpose()?;
        let tle = self.find_record(id).await?;

        self.predict_one(tle, observer, min_elevation, step).await
    }

    /// Up to `count` consecutive passes under the configured policy
    pub async fn next_passes(
        &self,
        id: &str,
        query: PassQuery,
        count: u32,
    ) -> Result<Vec<SatellitePassResponse>, ServiceError> {
        let (observer, min_elevation) = query.validate()?;
        let count = validate_count(count, self.prediction.max_passes)?;
        let tle = self.find_record(id).await?;

        let start = (self.clock)();
        let horizon = self.horizon();
        let policy = self.prediction.enumeration_policy;

        let passes = run_blocking(move || {
            let model = Sgp4OrbitModel::new();
            PassEnumerator::new(&model, tle, observer, min_elevation, policy)
                .with_horizon(horizon)
                .next_passes(start, count)
                .map_err(ServiceError::from)
        })
        .await?;

        tracing::debug!("Enumerated {} of {} requested passes", passes.len(), count);
        Ok(passes.iter().map(pass_response).collect())
    }

    /// Next pass for an element set supplied by the caller
    pub async fn custom_pass(
        &self,
        request: CustomPassRequest,
    ) -> Result<Option<SatellitePassResponse>, ServiceError> {
        let query = PassQuery {
            latitude: request.lat,
            longitude: request.lon,
            altitude: request.alt,
            min_elevation: request.min_el,
        };
        let (observer, min_elevation) = query.validate()?;
        let step = request.step.map(validate_step).transpose()?;

        let tle = TleRecord::new(
            request.name.as_deref(),
            request.line1.trim(),
            request.line2.trim(),
        )?;
        tracing::info!("Custom pass request for catalog number {}", tle.catalog_number());

        self.predict_one(Arc::new(tle), observer, min_elevation, step).await
    }

    async fn predict_one(
        &self,
        tle: Arc<TleRecord>,
        observer: Observer,
        min_elevation: f64,
        step: Option<f64>,
    ) -> Result<Option<SatellitePassResponse>, ServiceError> {
        let start = (self.clock)();
        let end = start + self.horizon();

        let pass = run_blocking(move || {
            let model = Sgp4OrbitModel::new();
            let engine = PassSearchEngine::new(&model, tle, observer, min_elevation);

            let mut pass = match engine.find_next_pass(start, end) {
                Ok(pass) => pass,
                Err(PassSearchError::WrongEventCount { .. }) => return Ok(None),
                Err(PassSearchError::Orbit(e)) => return Err(e.into()),
            };

            if let Some(step) = step {
                PassSampler::new(&model, observer, step)?.sample(&mut pass)?;
            }
            Ok(Some(pass))
        })
        .await?;

        Ok(pass.as_ref().map(pass_response))
    }
}

/// Run CPU-bound prediction work off the async executor
async fn run_blocking<T, F>(work: F) -> Result<T, ServiceError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ServiceError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ServiceError::Internal(e.to_string()))?
}

fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn seconds(duration: Duration) -> f64 {
    match duration.num_microseconds() {
        Some(micros) => micros as f64 / 1e6,
        None => duration.num_milliseconds() as f64 / 1e3,
    }
}

fn event_entry(event: &PassEvent) -> PassEventEntry {
    PassEventEntry::rounded(
        format_time(event.time),
        event.azimuth,
        event.elevation,
        event.range,
        event.range_rate,
    )
}

pub fn pass_response(pass: &SatellitePass) -> SatellitePassResponse {
    SatellitePassResponse {
        tle: pass.tle.render(),
        now: format_time(pass.search_start),
        wait: round_to(seconds(pass.wait()), 2),
        rise_point: event_entry(&pass.rise),
        mid_point: event_entry(&pass.peak),
        set_point: event_entry(&pass.set),
        duration: round_to(seconds(pass.duration()), 2),
        event_details: pass.samples.iter().map(event_entry).collect(),
    }
}
