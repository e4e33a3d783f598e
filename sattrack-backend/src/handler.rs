///! HTTP surface: axum router, handlers and error mapping
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use sattrack_common::{ApiError, CustomPassRequest, PositionResponse, SatellitePassResponse};

use crate::service::{PassQuery, SatTrackService, ServiceError};

/// Error returned by every handler, rendered as an `ApiError` body
pub enum AppError {
    Service(ServiceError),
    BadRequest(String),
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        AppError::Service(e)
    }
}

impl From<PathRejection> for AppError {
    fn from(e: PathRejection) -> Self {
        AppError::BadRequest(e.body_text())
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::BadRequest(e.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", message),
            AppError::Service(e) => {
                let (status, code) = match &e {
                    ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                    ServiceError::InvalidTle(_) => (StatusCode::BAD_REQUEST, "INVALID_TLE"),
                    ServiceError::InvalidParams(_) => (StatusCode::BAD_REQUEST, "INVALID_PARAMS"),
                    ServiceError::Orbit(_) => (StatusCode::INTERNAL_SERVER_ERROR, "ORBIT_ERROR"),
                    ServiceError::Internal(_) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                    }
                };
                if status.is_server_error() {
                    tracing::error!("Request failed: {}", e);
                }
                (status, code, e.to_string())
            }
        };

        (status, Json(ApiError::new(code, message))).into_response()
    }
}

type AppState = Arc<SatTrackService>;

#[derive(Debug, Deserialize)]
struct PassPath {
    id: String,
    lat: f64,
    lon: f64,
    alt: f64,
    min_el: f64,
}

#[derive(Debug, Deserialize)]
struct SampledPassPath {
    id: String,
    lat: f64,
    lon: f64,
    alt: f64,
    min_el: f64,
    step: f64,
}

#[derive(Debug, Deserialize)]
struct NextPassesPath {
    id: String,
    lat: f64,
    lon: f64,
    alt: f64,
    min_el: f64,
    count: u32,
}

fn pass_query(lat: f64, lon: f64, alt: f64, min_el: f64) -> PassQuery {
    PassQuery {
        latitude: lat,
        longitude: lon,
        altitude: alt,
        min_elevation: min_el,
    }
}

const PASS_ROUTE: &str = "/api/v1/passes/{id}/lat/{lat}/lon/{lon}/alt/{alt}/minEl/{min_el}";

/// Build the application router
pub fn router(service: Arc<SatTrackService>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/tles/{id}", get(get_tle))
        .route("/api/v1/positions/{id}", get(get_position))
        .route(PASS_ROUTE, get(get_next_pass))
        .route(&format!("{}/step/{{step}}", PASS_ROUTE), get(get_sampled_pass))
        .route(&format!("{}/next/{{count}}", PASS_ROUTE), get(get_next_passes))
        .route("/api/v1/passes", post(post_custom_pass))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn get_tle(
    State(service): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<String, AppError> {
    let Path(id) = path?;
    Ok(service.tle(&id).await?)
}

async fn get_position(
    State(service): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<PositionResponse>, AppError> {
    let Path(id) = path?;
    Ok(Json(service.position(&id).await?))
}

async fn get_next_pass(
    State(service): State<AppState>,
    path: Result<Path<PassPath>, PathRejection>,
) -> Result<Json<Option<SatellitePassResponse>>, AppError> {
    let Path(path) = path?;
    let query = pass_query(path.lat, path.lon, path.alt, path.min_el);
    Ok(Json(service.next_pass(&path.id, query, None).await?))
}

async fn get_sampled_pass(
    State(service): State<AppState>,
    path: Result<Path<SampledPassPath>, PathRejection>,
) -> Result<Json<Option<SatellitePassResponse>>, AppError> {
    let Path(path) = path?;
    let query = pass_query(path.lat, path.lon, path.alt, path.min_el);
    let pass = service.next_pass(&path.id, query, Some(path.step)).await?;
    Ok(Json(pass))
}

async fn get_next_passes(
    State(service): State<AppState>,
    path: Result<Path<NextPassesPath>, PathRejection>,
) -> Result<Json<Vec<SatellitePassResponse>>, AppError> {
    let Path(path) = path?;
    let query = pass_query(path.lat, path.lon, path.alt, path.min_el);
    let passes = service.next_passes(&path.id, query, path.count).await?;
    Ok(Json(passes))
}

async fn post_custom_pass(
    State(service): State<AppState>,
    body: Result<Json<CustomPassRequest>, JsonRejection>,
) -> Result<Json<Option<SatellitePassResponse>>, AppError> {
    let Json(request) = body?;
    Ok(Json(service.custom_pass(request).await?))
}
