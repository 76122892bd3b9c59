//! Fleet-facing HTTP API.
//!
//! Implements the service surface consumed by the fleet dashboard:
//! - POST /predict
//! - GET /
//! - GET /health
//! - GET /model/info

use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{Config, MODEL_VERSION};
use crate::predictor::engine::{
    EvMaintenancePredictor, PredictionReport, VehicleData, RUL_URGENT, SOH_CRITICAL, SOH_WARNING,
    THERMAL_DANGER,
};
use crate::server::error::ApiError;

/// Application state shared across handlers.
///
/// The predictor is `None` only when the state is assembled before model
/// loading (startup fails fast, so a serving process always holds `Some`);
/// handlers must still answer 503 for the absent case.
pub struct AppState {
    pub predictor: Option<Arc<EvMaintenancePredictor>>,
    pub start_time: Instant,
}

/// Build the axum router with all API routes.
pub fn build_router(state: Arc<AppState>, cors: CorsLayer) -> Router {
    Router::new()
        .route("/predict", post(predict_maintenance))
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/model/info", get(model_info))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS policy: the single configured origin, any method and header,
/// credentials allowed. Methods and headers are mirrored from the request
/// since a wildcard cannot be combined with credentials.
pub fn cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let origin: HeaderValue = config.server.cors_allowed_origin.parse()?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}

// ─── Response Types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct WelcomeResponse {
    pub message: String,
    pub version: String,
    pub status: String,
    pub endpoints: EndpointMap,
}

#[derive(Debug, Serialize)]
pub struct EndpointMap {
    pub health: String,
    pub predict: String,
    pub model_info: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_version: String,
    pub timestamp: String,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct ModelInfoResponse {
    pub model_version: String,
    pub features: Vec<String>,
    pub models: ModelNames,
    pub thresholds: ThresholdTable,
}

#[derive(Debug, Serialize)]
pub struct ModelNames {
    pub soh_predictor: String,
    pub thermal_predictor: String,
}

/// Decision thresholds the fleet dashboard renders next to predictions.
#[derive(Debug, Serialize)]
pub struct ThresholdTable {
    pub soh_critical: f64,
    pub soh_warning: f64,
    pub rul_urgent: i64,
    pub thermal_danger: f64,
}

impl ThresholdTable {
    fn current() -> Self {
        Self {
            soh_critical: SOH_CRITICAL,
            soh_warning: SOH_WARNING,
            rul_urgent: RUL_URGENT,
            thermal_danger: THERMAL_DANGER,
        }
    }
}

// ─── Route Handlers ────────────────────────────────────────────────────────

async fn predict_maintenance(
    State(state): State<Arc<AppState>>,
    Json(vehicle): Json<VehicleData>,
) -> Result<Json<PredictionReport>, ApiError> {
    let predictor = state
        .predictor
        .as_ref()
        .ok_or(ApiError::ModelUnavailable)?
        .clone();

    let request_id = Uuid::new_v4().to_string();
    let vehicle_id = vehicle.vehicle_id.clone();

    info!(request_id, vehicle_id, "Processing prediction");

    // Scoring is CPU-bound; run it off the async workers. A panic in the
    // predictor surfaces as a join error.
    let result = tokio::task::spawn_blocking(move || predictor.predict(&vehicle)).await;

    match result {
        Ok(Ok(report)) => {
            info!(request_id, vehicle_id, "Prediction successful");
            Ok(Json(report))
        }
        Ok(Err(err)) => {
            warn!(request_id, vehicle_id, error = %err, "Prediction rejected");
            Err(err.into())
        }
        Err(join_err) => {
            warn!(request_id, vehicle_id, error = %join_err, "Prediction task failed");
            Err(ApiError::Internal(join_err.to_string()))
        }
    }
}

async fn root() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: "EV Predictive Maintenance".to_string(),
        version: MODEL_VERSION.to_string(),
        status: "running".to_string(),
        endpoints: EndpointMap {
            health: "GET /health".to_string(),
            predict: "POST /predict".to_string(),
            model_info: "GET /model/info".to_string(),
        },
    })
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        model_version: MODEL_VERSION.to_string(),
        timestamp: Utc::now().to_rfc3339(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

async fn model_info(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ModelInfoResponse>, ApiError> {
    let predictor = state.predictor.as_ref().ok_or(ApiError::ModelUnavailable)?;

    Ok(Json(ModelInfoResponse {
        model_version: MODEL_VERSION.to_string(),
        features: predictor.feature_columns().to_vec(),
        models: ModelNames {
            soh_predictor: predictor.soh_model().model_name().to_string(),
            thermal_predictor: predictor.thermal_model().model_name().to_string(),
        },
        thresholds: ThresholdTable::current(),
    }))
}
