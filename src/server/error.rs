//! HTTP error mapping.
//!
//! Handlers return `Result<_, ApiError>`; the error is rendered at the
//! boundary as a JSON body with a human-readable `detail` string, matching
//! the error shape the fleet dashboard expects.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::predictor::engine::PredictionError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Model not loaded. Server may be starting up.")]
    ModelUnavailable,

    #[error("{0}")]
    Prediction(String),

    #[error("Prediction failed: {0}")]
    Internal(String),
}

impl From<PredictionError> for ApiError {
    fn from(err: PredictionError) -> Self {
        ApiError::Prediction(err.to_string())
    }
}

/// JSON error body: `{"detail": "..."}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ModelUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Prediction(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::ModelUnavailable.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::Prediction("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Internal("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_prediction_error_message_passes_through() {
        let err: ApiError = PredictionError::SocOutOfRange(130.0).into();
        assert_eq!(err.to_string(), "State_of_Charge must be between 0 and 100, got 130");
    }
}
