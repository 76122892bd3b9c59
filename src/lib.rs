//! ev-maintenance-api: predictive-maintenance inference API for EV fleets.
//!
//! Serves a pre-trained battery state-of-health / thermal-risk predictor
//! over HTTP. The predictor is constructed once at startup and shared
//! read-only across requests.
//!
//! - [`config`]: CLI arguments and runtime configuration
//! - [`predictor`]: model artifacts and the prediction engine
//! - [`server`]: axum routes, request/response types, error mapping

pub mod config;
pub mod predictor;
pub mod server;
