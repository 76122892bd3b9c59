//! EV maintenance prediction engine.
//!
//! - [`engine`]: High-level predictor orchestrating validation and scoring
//! - [`models`]: Serialized model coefficients and loading

pub mod engine;
pub mod models;
