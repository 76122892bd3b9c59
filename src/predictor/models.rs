//! Model coefficient loading.
//!
//! Reads serialized coefficients for the two underlying models (SOH
//! regressor, thermal-risk scorer) from JSON artifacts exported by the
//! training pipeline.
//!
//! When no artifact directory is configured, built-in coefficients from the
//! last training run are used so the service can run without a model bundle
//! on disk.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error("Model artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("Invalid model artifact {path}: {reason}")]
    InvalidArtifact { path: String, reason: String },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Telemetry features consumed by both models, in scoring order.
///
/// Names match the upstream telemetry schema; the order is the order of the
/// serialized weight vectors.
pub const FEATURE_COLUMNS: [&str; 9] = [
    "State_of_Charge",
    "Battery_Temperature",
    "Ambient_Temperature",
    "Battery_Voltage",
    "Battery_Current",
    "Charge_Cycles",
    "Odometer_km",
    "Avg_Charging_Power_kW",
    "Fast_Charge_Ratio",
];

const DEFAULT_SOH_INTERCEPT: f64 = 0.95;
const DEFAULT_SOH_WEIGHTS: [f64; 9] = [
    2.0e-4,  // State_of_Charge
    -1.5e-3, // Battery_Temperature
    -3.0e-4, // Ambient_Temperature
    1.0e-4,  // Battery_Voltage
    -1.0e-4, // Battery_Current
    -8.0e-5, // Charge_Cycles
    -4.0e-7, // Odometer_km
    -1.2e-3, // Avg_Charging_Power_kW
    -4.5e-2, // Fast_Charge_Ratio
];

const DEFAULT_THERMAL_BIAS: f64 = -4.6;
const DEFAULT_THERMAL_WEIGHTS: [f64; 9] = [
    -2.0e-3, // State_of_Charge
    0.11,    // Battery_Temperature
    0.02,    // Ambient_Temperature
    -1.0e-3, // Battery_Voltage
    0.01,    // Battery_Current
    1.0e-4,  // Charge_Cycles
    1.0e-7,  // Odometer_km
    0.06,    // Avg_Charging_Power_kW
    1.2,     // Fast_Charge_Ratio
];

/// Serialized coefficient bundle for a single linear model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearCoefficients {
    pub intercept: f64,
    pub weights: Vec<f64>,
}

impl LinearCoefficients {
    fn validate(&self, path: &str) -> Result<(), ModelLoadError> {
        if self.weights.len() != FEATURE_COLUMNS.len() {
            return Err(ModelLoadError::InvalidArtifact {
                path: path.to_string(),
                reason: format!(
                    "expected {} weights, got {}",
                    FEATURE_COLUMNS.len(),
                    self.weights.len()
                ),
            });
        }
        if !self.intercept.is_finite() || self.weights.iter().any(|w| !w.is_finite()) {
            return Err(ModelLoadError::InvalidArtifact {
                path: path.to_string(),
                reason: "non-finite coefficient".to_string(),
            });
        }
        Ok(())
    }
}

fn read_coefficients(path: &Path) -> Result<LinearCoefficients, ModelLoadError> {
    if !path.exists() {
        return Err(ModelLoadError::ArtifactNotFound(path.display().to_string()));
    }
    let data = std::fs::read_to_string(path)?;
    let coeffs: LinearCoefficients =
        serde_json::from_str(&data).map_err(|e| ModelLoadError::InvalidArtifact {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
    coeffs.validate(&path.display().to_string())?;
    Ok(coeffs)
}

/// Battery state-of-health regressor.
///
/// Linear model over the telemetry feature vector; output clamped to [0, 1].
#[derive(Debug, Clone)]
pub struct SohRegressor {
    coefficients: LinearCoefficients,
}

impl SohRegressor {
    pub fn model_name(&self) -> &'static str {
        "SohRegressor"
    }

    pub fn score(&self, features: &[f64]) -> f64 {
        let raw = self.coefficients.intercept
            + self
                .coefficients
                .weights
                .iter()
                .zip(features)
                .map(|(w, x)| w * x)
                .sum::<f64>();
        raw.clamp(0.0, 1.0)
    }
}

impl Default for SohRegressor {
    fn default() -> Self {
        Self {
            coefficients: LinearCoefficients {
                intercept: DEFAULT_SOH_INTERCEPT,
                weights: DEFAULT_SOH_WEIGHTS.to_vec(),
            },
        }
    }
}

/// Thermal-event risk scorer.
///
/// Logistic model over the telemetry feature vector; output in (0, 1).
#[derive(Debug, Clone)]
pub struct ThermalRiskScorer {
    coefficients: LinearCoefficients,
}

impl ThermalRiskScorer {
    pub fn model_name(&self) -> &'static str {
        "ThermalRiskScorer"
    }

    pub fn score(&self, features: &[f64]) -> f64 {
        let z = self.coefficients.intercept
            + self
                .coefficients
                .weights
                .iter()
                .zip(features)
                .map(|(w, x)| w * x)
                .sum::<f64>();
        1.0 / (1.0 + (-z).exp())
    }
}

impl Default for ThermalRiskScorer {
    fn default() -> Self {
        Self {
            coefficients: LinearCoefficients {
                intercept: DEFAULT_THERMAL_BIAS,
                weights: DEFAULT_THERMAL_WEIGHTS.to_vec(),
            },
        }
    }
}

/// Load both models from an artifact directory, or fall back to built-in
/// coefficients when no directory is configured or it does not exist.
///
/// A directory that exists but holds missing or malformed artifacts is a
/// load error: the bundle is presumed corrupt and startup must fail.
pub fn load_models(
    artifact_dir: Option<&Path>,
) -> Result<(SohRegressor, ThermalRiskScorer), ModelLoadError> {
    match artifact_dir {
        Some(dir) if dir.exists() => {
            let soh = SohRegressor {
                coefficients: read_coefficients(&dir.join("soh_model.json"))?,
            };
            let thermal = ThermalRiskScorer {
                coefficients: read_coefficients(&dir.join("thermal_model.json"))?,
            };
            info!(dir = %dir.display(), "Loaded model coefficients from artifacts");
            Ok((soh, thermal))
        }
        Some(dir) => {
            warn!(
                dir = %dir.display(),
                "Artifact directory not found, using built-in coefficients"
            );
            Ok((SohRegressor::default(), ThermalRiskScorer::default()))
        }
        None => {
            info!("No artifact directory configured, using built-in coefficients");
            Ok((SohRegressor::default(), ThermalRiskScorer::default()))
        }
    }
}
