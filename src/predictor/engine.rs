//! Prediction engine: validates telemetry and scores battery health.
//!
//! The engine is the top-level predictor component that:
//! 1. Receives one vehicle's telemetry snapshot
//! 2. Validates field ranges before any scoring
//! 3. Assembles the feature vector in `feature_columns` order
//! 4. Runs the SOH and thermal-risk models
//! 5. Classifies the scores against the maintenance thresholds

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::ModelConfig;
use crate::predictor::models::{
    load_models, ModelLoadError, SohRegressor, ThermalRiskScorer, FEATURE_COLUMNS,
};

/// SOH below this is a critical battery.
pub const SOH_CRITICAL: f64 = 0.60;

/// SOH below this (but above critical) is a degrading battery.
pub const SOH_WARNING: f64 = 0.80;

/// Remaining useful life below this many cycles needs immediate service.
pub const RUL_URGENT: i64 = 100;

/// Thermal risk above this indicates a dangerous thermal condition.
pub const THERMAL_DANGER: f64 = 0.70;

/// Average SOH lost per charge cycle, used to project remaining useful life.
const SOH_DECAY_PER_CYCLE: f64 = 8.0e-5;

/// One vehicle's telemetry snapshot.
///
/// Field names follow the upstream fleet telemetry schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleData {
    #[serde(rename = "Vehicle_ID")]
    pub vehicle_id: String,

    /// Battery state of charge, percent.
    #[serde(rename = "State_of_Charge")]
    pub state_of_charge: f64,

    /// Battery pack temperature, °C.
    #[serde(rename = "Battery_Temperature")]
    pub battery_temperature: f64,

    /// Ambient temperature, °C.
    #[serde(rename = "Ambient_Temperature")]
    pub ambient_temperature: f64,

    /// Pack voltage, V.
    #[serde(rename = "Battery_Voltage")]
    pub battery_voltage: f64,

    /// Pack current, A (negative while discharging).
    #[serde(rename = "Battery_Current")]
    pub battery_current: f64,

    /// Completed charge cycles.
    #[serde(rename = "Charge_Cycles")]
    pub charge_cycles: f64,

    #[serde(rename = "Odometer_km")]
    pub odometer_km: f64,

    /// Mean charging power over the observation window, kW.
    #[serde(rename = "Avg_Charging_Power_kW")]
    pub avg_charging_power_kw: f64,

    /// Fraction of charge sessions that were DC fast charges.
    #[serde(rename = "Fast_Charge_Ratio")]
    pub fast_charge_ratio: f64,
}

impl VehicleData {
    /// Feature vector in [`FEATURE_COLUMNS`] order.
    fn feature_vector(&self) -> [f64; 9] {
        [
            self.state_of_charge,
            self.battery_temperature,
            self.ambient_temperature,
            self.battery_voltage,
            self.battery_current,
            self.charge_cycles,
            self.odometer_km,
            self.avg_charging_power_kw,
            self.fast_charge_ratio,
        ]
    }
}

/// A telemetry snapshot the models cannot score.
#[derive(Error, Debug)]
pub enum PredictionError {
    #[error("{field} must be a finite number")]
    NonFinite { field: &'static str },

    #[error("State_of_Charge must be between 0 and 100, got {0}")]
    SocOutOfRange(f64),

    #[error("Fast_Charge_Ratio must be between 0 and 1, got {0}")]
    FastChargeRatioOutOfRange(f64),

    #[error("{field} must be non-negative, got {value}")]
    NegativeValue { field: &'static str, value: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionStatus {
    Success,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SohStatus {
    Healthy,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MaintenanceUrgency {
    Routine,
    Scheduled,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThermalStatus {
    Normal,
    Danger,
}

/// Scoring result for one vehicle, returned verbatim as the response body.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionReport {
    pub status: PredictionStatus,
    pub vehicle_id: String,
    pub predicted_soh: f64,
    pub soh_status: SohStatus,
    pub predicted_rul_cycles: i64,
    pub maintenance_urgency: MaintenanceUrgency,
    pub thermal_risk: f64,
    pub thermal_status: ThermalStatus,
    pub recommendations: Vec<String>,
}

/// The loaded predictor: feature metadata plus both scoring models.
///
/// Constructed once at startup and read-only afterwards.
pub struct EvMaintenancePredictor {
    feature_columns: Vec<String>,
    soh_model: SohRegressor,
    thermal_model: ThermalRiskScorer,
}

impl EvMaintenancePredictor {
    /// Load the predictor from the configured artifact location.
    pub fn load(config: &ModelConfig) -> Result<Self, ModelLoadError> {
        let (soh_model, thermal_model) = load_models(config.artifact_dir.as_deref())?;

        let predictor = Self {
            feature_columns: FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect(),
            soh_model,
            thermal_model,
        };

        info!(
            features = predictor.feature_columns.len(),
            soh_model = predictor.soh_model.model_name(),
            thermal_model = predictor.thermal_model.model_name(),
            "Predictor ready"
        );

        Ok(predictor)
    }

    /// Ordered feature names the models were trained on.
    pub fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }

    pub fn soh_model(&self) -> &SohRegressor {
        &self.soh_model
    }

    pub fn thermal_model(&self) -> &ThermalRiskScorer {
        &self.thermal_model
    }

    /// Score one vehicle.
    pub fn predict(&self, vehicle: &VehicleData) -> Result<PredictionReport, PredictionError> {
        validate(vehicle)?;

        let features = vehicle.feature_vector();
        let soh = self.soh_model.score(&features);
        let thermal_risk = self.thermal_model.score(&features);

        let rul_cycles = (((soh - SOH_CRITICAL) / SOH_DECAY_PER_CYCLE).max(0.0)).round() as i64;
        let soh_status = classify_soh(soh);
        let thermal_status = classify_thermal(thermal_risk);
        let urgency = classify_urgency(soh_status, rul_cycles, thermal_status);

        debug!(
            vehicle_id = vehicle.vehicle_id,
            soh, thermal_risk, rul_cycles, "Scored vehicle"
        );

        Ok(PredictionReport {
            status: PredictionStatus::Success,
            vehicle_id: vehicle.vehicle_id.clone(),
            predicted_soh: round4(soh),
            soh_status,
            predicted_rul_cycles: rul_cycles,
            maintenance_urgency: urgency,
            thermal_risk: round4(thermal_risk),
            thermal_status,
            recommendations: recommendations(soh_status, rul_cycles, thermal_status),
        })
    }
}

fn validate(vehicle: &VehicleData) -> Result<(), PredictionError> {
    for (field, value) in FEATURE_COLUMNS.into_iter().zip(vehicle.feature_vector()) {
        if !value.is_finite() {
            return Err(PredictionError::NonFinite { field });
        }
    }

    if !(0.0..=100.0).contains(&vehicle.state_of_charge) {
        return Err(PredictionError::SocOutOfRange(vehicle.state_of_charge));
    }
    if !(0.0..=1.0).contains(&vehicle.fast_charge_ratio) {
        return Err(PredictionError::FastChargeRatioOutOfRange(
            vehicle.fast_charge_ratio,
        ));
    }

    for (field, value) in [
        ("Charge_Cycles", vehicle.charge_cycles),
        ("Odometer_km", vehicle.odometer_km),
        ("Avg_Charging_Power_kW", vehicle.avg_charging_power_kw),
    ] {
        if value < 0.0 {
            return Err(PredictionError::NegativeValue { field, value });
        }
    }

    Ok(())
}

fn classify_soh(soh: f64) -> SohStatus {
    if soh < SOH_CRITICAL {
        SohStatus::Critical
    } else if soh < SOH_WARNING {
        SohStatus::Warning
    } else {
        SohStatus::Healthy
    }
}

fn classify_thermal(risk: f64) -> ThermalStatus {
    if risk > THERMAL_DANGER {
        ThermalStatus::Danger
    } else {
        ThermalStatus::Normal
    }
}

fn classify_urgency(
    soh_status: SohStatus,
    rul_cycles: i64,
    thermal_status: ThermalStatus,
) -> MaintenanceUrgency {
    if soh_status == SohStatus::Critical || rul_cycles < RUL_URGENT {
        MaintenanceUrgency::Urgent
    } else if soh_status == SohStatus::Warning || thermal_status == ThermalStatus::Danger {
        MaintenanceUrgency::Scheduled
    } else {
        MaintenanceUrgency::Routine
    }
}

fn recommendations(
    soh_status: SohStatus,
    rul_cycles: i64,
    thermal_status: ThermalStatus,
) -> Vec<String> {
    let mut recs = Vec::new();

    match soh_status {
        SohStatus::Critical => {
            recs.push("Battery SOH below critical threshold; schedule battery replacement.".into())
        }
        SohStatus::Warning => {
            recs.push("Battery degradation detected; monitor SOH trend closely.".into())
        }
        SohStatus::Healthy => {}
    }
    if rul_cycles < RUL_URGENT {
        recs.push(format!(
            "Estimated {rul_cycles} charge cycles remaining; service immediately."
        ));
    }
    if thermal_status == ThermalStatus::Danger {
        recs.push("Thermal risk elevated; inspect cooling system before next fast charge.".into());
    }
    if recs.is_empty() {
        recs.push("No immediate maintenance action required.".into());
    }

    recs
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn predictor() -> EvMaintenancePredictor {
        EvMaintenancePredictor::load(&ModelConfig { artifact_dir: None }).unwrap()
    }

    fn nominal_vehicle() -> VehicleData {
        VehicleData {
            vehicle_id: "EV-1042".to_string(),
            state_of_charge: 68.0,
            battery_temperature: 31.0,
            ambient_temperature: 22.0,
            battery_voltage: 362.0,
            battery_current: -44.0,
            charge_cycles: 420.0,
            odometer_km: 38_500.0,
            avg_charging_power_kw: 7.4,
            fast_charge_ratio: 0.22,
        }
    }

    #[test]
    fn test_predict_nominal_vehicle() {
        let report = predictor().predict(&nominal_vehicle()).unwrap();

        assert_eq!(report.status, PredictionStatus::Success);
        assert_eq!(report.vehicle_id, "EV-1042");
        assert_eq!(report.soh_status, SohStatus::Healthy);
        assert_eq!(report.maintenance_urgency, MaintenanceUrgency::Routine);
        assert_eq!(report.thermal_status, ThermalStatus::Normal);
        assert!(report.predicted_soh > 0.8);
        assert!(report.predicted_rul_cycles > RUL_URGENT);
        assert_eq!(
            report.recommendations,
            vec!["No immediate maintenance action required.".to_string()]
        );
    }

    #[test]
    fn test_predict_worn_battery_flags_maintenance() {
        let mut vehicle = nominal_vehicle();
        vehicle.charge_cycles = 2_400.0;
        vehicle.odometer_km = 210_000.0;

        let report = predictor().predict(&vehicle).unwrap();
        assert_eq!(report.soh_status, SohStatus::Warning);
        assert_eq!(report.maintenance_urgency, MaintenanceUrgency::Scheduled);
        assert!(!report.recommendations.is_empty());
    }

    #[test]
    fn test_predict_overheating_vehicle_is_danger() {
        let mut vehicle = nominal_vehicle();
        vehicle.battery_temperature = 52.0;
        vehicle.battery_current = 180.0;
        vehicle.avg_charging_power_kw = 140.0;
        vehicle.fast_charge_ratio = 0.85;

        let report = predictor().predict(&vehicle).unwrap();
        assert_eq!(report.thermal_status, ThermalStatus::Danger);
        assert!(report.thermal_risk > THERMAL_DANGER);
    }

    #[test]
    fn test_soc_out_of_range_rejected() {
        let mut vehicle = nominal_vehicle();
        vehicle.state_of_charge = 130.0;

        let err = predictor().predict(&vehicle).unwrap_err();
        assert!(err.to_string().contains("State_of_Charge"));
    }

    #[test]
    fn test_negative_cycles_rejected() {
        let mut vehicle = nominal_vehicle();
        vehicle.charge_cycles = -5.0;

        let err = predictor().predict(&vehicle).unwrap_err();
        assert!(matches!(err, PredictionError::NegativeValue { field: "Charge_Cycles", .. }));
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut vehicle = nominal_vehicle();
        vehicle.battery_voltage = f64::NAN;

        let err = predictor().predict(&vehicle).unwrap_err();
        assert!(matches!(err, PredictionError::NonFinite { field: "Battery_Voltage" }));
    }

    #[test]
    fn test_soh_classification_boundaries() {
        assert_eq!(classify_soh(0.59), SohStatus::Critical);
        assert_eq!(classify_soh(0.60), SohStatus::Warning);
        assert_eq!(classify_soh(0.79), SohStatus::Warning);
        assert_eq!(classify_soh(0.80), SohStatus::Healthy);
    }

    #[test]
    fn test_urgency_from_low_rul() {
        let urgency = classify_urgency(SohStatus::Warning, RUL_URGENT - 1, ThermalStatus::Normal);
        assert_eq!(urgency, MaintenanceUrgency::Urgent);
    }

    #[test]
    fn test_thermal_classification_boundary() {
        assert_eq!(classify_thermal(0.70), ThermalStatus::Normal);
        assert_eq!(classify_thermal(0.71), ThermalStatus::Danger);
    }

    #[test]
    fn test_vehicle_data_deserializes_upstream_field_names() {
        let json = serde_json::json!({
            "Vehicle_ID": "EV-7",
            "State_of_Charge": 55.0,
            "Battery_Temperature": 29.5,
            "Ambient_Temperature": 18.0,
            "Battery_Voltage": 358.0,
            "Battery_Current": -12.0,
            "Charge_Cycles": 900,
            "Odometer_km": 74000,
            "Avg_Charging_Power_kW": 11.0,
            "Fast_Charge_Ratio": 0.4
        });

        let vehicle: VehicleData = serde_json::from_value(json).unwrap();
        assert_eq!(vehicle.vehicle_id, "EV-7");
        assert_eq!(vehicle.charge_cycles, 900.0);
    }
}
