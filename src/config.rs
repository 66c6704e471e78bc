use serde::{Deserialize, Serialize};

use crate::integrate::IntegrationMethod;
use crate::types::InputType;
use crate::units::MeasurementUnits;

/// Which stationary data calibrates gyro bias and gravity direction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalibrationPolicy {
    /// First stationary interval only
    FirstInterval,
    /// Sample-weighted mean over every stationary interval
    AllIntervals,
}

/// Optional row range applied to the data rows of a log before extraction
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowSlice {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    // ── Input ──
    pub accepted_inputs: Vec<InputType>,
    pub slice: RowSlice,
    pub units: MeasurementUnits,

    // ── Disturbance reduction ──
    pub window_size: usize,

    // ── Stationary detection ──
    pub stationary_speed_threshold: f64,
    pub min_stationary_samples: usize,
    /// Smoothed acceleration deviation from the rest level that ends a
    /// calibration interval [m/s²]
    pub rest_acceleration_tolerance: f64,
    pub calibration_policy: CalibrationPolicy,

    // ── Orientation ──
    pub straight_yaw_rate_threshold: f64,
    pub min_straight_samples: usize,
    pub alignment_distance: f64,

    // ── Integration ──
    pub integration_method: IntegrationMethod,
    pub velocity_adjust_frequency: Option<usize>,
    pub position_adjust_frequency: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            accepted_inputs: vec![InputType::UnmodFullInertial, InputType::FullInertial],
            slice: RowSlice::default(),
            units: MeasurementUnits::default(),
            window_size: 20,
            stationary_speed_threshold: 0.2,
            min_stationary_samples: 50,
            rest_acceleration_tolerance: 0.05,
            calibration_policy: CalibrationPolicy::FirstInterval,
            straight_yaw_rate_threshold: 0.05,
            min_straight_samples: 20,
            alignment_distance: 10.0,
            integration_method: IntegrationMethod::Simpson,
            velocity_adjust_frequency: Some(100),
            position_adjust_frequency: Some(100),
        }
    }
}
