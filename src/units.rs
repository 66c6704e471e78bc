//! Raw sensor unit normalisation.
//!
//! Every conversion has an exact inverse so exported values can be mapped back
//! to the recorder's native units.

use serde::{Deserialize, Serialize};

use crate::types::InertialLog;

/// Standard gravity (m/s²)
pub const STANDARD_GRAVITY: f64 = 9.80665;
const KMH_PER_MS: f64 = 3.6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccelUnit {
    StandardGravity,
    MetersPerSecondSquared,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AngularUnit {
    DegreesPerSecond,
    RadiansPerSecond,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeedUnit {
    KilometersPerHour,
    MetersPerSecond,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AngleUnit {
    Degrees,
    Radians,
}

/// Units a log was recorded in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementUnits {
    pub acceleration: AccelUnit,
    pub angular_velocity: AngularUnit,
    pub speed: SpeedUnit,
    pub coordinates: AngleUnit,
}

impl Default for MeasurementUnits {
    /// Native recorder layout: g, deg/s, km/h, degrees
    fn default() -> Self {
        Self {
            acceleration: AccelUnit::StandardGravity,
            angular_velocity: AngularUnit::DegreesPerSecond,
            speed: SpeedUnit::KilometersPerHour,
            coordinates: AngleUnit::Degrees,
        }
    }
}

impl MeasurementUnits {
    pub fn si() -> Self {
        Self {
            acceleration: AccelUnit::MetersPerSecondSquared,
            angular_velocity: AngularUnit::RadiansPerSecond,
            speed: SpeedUnit::MetersPerSecond,
            coordinates: AngleUnit::Radians,
        }
    }
}

pub fn g_to_ms2(value: f64) -> f64 {
    value * STANDARD_GRAVITY
}

pub fn ms2_to_g(value: f64) -> f64 {
    value / STANDARD_GRAVITY
}

pub fn kmh_to_ms(value: f64) -> f64 {
    value / KMH_PER_MS
}

pub fn ms_to_kmh(value: f64) -> f64 {
    value * KMH_PER_MS
}

pub fn deg_to_rad(value: f64) -> f64 {
    value.to_radians()
}

pub fn rad_to_deg(value: f64) -> f64 {
    value.to_degrees()
}

/// Convert every series of `log` from `units` to SI base units in place.
pub fn convert_measurement_units(log: &mut InertialLog, units: &MeasurementUnits) {
    if units.acceleration == AccelUnit::StandardGravity {
        log.accelerations.mapv_inplace(g_to_ms2);
    }
    if units.angular_velocity == AngularUnit::DegreesPerSecond {
        log.angular_velocities.mapv_inplace(deg_to_rad);
    }
    if units.speed == SpeedUnit::KilometersPerHour {
        log.gps_speed.mapv_inplace(kmh_to_ms);
    }
    if units.coordinates == AngleUnit::Degrees {
        if let Some(coordinates) = log.coordinates.as_mut() {
            coordinates.mapv_inplace(deg_to_rad);
        }
    }
}

/// Inverse of [`convert_measurement_units`]: SI back to `units`.
pub fn revert_measurement_units(log: &mut InertialLog, units: &MeasurementUnits) {
    if units.acceleration == AccelUnit::StandardGravity {
        log.accelerations.mapv_inplace(ms2_to_g);
    }
    if units.angular_velocity == AngularUnit::DegreesPerSecond {
        log.angular_velocities.mapv_inplace(rad_to_deg);
    }
    if units.speed == SpeedUnit::KilometersPerHour {
        log.gps_speed.mapv_inplace(ms_to_kmh);
    }
    if units.coordinates == AngleUnit::Degrees {
        if let Some(coordinates) = log.coordinates.as_mut() {
            coordinates.mapv_inplace(rad_to_deg);
        }
    }
}
