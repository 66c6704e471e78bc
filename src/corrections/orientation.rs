//! Sensor-to-vehicle orientation correction.
//!
//! The phone or logger is mounted at an arbitrary attitude. While parked the
//! accelerometer measures gravity alone, which fixes the vertical axis; the
//! dominant horizontal acceleration while driving straight fixes the forward
//! axis up to a half-turn.

use std::f64::consts::PI;

use crate::config::CalibrationPolicy;
use crate::corrections::gyro_drift::weighted_mean;
use crate::error::{PipelineResult, TrajectoryError};
use crate::stationary::calibration_intervals;
use crate::types::{rotate_series, Rot3, StationaryInterval, TimeSeries3, Vec3};

/// Rotation taking the measured gravity direction onto +z.
pub fn z_alignment(gravity: &Vec3) -> PipelineResult<Rot3> {
    if gravity.norm() < 1e-9 {
        return Err(TrajectoryError::InvalidData(
            "stationary acceleration is zero; gravity direction undefined".to_string(),
        ));
    }
    // rotation_between has no unique answer for opposite vectors
    Ok(Rot3::rotation_between(gravity, &Vec3::z())
        .unwrap_or_else(|| Rot3::from_axis_angle(&Vec3::x_axis(), PI)))
}

/// Rotate both series so the stationary acceleration points along +z.
pub fn correct_z_orientation(
    accelerations: &TimeSeries3,
    angular_velocities: &TimeSeries3,
    intervals: &[StationaryInterval],
    policy: CalibrationPolicy,
) -> PipelineResult<(TimeSeries3, TimeSeries3)> {
    let gravity = weighted_mean(accelerations, calibration_intervals(intervals, policy));
    let rotation = z_alignment(&gravity)?;
    log::debug!(
        "Gravity ({:.4}, {:.4}, {:.4}) m/s², z tilt {:.2}°",
        gravity.x,
        gravity.y,
        gravity.z,
        rotation.angle().to_degrees()
    );

    Ok((
        rotate_series(&rotation, accelerations),
        rotate_series(&rotation, angular_velocities),
    ))
}

/// Subtract the mean vertical acceleration of the first stationary interval.
pub fn remove_gravity(
    accelerations: &TimeSeries3,
    intervals: &[StationaryInterval],
) -> PipelineResult<TimeSeries3> {
    let first = intervals.first().ok_or_else(|| {
        TrajectoryError::InvalidData("gravity removal needs a stationary interval".to_string())
    })?;
    let gravity = weighted_mean(accelerations, std::slice::from_ref(first)).z;
    log::debug!("Removing {:.4} m/s² of gravity", gravity);

    let mut corrected = accelerations.clone();
    corrected.row_mut(2).mapv_inplace(|a| a - gravity);
    Ok(corrected)
}

/// Angle of the principal horizontal acceleration axis in the sensor xy plane.
///
/// Only samples with `|yaw rate| < yaw_rate_threshold` count, so centripetal
/// acceleration in turns does not pull the estimate sideways; when fewer than
/// `min_samples` qualify every sample is used.
pub fn estimate_forward_angle(
    accelerations: &TimeSeries3,
    angular_velocities: &TimeSeries3,
    yaw_rate_threshold: f64,
    min_samples: usize,
) -> f64 {
    let samples = accelerations.ncols();
    let straight: Vec<usize> = (0..samples)
        .filter(|&k| angular_velocities[[2, k]].abs() < yaw_rate_threshold)
        .collect();
    let selected: Vec<usize> = if straight.len() >= min_samples {
        straight
    } else {
        log::warn!(
            "Only {} straight-driving samples; using all {} for xy alignment",
            straight.len(),
            samples
        );
        (0..samples).collect()
    };

    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for &k in &selected {
        let (ax, ay) = (accelerations[[0, k]], accelerations[[1, k]]);
        sxx += ax * ax;
        syy += ay * ay;
        sxy += ax * ay;
    }
    if sxx + syy < 1e-12 {
        log::warn!("No horizontal acceleration; skipping xy alignment");
        return 0.0;
    }
    0.5 * (2.0 * sxy).atan2(sxx - syy)
}

/// Rotate both series about z so the forward axis lies along x.
///
/// Returns the corrected series and the removed yaw offset in radians.
pub fn correct_xy_orientation(
    accelerations: &TimeSeries3,
    angular_velocities: &TimeSeries3,
    yaw_rate_threshold: f64,
    min_samples: usize,
) -> (TimeSeries3, TimeSeries3, f64) {
    let angle =
        estimate_forward_angle(accelerations, angular_velocities, yaw_rate_threshold, min_samples);
    log::debug!("Sensor yaw offset {:.2}°", angle.to_degrees());

    let rotation = Rot3::from_axis_angle(&Vec3::z_axis(), -angle);
    (
        rotate_series(&rotation, accelerations),
        rotate_series(&rotation, angular_velocities),
        angle,
    )
}
