//! End-to-end trajectory reconstruction.
//!
//! Stages run strictly in order on in-memory arrays and any failure aborts the
//! run. GNSS positions and velocities never get integrated; they only anchor
//! the inertial integration.

use std::path::Path;

use ndarray::Array1;

use crate::config::PipelineConfig;
use crate::corrections::{
    clear_gyro_drift, correct_sign, correct_xy_orientation, correct_z_orientation, remove_gravity,
};
use crate::error::{ensure_increasing, PipelineResult, TrajectoryError};
use crate::frames::{align_to_world, rotate_accelerations};
use crate::gnss::{get_positions, get_velocities, track_length};
use crate::input::parse_input;
use crate::integrate::{integrate_anchored, Anchor, IntegrationMethod};
use crate::smoothing::{reduce_disturbance, trim_edges, trim_edges_1d, MovingAverage};
use crate::stationary::{require_stationary_times, settle_intervals};
use crate::types::{column, norms, InertialLog, TimeSeries3, TimeVector, Trajectory};
use crate::units::convert_measurement_units;

/// Reconstruct the trajectory of the log at `path` with default settings.
pub fn get_trajectory(path: impl AsRef<Path>) -> PipelineResult<Trajectory> {
    get_trajectory_with(path, &PipelineConfig::default())
}

/// Reconstruct the trajectory of the log at `path`.
pub fn get_trajectory_with(path: impl AsRef<Path>, config: &PipelineConfig) -> PipelineResult<Trajectory> {
    let path = path.as_ref();
    log::info!("Reading {}", path.display());
    let log = parse_input(path, &config.accepted_inputs, &config.slice)?;
    process_log(log, config)
}

/// Run every processing stage on an already parsed log.
pub fn process_log(mut log: InertialLog, config: &PipelineConfig) -> PipelineResult<Trajectory> {
    let input_type = log.input_type;
    if log.coordinates.is_none() || log.altitudes.is_none() {
        return Err(TrajectoryError::Format(format!(
            "{:?} logs carry no GNSS coordinates",
            input_type
        )));
    }
    ensure_increasing(&log.times.to_vec())?;

    // ── Units ──
    convert_measurement_units(&mut log, &config.units);
    log::info!("Converted {} samples to SI units", log.len());

    // ── GNSS reference ──
    let (gnss_positions, headings) = gnss_reference(&log)?;

    // ── Disturbance reduction ──
    let (times, accelerations) = reduce_disturbance(&log.times, &log.accelerations, config.window_size)?;
    let (_, angular_velocities) =
        reduce_disturbance(&log.times, &log.angular_velocities, config.window_size)?;
    let half = MovingAverage::new(config.window_size).half_width();
    let gnss_positions = trim_edges(&gnss_positions, half);
    let headings = trim_edges_1d(&headings, half);
    log::info!(
        "Smoothed with a {}-sample window, {} samples remain",
        config.window_size,
        times.len()
    );

    let times = normalize_times(&times);
    let gnss_velocities = get_velocities(&times, &gnss_positions)?;

    // ── Calibration ──
    let intervals = require_stationary_times(
        &norms(&gnss_velocities),
        config.stationary_speed_threshold,
        config.min_stationary_samples,
    )?;
    let intervals = settle_intervals(
        &intervals,
        &accelerations,
        config.rest_acceleration_tolerance,
        half,
    );
    let angular_velocities = clear_gyro_drift(&angular_velocities, &intervals, config.calibration_policy);
    let (accelerations, angular_velocities) =
        correct_z_orientation(&accelerations, &angular_velocities, &intervals, config.calibration_policy)?;
    let accelerations = remove_gravity(&accelerations, &intervals)?;
    let (accelerations, angular_velocities, yaw_offset) = correct_xy_orientation(
        &accelerations,
        &angular_velocities,
        config.straight_yaw_rate_threshold,
        config.min_straight_samples,
    );
    log::info!(
        "Calibrated on {} stationary interval(s), sensor yaw offset {:.1}°",
        intervals.len(),
        yaw_offset.to_degrees()
    );

    // ── Frames ──
    let laboratory = rotate_accelerations(&times, &accelerations, &angular_velocities)?;
    let mut accelerations = align_to_world(
        &times,
        &gnss_positions,
        &gnss_velocities,
        &laboratory,
        &intervals,
        config.alignment_distance,
    )?;
    log::info!("Accelerations expressed in East-North-Up");

    // ── Integration ──
    let mut velocities = integrate_velocity(&times, &accelerations, &gnss_velocities, config)?;
    if correct_sign(
        &mut accelerations,
        &mut velocities,
        &gnss_velocities,
        config.velocity_adjust_frequency,
    ) {
        velocities = integrate_velocity(&times, &accelerations, &gnss_velocities, config)?;
    }
    let positions = integrate_anchored(
        &times,
        &velocities,
        &[0.0; 3],
        config.integration_method,
        Anchor::optional(&gnss_positions, config.position_adjust_frequency),
    )?;
    log::info!(
        "Integrated {} positions with {:?}",
        positions.ncols(),
        config.integration_method
    );

    Ok(Trajectory {
        input_type,
        positions,
        times,
        headings,
    })
}

fn gnss_reference(log: &InertialLog) -> PipelineResult<(TimeSeries3, Array1<f64>)> {
    match (&log.coordinates, &log.altitudes) {
        (Some(coordinates), Some(altitudes)) => {
            log::info!(
                "GNSS track of {} fixes, {:.1} m",
                coordinates.ncols(),
                track_length(coordinates)
            );
            get_positions(coordinates, altitudes)
        }
        _ => Err(TrajectoryError::Format("log carries no GNSS coordinates".to_string())),
    }
}

/// Shift a time vector so its first sample is 0.
pub fn normalize_times(times: &TimeVector) -> TimeVector {
    match times.first() {
        Some(&start) => times.mapv(|t| t - start),
        None => Array1::zeros(0),
    }
}

fn integrate_velocity(
    times: &TimeVector,
    accelerations: &TimeSeries3,
    gnss_velocities: &TimeSeries3,
    config: &PipelineConfig,
) -> PipelineResult<TimeSeries3> {
    let initial = column(&gnss_velocities.view(), 0);
    integrate_anchored(
        times,
        accelerations,
        initial.as_slice(),
        config.integration_method,
        Anchor::optional(gnss_velocities, config.velocity_adjust_frequency),
    )
}

/// Method name as accepted on the command line
pub fn parse_method(name: &str) -> Option<IntegrationMethod> {
    match name.to_ascii_lowercase().as_str() {
        "simpson" | "simps" => Some(IntegrationMethod::Simpson),
        "trapezoid" | "trapz" => Some(IntegrationMethod::Trapezoid),
        "quadrature" | "quad" => Some(IntegrationMethod::Quadrature),
        _ => None,
    }
}
