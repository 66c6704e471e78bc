use crate::error::{ensure_increasing, PipelineResult, TrajectoryError};
use crate::types::{column, set_column, Quat, TimeSeries3, TimeVector, Vec3};

/// One gyroscope mechanization step.
///
/// Body rates are applied on the right: `q_next = q * exp(ω·dt)`, with `ω` the
/// midpoint of the two samples bounding the step.
pub fn propagate_orientation(orientation: &Quat, omega_prev: &Vec3, omega_next: &Vec3, dt: f64) -> Quat {
    let omega = 0.5 * (omega_prev + omega_next);
    orientation * Quat::from_scaled_axis(omega * dt)
}

/// Express vehicle-frame accelerations in the fixed laboratory frame.
///
/// The laboratory frame coincides with the vehicle frame at the first sample.
/// Each step's orientation depends on every earlier angular velocity sample,
/// so this is a sequential fold carrying one orientation accumulator.
pub fn rotate_accelerations(
    times: &TimeVector,
    accelerations: &TimeSeries3,
    angular_velocities: &TimeSeries3,
) -> PipelineResult<TimeSeries3> {
    let samples = times.len();
    if accelerations.ncols() != samples || angular_velocities.ncols() != samples {
        return Err(TrajectoryError::InvalidData(format!(
            "rotation inputs are not aligned: {} times, {} accelerations, {} angular velocities",
            samples,
            accelerations.ncols(),
            angular_velocities.ncols()
        )));
    }
    ensure_increasing(&times.to_vec())?;

    let mut lab = TimeSeries3::zeros(accelerations.raw_dim());
    if samples == 0 {
        return Ok(lab);
    }

    let acc = accelerations.view();
    let gyro = angular_velocities.view();
    set_column(&mut lab, 0, &column(&acc, 0));

    let final_orientation = (1..samples).fold(Quat::identity(), |orientation, k| {
        let dt = times[k] - times[k - 1];
        let next = propagate_orientation(&orientation, &column(&gyro, k - 1), &column(&gyro, k), dt);
        set_column(&mut lab, k, &(next * column(&acc, k)));
        next
    });

    log::debug!(
        "Total rotation over recording {:.1}°",
        final_orientation.angle().to_degrees()
    );
    Ok(lab)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{Array1, Array2};

    #[test]
    fn test_no_rotation_keeps_accelerations() {
        let times = Array1::from_iter((0..50).map(|k| k as f64 * 0.02));
        let acc = Array2::from_shape_fn((3, 50), |(axis, k)| (axis * 50 + k) as f64);
        let gyro = Array2::zeros((3, 50));
        let lab = rotate_accelerations(&times, &acc, &gyro).unwrap();
        for (a, b) in lab.iter().zip(acc.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_constant_yaw_rate() {
        // Vehicle turns at 0.5 rad/s with constant forward acceleration
        let rate = 0.5;
        let times = Array1::from_iter((0..=200).map(|k| k as f64 * 0.01));
        let n = times.len();
        let mut acc = Array2::zeros((3, n));
        let mut gyro = Array2::zeros((3, n));
        for k in 0..n {
            acc[[0, k]] = 1.0;
            gyro[[2, k]] = rate;
        }

        let lab = rotate_accelerations(&times, &acc, &gyro).unwrap();
        for k in [0, 50, 200] {
            let heading = rate * times[k];
            assert_relative_eq!(lab[[0, k]], heading.cos(), epsilon = 1e-9);
            assert_relative_eq!(lab[[1, k]], heading.sin(), epsilon = 1e-9);
            assert_relative_eq!(lab[[2, k]], 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_non_uniform_steps_accumulate_angle() {
        let times = Array1::from(vec![0.0, 0.1, 0.4, 0.5, 1.0]);
        let acc = Array2::from_shape_fn((3, 5), |(axis, _)| if axis == 1 { 1.0 } else { 0.0 });
        let gyro = Array2::from_shape_fn((3, 5), |(axis, _)| if axis == 2 { 1.0 } else { 0.0 });
        let lab = rotate_accelerations(&times, &acc, &gyro).unwrap();
        // After 1 s at 1 rad/s, body y points along (-sin 1, cos 1)
        assert_relative_eq!(lab[[0, 4]], -(1.0_f64).sin(), epsilon = 1e-12);
        assert_relative_eq!(lab[[1, 4]], (1.0_f64).cos(), epsilon = 1e-12);
    }

    #[test]
    fn test_unordered_time_is_rejected() {
        let times = Array1::from(vec![0.0, 0.2, 0.1]);
        let series = Array2::zeros((3, 3));
        assert!(matches!(
            rotate_accelerations(&times, &series, &series),
            Err(TrajectoryError::Ordering { .. })
        ));
    }
}
