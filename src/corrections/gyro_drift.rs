use crate::config::CalibrationPolicy;
use crate::stationary::calibration_intervals;
use crate::types::{mean_over, StationaryInterval, TimeSeries3, Vec3};

/// Mean angular velocity while the vehicle is at rest.
///
/// The bias of a MEMS gyro wanders with temperature, so on long recordings
/// `FirstInterval` and `AllIntervals` produce visibly different heading drift.
/// `FirstInterval` reproduces what the recorder's own post-processing did.
pub fn estimate_gyro_bias(
    angular_velocities: &TimeSeries3,
    intervals: &[StationaryInterval],
    policy: CalibrationPolicy,
) -> Vec3 {
    weighted_mean(angular_velocities, calibration_intervals(intervals, policy))
}

/// Sample-weighted mean of `series` over every interval.
pub(crate) fn weighted_mean(series: &TimeSeries3, intervals: &[StationaryInterval]) -> Vec3 {
    let total: usize = intervals.iter().map(|i| i.len()).sum();
    if total == 0 {
        return Vec3::zeros();
    }
    intervals
        .iter()
        .fold(Vec3::zeros(), |acc, interval| {
            acc + mean_over(series, interval.range()) * interval.len() as f64
        })
        / total as f64
}

/// Subtract the stationary gyro bias from the whole angular velocity series.
pub fn clear_gyro_drift(
    angular_velocities: &TimeSeries3,
    intervals: &[StationaryInterval],
    policy: CalibrationPolicy,
) -> TimeSeries3 {
    let bias = estimate_gyro_bias(angular_velocities, intervals, policy);
    log::debug!(
        "Gyro bias ({:.5}, {:.5}, {:.5}) rad/s",
        bias.x,
        bias.y,
        bias.z
    );

    let mut corrected = angular_velocities.clone();
    for (axis, mut row) in corrected.outer_iter_mut().enumerate() {
        row -= bias[axis];
    }
    corrected
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    fn gyro_with_bias(n: usize, bias: [f64; 3]) -> TimeSeries3 {
        let mut gyro = Array2::zeros((3, n));
        for k in 0..n {
            for axis in 0..3 {
                // Motion only after sample 40
                let motion = if k >= 40 { 0.3 * ((k + axis) as f64 * 0.1).sin() } else { 0.0 };
                gyro[[axis, k]] = bias[axis] + motion;
            }
        }
        gyro
    }

    #[test]
    fn test_bias_from_first_interval() {
        let gyro = gyro_with_bias(100, [0.01, -0.02, 0.005]);
        let intervals = [StationaryInterval::new(0, 40)];
        let bias = estimate_gyro_bias(&gyro, &intervals, CalibrationPolicy::FirstInterval);
        assert_relative_eq!(bias.x, 0.01, epsilon = 1e-12);
        assert_relative_eq!(bias.y, -0.02, epsilon = 1e-12);
        assert_relative_eq!(bias.z, 0.005, epsilon = 1e-12);
    }

    #[test]
    fn test_cleared_series_is_zero_at_rest() {
        let gyro = gyro_with_bias(100, [0.01, -0.02, 0.005]);
        let intervals = [StationaryInterval::new(0, 40)];
        let corrected = clear_gyro_drift(&gyro, &intervals, CalibrationPolicy::FirstInterval);
        for k in 0..40 {
            for axis in 0..3 {
                assert_relative_eq!(corrected[[axis, k]], 0.0, epsilon = 1e-12);
            }
        }
        assert_relative_eq!(corrected[[0, 60]], gyro[[0, 60]] - 0.01, epsilon = 1e-12);
    }

    #[test]
    fn test_aggregate_policy_weights_by_length() {
        let mut gyro = Array2::zeros((3, 100));
        for k in 0..10 {
            gyro[[2, k]] = 1.0;
        }
        for k in 50..80 {
            gyro[[2, k]] = 3.0;
        }
        let intervals = [StationaryInterval::new(0, 10), StationaryInterval::new(50, 80)];
        let first = estimate_gyro_bias(&gyro, &intervals, CalibrationPolicy::FirstInterval);
        let all = estimate_gyro_bias(&gyro, &intervals, CalibrationPolicy::AllIntervals);
        assert_relative_eq!(first.z, 1.0);
        assert_relative_eq!(all.z, (10.0 * 1.0 + 30.0 * 3.0) / 40.0, epsilon = 1e-12);
    }
}
