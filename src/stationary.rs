//! Stationary interval detection.
//!
//! Rest periods are the only samples where the true acceleration is gravity
//! and the true angular velocity is zero, so every calibration downstream is
//! anchored on them.

use ndarray::Array1;

use crate::config::CalibrationPolicy;
use crate::error::{PipelineResult, TrajectoryError};
use crate::types::{column, mean_over, StationaryInterval, TimeSeries3};

/// Group samples with `speed < threshold` into intervals of at least
/// `min_samples` consecutive samples.
pub fn get_stationary_times(
    speeds: &Array1<f64>,
    threshold: f64,
    min_samples: usize,
) -> Vec<StationaryInterval> {
    let mut intervals = Vec::new();
    let mut run_start: Option<usize> = None;

    for (k, &speed) in speeds.iter().enumerate() {
        match (speed < threshold, run_start) {
            (true, None) => run_start = Some(k),
            (false, Some(start)) => {
                push_if_long(&mut intervals, start, k, min_samples);
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run_start {
        push_if_long(&mut intervals, start, speeds.len(), min_samples);
    }

    intervals
}

fn push_if_long(
    intervals: &mut Vec<StationaryInterval>,
    start: usize,
    end: usize,
    min_samples: usize,
) {
    if end - start >= min_samples.max(1) {
        intervals.push(StationaryInterval::new(start, end));
    }
}

/// Like [`get_stationary_times`] but fails when the vehicle never rests.
pub fn require_stationary_times(
    speeds: &Array1<f64>,
    threshold: f64,
    min_samples: usize,
) -> PipelineResult<Vec<StationaryInterval>> {
    let intervals = get_stationary_times(speeds, threshold, min_samples);
    if intervals.is_empty() {
        return Err(TrajectoryError::StationaryNotFound {
            speed_threshold: threshold,
            min_samples,
        });
    }

    log::info!(
        "Found {} stationary interval(s), first [{}, {})",
        intervals.len(),
        intervals[0].start,
        intervals[0].end
    );
    if intervals[0].start > 0 {
        log::warn!(
            "Recording does not start at rest; first stationary interval begins at sample {}",
            intervals[0].start
        );
    }
    Ok(intervals)
}

/// Intervals whose samples calibrate bias and gravity under `policy`.
pub fn calibration_intervals(
    intervals: &[StationaryInterval],
    policy: CalibrationPolicy,
) -> &[StationaryInterval] {
    match policy {
        CalibrationPolicy::FirstInterval => &intervals[..intervals.len().min(1)],
        CalibrationPolicy::AllIntervals => intervals,
    }
}

/// Shrink interior interval edges to samples where the smoothed acceleration
/// sits at its rest level, then drop `margin` more samples at each trimmed edge.
///
/// GNSS speed stays below the threshold for a while after the vehicle starts
/// moving, and the moving average spreads the first acceleration `margin`
/// samples back into the rest period. Edges at either end of the recording
/// are kept. The rest level is the mean of the middle half of the interval,
/// which is never removed.
pub fn settle_intervals(
    intervals: &[StationaryInterval],
    accelerations: &TimeSeries3,
    tolerance: f64,
    margin: usize,
) -> Vec<StationaryInterval> {
    let settled: Vec<_> = intervals
        .iter()
        .map(|interval| settle_interval(interval, accelerations, tolerance, margin))
        .collect();
    if let (Some(raw), Some(first)) = (intervals.first(), settled.first()) {
        log::debug!(
            "First stationary interval settled from [{}, {}) to [{}, {})",
            raw.start,
            raw.end,
            first.start,
            first.end
        );
    }
    settled
}

fn settle_interval(
    interval: &StationaryInterval,
    accelerations: &TimeSeries3,
    tolerance: f64,
    margin: usize,
) -> StationaryInterval {
    let StationaryInterval { start, end } = *interval;
    let quarter = interval.len() / 4;
    let core = StationaryInterval::new(start + quarter, end - quarter);
    if core.is_empty() {
        return *interval;
    }

    let view = accelerations.view();
    let rest = mean_over(accelerations, core.range());
    let deviates = |k: usize| (column(&view, k) - rest).norm() > tolerance;

    let mut settled_start = start;
    if start > 0 {
        while settled_start < core.start && deviates(settled_start) {
            settled_start += 1;
        }
        settled_start = (settled_start + margin).min(core.start);
    }

    let mut settled_end = end;
    if end < accelerations.ncols() {
        while settled_end > core.end && deviates(settled_end - 1) {
            settled_end -= 1;
        }
        settled_end = settled_end.saturating_sub(margin).max(core.end);
    }

    StationaryInterval::new(settled_start, settled_end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corrections::gyro_drift::weighted_mean;
    use crate::smoothing::reduce_disturbance;
    use crate::units::STANDARD_GRAVITY;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    fn speeds_with_rest(n: usize, rest: std::ops::Range<usize>) -> Array1<f64> {
        Array1::from_iter((0..n).map(|k| if rest.contains(&k) { 0.0 } else { 5.0 + (k % 3) as f64 }))
    }

    #[test]
    fn test_single_rest_period() {
        let speeds = speeds_with_rest(100, 10..50);
        let intervals = get_stationary_times(&speeds, 0.2, 30);
        assert_eq!(intervals, vec![StationaryInterval::new(10, 50)]);
    }

    #[test]
    fn test_short_dropouts_are_rejected() {
        let mut speeds = speeds_with_rest(100, 10..50);
        speeds[70] = 0.0;
        speeds[71] = 0.0;
        let intervals = get_stationary_times(&speeds, 0.2, 5);
        assert_eq!(intervals, vec![StationaryInterval::new(10, 50)]);
    }

    #[test]
    fn test_interval_reaching_end_of_recording() {
        let speeds = speeds_with_rest(60, 40..60);
        let intervals = get_stationary_times(&speeds, 0.2, 10);
        assert_eq!(intervals, vec![StationaryInterval::new(40, 60)]);
    }

    #[test]
    fn test_multiple_intervals_sorted_and_disjoint() {
        let mut speeds = speeds_with_rest(200, 0..30);
        for k in 120..180 {
            speeds[k] = 0.05;
        }
        let intervals = get_stationary_times(&speeds, 0.2, 10);
        assert_eq!(
            intervals,
            vec![StationaryInterval::new(0, 30), StationaryInterval::new(120, 180)]
        );
        assert!(intervals.windows(2).all(|w| w[0].end <= w[1].start));
    }

    #[test]
    fn test_no_rest_is_an_error() {
        let speeds = Array1::from_elem(50, 3.0);
        let result = require_stationary_times(&speeds, 0.2, 10);
        assert!(matches!(result, Err(TrajectoryError::StationaryNotFound { .. })));
    }

    #[test]
    fn test_settled_interval_excludes_start_of_motion() {
        // Level sensor at rest for 10 s, then 1 m/s² forward, 100 Hz
        let n = 1500;
        let times = Array1::from_iter((0..n).map(|k| k as f64 * 0.01));
        let raw = Array2::from_shape_fn((3, n), |(axis, k)| match axis {
            0 if k >= 1000 => 1.0,
            2 => STANDARD_GRAVITY,
            _ => 0.0,
        });
        let (_, smoothed) = reduce_disturbance(&times, &raw, 20).unwrap();
        // Smoothed sample j is raw sample j + 10
        let speeds = Array1::from_iter(
            (0..smoothed.ncols()).map(|j| ((j + 10) as f64 - 1000.0).max(0.0) * 0.01),
        );
        let intervals = get_stationary_times(&speeds, 0.2, 50);
        assert_eq!(intervals, vec![StationaryInterval::new(0, 1010)]);
        assert!(weighted_mean(&smoothed, &intervals).x > 0.01);

        let settled = settle_intervals(&intervals, &smoothed, 0.05, 10);
        assert_eq!(settled[0].start, 0);
        assert!(settled[0].end <= 980, "end {}", settled[0].end);
        let gravity = weighted_mean(&smoothed, &settled);
        assert!(gravity.x.abs() < 1e-12, "x {}", gravity.x);
        assert_relative_eq!(gravity.z, STANDARD_GRAVITY, epsilon = 1e-9);
    }

    #[test]
    fn test_settling_trims_interior_edges_only() {
        let n = 300;
        let accelerations = Array2::from_shape_fn((3, n), |(axis, k)| match axis {
            0 if !(100..200).contains(&k) => 1.0,
            2 => STANDARD_GRAVITY,
            _ => 0.0,
        });
        let intervals = [StationaryInterval::new(100, 205), StationaryInterval::new(260, 300)];
        let settled = settle_intervals(&intervals, &accelerations, 0.05, 2);
        assert_eq!(settled[0], StationaryInterval::new(102, 198));
        // Recording end is kept, the interior start still loses the margin
        assert_eq!(settled[1], StationaryInterval::new(262, 300));
    }

    #[test]
    fn test_settling_keeps_middle_half() {
        let accelerations = Array2::from_shape_fn((3, 100), |(axis, k)| (axis * k) as f64);
        let intervals = [StationaryInterval::new(20, 60)];
        let settled = settle_intervals(&intervals, &accelerations, 0.01, 5);
        assert_eq!(settled[0], StationaryInterval::new(30, 50));
    }

    #[test]
    fn test_calibration_policy_selection() {
        let intervals = vec![StationaryInterval::new(0, 30), StationaryInterval::new(120, 180)];
        assert_eq!(calibration_intervals(&intervals, CalibrationPolicy::FirstInterval).len(), 1);
        assert_eq!(calibration_intervals(&intervals, CalibrationPolicy::AllIntervals).len(), 2);
        assert!(calibration_intervals(&[], CalibrationPolicy::FirstInterval).is_empty());
    }
}
