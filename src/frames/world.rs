use ndarray::s;

use crate::error::{PipelineResult, TrajectoryError};
use crate::integrate::{integrate, IntegrationMethod};
use crate::types::{rotate_series, Rot3, StationaryInterval, TimeSeries3, TimeVector, Vec3};

/// Samples used to compare GNSS and inertial direction of travel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlignmentWindow {
    pub start: usize,
    /// Inclusive
    pub end: usize,
}

/// First stretch after the first stationary interval over which the GNSS
/// track moves at least `distance` metres horizontally.
pub fn find_alignment_window(
    gnss_positions: &TimeSeries3,
    intervals: &[StationaryInterval],
    distance: f64,
) -> PipelineResult<AlignmentWindow> {
    let samples = gnss_positions.ncols();
    if samples == 0 {
        return Err(TrajectoryError::MotionNotFound { distance });
    }
    let start = intervals.first().map(|i| i.end.min(samples.saturating_sub(1))).unwrap_or(0);
    let (x0, y0) = (gnss_positions[[0, start]], gnss_positions[[1, start]]);

    (start + 1..samples)
        .find(|&k| (gnss_positions[[0, k]] - x0).hypot(gnss_positions[[1, k]] - y0) >= distance)
        .map(|end| AlignmentWindow { start, end })
        .ok_or(TrajectoryError::MotionNotFound { distance })
}

/// Yaw (counter-clockwise from east) of a horizontal displacement
fn displacement_yaw(d: &Vec3) -> f64 {
    d.y.atan2(d.x)
}

/// Rotation about z from the laboratory frame to East-North-Up.
///
/// Over the alignment window, the part of the GNSS displacement caused by
/// acceleration (displacement minus initial velocity × elapsed time) is
/// compared with the double integral of laboratory-frame acceleration from
/// rest. The two differ only by the unknown yaw.
pub fn world_alignment(
    times: &TimeVector,
    gnss_positions: &TimeSeries3,
    gnss_velocities: &TimeSeries3,
    accelerations: &TimeSeries3,
    window: AlignmentWindow,
) -> PipelineResult<Rot3> {
    let AlignmentWindow { start, end } = window;
    let elapsed = times[end] - times[start];

    let gnss = Vec3::new(
        gnss_positions[[0, end]] - gnss_positions[[0, start]] - gnss_velocities[[0, start]] * elapsed,
        gnss_positions[[1, end]] - gnss_positions[[1, start]] - gnss_velocities[[1, start]] * elapsed,
        0.0,
    );

    let window_times = times.slice(s![start..=end]).to_owned();
    let window_acc = accelerations.slice(s![.., start..=end]).to_owned();
    let velocities = integrate(&window_times, &window_acc, &[0.0; 3], IntegrationMethod::Trapezoid)?;
    let positions = integrate(&window_times, &velocities, &[0.0; 3], IntegrationMethod::Trapezoid)?;
    let last = positions.ncols() - 1;
    let inertial = Vec3::new(positions[[0, last]], positions[[1, last]], 0.0);

    if gnss.norm() < 1e-6 || inertial.norm() < 1e-6 {
        return Err(TrajectoryError::InvalidData(format!(
            "no acceleration-driven displacement in samples {}..={}; heading undefined",
            start, end
        )));
    }

    let yaw = displacement_yaw(&gnss) - displacement_yaw(&inertial);
    log::debug!(
        "World alignment over samples {}..={} ({:.1} s): yaw {:.2}°",
        start,
        end,
        elapsed,
        yaw.to_degrees()
    );
    Ok(Rot3::from_axis_angle(&Vec3::z_axis(), yaw))
}

/// Rotate laboratory-frame accelerations so x points east and y north.
pub fn align_to_world(
    times: &TimeVector,
    gnss_positions: &TimeSeries3,
    gnss_velocities: &TimeSeries3,
    accelerations: &TimeSeries3,
    intervals: &[StationaryInterval],
    alignment_distance: f64,
) -> PipelineResult<TimeSeries3> {
    let window = find_alignment_window(gnss_positions, intervals, alignment_distance)?;
    let rotation = world_alignment(times, gnss_positions, gnss_velocities, accelerations, window)?;
    Ok(rotate_series(&rotation, accelerations))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gnss::get_velocities;
    use approx::assert_relative_eq;
    use ndarray::{Array1, Array2};

    /// Rest for 2 s, then 1.5 m/s² along world heading `yaw`.
    fn world_run(yaw: f64) -> (TimeVector, TimeSeries3, TimeSeries3) {
        let times = Array1::from_iter((0..1000).map(|k| k as f64 * 0.01));
        let n = times.len();
        let mut positions = Array2::zeros((3, n));
        let mut accelerations = Array2::zeros((3, n));
        for (k, &t) in times.iter().enumerate() {
            let moving = (t - 2.0).max(0.0);
            let along = 0.75 * moving * moving;
            positions[[0, k]] = along * yaw.cos();
            positions[[1, k]] = along * yaw.sin();
            if t >= 2.0 {
                accelerations[[0, k]] = 1.5 * yaw.cos();
                accelerations[[1, k]] = 1.5 * yaw.sin();
            }
        }
        (times, positions, accelerations)
    }

    #[test]
    fn test_window_starts_after_rest() {
        let (_, positions, _) = world_run(0.3);
        let intervals = [StationaryInterval::new(0, 200)];
        let window = find_alignment_window(&positions, &intervals, 10.0).unwrap();
        assert_eq!(window.start, 200);
        // 0.75 t² = 10 after ~3.65 s of motion
        assert!(window.end > 560 && window.end < 570, "end {}", window.end);
    }

    #[test]
    fn test_rotated_laboratory_frame_is_recovered() {
        let yaw = 1.1;
        let (times, positions, world_acc) = world_run(yaw);
        let velocities = get_velocities(&times, &positions).unwrap();
        // Laboratory frame is yawed 0.8 rad away from the world frame
        let lab_from_world = Rot3::from_axis_angle(&Vec3::z_axis(), -0.8);
        let lab_acc = rotate_series(&lab_from_world, &world_acc);

        let intervals = [StationaryInterval::new(0, 200)];
        let aligned = align_to_world(&times, &positions, &velocities, &lab_acc, &intervals, 10.0).unwrap();
        for k in [250, 600, 999] {
            assert_relative_eq!(aligned[[0, k]], world_acc[[0, k]], epsilon = 1e-3);
            assert_relative_eq!(aligned[[1, k]], world_acc[[1, k]], epsilon = 1e-3);
        }
    }

    #[test]
    fn test_parked_recording_cannot_be_aligned() {
        let positions = Array2::zeros((3, 300));
        let intervals = [StationaryInterval::new(0, 300)];
        assert!(matches!(
            find_alignment_window(&positions, &intervals, 10.0),
            Err(TrajectoryError::MotionNotFound { .. })
        ));
    }
}
