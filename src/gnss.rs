//! GNSS reference trajectory.
//!
//! Converts geodetic fixes into a local tangent-plane (East, North, Up)
//! position series with its origin at the first fix, plus course over ground
//! and finite-difference velocity. None of these series are integrated
//! forward; they only anchor the inertial integration.

use geo::{HaversineBearing, HaversineDistance, Point};
use ndarray::{Array1, Array2};

use crate::error::{ensure_increasing, PipelineResult, TrajectoryError};
use crate::types::{TimeSeries3, TimeVector, AXES, COORD_AXES};

const EARTH_RADIUS: f64 = 6_371_000.0; // m
/// Fixes closer than this do not define a direction of travel
const MIN_HEADING_DISTANCE: f64 = 1e-3; // m

/// Equirectangular projection of (lat, lon) in radians around an origin
pub fn latlon_to_meters(lat: f64, lon: f64, origin_lat: f64, origin_lon: f64) -> (f64, f64) {
    let x = EARTH_RADIUS * (lon - origin_lon) * origin_lat.cos();
    let y = EARTH_RADIUS * (lat - origin_lat);
    (x, y)
}

/// Inverse of [`latlon_to_meters`], returns (lat, lon) in radians
pub fn meters_to_latlon(x: f64, y: f64, origin_lat: f64, origin_lon: f64) -> (f64, f64) {
    let lat = origin_lat + y / EARTH_RADIUS;
    let lon = origin_lon + x / (EARTH_RADIUS * origin_lat.cos());
    (lat, lon)
}

fn geo_point(lon: f64, lat: f64) -> Point<f64> {
    Point::new(lon.to_degrees(), lat.to_degrees())
}

/// Local ENU positions and course over ground from a geodetic series
///
/// # Arguments
/// * `coordinates` - 2×N (lon, lat) in radians
/// * `altitudes` - N altitudes in metres
///
/// # Returns
/// 3×N positions relative to the first fix, and N headings in radians
/// clockwise from north, in `[0, 2π)`
pub fn get_positions(
    coordinates: &Array2<f64>,
    altitudes: &Array1<f64>,
) -> PipelineResult<(TimeSeries3, Array1<f64>)> {
    let samples = coordinates.ncols();
    if coordinates.nrows() != COORD_AXES || altitudes.len() != samples {
        return Err(TrajectoryError::InvalidData(format!(
            "coordinates {:?} and altitudes ({}) are not aligned",
            coordinates.dim(),
            altitudes.len()
        )));
    }

    let mut positions = TimeSeries3::zeros((AXES, samples));
    if samples == 0 {
        return Ok((positions, Array1::zeros(0)));
    }

    let (origin_lon, origin_lat, origin_alt) =
        (coordinates[[0, 0]], coordinates[[1, 0]], altitudes[0]);
    for k in 0..samples {
        let (x, y) = latlon_to_meters(coordinates[[1, k]], coordinates[[0, k]], origin_lat, origin_lon);
        positions[[0, k]] = x;
        positions[[1, k]] = y;
        positions[[2, k]] = altitudes[k] - origin_alt;
    }

    Ok((positions, get_headings(coordinates)))
}

/// Course over ground per fix; carried over while the receiver is not moving.
fn get_headings(coordinates: &Array2<f64>) -> Array1<f64> {
    let samples = coordinates.ncols();
    let mut bearings: Vec<Option<f64>> = vec![None; samples];

    for k in 1..samples {
        let from = geo_point(coordinates[[0, k - 1]], coordinates[[1, k - 1]]);
        let to = geo_point(coordinates[[0, k]], coordinates[[1, k]]);
        if from.haversine_distance(&to) > MIN_HEADING_DISTANCE {
            let bearing = from.haversine_bearing(to).to_radians();
            bearings[k] = Some(bearing.rem_euclid(std::f64::consts::TAU));
        }
    }

    let first = bearings.iter().flatten().next().copied().unwrap_or(0.0);
    let mut current = first;
    Array1::from_iter(bearings.into_iter().map(|bearing| {
        if let Some(b) = bearing {
            current = b;
        }
        current
    }))
}

/// Great-circle length of a (lon, lat) track in radians [m]
pub fn track_length(coordinates: &Array2<f64>) -> f64 {
    (1..coordinates.ncols())
        .map(|k| {
            let from = geo_point(coordinates[[0, k - 1]], coordinates[[1, k - 1]]);
            let to = geo_point(coordinates[[0, k]], coordinates[[1, k]]);
            from.haversine_distance(&to)
        })
        .sum()
}

/// Time derivative of every row by finite differences
///
/// Central differences inside, one-sided at both ends, valid on a
/// non-uniform time grid.
pub fn differentiate(times: &TimeVector, series: &Array2<f64>) -> PipelineResult<Array2<f64>> {
    let samples = series.ncols();
    if times.len() != samples {
        return Err(TrajectoryError::InvalidData(format!(
            "time vector has {} samples, series has {}",
            times.len(),
            samples
        )));
    }
    let t = times.to_vec();
    ensure_increasing(&t)?;

    let mut derivative = Array2::zeros(series.raw_dim());
    if samples < 2 {
        return Ok(derivative);
    }
    for row in 0..series.nrows() {
        derivative[[row, 0]] = (series[[row, 1]] - series[[row, 0]]) / (t[1] - t[0]);
        derivative[[row, samples - 1]] = (series[[row, samples - 1]] - series[[row, samples - 2]])
            / (t[samples - 1] - t[samples - 2]);
        for k in 1..samples - 1 {
            derivative[[row, k]] = (series[[row, k + 1]] - series[[row, k - 1]]) / (t[k + 1] - t[k - 1]);
        }
    }
    Ok(derivative)
}

/// Velocities of the GNSS position series
pub fn get_velocities(times: &TimeVector, positions: &TimeSeries3) -> PipelineResult<TimeSeries3> {
    differentiate(times, positions)
}

/// Sparse GNSS fixes on their own time base
#[derive(Clone, Debug)]
pub struct GnssTrack {
    times: Vec<f64>,
    /// 3×M (lon, lat, alt)
    fixes: Array2<f64>,
}

impl GnssTrack {
    pub fn new(times: Vec<f64>, lon: Vec<f64>, lat: Vec<f64>, alt: Vec<f64>) -> PipelineResult<Self> {
        let m = times.len();
        if m == 0 {
            return Err(TrajectoryError::InvalidData("GNSS track has no fixes".to_string()));
        }
        if lon.len() != m || lat.len() != m || alt.len() != m {
            return Err(TrajectoryError::InvalidData(
                "GNSS columns have different lengths".to_string(),
            ));
        }
        ensure_increasing(&times)?;

        let mut fixes = Array2::zeros((3, m));
        for k in 0..m {
            fixes[[0, k]] = lon[k];
            fixes[[1, k]] = lat[k];
            fixes[[2, k]] = alt[k];
        }
        Ok(GnssTrack { times, fixes })
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Interpolate (lon, lat, alt) at each of `times`
    ///
    /// Piecewise quadratic through the three fixes around each query time,
    /// extrapolated beyond both ends of the track.
    pub fn resample(&self, times: &[f64]) -> Array2<f64> {
        let mut resampled = Array2::zeros((3, times.len()));
        for (k, &t) in times.iter().enumerate() {
            for row in 0..3 {
                resampled[[row, k]] = self.interpolate(row, t);
            }
        }
        resampled
    }

    fn interpolate(&self, row: usize, t: f64) -> f64 {
        let m = self.times.len();
        let value = |i: usize| self.fixes[[row, i]];
        match m {
            1 => value(0),
            2 => {
                let (t0, t1) = (self.times[0], self.times[1]);
                value(0) + (value(1) - value(0)) * (t - t0) / (t1 - t0)
            }
            _ => {
                let after = self.times.partition_point(|&x| x <= t);
                let j = after.saturating_sub(1).min(m - 3);
                let (x0, x1, x2) = (self.times[j], self.times[j + 1], self.times[j + 2]);
                let l0 = (t - x1) * (t - x2) / ((x0 - x1) * (x0 - x2));
                let l1 = (t - x0) * (t - x2) / ((x1 - x0) * (x1 - x2));
                let l2 = (t - x0) * (t - x1) / ((x2 - x0) * (x2 - x1));
                l0 * value(j) + l1 * value(j + 1) + l2 * value(j + 2)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    const ORIGIN_LAT: f64 = 44.494887;
    const ORIGIN_LON: f64 = 11.342616;

    fn coordinates_from_meters(points: &[(f64, f64)]) -> Array2<f64> {
        let (lat0, lon0) = (ORIGIN_LAT.to_radians(), ORIGIN_LON.to_radians());
        let mut coordinates = Array2::zeros((2, points.len()));
        for (k, &(x, y)) in points.iter().enumerate() {
            let (lat, lon) = meters_to_latlon(x, y, lat0, lon0);
            coordinates[[0, k]] = lon;
            coordinates[[1, k]] = lat;
        }
        coordinates
    }

    #[test]
    fn test_projection_round_trip() {
        let (lat0, lon0) = (ORIGIN_LAT.to_radians(), ORIGIN_LON.to_radians());
        let (lat, lon) = meters_to_latlon(120.0, -45.0, lat0, lon0);
        let (x, y) = latlon_to_meters(lat, lon, lat0, lon0);
        assert_relative_eq!(x, 120.0, epsilon = 1e-6);
        assert_relative_eq!(y, -45.0, epsilon = 1e-6);
    }

    #[test]
    fn test_positions_relative_to_first_fix() {
        let coordinates = coordinates_from_meters(&[(0.0, 0.0), (10.0, 0.0), (10.0, 5.0)]);
        let altitudes = array![100.0, 101.0, 99.5];
        let (positions, _) = get_positions(&coordinates, &altitudes).unwrap();
        assert_relative_eq!(positions[[0, 0]], 0.0);
        assert_relative_eq!(positions[[0, 1]], 10.0, epsilon = 1e-6);
        assert_relative_eq!(positions[[1, 2]], 5.0, epsilon = 1e-6);
        assert_relative_eq!(positions[[2, 2]], -0.5);
    }

    #[test]
    fn test_headings_follow_direction_of_travel() {
        // Parked, then east, then north
        let coordinates =
            coordinates_from_meters(&[(0.0, 0.0), (0.0, 0.0), (10.0, 0.0), (20.0, 0.0), (20.0, 10.0)]);
        let altitudes = Array1::zeros(5);
        let (_, headings) = get_positions(&coordinates, &altitudes).unwrap();
        let east = std::f64::consts::FRAC_PI_2;
        assert_relative_eq!(headings[0], east, epsilon = 1e-3);
        assert_relative_eq!(headings[1], east, epsilon = 1e-3);
        assert_relative_eq!(headings[3], east, epsilon = 1e-3);
        assert!(headings[4] < 1e-3 || headings[4] > std::f64::consts::TAU - 1e-3);
    }

    #[test]
    fn test_track_length_matches_projection() {
        let coordinates = coordinates_from_meters(&[(0.0, 0.0), (30.0, 0.0), (30.0, 40.0)]);
        assert_relative_eq!(track_length(&coordinates), 70.0, epsilon = 0.05);
    }

    #[test]
    fn test_velocities_of_uniform_motion() {
        let times = array![0.0, 0.5, 1.5, 2.0, 3.0];
        let mut positions = Array2::zeros((3, 5));
        for (k, &t) in times.iter().enumerate() {
            positions[[0, k]] = 4.0 * t;
            positions[[1, k]] = -2.0 * t + 1.0;
        }
        let velocities = get_velocities(&times, &positions).unwrap();
        for k in 0..5 {
            assert_relative_eq!(velocities[[0, k]], 4.0, epsilon = 1e-12);
            assert_relative_eq!(velocities[[1, k]], -2.0, epsilon = 1e-12);
            assert_relative_eq!(velocities[[2, k]], 0.0);
        }
    }

    #[test]
    fn test_differentiate_rejects_unordered_time() {
        let times = array![0.0, 1.0, 0.5];
        let series = Array2::zeros((3, 3));
        assert!(matches!(
            differentiate(&times, &series),
            Err(TrajectoryError::Ordering { index: 2, .. })
        ));
    }

    #[test]
    fn test_resample_reproduces_quadratic_track() {
        let times: Vec<f64> = vec![0.0, 1.0, 2.5, 3.0, 4.0];
        let lon: Vec<f64> = times.iter().map(|t| 0.2 + 0.01 * t * t).collect();
        let lat: Vec<f64> = times.iter().map(|t| 0.7 - 0.002 * t).collect();
        let alt: Vec<f64> = times.iter().map(|t| 50.0 + t).collect();
        let track = GnssTrack::new(times, lon, lat, alt).unwrap();

        let queries = [-0.5, 0.25, 1.7, 3.999, 5.0];
        let resampled = track.resample(&queries);
        for (k, &t) in queries.iter().enumerate() {
            assert_relative_eq!(resampled[[0, k]], 0.2 + 0.01 * t * t, epsilon = 1e-12);
            assert_relative_eq!(resampled[[1, k]], 0.7 - 0.002 * t, epsilon = 1e-12);
            assert_relative_eq!(resampled[[2, k]], 50.0 + t, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_resample_short_tracks() {
        let single = GnssTrack::new(vec![1.0], vec![0.1], vec![0.2], vec![3.0]).unwrap();
        assert_eq!(single.resample(&[0.0, 5.0])[[2, 1]], 3.0);

        let pair = GnssTrack::new(vec![0.0, 2.0], vec![0.0, 2.0], vec![0.0, 0.0], vec![0.0, 4.0]).unwrap();
        let resampled = pair.resample(&[1.0, 3.0]);
        assert_relative_eq!(resampled[[0, 0]], 1.0);
        assert_relative_eq!(resampled[[2, 1]], 6.0);
    }

    #[test]
    fn test_track_rejects_duplicate_timestamps() {
        let result = GnssTrack::new(vec![0.0, 0.0], vec![0.0; 2], vec![0.0; 2], vec![0.0; 2]);
        assert!(matches!(result, Err(TrajectoryError::Ordering { .. })));
    }
}
