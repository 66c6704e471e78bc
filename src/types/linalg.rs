//! Linear algebra type system for the trajectory pipeline
//!
//! Time series are `ndarray` matrices laid out axes × samples. Per-sample
//! vectors and rotations are `nalgebra` fixed-size types.

use nalgebra::{Rotation3, UnitQuaternion, Vector3};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use std::ops::Range;

// ===== Series Dimensions =====
pub const AXES: usize = 3; // (x, y, z)
pub const COORD_AXES: usize = 2; // (lon, lat)

// ===== Series Types =====
/// 3×N series: acceleration, angular velocity, velocity, position
pub type TimeSeries3 = Array2<f64>;
/// 1×N strictly increasing sample times [s]
pub type TimeVector = Array1<f64>;

// ===== Per-sample Types =====
pub type Vec3 = Vector3<f64>;
pub type Rot3 = Rotation3<f64>;
pub type Quat = UnitQuaternion<f64>;

/// Column `k` of a 3×N series as a vector.
pub fn column(series: &ArrayView2<f64>, k: usize) -> Vec3 {
    Vec3::new(series[[0, k]], series[[1, k]], series[[2, k]])
}

/// Overwrite column `k` of a 3×N series.
pub fn set_column(series: &mut TimeSeries3, k: usize, value: &Vec3) {
    for axis in 0..AXES {
        series[[axis, k]] = value[axis];
    }
}

/// Mean vector of the columns in `range`.
pub fn mean_over(series: &TimeSeries3, range: Range<usize>) -> Vec3 {
    let len = range.len().max(1) as f64;
    let view = series.view();
    range.fold(Vec3::zeros(), |acc, k| acc + column(&view, k)) / len
}

/// Apply one rotation to every sample of a 3×N series.
pub fn rotate_series(rotation: &Rot3, series: &TimeSeries3) -> TimeSeries3 {
    let mut rotated = TimeSeries3::zeros(series.raw_dim());
    let view = series.view();
    for k in 0..series.ncols() {
        set_column(&mut rotated, k, &(rotation * column(&view, k)));
    }
    rotated
}

/// Euclidean norm of every sample of a 3×N series.
pub fn norms(series: &TimeSeries3) -> Array1<f64> {
    series.map_axis(Axis(0), |c| c.dot(&c).sqrt())
}
