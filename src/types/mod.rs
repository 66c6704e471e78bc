pub mod linalg;

pub use linalg::*;

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Column layout schemas the recorder produces
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputType {
    Acceleration,
    FullInertial,
    Gnss,
    Gyroscope,
    Inertial,
    /// Interleaved GNSS and inertial records, with coordinates
    UnmodFullInertial,
    /// Interleaved GNSS and inertial records, without coordinates
    UnmodInertial,
    Unrecognized,
}

impl InputType {
    /// Layouts that carry lon/lat/alt columns
    pub fn has_coordinates(&self) -> bool {
        matches!(self, InputType::FullInertial | InputType::UnmodFullInertial)
    }

    /// Layouts whose GNSS and inertial records are on separate rows
    pub fn is_interleaved(&self) -> bool {
        matches!(self, InputType::UnmodFullInertial | InputType::UnmodInertial)
    }
}

/// Aligned arrays extracted from one recording
#[derive(Clone, Debug)]
pub struct InertialLog {
    pub input_type: InputType,
    pub times: TimeVector,
    /// 2×N (lon, lat); degrees as parsed, radians after unit conversion
    pub coordinates: Option<ndarray::Array2<f64>>,
    pub altitudes: Option<Array1<f64>>,
    pub gps_speed: Array1<f64>,
    pub accelerations: TimeSeries3,
    pub angular_velocities: TimeSeries3,
}

impl InertialLog {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// Half-open sample range `[start, end)` where the vehicle is at rest
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationaryInterval {
    pub start: usize,
    pub end: usize,
}

impl StationaryInterval {
    pub fn new(start: usize, end: usize) -> Self {
        StationaryInterval { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Pipeline output
#[derive(Clone, Debug)]
pub struct Trajectory {
    pub input_type: InputType,
    /// 3×N positions [m], x east, y north, z up
    pub positions: TimeSeries3,
    /// Sample times [s], starting at 0
    pub times: TimeVector,
    /// GNSS course over ground [rad], clockwise from north
    pub headings: Array1<f64>,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn duration(&self) -> f64 {
        match (self.times.first(), self.times.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }

    /// Sum of straight-line distances between consecutive positions [m]
    pub fn path_length(&self) -> f64 {
        let view = self.positions.view();
        (1..self.len())
            .map(|k| (column(&view, k) - column(&view, k - 1)).norm())
            .sum()
    }
}
