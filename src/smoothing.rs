use ndarray::{s, Array1, Array2, Axis};

use crate::error::{PipelineResult, TrajectoryError};
use crate::types::{TimeSeries3, TimeVector};

/// Centered moving-average low-pass filter for raw IMU series
///
/// Edge windows are discarded rather than padded, so the output is shorter
/// than the input by `2 * (window_size / 2)` samples and the time vector is
/// trimmed to match.
pub struct MovingAverage {
    window_size: usize,
    weights: Vec<f64>,
}

impl MovingAverage {
    /// Create a filter averaging over `window_size` samples (typically 20)
    pub fn new(window_size: usize) -> Self {
        MovingAverage {
            window_size,
            weights: Self::compute_weights(window_size),
        }
    }

    /// Samples dropped from each end of the series
    pub fn half_width(&self) -> usize {
        self.window_size / 2
    }

    /// Kernel of total weight 1 centered on the output sample.
    /// Odd windows: `w` equal taps. Even windows: `w + 1` taps with the two
    /// end taps at half weight.
    fn compute_weights(window_size: usize) -> Vec<f64> {
        if window_size <= 1 {
            return vec![1.0];
        }

        let half = window_size / 2;
        let tap = 1.0 / window_size as f64;
        let mut weights = vec![tap; 2 * half + 1];
        if window_size % 2 == 0 {
            weights[0] = 0.5 * tap;
            weights[2 * half] = 0.5 * tap;
        }
        weights
    }

    /// Smooth every axis of `series` and trim `times` to the surviving samples.
    pub fn apply(
        &self,
        times: &TimeVector,
        series: &TimeSeries3,
    ) -> PipelineResult<(TimeVector, TimeSeries3)> {
        let samples = series.ncols();
        if times.len() != samples {
            return Err(TrajectoryError::InvalidData(format!(
                "time vector has {} samples, series has {}",
                times.len(),
                samples
            )));
        }

        let half = self.half_width();
        let required = 2 * half + 1;
        if samples < required {
            return Err(TrajectoryError::InsufficientData { samples, required });
        }

        let out_len = samples - 2 * half;
        let mut smoothed = Array2::<f64>::zeros((series.nrows(), out_len));
        for (axis, row) in series.axis_iter(Axis(0)).enumerate() {
            for i in 0..out_len {
                smoothed[[axis, i]] = self
                    .weights
                    .iter()
                    .zip(row.slice(s![i..i + self.weights.len()]).iter())
                    .map(|(w, v)| w * v)
                    .sum();
            }
        }

        Ok((trim_edges_1d(times, half), smoothed))
    }
}

/// Moving-average `series` over `window_size` samples.
///
/// Returns the trimmed time vector together with the smoothed series.
pub fn reduce_disturbance(
    times: &TimeVector,
    series: &TimeSeries3,
    window_size: usize,
) -> PipelineResult<(TimeVector, TimeSeries3)> {
    MovingAverage::new(window_size).apply(times, series)
}

/// Drop `half` samples from both ends of a multi-row series.
pub fn trim_edges(series: &Array2<f64>, half: usize) -> Array2<f64> {
    let end = series.ncols().saturating_sub(half).max(half);
    series.slice(s![.., half..end]).to_owned()
}

/// Drop `half` samples from both ends of a scalar series.
pub fn trim_edges_1d(series: &Array1<f64>, half: usize) -> Array1<f64> {
    let end = series.len().saturating_sub(half).max(half);
    series.slice(s![half..end]).to_owned()
}
