//! Anchored numerical integration of vector time series.
//!
//! Integration proceeds step by step on the (possibly non-uniform) time grid.
//! When a reference series is supplied, the running value is overwritten with
//! the reference at every anchor index before integration continues, which
//! bounds the drift that bias residue and noise would otherwise accumulate.

use ndarray::{ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{ensure_increasing, PipelineResult, TrajectoryError};
use crate::types::{TimeSeries3, TimeVector};

/// Quadrature rule used for each integration step
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegrationMethod {
    /// Quadratic through three neighbouring samples, integrated exactly
    Simpson,
    /// Straight line between the two bounding samples
    Trapezoid,
    /// Cubic Hermite segment with finite-difference slopes
    Quadrature,
}

/// Reference series the running integral is snapped to
#[derive(Clone, Copy, Debug)]
pub struct Anchor<'a> {
    /// Same shape and time base as the integrated series
    pub reference: &'a TimeSeries3,
    /// Snap every `frequency` samples, starting at sample 0
    pub frequency: usize,
}

impl<'a> Anchor<'a> {
    pub fn new(reference: &'a TimeSeries3, frequency: usize) -> Self {
        Anchor {
            reference,
            frequency,
        }
    }

    /// Build an anchor only when a frequency is configured
    pub fn optional(reference: &'a TimeSeries3, frequency: Option<usize>) -> Option<Self> {
        frequency.map(|f| Anchor::new(reference, f))
    }

    pub fn is_anchor(&self, k: usize) -> bool {
        is_anchor_index(k, Some(self.frequency))
    }
}

/// Whether sample `k` is snapped under `frequency`
pub fn is_anchor_index(k: usize, frequency: Option<usize>) -> bool {
    match frequency {
        Some(f) if f > 0 => k % f == 0,
        _ => false,
    }
}

/// Integrate `vectors` over `times` starting from `initial`.
pub fn integrate(
    times: &TimeVector,
    vectors: &TimeSeries3,
    initial: &[f64],
    method: IntegrationMethod,
) -> PipelineResult<TimeSeries3> {
    integrate_anchored(times, vectors, initial, method, None)
}

/// Integrate `vectors` over `times`, snapping to `anchor` when given.
///
/// Output has the same shape as `vectors`; column 0 is `initial`, or the
/// reference value when anchoring.
pub fn integrate_anchored(
    times: &TimeVector,
    vectors: &TimeSeries3,
    initial: &[f64],
    method: IntegrationMethod,
    anchor: Option<Anchor<'_>>,
) -> PipelineResult<TimeSeries3> {
    let samples = vectors.ncols();
    let rows = vectors.nrows();
    if times.len() != samples {
        return Err(TrajectoryError::InvalidData(format!(
            "time vector has {} samples, series has {}",
            times.len(),
            samples
        )));
    }
    if initial.len() != rows {
        return Err(TrajectoryError::InvalidData(format!(
            "initial value has {} components, series has {} rows",
            initial.len(),
            rows
        )));
    }
    if let Some(anchor) = &anchor {
        if anchor.frequency == 0 {
            return Err(TrajectoryError::InvalidData(
                "adjust frequency must be positive".to_string(),
            ));
        }
        if anchor.reference.dim() != vectors.dim() {
            return Err(TrajectoryError::InvalidData(format!(
                "reference series shape {:?} does not match integrated series {:?}",
                anchor.reference.dim(),
                vectors.dim()
            )));
        }
    }

    let t = times.to_vec();
    ensure_increasing(&t)?;

    let mut integrated = TimeSeries3::zeros(vectors.raw_dim());
    if samples == 0 {
        return Ok(integrated);
    }

    for (axis, row) in vectors.axis_iter(Axis(0)).enumerate() {
        let increments = step_increments(&t, row, method);
        let mut running = initial[axis];
        for k in 0..samples {
            running += increments[k];
            if let Some(anchor) = &anchor {
                if anchor.is_anchor(k) {
                    running = anchor.reference[[axis, k]];
                }
            }
            integrated[[axis, k]] = running;
        }
    }

    Ok(integrated)
}

/// Simpson's rule integration without anchoring
pub fn simps_integrate(
    times: &TimeVector,
    vectors: &TimeSeries3,
    initial: &[f64],
) -> PipelineResult<TimeSeries3> {
    integrate(times, vectors, initial, IntegrationMethod::Simpson)
}

/// Trapezoidal integration without anchoring
pub fn trapz_integrate(
    times: &TimeVector,
    vectors: &TimeSeries3,
    initial: &[f64],
) -> PipelineResult<TimeSeries3> {
    integrate(times, vectors, initial, IntegrationMethod::Trapezoid)
}

/// Cubic Hermite quadrature without anchoring
pub fn quad_integrate(
    times: &TimeVector,
    vectors: &TimeSeries3,
    initial: &[f64],
) -> PipelineResult<TimeSeries3> {
    integrate(times, vectors, initial, IntegrationMethod::Quadrature)
}

/// Integral of `values` over each step `[t[k-1], t[k]]`; element 0 is zero.
fn step_increments(t: &[f64], values: ArrayView1<f64>, method: IntegrationMethod) -> Vec<f64> {
    let n = t.len();
    let mut increments = vec![0.0; n];
    if n < 2 {
        return increments;
    }

    let f: Vec<f64> = values.iter().copied().collect();
    match method {
        IntegrationMethod::Trapezoid => {
            for k in 1..n {
                increments[k] = 0.5 * (t[k] - t[k - 1]) * (f[k] + f[k - 1]);
            }
        }
        IntegrationMethod::Simpson => {
            if n == 2 {
                increments[1] = 0.5 * (t[1] - t[0]) * (f[0] + f[1]);
                return increments;
            }

            // First step: quadratic through samples 0, 1, 2 over [t0, t1]
            let h1 = t[1] - t[0];
            let h2 = t[2] - t[1];
            increments[1] = h1 * (2.0 * h1 + 3.0 * h2) / (6.0 * (h1 + h2)) * f[0]
                + h1 * (h1 + 3.0 * h2) / (6.0 * h2) * f[1]
                - h1 * h1 * h1 / (6.0 * h2 * (h1 + h2)) * f[2];

            // Later steps: quadratic through k-2, k-1, k over [t(k-1), t(k)]
            for k in 2..n {
                let h1 = t[k - 1] - t[k - 2];
                let h2 = t[k] - t[k - 1];
                increments[k] = -h2 * h2 * h2 / (6.0 * h1 * (h1 + h2)) * f[k - 2]
                    + h2 * (h2 + 3.0 * h1) / (6.0 * h1) * f[k - 1]
                    + h2 * (2.0 * h2 + 3.0 * h1) / (6.0 * (h1 + h2)) * f[k];
            }
        }
        IntegrationMethod::Quadrature => {
            let slopes = finite_difference_slopes(t, &f);
            for k in 1..n {
                let h = t[k] - t[k - 1];
                increments[k] =
                    0.5 * h * (f[k - 1] + f[k]) + h * h / 12.0 * (slopes[k - 1] - slopes[k]);
            }
        }
    }

    increments
}

/// Central differences inside, one-sided at the ends.
fn finite_difference_slopes(t: &[f64], f: &[f64]) -> Vec<f64> {
    let n = t.len();
    let mut slopes = vec![0.0; n];
    if n < 2 {
        return slopes;
    }
    slopes[0] = (f[1] - f[0]) / (t[1] - t[0]);
    slopes[n - 1] = (f[n - 1] - f[n - 2]) / (t[n - 1] - t[n - 2]);
    for k in 1..n - 1 {
        slopes[k] = (f[k + 1] - f[k - 1]) / (t[k + 1] - t[k - 1]);
    }
    slopes
}
