use crate::integrate::is_anchor_index;
use crate::types::TimeSeries3;

/// Correlation of velocity changes between the integrated and reference series
///
/// Steps ending on an anchor index are skipped: there the integrated change is
/// the snap to the reference, not integrated acceleration.
pub fn velocity_correlation(
    integrated: &TimeSeries3,
    reference: &TimeSeries3,
    adjust_frequency: Option<usize>,
) -> f64 {
    let samples = integrated.ncols().min(reference.ncols());
    let axes = integrated.nrows().min(reference.nrows());
    (1..samples)
        .filter(|&k| !is_anchor_index(k, adjust_frequency))
        .map(|k| {
            (0..axes)
                .map(|axis| {
                    (integrated[[axis, k]] - integrated[[axis, k - 1]])
                        * (reference[[axis, k]] - reference[[axis, k - 1]])
                })
                .sum::<f64>()
        })
        .sum()
}

/// True when integration runs against the reference, the 180° heading
/// ambiguity left over by the xy alignment.
pub fn sign_inversion_is_necessary(
    integrated: &TimeSeries3,
    reference: &TimeSeries3,
    adjust_frequency: Option<usize>,
) -> bool {
    velocity_correlation(integrated, reference, adjust_frequency) < 0.0
}

/// Negate `accelerations` and `velocities` in place when they are
/// anti-correlated with `reference`. Returns whether a flip happened.
pub fn correct_sign(
    accelerations: &mut TimeSeries3,
    velocities: &mut TimeSeries3,
    reference: &TimeSeries3,
    adjust_frequency: Option<usize>,
) -> bool {
    if !sign_inversion_is_necessary(velocities, reference, adjust_frequency) {
        return false;
    }
    log::info!("Integrated velocity opposes GNSS velocity; inverting heading");
    accelerations.mapv_inplace(|a| -a);
    velocities.mapv_inplace(|v| -v);
    true
}
