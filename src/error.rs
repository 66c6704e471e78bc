use thiserror::Error;

/// Trajectory pipeline error types
#[derive(Error, Debug)]
pub enum TrajectoryError {
    #[error("Format error: {0}")]
    Format(String),

    #[error("Invalid slice: {0}")]
    Slice(String),

    #[error(
        "No stationary interval found (speed threshold {speed_threshold} m/s, \
         minimum length {min_samples} samples); sensor bias and gravity cannot be calibrated"
    )]
    StationaryNotFound { speed_threshold: f64, min_samples: usize },

    #[error("Time vector is not strictly increasing at sample {index} ({previous} -> {current})")]
    Ordering {
        index: usize,
        previous: f64,
        current: f64,
    },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Insufficient data: {samples} samples, at least {required} required")]
    InsufficientData { samples: usize, required: usize },

    #[error("Vehicle never travels {distance} m after the first stationary interval; cannot align heading")]
    MotionNotFound { distance: f64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, TrajectoryError>;

/// Fails with `Ordering` unless every sample is strictly later than the previous one.
pub fn ensure_increasing(times: &[f64]) -> PipelineResult<()> {
    for (index, pair) in times.windows(2).enumerate() {
        if !(pair[1] > pair[0]) {
            return Err(TrajectoryError::Ordering {
                index: index + 1,
                previous: pair[0],
                current: pair[1],
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increasing_accepts_non_uniform_steps() {
        assert!(ensure_increasing(&[0.0, 0.1, 0.35, 0.4]).is_ok());
        assert!(ensure_increasing(&[]).is_ok());
    }

    #[test]
    fn test_increasing_reports_first_offending_index() {
        match ensure_increasing(&[0.0, 1.0, 1.0, 0.5]) {
            Err(TrajectoryError::Ordering { index, previous, current }) => {
                assert_eq!(index, 2);
                assert_eq!(previous, 1.0);
                assert_eq!(current, 1.0);
            }
            other => panic!("expected ordering error, got {:?}", other),
        }
    }

    #[test]
    fn test_nan_time_is_an_ordering_error() {
        assert!(matches!(
            ensure_increasing(&[0.0, f64::NAN]),
            Err(TrajectoryError::Ordering { index: 1, .. })
        ));
    }
}
