//! Vehicle trajectory reconstruction from IMU + GNSS recorder logs.
//!
//! Raw accelerometer and gyroscope samples are smoothed, calibrated on
//! stationary periods, rotated into East-North-Up and double-integrated, with
//! the running integrals periodically re-anchored to GNSS velocity and
//! position.

pub mod config;
pub mod corrections;
pub mod error;
pub mod export;
pub mod frames;
pub mod gnss;
pub mod input;
pub mod integrate;
pub mod pipeline;
pub mod smoothing;
pub mod stationary;
pub mod types;
pub mod units;

pub use config::{CalibrationPolicy, PipelineConfig, RowSlice};
pub use error::{PipelineResult, TrajectoryError};
pub use export::TrajectoryExport;
pub use input::parse_input;
pub use integrate::IntegrationMethod;
pub use pipeline::{get_trajectory, get_trajectory_with, process_log};
pub use types::{InertialLog, InputType, Trajectory};
