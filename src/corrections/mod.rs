/// Calibration corrections estimated from stationary data
///
/// Gyro bias removal, sensor-to-vehicle orientation alignment, and the
/// heading sign fix applied after the first integration.

pub mod gyro_drift;
pub mod orientation;
pub mod sign;

pub use gyro_drift::{clear_gyro_drift, estimate_gyro_bias};
pub use orientation::{correct_xy_orientation, correct_z_orientation, remove_gravity};
pub use sign::{correct_sign, sign_inversion_is_necessary};
