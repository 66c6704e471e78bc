/// Reference frame transforms
///
/// Vehicle → laboratory by gyroscope mechanization, then laboratory →
/// East-North-Up by matching the GNSS direction of travel.

pub mod rotator;
pub mod world;

pub use rotator::rotate_accelerations;
pub use world::align_to_world;
