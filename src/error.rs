//! Error types

use thiserror::Error;

/// Reasons a sample is rejected by [`OrientationFilter::update`](crate::OrientationFilter::update).
///
/// A rejected sample leaves the filter state untouched.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum FilterError {
    /// Accelerometer or gyroscope reading contains NaN or infinity
    #[error("sensor sample contains a non-finite component")]
    NonFiniteSample,

    /// Time step is negative or not finite
    #[error("invalid time step: {0} s")]
    InvalidTimeStep(f32),

    /// Integration collapsed the quaternion to (near) zero length
    #[error("quaternion degenerated during integration (norm {0:e})")]
    DegenerateQuaternion(f32),
}

/// Failures reading or writing the persisted gyroscope bias record
#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("calibration record I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("calibration record has {actual} bytes, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("calibration record holds an invalid bias ({x}, {y}, {z})")]
    InvalidBias { x: f32, y: f32, z: f32 },
}

/// Failures stopping a background task
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task panicked or was aborted: {0}")]
    Join(#[from] tokio::task::JoinError),
}
