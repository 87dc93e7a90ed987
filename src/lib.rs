//! [![license]](https://opensource.org/licenses/MIT)
//!
//! [license]: https://img.shields.io/badge/License-MIT-blue.svg?style=for-the-badge&labelColor=555555
//!
//! Gesture AHRS - orientation estimation and gesture recognition for
//! wearable IMUs
//!
//! The library fuses accelerometer and gyroscope readings with a
//! gradient-descent orientation filter, derives the quantities a gesture
//! classifier needs, and runs the whole chain as tokio tasks paced by the
//! gyroscope sample rate.
//!
//! # Features
//!
//! - Gradient-descent IMU orientation filter with a high start-up gain
//! - Gravity removal and heading-free attitude for motion features
//! - Cyclic angle arithmetic in `[0, 2π)`
//! - Gate-paced filter task that always processes the newest sample
//! - Persistent gyroscope bias and a stationary calibration routine
//! - Windowed gesture recognition with majority voting over any model
//! - Optional `serde` support for the settings types
//!
//! # Quick Start
//!
//! ```rust
//! use nalgebra::Vector3;
//! use gesture_ahrs::OrientationFilter;
//!
//! let mut filter = OrientationFilter::new();
//!
//! // Sensor readings
//! let accelerometer = Vector3::new(0.0, 0.0, 9.84); // m/s²
//! let gyroscope = Vector3::new(0.0, 0.0, 0.1);      // rad/s
//!
//! // Update the filter
//! filter.update(accelerometer, gyroscope, 0.001).unwrap(); // 1ms
//!
//! // Get orientation
//! let quaternion = filter.quaternion();
//! let euler = filter.euler();
//! println!("yaw {} pitch {} roll {}", euler.yaw, euler.pitch, euler.roll);
//! # assert!((quaternion.norm() - 1.0).abs() < 1e-6);
//! ```
//!
//! See [`SampleScheduler`] for running the filter as a background task and
//! [`GestureRecognizer`] for the classifier front-end.

pub mod angle;
pub mod calibration;
pub mod clock;
mod error;
mod estimate;
mod filter;
pub mod gesture;
mod gravity;
mod math;
pub mod offset;
pub mod scheduler;
mod types;
mod yaw;

// Re-export all public types and functions
pub use angle::{CyclicAngle, EulerAngles};
pub use calibration::GyroBias;
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use error::{CalibrationError, FilterError, TaskError};
pub use estimate::{Estimate, OrientationPipeline};
pub use filter::OrientationFilter;
pub use gesture::{FeatureWindow, Gesture, GestureModel, GestureRecognizer, spawn_recognizer};
pub use gravity::GravityCompensator;
pub use math::{QuaternionExt, Vector3Ext};
pub use offset::{BiasCalibrator, CalibrationOutcome, CalibrationStatus};
pub use scheduler::{SampleScheduler, SensorLink, TaskHandle};
pub use types::*;
pub use yaw::strip_yaw;
