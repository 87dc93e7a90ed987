//! Core types and settings

use core::time::Duration;

use nalgebra::Vector3;

/// Calibrated gravity magnitude in m/s².
///
/// Slightly above the textbook 9.80665 to absorb the accelerometer's
/// static bias on the reference hardware.
pub const GRAVITY: f32 = 9.84;

/// One accelerometer + gyroscope reading
///
/// Acceleration is in m/s², angular rate in rad/s, both in the body frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ImuSample {
    /// Accelerometer reading
    pub accelerometer: Vector3<f32>,
    /// Gyroscope reading
    pub gyroscope: Vector3<f32>,
}

impl ImuSample {
    pub fn new(accelerometer: Vector3<f32>, gyroscope: Vector3<f32>) -> Self {
        Self {
            accelerometer,
            gyroscope,
        }
    }
}

/// Orientation filter settings
///
/// The correction gain is two-phase: `initial_gain` while the filter is
/// younger than `initialisation_period` (fast lock-on from the arbitrary
/// start pose), then `gain` for steady tracking. The switch is a single
/// step, not a ramp.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use gesture_ahrs::FilterSettings;
///
/// let settings = FilterSettings {
///     gain: 0.05,
///     ..Default::default()
/// };
///
/// assert_eq!(settings.gain_at(Duration::from_millis(500)), 10.0);
/// assert_eq!(settings.gain_at(Duration::from_millis(1500)), 0.05);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FilterSettings {
    /// Correction gain (β) during the initialisation period
    pub initial_gain: f32,
    /// Steady-state correction gain (β)
    pub gain: f32,
    /// How long after construction `initial_gain` applies (inclusive)
    pub initialisation_period: Duration,
}

impl FilterSettings {
    /// Correction gain for a filter that has been running for `elapsed`
    pub fn gain_at(&self, elapsed: Duration) -> f32 {
        if elapsed <= self.initialisation_period {
            self.initial_gain
        } else {
            self.gain
        }
    }
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            initial_gain: 10.0,
            gain: 0.07,
            initialisation_period: Duration::from_secs(1),
        }
    }
}

/// Sample scheduler settings
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SchedulerSettings {
    /// Expected sensor period, used as the time step of the very first cycle
    pub nominal_period: Duration,
    /// Emit a debug heartbeat every this many cycles (0 disables it)
    pub heartbeat_cycles: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            nominal_period: Duration::from_millis(1),
            heartbeat_cycles: 1000,
        }
    }
}

/// Gyroscope bias calibration settings
///
/// Timings are measured from the start of the current stationary window;
/// any motion restarts the window.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CalibrationSettings {
    /// Readings before this are ignored while the device settles
    pub settle_time: Duration,
    /// Readings are averaged until this point
    pub collect_until: Duration,
    /// The routine completes once this much stationary time has passed
    pub finish_after: Duration,
    /// Per-axis step between consecutive readings that counts as motion, rad/s
    pub motion_threshold: [f32; 3],
    /// Minimum averaged component worth correcting, rad/s
    pub min_correction: f32,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            settle_time: Duration::from_secs(5),
            collect_until: Duration::from_secs(30),
            finish_after: Duration::from_secs(35),
            motion_threshold: [0.005, 0.005, 0.01],
            min_correction: 0.005,
        }
    }
}

/// Gesture recognizer settings
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GestureSettings {
    /// Fraction of the window that must be new before the model runs again
    pub update_ratio: f32,
    /// Number of recent predictions kept for voting
    pub history_size: usize,
    /// Votes a class needs to be reported
    pub min_consensus_votes: usize,
    /// Capacity of the gesture event channel
    pub event_capacity: usize,
}

impl Default for GestureSettings {
    fn default() -> Self {
        Self {
            update_ratio: 0.1,
            history_size: 5,
            min_consensus_votes: 3,
            event_capacity: 16,
        }
    }
}
