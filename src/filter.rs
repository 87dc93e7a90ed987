//! Madgwick-style orientation filter

use core::time::Duration;

use nalgebra::{Quaternion, UnitQuaternion, Vector3};

use crate::angle::EulerAngles;
use crate::clock::{Clock, MonotonicClock};
use crate::error::FilterError;
use crate::math::{QuaternionExt, Vector3Ext};
use crate::types::FilterSettings;

/// Smallest pre-normalisation norm accepted after integration
const DEGENERATE_NORM: f32 = 1e-12;

/// Gradient-descent orientation filter
///
/// Fuses accelerometer and gyroscope samples into a unit quaternion. The
/// gyroscope is integrated directly; the accelerometer nudges the estimate
/// towards the sensed gravity direction with gain β, which is large for the
/// first second after construction and small afterwards (see
/// [`FilterSettings::gain_at`]).
///
/// The filter owns its state exclusively. It is mutated only by
/// [`update`](Self::update), and a rejected sample leaves it untouched.
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use gesture_ahrs::OrientationFilter;
///
/// let mut filter = OrientationFilter::new();
///
/// let accelerometer = Vector3::new(0.0, 0.0, 9.84); // m/s²
/// let gyroscope = Vector3::new(0.0, 0.0, 0.1);      // rad/s
/// filter.update(accelerometer, gyroscope, 0.001).unwrap();
///
/// let (quaternion, euler) = filter.orientation();
/// assert!((quaternion.as_ref().norm() - 1.0).abs() < 1e-5);
/// println!("{euler}");
/// ```
#[derive(Debug, Clone)]
pub struct OrientationFilter<C = MonotonicClock> {
    settings: FilterSettings,
    clock: C,
    /// Clock reading at construction or last reset; origin of the gain policy
    start: Duration,
    /// Clock reading of the last accepted update
    last_update: Option<Duration>,
    /// Current orientation, body to world
    quaternion: UnitQuaternion<f32>,
    /// Most recent accepted accelerometer sample
    accelerometer: Vector3<f32>,
    /// Most recent accepted gyroscope sample
    gyroscope: Vector3<f32>,
    /// Gain used by the last accepted update
    applied_gain: f32,
}

impl OrientationFilter<MonotonicClock> {
    /// Create a filter with default settings on the wall clock
    pub fn new() -> Self {
        Self::with_settings(FilterSettings::default())
    }

    /// Create a filter with specified settings on the wall clock
    pub fn with_settings(settings: FilterSettings) -> Self {
        Self::with_clock(settings, MonotonicClock::new())
    }
}

impl Default for OrientationFilter<MonotonicClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> OrientationFilter<C> {
    /// Create a filter reading time from `clock`
    ///
    /// The gain policy's origin is the clock reading at this call.
    pub fn with_clock(settings: FilterSettings, clock: C) -> Self {
        let start = clock.now();
        Self {
            settings,
            clock,
            start,
            last_update: None,
            quaternion: initial_quaternion(),
            accelerometer: Vector3::zeros(),
            gyroscope: Vector3::zeros(),
            applied_gain: settings.initial_gain,
        }
    }

    /// Re-seed the orientation and restart the gain policy
    pub fn reset(&mut self) {
        self.start = self.clock.now();
        self.last_update = None;
        self.quaternion = initial_quaternion();
        self.accelerometer = Vector3::zeros();
        self.gyroscope = Vector3::zeros();
        self.applied_gain = self.settings.initial_gain;
    }

    /// Update the estimate with one sample
    ///
    /// # Arguments
    /// * `accelerometer` - Acceleration in any consistent unit (it is normalised)
    /// * `gyroscope` - Angular rate in rad/s
    /// * `delta_time` - Time since the previous sample in seconds
    ///
    /// An all-zero accelerometer skips the gravity correction for this cycle
    /// and integrates the gyroscope alone.
    ///
    /// # Errors
    /// Non-finite samples, a negative or non-finite `delta_time`, or an
    /// integration result that collapses to zero length are rejected; the
    /// state is left as it was.
    pub fn update(
        &mut self,
        accelerometer: Vector3<f32>,
        gyroscope: Vector3<f32>,
        delta_time: f32,
    ) -> Result<(), FilterError> {
        if !accelerometer.is_finite() || !gyroscope.is_finite() {
            return Err(FilterError::NonFiniteSample);
        }
        if !delta_time.is_finite() || delta_time < 0.0 {
            return Err(FilterError::InvalidTimeStep(delta_time));
        }

        let now = self.clock.now();
        let gain = self.settings.gain_at(now.saturating_sub(self.start));
        let q = *self.quaternion.as_ref();

        // Quaternion derivative from gyroscope: dq/dt = 0.5 * q * ω
        let mut rate = q * Quaternion::from_parts(0.0, gyroscope) * 0.5;

        if let Some(step) = gradient_step(&q, &accelerometer) {
            rate = rate - step * gain;
        }

        let integrated = q + rate * delta_time;
        let norm = integrated.norm();
        if !norm.is_finite() || norm < DEGENERATE_NORM {
            return Err(FilterError::DegenerateQuaternion(norm));
        }

        self.quaternion = UnitQuaternion::new_unchecked(integrated / norm);
        self.accelerometer = accelerometer;
        self.gyroscope = gyroscope;
        self.last_update = Some(now);
        self.applied_gain = gain;
        Ok(())
    }

    /// Current orientation quaternion
    pub fn quaternion(&self) -> UnitQuaternion<f32> {
        self.quaternion
    }

    /// Current orientation as Euler angles
    pub fn euler(&self) -> EulerAngles {
        self.quaternion.euler()
    }

    /// Current orientation as both quaternion and Euler angles
    pub fn orientation(&self) -> (UnitQuaternion<f32>, EulerAngles) {
        (self.quaternion, self.euler())
    }

    /// Set orientation quaternion directly
    pub fn set_quaternion(&mut self, quaternion: UnitQuaternion<f32>) {
        self.quaternion = quaternion;
    }

    /// Gain the policy selects right now
    pub fn gain(&self) -> f32 {
        self.settings.gain_at(self.elapsed())
    }

    /// Gain applied by the most recent accepted update
    pub fn applied_gain(&self) -> f32 {
        self.applied_gain
    }

    /// Time since construction or the last reset
    pub fn elapsed(&self) -> Duration {
        self.clock.now().saturating_sub(self.start)
    }

    /// Clock reading of the most recent accepted update
    pub fn last_update(&self) -> Option<Duration> {
        self.last_update
    }

    /// Most recent accepted accelerometer sample
    pub fn accelerometer(&self) -> Vector3<f32> {
        self.accelerometer
    }

    /// Most recent accepted gyroscope sample
    pub fn gyroscope(&self) -> Vector3<f32> {
        self.gyroscope
    }

    pub fn settings(&self) -> FilterSettings {
        self.settings
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}

/// Starting pose `(-1, 0, 0, 0)`
pub(crate) fn initial_quaternion() -> UnitQuaternion<f32> {
    UnitQuaternion::new_unchecked(Quaternion::new(-1.0, 0.0, 0.0, 0.0))
}

/// Normalised gradient of the gravity alignment error
///
/// Returns `None` when there is nothing to correct: an all-zero
/// accelerometer, or an estimate that already matches the sensed gravity
/// exactly (zero gradient).
fn gradient_step(q: &Quaternion<f32>, accelerometer: &Vector3<f32>) -> Option<Quaternion<f32>> {
    let a = accelerometer.safe_normalize();
    if a == Vector3::zeros() {
        return None;
    }

    let (ax, ay, az) = (a.x, a.y, a.z);
    let (q0, q1, q2, q3) = (q.w, q.i, q.j, q.k);

    let two_q0 = 2.0 * q0;
    let two_q1 = 2.0 * q1;
    let two_q2 = 2.0 * q2;
    let two_q3 = 2.0 * q3;
    let four_q0 = 4.0 * q0;
    let four_q1 = 4.0 * q1;
    let four_q2 = 4.0 * q2;
    let eight_q1 = 8.0 * q1;
    let eight_q2 = 8.0 * q2;
    let q0q0 = q0 * q0;
    let q1q1 = q1 * q1;
    let q2q2 = q2 * q2;
    let q3q3 = q3 * q3;

    let s0 = four_q0 * q2q2 + two_q2 * ax + four_q0 * q1q1 - two_q1 * ay;
    let s1 = four_q1 * q3q3 - two_q3 * ax + 4.0 * q0q0 * q1 - two_q0 * ay - four_q1
        + eight_q1 * q1q1
        + eight_q1 * q2q2
        + four_q1 * az;
    let s2 = 4.0 * q0q0 * q2 + two_q0 * ax + four_q2 * q3q3 - two_q3 * ay - four_q2
        + eight_q2 * q1q1
        + eight_q2 * q2q2
        + four_q2 * az;
    let s3 = 4.0 * q1q1 * q3 - two_q1 * ax + 4.0 * q2q2 * q3 - two_q2 * ay;

    let step = Quaternion::new(s0, s1, s2, s3);
    let norm = step.norm();
    if !norm.is_normal() {
        return None;
    }
    Some(step / norm)
}
