//! Per-cycle orientation estimate and the synchronous processing pipeline

use nalgebra::{UnitQuaternion, Vector3};

use crate::angle::EulerAngles;
use crate::calibration::GyroBias;
use crate::clock::{Clock, MonotonicClock};
use crate::error::FilterError;
use crate::filter::{OrientationFilter, initial_quaternion};
use crate::gravity::GravityCompensator;
use crate::math::QuaternionExt;
use crate::types::ImuSample;
use crate::yaw::strip_yaw;

/// Everything one filter cycle publishes
///
/// All fields come from the same filter state, so consumers never see a
/// mix of two cycles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    /// Accepted cycle count, starting at 1; 0 means nothing published yet
    pub sequence: u64,
    /// Full orientation, body to world
    pub quaternion: UnitQuaternion<f32>,
    /// Full orientation as Euler angles
    pub euler: EulerAngles,
    /// Body-frame acceleration with gravity removed, m/s²
    pub gravity_free_acceleration: Vector3<f32>,
    /// Orientation with heading zeroed
    pub yaw_free_quaternion: UnitQuaternion<f32>,
    /// Euler angles with heading zeroed
    pub yaw_free_euler: EulerAngles,
    /// Accelerometer reading that produced this estimate, m/s²
    pub accelerometer: Vector3<f32>,
    /// Bias-corrected gyroscope reading that produced this estimate, rad/s
    pub gyroscope: Vector3<f32>,
    /// Time step used for this cycle, seconds
    pub delta_time: f32,
}

/// Filter seed with its derived outputs, before any sample
impl Default for Estimate {
    fn default() -> Self {
        let quaternion = initial_quaternion();
        let euler = quaternion.euler();
        let (yaw_free_euler, yaw_free_quaternion) = strip_yaw(&euler);
        Self {
            sequence: 0,
            quaternion,
            euler,
            gravity_free_acceleration: Vector3::zeros(),
            yaw_free_quaternion,
            yaw_free_euler,
            accelerometer: Vector3::zeros(),
            gyroscope: Vector3::zeros(),
            delta_time: 0.0,
        }
    }
}

/// One filter cycle and its derived outputs, without any threading
///
/// Applies the gyroscope bias, updates the filter, removes gravity and
/// strips yaw. [`SampleScheduler`](crate::SampleScheduler) drives this from
/// the sensor gate; it can also be driven directly for offline replay.
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use gesture_ahrs::{ImuSample, OrientationPipeline};
///
/// let mut pipeline = OrientationPipeline::new();
/// let sample = ImuSample::new(Vector3::new(0.0, 0.0, 9.84), Vector3::zeros());
///
/// let estimate = pipeline.process(sample, 0.001).unwrap();
/// assert_eq!(estimate.sequence, 1);
/// assert!(estimate.gravity_free_acceleration.norm() < 1e-4);
/// ```
#[derive(Debug, Clone)]
pub struct OrientationPipeline<C = MonotonicClock> {
    filter: OrientationFilter<C>,
    compensator: GravityCompensator,
    gyro_bias: GyroBias,
    sequence: u64,
    rejected: u64,
}

impl OrientationPipeline<MonotonicClock> {
    /// Default filter on the wall clock, standard gravity, zero bias
    pub fn new() -> Self {
        Self::with_filter(OrientationFilter::new())
    }
}

impl Default for OrientationPipeline<MonotonicClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> OrientationPipeline<C> {
    pub fn with_filter(filter: OrientationFilter<C>) -> Self {
        Self {
            filter,
            compensator: GravityCompensator::default(),
            gyro_bias: GyroBias::zero(),
            sequence: 0,
            rejected: 0,
        }
    }

    pub fn with_compensator(mut self, compensator: GravityCompensator) -> Self {
        self.compensator = compensator;
        self
    }

    pub fn with_gyro_bias(mut self, gyro_bias: GyroBias) -> Self {
        self.gyro_bias = gyro_bias;
        self
    }

    /// Run one cycle
    ///
    /// # Errors
    /// Returns the filter's rejection reason; nothing is derived and the
    /// sequence number does not advance.
    pub fn process(&mut self, sample: ImuSample, delta_time: f32) -> Result<Estimate, FilterError> {
        let gyroscope = self.gyro_bias.correct(sample.gyroscope);

        if let Err(e) = self.filter.update(sample.accelerometer, gyroscope, delta_time) {
            self.rejected += 1;
            return Err(e);
        }
        self.sequence += 1;

        let (quaternion, euler) = self.filter.orientation();
        let gravity_free_acceleration = self
            .compensator
            .remove_gravity(&quaternion, &sample.accelerometer);
        let (yaw_free_euler, yaw_free_quaternion) = strip_yaw(&euler);

        Ok(Estimate {
            sequence: self.sequence,
            quaternion,
            euler,
            gravity_free_acceleration,
            yaw_free_quaternion,
            yaw_free_euler,
            accelerometer: sample.accelerometer,
            gyroscope,
            delta_time,
        })
    }

    pub fn filter(&self) -> &OrientationFilter<C> {
        &self.filter
    }

    pub fn filter_mut(&mut self) -> &mut OrientationFilter<C> {
        &mut self.filter
    }

    pub fn gyro_bias(&self) -> GyroBias {
        self.gyro_bias
    }

    /// Replace the bias, e.g. after a calibration run
    pub fn set_gyro_bias(&mut self, gyro_bias: GyroBias) {
        self.gyro_bias = gyro_bias;
    }

    /// Number of accepted cycles
    pub fn cycles(&self) -> u64 {
        self.sequence
    }

    /// Number of samples the filter rejected
    pub fn rejected_samples(&self) -> u64 {
        self.rejected
    }
}
