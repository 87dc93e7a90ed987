//! Gravity removal from raw accelerometer readings

use nalgebra::{UnitQuaternion, Vector3};

use crate::types::GRAVITY;

/// Removes the static gravity component from body-frame acceleration.
///
/// The raw reading is rotated into the world frame with the current
/// orientation, gravity is subtracted from the world Z axis, and the
/// residual is rotated back into the body frame. The result is invariant to
/// static tilt.
///
/// # Example
/// ```
/// use nalgebra::{UnitQuaternion, Vector3};
/// use gesture_ahrs::GravityCompensator;
///
/// let compensator = GravityCompensator::default();
/// let linear = compensator.remove_gravity(
///     &UnitQuaternion::identity(),
///     &Vector3::new(0.0, 0.0, 9.84),
/// );
/// assert!(linear.norm() < 1e-6);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GravityCompensator {
    gravity: f32,
}

impl GravityCompensator {
    /// Compensator for a specific gravity magnitude in m/s²
    pub fn new(gravity: f32) -> Self {
        Self { gravity }
    }

    /// Gravity-free acceleration in body frame
    ///
    /// # Arguments
    /// * `quaternion` - Orientation, body to world
    /// * `accelerometer` - Raw acceleration in body frame, m/s²
    pub fn remove_gravity(
        &self,
        quaternion: &UnitQuaternion<f32>,
        accelerometer: &Vector3<f32>,
    ) -> Vector3<f32> {
        let mut world = quaternion.transform_vector(accelerometer);
        world.z -= self.gravity;
        quaternion.inverse_transform_vector(&world)
    }

    /// Gravity magnitude being removed
    pub fn gravity(&self) -> f32 {
        self.gravity
    }
}

impl Default for GravityCompensator {
    fn default() -> Self {
        Self::new(GRAVITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_rest_reading_cancels_exactly() {
        let compensator = GravityCompensator::default();
        let result = compensator.remove_gravity(
            &UnitQuaternion::identity(),
            &Vector3::new(0.0, 0.0, GRAVITY),
        );
        assert!(result.norm() < EPSILON);
    }

    #[test]
    fn test_static_tilt_is_removed() {
        let compensator = GravityCompensator::default();
        let q = UnitQuaternion::from_euler_angles(0.4, -0.7, 1.2);

        // What a still sensor reads in this orientation
        let reading = q.inverse_transform_vector(&Vector3::new(0.0, 0.0, GRAVITY));
        let result = compensator.remove_gravity(&q, &reading);

        assert!(result.norm() < 1e-4, "residual {result:?}");
    }

    #[test]
    fn test_linear_motion_is_kept_in_body_frame() {
        let compensator = GravityCompensator::default();
        let q = UnitQuaternion::from_euler_angles(0.0, 0.0, core::f32::consts::FRAC_PI_2);

        let push = Vector3::new(1.5, 0.0, 0.0);
        let reading = push + q.inverse_transform_vector(&Vector3::new(0.0, 0.0, GRAVITY));
        let result = compensator.remove_gravity(&q, &reading);

        assert!((result - push).norm() < 1e-4);
    }

    #[test]
    fn test_negated_quaternion_gives_same_result() {
        let compensator = GravityCompensator::default();
        let q = UnitQuaternion::from_euler_angles(0.2, 0.1, 0.0);
        let negated = UnitQuaternion::new_unchecked(-q.into_inner());
        let reading = Vector3::new(0.3, -1.0, 9.5);

        let a = compensator.remove_gravity(&q, &reading);
        let b = compensator.remove_gravity(&negated, &reading);
        assert!((a - b).norm() < EPSILON);
    }
}
