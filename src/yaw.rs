//! Heading removal for tilt-only orientation

use nalgebra::UnitQuaternion;

use crate::angle::{CyclicAngle, EulerAngles};
use crate::math::QuaternionExt;

/// Same tilt with the heading zeroed.
///
/// Pitch and roll are copied unchanged and yaw is forced to exactly zero;
/// the quaternion is rebuilt from that triple. Gesture features derived
/// from the result do not depend on which way the user is facing.
///
/// # Example
/// ```
/// use gesture_ahrs::{strip_yaw, CyclicAngle, EulerAngles};
///
/// let full = EulerAngles::new(2.0, 0.1, -0.2);
/// let (euler, _quaternion) = strip_yaw(&full);
///
/// assert_eq!(euler.yaw, CyclicAngle::ZERO);
/// assert_eq!(euler.pitch, full.pitch);
/// assert_eq!(euler.roll, full.roll);
/// ```
pub fn strip_yaw(euler: &EulerAngles) -> (EulerAngles, UnitQuaternion<f32>) {
    let stripped = EulerAngles {
        yaw: CyclicAngle::ZERO,
        pitch: euler.pitch,
        roll: euler.roll,
    };
    (stripped, UnitQuaternion::from_euler(&stripped))
}
