//! Mathematical utilities and nalgebra extensions

use nalgebra::{Quaternion, UnitQuaternion, Vector3};

use crate::angle::EulerAngles;

/// Extension trait for Vector3 operations
pub trait Vector3Ext {
    /// Normalize the vector, returning zero vector if magnitude is zero
    fn safe_normalize(&self) -> Vector3<f32>;

    /// True when every component is finite
    fn is_finite(&self) -> bool;
}

impl Vector3Ext for Vector3<f32> {
    fn safe_normalize(&self) -> Vector3<f32> {
        // Scale by the largest component first so norm() cannot overflow
        let scale = self.amax();
        if scale > 0.0 && scale.is_finite() {
            let scaled = *self / scale;
            scaled / scaled.norm()
        } else {
            Vector3::zeros()
        }
    }

    fn is_finite(&self) -> bool {
        self.iter().all(|c| c.is_finite())
    }
}

/// Extension trait for UnitQuaternion operations
pub trait QuaternionExt {
    /// Decompose into yaw/pitch/roll (Z-Y-X)
    ///
    /// The pitch `asin` argument is clamped to `[-1, 1]` so floating-point
    /// overshoot near ±90° cannot produce NaN.
    fn euler(&self) -> EulerAngles;

    /// Compose a rotation from yaw/pitch/roll (Z-Y-X)
    fn from_euler(euler: &EulerAngles) -> UnitQuaternion<f32>;
}

impl QuaternionExt for UnitQuaternion<f32> {
    fn euler(&self) -> EulerAngles {
        let q = self.as_ref();
        let (q0, q1, q2, q3) = (q.w, q.i, q.j, q.k);

        let yaw = (2.0 * (q0 * q3 + q1 * q2)).atan2(1.0 - 2.0 * (q3 * q3 + q2 * q2));
        let pitch = (2.0 * (q0 * q2 - q1 * q3)).clamp(-1.0, 1.0).asin();
        let roll = (2.0 * (q0 * q1 + q2 * q3)).atan2(1.0 - 2.0 * (q2 * q2 + q1 * q1));

        EulerAngles::new(yaw, pitch, roll)
    }

    fn from_euler(euler: &EulerAngles) -> UnitQuaternion<f32> {
        let (sy, cy) = (euler.yaw.signed() * 0.5).sin_cos();
        let (sp, cp) = (euler.pitch.signed() * 0.5).sin_cos();
        let (sr, cr) = (euler.roll.signed() * 0.5).sin_cos();

        UnitQuaternion::from_quaternion(Quaternion::new(
            cr * cp * cy + sr * sp * sy,
            sr * cp * cy - cr * sp * sy,
            cr * sp * cy + sr * cp * sy,
            cr * cp * sy - sr * sp * cy,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::angle::CyclicAngle;

    #[test]
    fn test_vector_extensions() {
        let v = Vector3::new(3.0f32, 4.0, 0.0);
        let normalized = v.safe_normalize();
        assert!((normalized.norm() - 1.0).abs() < 1e-6);

        assert_eq!(Vector3::<f32>::zeros().safe_normalize(), Vector3::zeros());

        // Norm of this overflows f32 without scaling
        let huge = Vector3::new(3.0e20f32, 0.0, 4.0e20).safe_normalize();
        assert!((huge - Vector3::new(0.6, 0.0, 0.8)).norm() < 1e-6);

        let tiny = Vector3::new(0.0f32, 1.0e-30, 0.0).safe_normalize();
        assert_eq!(tiny, Vector3::new(0.0, 1.0, 0.0));
        assert!(v.is_finite());
        assert!(!Vector3::new(f32::NAN, 0.0, 0.0).is_finite());
        assert!(!Vector3::new(0.0, f32::INFINITY, 0.0).is_finite());
    }

    #[test]
    fn test_quaternion_euler_conversion() {
        let euler = EulerAngles {
            yaw: CyclicAngle::from_degrees(60.0),
            pitch: CyclicAngle::from_degrees(-30.0),
            roll: CyclicAngle::from_degrees(45.0),
        };
        let quat = UnitQuaternion::from_euler(&euler);
        let recovered = quat.euler();

        assert!((recovered.yaw - euler.yaw).abs() < 1e-5);
        assert!((recovered.pitch - euler.pitch).abs() < 1e-5);
        assert!((recovered.roll - euler.roll).abs() < 1e-5);
    }

    #[test]
    fn test_matches_nalgebra_convention() {
        let (roll, pitch, yaw) = (0.3f32, -0.2, 1.1);
        let reference = UnitQuaternion::from_euler_angles(roll, pitch, yaw);
        let euler = reference.euler();

        assert!((euler.yaw - CyclicAngle::new(yaw)).abs() < 1e-5);
        assert!((euler.pitch - CyclicAngle::new(pitch)).abs() < 1e-5);
        assert!((euler.roll - CyclicAngle::new(roll)).abs() < 1e-5);
    }

    #[test]
    fn test_pitch_is_clamped_at_gimbal_lock() {
        // Slightly non-unit storage pushes the asin argument past 1.0
        let q = UnitQuaternion::new_unchecked(Quaternion::new(
            0.7072, 0.0, 0.7072, 0.0,
        ));
        let euler = q.euler();

        assert!(euler.pitch.radians().is_finite());
        assert!((euler.pitch.signed() - core::f32::consts::FRAC_PI_2).abs() < 1e-3);
    }

    #[test]
    fn test_identity_and_negated_identity_are_level() {
        for w in [1.0f32, -1.0] {
            let q = UnitQuaternion::new_unchecked(Quaternion::new(w, 0.0, 0.0, 0.0));
            let euler = q.euler();
            assert_eq!(euler.yaw.radians(), 0.0);
            assert_eq!(euler.pitch.radians(), 0.0);
            assert_eq!(euler.roll.radians(), 0.0);
        }
    }
}
