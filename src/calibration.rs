//! Persisted gyroscope bias calibration
//!
//! The record is twelve bytes: the x, y and z bias in rad/s as
//! little-endian `f32`.

use std::fs;
use std::path::Path;

use nalgebra::Vector3;
use tracing::{info, warn};

use crate::error::CalibrationError;
use crate::math::Vector3Ext;

/// Size of the persisted record in bytes
pub const RECORD_LEN: usize = 12;

/// Largest plausible bias magnitude per axis, rad/s
pub const MAX_BIAS: f32 = 1.0;

/// Constant gyroscope offset
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use gesture_ahrs::GyroBias;
///
/// let bias = GyroBias::new(Vector3::new(0.01, -0.02, 0.0));
/// let corrected = bias.correct(Vector3::new(0.01, 0.0, 0.5));
/// assert_eq!(corrected, Vector3::new(0.0, 0.02, 0.5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GyroBias {
    bias: Vector3<f32>,
}

impl GyroBias {
    pub fn new(bias: Vector3<f32>) -> Self {
        Self { bias }
    }

    /// Zero bias
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn bias(&self) -> Vector3<f32> {
        self.bias
    }

    /// Apply the correction to a raw reading
    pub fn correct(&self, raw: Vector3<f32>) -> Vector3<f32> {
        raw - self.bias
    }

    /// True when every component is finite and within [`MAX_BIAS`]
    pub fn is_valid(&self) -> bool {
        self.bias.is_finite() && self.bias.iter().all(|c| c.abs() <= MAX_BIAS)
    }

    /// Decode a persisted record
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CalibrationError> {
        let record: &[u8; RECORD_LEN] =
            bytes.try_into().map_err(|_| CalibrationError::SizeMismatch {
                expected: RECORD_LEN,
                actual: bytes.len(),
            })?;

        let component = |i: usize| {
            f32::from_le_bytes([record[i], record[i + 1], record[i + 2], record[i + 3]])
        };
        let bias = Self::new(Vector3::new(component(0), component(4), component(8)));

        if !bias.is_valid() {
            return Err(CalibrationError::InvalidBias {
                x: bias.bias.x,
                y: bias.bias.y,
                z: bias.bias.z,
            });
        }
        Ok(bias)
    }

    /// Encode as a persisted record
    pub fn to_bytes(&self) -> [u8; RECORD_LEN] {
        let mut record = [0u8; RECORD_LEN];
        for (chunk, value) in record.chunks_exact_mut(4).zip(self.bias.iter()) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        record
    }

    /// Read a record from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CalibrationError> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Read a record from disk, falling back to zero bias on any failure
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(bias) => {
                info!(
                    ?path,
                    x = bias.bias.x,
                    y = bias.bias.y,
                    z = bias.bias.z,
                    "Loaded gyroscope calibration"
                );
                bias
            }
            Err(CalibrationError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(?path, "No gyroscope calibration found, using zero bias");
                Self::zero()
            }
            Err(e) => {
                warn!(?path, error = %e, "Discarding gyroscope calibration");
                Self::zero()
            }
        }
    }

    /// Write the record to disk
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CalibrationError> {
        let path = path.as_ref();
        fs::write(path, self.to_bytes())?;
        info!(?path, "Saved gyroscope calibration");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("gesture-ahrs-{}-{name}", std::process::id()))
    }

    #[test]
    fn test_record_layout_is_little_endian_xyz() {
        let bias = GyroBias::new(Vector3::new(1.0, -0.5, 0.25));
        let bytes = bias.to_bytes();

        assert_eq!(&bytes[0..4], &1.0f32.to_le_bytes());
        assert_eq!(&bytes[4..8], &(-0.5f32).to_le_bytes());
        assert_eq!(&bytes[8..12], &0.25f32.to_le_bytes());
    }

    #[test]
    fn test_size_mismatch_is_rejected() {
        let result = GyroBias::from_bytes(&[0u8; 8]);
        assert!(matches!(
            result,
            Err(CalibrationError::SizeMismatch { expected: 12, actual: 8 })
        ));
    }

    #[test]
    fn test_invalid_content_is_rejected() {
        let too_large = GyroBias::new(Vector3::new(0.0, 1.5, 0.0)).to_bytes();
        assert!(matches!(
            GyroBias::from_bytes(&too_large),
            Err(CalibrationError::InvalidBias { .. })
        ));

        let not_a_number = GyroBias::new(Vector3::new(f32::NAN, 0.0, 0.0)).to_bytes();
        assert!(matches!(
            GyroBias::from_bytes(&not_a_number),
            Err(CalibrationError::InvalidBias { .. })
        ));
    }

    #[test]
    fn test_save_then_load() {
        let path = scratch_path("save-load.bin");
        let bias = GyroBias::new(Vector3::new(0.012, -0.003, 0.0071));

        bias.save(&path).unwrap();
        let loaded = GyroBias::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, bias);
    }

    #[test]
    fn test_load_or_default_falls_back() {
        let missing = scratch_path("missing.bin");
        assert_eq!(GyroBias::load_or_default(&missing), GyroBias::zero());

        let truncated = scratch_path("truncated.bin");
        std::fs::write(&truncated, [1u8, 2, 3]).unwrap();
        assert_eq!(GyroBias::load_or_default(&truncated), GyroBias::zero());
        std::fs::remove_file(&truncated).ok();
    }
}
