//! Cyclic angles and Euler angle triples

use core::f32::consts::{PI, TAU};
use core::fmt;
use core::ops::{Add, AddAssign, Neg, Sub};

/// An angle in radians kept in the canonical range `[0, 2π)`.
///
/// Addition re-wraps into the canonical range. Subtracting two angles yields
/// the signed shortest-path difference in `[-π, π)`, so crossing the wrap
/// boundary gives a small delta instead of a near-full turn.
///
/// # Example
/// ```
/// use gesture_ahrs::CyclicAngle;
///
/// let a = CyclicAngle::from_degrees(359.0);
/// let b = CyclicAngle::from_degrees(1.0);
///
/// let delta = a - b;
/// assert!((delta.to_degrees() + 2.0).abs() < 1e-3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "f32", into = "f32"))]
pub struct CyclicAngle(f32);

impl CyclicAngle {
    /// The zero angle
    pub const ZERO: Self = Self(0.0);

    /// Wrap an arbitrary angle in radians into `[0, 2π)`
    pub fn new(radians: f32) -> Self {
        Self(wrap(radians))
    }

    /// Wrap an arbitrary angle in degrees into `[0, 2π)`
    pub fn from_degrees(degrees: f32) -> Self {
        Self::new(degrees.to_radians())
    }

    /// Canonical value in `[0, 2π)`
    pub fn radians(self) -> f32 {
        self.0
    }

    /// Canonical value in degrees, `[0, 360)`
    pub fn degrees(self) -> f32 {
        self.0.to_degrees()
    }

    /// Same angle expressed in `[-π, π)`
    pub fn signed(self) -> f32 {
        shortest(self.0)
    }
}

/// Normalize into `[0, 2π)`.
fn wrap(radians: f32) -> f32 {
    let value = radians.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if value >= TAU { 0.0 } else { value }
}

/// Normalize a difference into `[-π, π)`.
fn shortest(mut delta: f32) -> f32 {
    while delta >= PI {
        delta -= TAU;
    }
    while delta < -PI {
        delta += TAU;
    }
    delta
}

impl From<f32> for CyclicAngle {
    fn from(radians: f32) -> Self {
        Self::new(radians)
    }
}

impl From<CyclicAngle> for f32 {
    fn from(angle: CyclicAngle) -> Self {
        angle.0
    }
}

impl Add for CyclicAngle {
    type Output = CyclicAngle;

    fn add(self, rhs: CyclicAngle) -> Self::Output {
        Self::new(self.0 + rhs.0)
    }
}

impl Add<f32> for CyclicAngle {
    type Output = CyclicAngle;

    fn add(self, rhs: f32) -> Self::Output {
        Self::new(self.0 + rhs)
    }
}

impl AddAssign for CyclicAngle {
    fn add_assign(&mut self, rhs: CyclicAngle) {
        *self = *self + rhs;
    }
}

impl AddAssign<f32> for CyclicAngle {
    fn add_assign(&mut self, rhs: f32) {
        *self = *self + rhs;
    }
}

impl Sub for CyclicAngle {
    type Output = f32;

    fn sub(self, rhs: CyclicAngle) -> f32 {
        shortest(self.0 - rhs.0)
    }
}

impl Sub<f32> for CyclicAngle {
    type Output = f32;

    fn sub(self, rhs: f32) -> f32 {
        self - CyclicAngle::new(rhs)
    }
}

impl Neg for CyclicAngle {
    type Output = CyclicAngle;

    fn neg(self) -> Self::Output {
        Self::new(-self.0)
    }
}

impl fmt::Display for CyclicAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+.4}", self.0)
    }
}

/// Yaw, pitch and roll of an orientation, each a [`CyclicAngle`]
///
/// Decomposition follows the aerospace Z-Y-X sequence: yaw about Z, then
/// pitch about Y, then roll about X.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EulerAngles {
    /// Heading about the vertical axis
    pub yaw: CyclicAngle,
    /// Rotation about the lateral axis
    pub pitch: CyclicAngle,
    /// Rotation about the longitudinal axis
    pub roll: CyclicAngle,
}

impl EulerAngles {
    /// Build from raw radians, wrapping each component
    pub fn new(yaw: f32, pitch: f32, roll: f32) -> Self {
        Self {
            yaw: CyclicAngle::new(yaw),
            pitch: CyclicAngle::new(pitch),
            roll: CyclicAngle::new(roll),
        }
    }
}

impl fmt::Display for EulerAngles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[rol={}, pit={}, yaw={}]", self.roll, self.pitch, self.yaw)
    }
}
