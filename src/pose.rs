//! Body pose: world position plus Euler orientation in degrees.

use core::f32::consts::PI;

use nalgebra::{UnitQuaternion, Vector3};

// ComplexField provides abs() for f32 in no_std via libm
#[allow(unused_imports)]
use nalgebra::ComplexField;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub(crate) const DEG_TO_RAD: f32 = PI / 180.0;

/// Tolerance, in degrees, for treating an Euler angle as a multiple of 90°.
const AXIS_ALIGNED_EPSILON: f32 = 1e-4;

/// Position and orientation of a body.
///
/// The orientation is stored as Euler angles in degrees and applied Z first,
/// then X, then Y.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pose {
    pub position: Vector3<f32>,
    /// Euler angles in degrees.
    pub orientation: Vector3<f32>,
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Pose {
    /// Pose at the origin with no rotation.
    pub fn identity() -> Self {
        Self {
            position: Vector3::zeros(),
            orientation: Vector3::zeros(),
        }
    }

    pub fn new(position: Vector3<f32>, orientation: Vector3<f32>) -> Self {
        Self { position, orientation }
    }

    /// Pose at `position` with no rotation.
    pub fn from_position(position: Vector3<f32>) -> Self {
        Self {
            position,
            orientation: Vector3::zeros(),
        }
    }

    /// Rotation taking local axes to world axes.
    pub fn rotation(&self) -> UnitQuaternion<f32> {
        let x = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), self.orientation.x * DEG_TO_RAD);
        let y = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), self.orientation.y * DEG_TO_RAD);
        let z = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), self.orientation.z * DEG_TO_RAD);
        y * x * z
    }

    /// World direction of the local +X axis.
    #[inline]
    pub fn right(&self) -> Vector3<f32> {
        self.rotation() * Vector3::x()
    }

    /// World direction of the local +Y axis.
    #[inline]
    pub fn up(&self) -> Vector3<f32> {
        self.rotation() * Vector3::y()
    }

    /// World direction of the local +Z axis.
    #[inline]
    pub fn forward(&self) -> Vector3<f32> {
        self.rotation() * Vector3::z()
    }

    /// `true` when every Euler angle is a multiple of 90°, so the local axes
    /// coincide with world axes (up to sign and permutation).
    pub fn is_axis_aligned(&self) -> bool {
        self.orientation.iter().all(|&angle| {
            let rem = (angle % 90.0).abs();
            rem < AXIS_ALIGNED_EPSILON || 90.0 - rem < AXIS_ALIGNED_EPSILON
        })
    }
}
