//! Rotation conversions: Rodrigues' formula and XYZ Euler decomposition.

use crate::constants::{GIMBAL_LOCK_EPSILON, ROTATION_EPSILON};
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

/// Head orientation in degrees
///
/// Pitch is the rotation about the camera X axis, yaw about Y and roll about Z.
/// No range is guaranteed; noisy input can push values past ±90°.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EulerAngles {
    /// Rotation about X, degrees
    pub pitch: f64,
    /// Rotation about Y, degrees
    pub yaw: f64,
    /// Rotation about Z, degrees
    pub roll: f64,
}

impl EulerAngles {
    /// Create a new angle triple (degrees)
    #[must_use]
    pub const fn new(pitch: f64, yaw: f64, roll: f64) -> Self {
        Self { pitch, yaw, roll }
    }

    /// Angles as `[pitch, yaw, roll]`
    #[must_use]
    pub const fn to_array(self) -> [f64; 3] {
        [self.pitch, self.yaw, self.roll]
    }

    /// True when all three angles are finite numbers
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.pitch.is_finite() && self.yaw.is_finite() && self.roll.is_finite()
    }
}

/// Convert an axis-angle rotation vector to a rotation matrix (Rodrigues)
///
/// Rotations smaller than `1e-10` rad return the exact identity.
#[must_use]
pub fn rotation_vector_to_matrix(rvec: &Vector3<f64>) -> Matrix3<f64> {
    let theta = rvec.norm();
    if theta < ROTATION_EPSILON {
        return Matrix3::identity();
    }

    let k = rvec / theta;
    let (kx, ky, kz) = (k.x, k.y, k.z);
    let (sin, cos) = theta.sin_cos();
    let v = 1.0 - cos;

    Matrix3::new(
        cos + kx * kx * v,      kx * ky * v - kz * sin, kx * kz * v + ky * sin,
        ky * kx * v + kz * sin, cos + ky * ky * v,      ky * kz * v - kx * sin,
        kz * kx * v - ky * sin, kz * ky * v + kx * sin, cos + kz * kz * v,
    )
}

/// Decompose a rotation matrix into pitch/yaw/roll degrees
///
/// Uses the XYZ convention `R = Rz(roll) * Ry(yaw) * Rx(pitch)`. When
/// `sqrt(R00² + R10²)` falls below `1e-6` the matrix is in gimbal lock and roll
/// is defined to be zero.
#[must_use]
pub fn rotation_matrix_to_euler(r: &Matrix3<f64>) -> EulerAngles {
    let sy = r[(0, 0)].hypot(r[(1, 0)]);

    let (pitch, yaw, roll) = if sy > GIMBAL_LOCK_EPSILON {
        (
            r[(2, 1)].atan2(r[(2, 2)]),
            (-r[(2, 0)]).atan2(sy),
            r[(1, 0)].atan2(r[(0, 0)]),
        )
    } else {
        ((-r[(1, 2)]).atan2(r[(1, 1)]), (-r[(2, 0)]).atan2(sy), 0.0)
    };

    EulerAngles::new(pitch.to_degrees(), yaw.to_degrees(), roll.to_degrees())
}

/// Build `Rz(roll) * Ry(yaw) * Rx(pitch)` from angles in degrees
///
/// Inverse of [`rotation_matrix_to_euler`] away from gimbal lock.
#[must_use]
pub fn euler_to_rotation_matrix(angles: &EulerAngles) -> Matrix3<f64> {
    let (sp, cp) = angles.pitch.to_radians().sin_cos();
    let (sy, cy) = angles.yaw.to_radians().sin_cos();
    let (sr, cr) = angles.roll.to_radians().sin_cos();

    let rx = Matrix3::new(1.0, 0.0, 0.0, 0.0, cp, -sp, 0.0, sp, cp);
    let ry = Matrix3::new(cy, 0.0, sy, 0.0, 1.0, 0.0, -sy, 0.0, cy);
    let rz = Matrix3::new(cr, -sr, 0.0, sr, cr, 0.0, 0.0, 0.0, 1.0);

    rz * ry * rx
}
