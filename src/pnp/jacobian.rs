//! Residuals and Jacobian of the pinhole reprojection.
//!
//! Rotation derivatives use the instantaneous-rotation approximation: a small
//! change `δ` of the rotation vector moves the rotated point `R·X` by roughly
//! `δ × R·X`. This is the leading-order term of the exact Rodrigues derivative
//! and is accurate near convergence. Translation derivatives are the identity.

use super::Pose;
use crate::{
    camera::CameraIntrinsics,
    constants::{INIT_EPSILON, NUM_POSE_LANDMARKS, NUM_RESIDUALS},
};
use nalgebra::{Matrix2x3, Matrix2x6, Matrix3, Point2, SMatrix, SVector, Vector2, Vector3};

/// Residual and 2x6 Jacobian block of one correspondence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLinearization {
    /// `projected - observed`, pixels
    pub residual: Vector2<f64>,
    /// d(residual)/d(rx, ry, rz, tx, ty, tz)
    pub jacobian: Matrix2x6<f64>,
}

/// Stacked residuals and Jacobian of all correspondences
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Linearization {
    /// 12 residuals, (u, v) per landmark
    pub residuals: SVector<f64, NUM_RESIDUALS>,
    /// 12x6 Jacobian
    pub jacobian: SMatrix<f64, NUM_RESIDUALS, 6>,
    /// Sum of squared residuals
    pub error: f64,
}

/// Linearize a single correspondence around the current rotation and translation
#[must_use]
pub fn linearize_point(
    rotation: &Matrix3<f64>,
    translation: &Vector3<f64>,
    object_point: &Vector3<f64>,
    observed: &Point2<f64>,
    camera: &CameraIntrinsics,
) -> PointLinearization {
    let rotated = rotation * object_point;
    let p = rotated + translation;

    // Points on the camera plane would divide by zero
    let z = if p.z.abs() < INIT_EPSILON {
        INIT_EPSILON.copysign(p.z)
    } else {
        p.z
    };
    let inv_z = 1.0 / z;

    let residual = Vector2::new(
        camera.fx * p.x * inv_z + camera.cx - observed.x,
        camera.fy * p.y * inv_z + camera.cy - observed.y,
    );

    // d(u, v) / d(Xc, Yc, Zc)
    let d_projection = Matrix2x3::new(
        camera.fx * inv_z, 0.0, -camera.fx * p.x * inv_z * inv_z,
        0.0, camera.fy * inv_z, -camera.fy * p.y * inv_z * inv_z,
    );

    // Columns are e_k × R·X for k = x, y, z
    let d_point_d_rotation = Matrix3::new(
        0.0, rotated.z, -rotated.y,
        -rotated.z, 0.0, rotated.x,
        rotated.y, -rotated.x, 0.0,
    );

    let mut jacobian = Matrix2x6::zeros();
    jacobian
        .fixed_view_mut::<2, 3>(0, 0)
        .copy_from(&(d_projection * d_point_d_rotation));
    jacobian.fixed_view_mut::<2, 3>(0, 3).copy_from(&d_projection);

    PointLinearization { residual, jacobian }
}

/// Linearize all correspondences at `pose`
#[must_use]
pub fn linearize(
    pose: &Pose,
    object_points: &[Vector3<f64>; NUM_POSE_LANDMARKS],
    image_points: &[Point2<f64>; NUM_POSE_LANDMARKS],
    camera: &CameraIntrinsics,
) -> Linearization {
    let rotation = pose.rotation_matrix();
    let mut residuals = SVector::<f64, NUM_RESIDUALS>::zeros();
    let mut jacobian = SMatrix::<f64, NUM_RESIDUALS, 6>::zeros();

    for (i, (object, observed)) in object_points.iter().zip(image_points).enumerate() {
        let block = linearize_point(&rotation, &pose.translation_vector, object, observed, camera);
        residuals.fixed_rows_mut::<2>(2 * i).copy_from(&block.residual);
        jacobian.fixed_rows_mut::<2>(2 * i).copy_from(&block.jacobian);
    }

    Linearization {
        residuals,
        jacobian,
        error: residuals.norm_squared(),
    }
}
