//! Closed-form starting point for refinement.
//!
//! This is a heuristic, not DLT or POSIT. Its only job is to put the
//! Levenberg-Marquardt loop inside its basin of convergence. Roll cannot be
//! observed by it and always starts at zero.

use super::Pose;
use crate::{
    camera::CameraIntrinsics,
    constants::{INIT_EPSILON, INIT_ROTATION_DAMPING, NUM_POSE_LANDMARKS},
    linalg::solve_linear_system,
    rotation::rotation_vector_to_matrix,
};
use nalgebra::{Matrix3, Point2, Vector3};

/// Estimate a rough pose from the correspondences
#[must_use]
pub fn estimate(
    object_points: &[Vector3<f64>; NUM_POSE_LANDMARKS],
    image_points: &[Point2<f64>; NUM_POSE_LANDMARKS],
    camera: &CameraIntrinsics,
) -> Pose {
    let n = NUM_POSE_LANDMARKS as f64;
    let object_centroid = object_points.iter().sum::<Vector3<f64>>() / n;
    let image_centroid = Point2::from(image_points.iter().map(|p| p.coords).sum::<nalgebra::Vector2<f64>>() / n);

    // Uniform scale from the mean radial spread in the X-Y plane
    let scale3d = object_points
        .iter()
        .map(|p| (p.x - object_centroid.x).hypot(p.y - object_centroid.y))
        .sum::<f64>()
        / n;
    let scale2d = image_points
        .iter()
        .map(|p| (p.x - image_centroid.x).hypot(p.y - image_centroid.y))
        .sum::<f64>()
        / n;
    let tz = camera.fx * scale3d / (scale2d + INIT_EPSILON);

    // Depth-weighted discrepancy between scaled image offsets and object offsets
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut depth_spread = 0.0;
    for (object, image) in object_points.iter().zip(image_points) {
        let offset = object - object_centroid;
        let u = (image.x - image_centroid.x) / camera.fx * tz;
        let v = (image.y - image_centroid.y) / camera.fy * tz;
        sum_y += (u - offset.x) * offset.z;
        sum_x -= (v - offset.y) * offset.z;
        depth_spread += offset.z * offset.z;
    }
    let sum_x = sum_x / (depth_spread + INIT_EPSILON) * tz;
    let sum_y = sum_y / (depth_spread + INIT_EPSILON) * tz;

    let rotation_vector = Vector3::new(
        sum_x.atan2(tz) * INIT_ROTATION_DAMPING,
        sum_y.atan2(tz) * INIT_ROTATION_DAMPING,
        0.0,
    );
    let rotation = rotation_vector_to_matrix(&rotation_vector);

    let back_projected = camera.back_project(&image_centroid, tz) - rotation * object_centroid;
    let translation_vector = least_squares_translation(object_points, image_points, camera, &rotation)
        .filter(|t| t.iter().all(|value| value.is_finite()))
        .unwrap_or(back_projected);

    Pose::new(rotation_vector, translation_vector)
}

/// Translation minimising the linearised reprojection error for a fixed rotation
///
/// Each correspondence gives `t.x - a t.z = a (RX).z - (RX).x` with
/// `a = (u - cx) / fx`, and likewise for `v`. `None` when the 3x3 normal
/// system is singular, e.g. when all image points coincide.
fn least_squares_translation(
    object_points: &[Vector3<f64>; NUM_POSE_LANDMARKS],
    image_points: &[Point2<f64>; NUM_POSE_LANDMARKS],
    camera: &CameraIntrinsics,
    rotation: &Matrix3<f64>,
) -> Option<Vector3<f64>> {
    let mut normal = Matrix3::zeros();
    let mut rhs = Vector3::zeros();

    for (object, image) in object_points.iter().zip(image_points) {
        let rotated = rotation * object;
        let a = (image.x - camera.cx) / camera.fx;
        let b = (image.y - camera.cy) / camera.fy;

        for (row, target) in [
            (Vector3::new(1.0, 0.0, -a), a * rotated.z - rotated.x),
            (Vector3::new(0.0, 1.0, -b), b * rotated.z - rotated.y),
        ] {
            normal += row * row.transpose();
            rhs += row * target;
        }
    }

    solve_linear_system(&normal, &rhs)
}
