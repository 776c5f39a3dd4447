//! Perspective-n-Point solver specialised for six facial landmarks.
//!
//! The solve runs in two phases:
//! 1. a closed-form heuristic ([`initial_guess`]) that only has to land inside
//!    the basin of convergence,
//! 2. Levenberg-Marquardt refinement ([`refine`]) of the 12 reprojection residuals
//!    over the 6 pose parameters, using the approximate Jacobian of [`jacobian`].
//!
//! The solver is a pure function of its inputs. It never fails: a singular
//! normal system or an exhausted iteration budget still yields the best
//! parameters at hand, and the reason is reported in [`PnpSolution::termination`].

pub mod initial_guess;
pub mod jacobian;
pub mod refine;

use crate::{
    camera::CameraIntrinsics,
    constants::{
        DEFAULT_CLAMPED_STEP_NORM, DEFAULT_DAMPING_DECREASE, DEFAULT_DAMPING_INCREASE, DEFAULT_ERROR_CHANGE_TOLERANCE,
        DEFAULT_ERROR_THRESHOLD, DEFAULT_INITIAL_DAMPING, DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_STEP_NORM,
        NUM_POSE_LANDMARKS,
    },
    rotation::{rotation_matrix_to_euler, rotation_vector_to_matrix, EulerAngles},
};
use nalgebra::{Matrix3, Point2, Vector3, Vector6};
use serde::{Deserialize, Serialize};

/// What to do with an iterate whose error did not improve on the best one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectedStepPolicy {
    /// Raise the damping but keep iterating from the rejected parameters
    #[default]
    Keep,
    /// Restore the best parameters before retrying with the raised damping
    RollBack,
}

/// Levenberg-Marquardt settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverParams {
    /// Residual evaluations allowed before giving up
    pub max_iterations: usize,
    /// Starting damping factor (lambda)
    pub initial_damping: f64,
    /// Lambda multiplier after an improving iterate
    pub damping_decrease: f64,
    /// Lambda multiplier after a non-improving iterate
    pub damping_increase: f64,
    /// Stop when the squared error changes by less than this
    pub error_change_tolerance: f64,
    /// Stop when the squared error (pixels²) drops below this
    pub error_threshold: f64,
    /// Steps longer than this are rescaled
    pub max_step_norm: f64,
    /// Norm of a rescaled step
    pub clamped_step_norm: f64,
    /// Handling of non-improving iterates
    pub rejected_steps: RejectedStepPolicy,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            initial_damping: DEFAULT_INITIAL_DAMPING,
            damping_decrease: DEFAULT_DAMPING_DECREASE,
            damping_increase: DEFAULT_DAMPING_INCREASE,
            error_change_tolerance: DEFAULT_ERROR_CHANGE_TOLERANCE,
            error_threshold: DEFAULT_ERROR_THRESHOLD,
            max_step_norm: DEFAULT_MAX_STEP_NORM,
            clamped_step_norm: DEFAULT_CLAMPED_STEP_NORM,
            rejected_steps: RejectedStepPolicy::Keep,
        }
    }
}

/// Why refinement stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Squared error changed by less than the tolerance
    ErrorConverged,
    /// Squared error fell below the absolute threshold
    BelowThreshold,
    /// The damped normal equations were singular
    SingularSystem,
    /// The iteration budget ran out
    MaxIterations,
}

/// Rotation vector plus translation, the six optimised parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// Axis-angle rotation, radians
    pub rotation_vector: Vector3<f64>,
    /// Camera-frame translation, millimetres
    pub translation_vector: Vector3<f64>,
}

impl Pose {
    /// Create a new pose
    #[must_use]
    pub const fn new(rotation_vector: Vector3<f64>, translation_vector: Vector3<f64>) -> Self {
        Self {
            rotation_vector,
            translation_vector,
        }
    }

    /// Rotation matrix of this pose
    #[must_use]
    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        rotation_vector_to_matrix(&self.rotation_vector)
    }

    /// Apply an LM step; the residual is `estimate - observed`, so the step is subtracted
    #[must_use]
    pub(crate) fn stepped(&self, delta: &Vector6<f64>) -> Self {
        Self::new(
            self.rotation_vector - delta.fixed_rows::<3>(0),
            self.translation_vector - delta.fixed_rows::<3>(3),
        )
    }

    /// Transform an object point into the camera frame
    #[must_use]
    pub fn transform(&self, point: &Vector3<f64>) -> Vector3<f64> {
        self.rotation_matrix() * point + self.translation_vector
    }
}

/// Result of a PnP solve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PnpSolution {
    /// Axis-angle rotation, radians
    pub rotation_vector: Vector3<f64>,
    /// Camera-frame translation of the model origin, millimetres
    pub translation_vector: Vector3<f64>,
    /// Sum of squared reprojection residuals at the returned pose
    pub final_error: f64,
    /// Residual evaluations performed
    pub iterations: usize,
    /// Why refinement stopped
    pub termination: Termination,
}

impl PnpSolution {
    /// Rotation and translation as a [`Pose`]
    #[must_use]
    pub const fn pose(&self) -> Pose {
        Pose::new(self.rotation_vector, self.translation_vector)
    }

    /// Rotation matrix (Rodrigues of the rotation vector)
    #[must_use]
    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        rotation_vector_to_matrix(&self.rotation_vector)
    }

    /// Pitch/yaw/roll of the solved rotation
    #[must_use]
    pub fn euler_angles(&self) -> EulerAngles {
        rotation_matrix_to_euler(&self.rotation_matrix())
    }
}

/// Solve for the pose with the default solver settings
#[must_use]
pub fn solve(
    object_points: &[Vector3<f64>; NUM_POSE_LANDMARKS],
    image_points: &[Point2<f64>; NUM_POSE_LANDMARKS],
    camera: &CameraIntrinsics,
) -> PnpSolution {
    solve_with_params(object_points, image_points, camera, &SolverParams::default())
}

/// Solve for the pose
///
/// The optimisation runs on object points re-centred on their centroid so that
/// rotation updates do not drag the translation along; the translation is mapped
/// back to the model origin before returning.
#[must_use]
pub fn solve_with_params(
    object_points: &[Vector3<f64>; NUM_POSE_LANDMARKS],
    image_points: &[Point2<f64>; NUM_POSE_LANDMARKS],
    camera: &CameraIntrinsics,
    params: &SolverParams,
) -> PnpSolution {
    let centroid = object_points.iter().sum::<Vector3<f64>>() / NUM_POSE_LANDMARKS as f64;
    let centered = (*object_points).map(|point| point - centroid);

    let guess = initial_guess::estimate(&centered, image_points, camera);
    log::debug!(
        "PnP initial guess: rvec={:?}, tvec={:?}",
        guess.rotation_vector.as_slice(),
        guess.translation_vector.as_slice()
    );

    let refined = refine::levenberg_marquardt(&centered, image_points, camera, guess, params);
    log::debug!(
        "PnP refinement stopped ({:?}) after {} iterations, error {:.6}",
        refined.termination,
        refined.iterations,
        refined.final_error
    );

    let rotation = refined.pose.rotation_matrix();
    PnpSolution {
        rotation_vector: refined.pose.rotation_vector,
        translation_vector: refined.pose.translation_vector - rotation * centroid,
        final_error: refined.final_error,
        iterations: refined.iterations,
        termination: refined.termination,
    }
}

/// Project object points through a pose and camera
#[must_use]
pub fn project_points(
    object_points: &[Vector3<f64>; NUM_POSE_LANDMARKS],
    pose: &Pose,
    camera: &CameraIntrinsics,
) -> [Point2<f64>; NUM_POSE_LANDMARKS] {
    let rotation = pose.rotation_matrix();
    (*object_points).map(|point| camera.project(&(rotation * point + pose.translation_vector)))
}

/// Sum of squared pixel residuals of a pose
#[must_use]
pub fn reprojection_error(
    object_points: &[Vector3<f64>; NUM_POSE_LANDMARKS],
    image_points: &[Point2<f64>; NUM_POSE_LANDMARKS],
    pose: &Pose,
    camera: &CameraIntrinsics,
) -> f64 {
    project_points(object_points, pose, camera)
        .iter()
        .zip(image_points)
        .map(|(projected, observed)| (projected - observed).norm_squared())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face_model::model_points;
    use approx::assert_abs_diff_eq;

    fn synthetic(pose: &Pose) -> [Point2<f64>; NUM_POSE_LANDMARKS] {
        project_points(&model_points(), pose, &CameraIntrinsics::default())
    }

    #[test]
    fn test_default_params() {
        let params = SolverParams::default();
        assert_eq!(params.max_iterations, 30);
        assert_eq!(params.error_change_tolerance, 1e-8);
        assert_eq!(params.error_threshold, 0.01);
        assert_eq!(params.max_step_norm, 1.0);
        assert_eq!(params.clamped_step_norm, 0.5);
        assert_eq!(params.rejected_steps, RejectedStepPolicy::Keep);
    }

    #[test]
    fn test_pose_step_subtracts() {
        let pose = Pose::new(Vector3::new(0.1, 0.2, 0.3), Vector3::new(1.0, 2.0, 3.0));
        let stepped = pose.stepped(&Vector6::new(0.1, 0.1, 0.1, 1.0, 1.0, 1.0));
        assert_abs_diff_eq!(stepped.rotation_vector, Vector3::new(0.0, 0.1, 0.2), epsilon = 1e-12);
        assert_abs_diff_eq!(stepped.translation_vector, Vector3::new(0.0, 1.0, 2.0), epsilon = 1e-12);
    }

    #[test]
    fn test_reprojection_error_zero_at_truth() {
        let pose = Pose::new(Vector3::new(0.05, -0.1, 0.02), Vector3::new(5.0, -3.0, 480.0));
        let image_points = synthetic(&pose);
        let error = reprojection_error(&model_points(), &image_points, &pose, &CameraIntrinsics::default());
        assert!(error < 1e-18);
    }

    #[test]
    fn test_frontal_solve() {
        let truth = Pose::new(Vector3::zeros(), Vector3::new(0.0, 0.0, 500.0));
        let solution = solve(&model_points(), &synthetic(&truth), &CameraIntrinsics::default());

        assert!(solution.final_error < 0.01);
        assert_abs_diff_eq!(solution.translation_vector, truth.translation_vector, epsilon = 0.5);
        let angles = solution.euler_angles();
        assert!(angles.pitch.abs() < 0.5 && angles.yaw.abs() < 0.5 && angles.roll.abs() < 0.5);
    }

    #[test]
    fn test_zero_iteration_budget_returns_initial_guess() {
        let truth = Pose::new(Vector3::new(0.1, 0.2, 0.0), Vector3::new(0.0, 0.0, 500.0));
        let params = SolverParams {
            max_iterations: 0,
            ..SolverParams::default()
        };
        let solution = solve_with_params(&model_points(), &synthetic(&truth), &CameraIntrinsics::default(), &params);
        assert_eq!(solution.iterations, 0);
        assert_eq!(solution.termination, Termination::MaxIterations);
        assert!(solution.final_error.is_finite());
    }
}
