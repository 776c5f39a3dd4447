//! Levenberg-Marquardt refinement of the six pose parameters.
//!
//! Each iteration linearizes the residuals, checks for convergence, then solves
//! the damped normal equations `(JᵀJ + λ·diag(JᵀJ)) δ = Jᵀr` and subtracts `δ`.
//! Damping is adapted against the best error seen so far. Unless
//! [`RejectedStepPolicy::RollBack`] is selected, a non-improving iterate is
//! kept and only the damping is raised.

use super::{
    jacobian::{linearize, Linearization},
    Pose, RejectedStepPolicy, SolverParams, Termination,
};
use crate::{camera::CameraIntrinsics, constants::NUM_POSE_LANDMARKS, linalg::solve_6x6};
use log::{trace, warn};
use nalgebra::{Matrix6, Point2, Vector3, Vector6};

/// Outcome of a refinement run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Refinement {
    /// Final parameters
    pub pose: Pose,
    /// Squared error at `pose`
    pub final_error: f64,
    /// Residual evaluations performed
    pub iterations: usize,
    /// Why the loop stopped
    pub termination: Termination,
}

/// Refine `initial` against the correspondences
#[must_use]
pub fn levenberg_marquardt(
    object_points: &[Vector3<f64>; NUM_POSE_LANDMARKS],
    image_points: &[Point2<f64>; NUM_POSE_LANDMARKS],
    camera: &CameraIntrinsics,
    initial: Pose,
    params: &SolverParams,
) -> Refinement {
    let roll_back = params.rejected_steps == RejectedStepPolicy::RollBack;

    let mut pose = initial;
    let mut damping = params.initial_damping;
    let mut prev_error = f64::INFINITY;
    let mut best_error = f64::INFINITY;
    let mut best: Option<(Pose, Linearization)> = None;
    let mut last_error = None;
    let mut iterations = 0;
    let mut termination = Termination::MaxIterations;

    for iteration in 0..params.max_iterations {
        iterations = iteration + 1;
        let mut system = linearize(&pose, object_points, image_points, camera);
        trace!(
            "LM iteration {iteration}: error={:.6e}, lambda={damping:.3e}",
            system.error
        );

        match best {
            Some((best_pose, best_system)) if roll_back && system.error >= best_error => {
                pose = best_pose;
                system = best_system;
                damping *= params.damping_increase;
                last_error = Some(best_error);
            }
            _ => {
                last_error = Some(system.error);
                if (prev_error - system.error).abs() < params.error_change_tolerance {
                    termination = Termination::ErrorConverged;
                    break;
                }
                if system.error < params.error_threshold {
                    termination = Termination::BelowThreshold;
                    break;
                }
                prev_error = system.error;
            }
        }

        let Some(step) = damped_step(&system, damping) else {
            warn!("Singular normal equations at iteration {iteration}, keeping current pose");
            termination = Termination::SingularSystem;
            break;
        };
        let step = clamp_step(step, params.max_step_norm, params.clamped_step_norm);

        if system.error < best_error {
            best_error = system.error;
            damping *= params.damping_decrease;
            if roll_back {
                best = Some((pose, system));
            }
        } else if !roll_back {
            damping *= params.damping_increase;
        }

        pose = pose.stepped(&step);
    }

    if roll_back && termination == Termination::MaxIterations {
        if let Some((best_pose, _)) = best {
            return Refinement {
                pose: best_pose,
                final_error: best_error,
                iterations,
                termination,
            };
        }
    }

    // An exhausted budget leaves `pose` one step past the last evaluation
    let final_error = match last_error {
        Some(error) if termination != Termination::MaxIterations => error,
        _ => linearize(&pose, object_points, image_points, camera).error,
    };

    Refinement {
        pose,
        final_error,
        iterations,
        termination,
    }
}

/// Solve the damped normal equations, `None` when singular
fn damped_step(system: &Linearization, damping: f64) -> Option<Vector6<f64>> {
    let jt = system.jacobian.transpose();
    let mut jtj: Matrix6<f64> = jt * system.jacobian;
    let jtr: Vector6<f64> = jt * system.residuals;
    for i in 0..6 {
        jtj[(i, i)] *= 1.0 + damping;
    }
    solve_6x6(&jtj, &jtr)
}

/// Rescale overly long steps
///
/// Rotation (radians) and translation (millimetres) share one norm.
fn clamp_step(step: Vector6<f64>, max_norm: f64, clamped_norm: f64) -> Vector6<f64> {
    let norm = step.norm();
    if norm > max_norm {
        step * (clamped_norm / norm)
    } else {
        step
    }
}
