//! Monocular head pose estimation from six facial landmarks.
//!
//! This library recovers the camera-relative rotation and translation of a head
//! from six 2D landmarks and a fixed 3D face model, and converts the rotation to
//! pitch/yaw/roll angles. Everything is implemented on small fixed-size
//! `nalgebra` types:
//! - a Perspective-n-Point solver (closed-form initial guess + Levenberg-Marquardt)
//! - Rodrigues rotation-vector conversion
//! - Euler angle decomposition with gimbal-lock handling
//! - 6x6 Gaussian elimination with partial pivoting
//!
//! The estimation pipeline for one frame is:
//! 1. Select the six pose landmarks (from a full face mesh if needed)
//! 2. Scale normalized coordinates to pixels
//! 3. Solve `PnP` against the built-in face model
//! 4. Decompose the rotation into Euler angles
//!
//! # Examples
//!
//! ## Basic Usage
//!
//! ```no_run
//! use head_pose_pnp::{face_model::NormalizedLandmark, pose_estimation::PoseEstimator};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let estimator = PoseEstimator::new(640, 480)?;
//!
//! // Nose tip, chin, left eye, left mouth, right mouth, right eye
//! let landmarks = [
//!     NormalizedLandmark::new(0.500, 0.500),
//!     NormalizedLandmark::new(0.500, 0.672),
//!     NormalizedLandmark::new(0.415, 0.414),
//!     NormalizedLandmark::new(0.443, 0.576),
//!     NormalizedLandmark::new(0.557, 0.576),
//!     NormalizedLandmark::new(0.585, 0.414),
//! ];
//!
//! let pose = estimator.estimate_pose(&landmarks)?;
//! println!(
//!     "Pitch: {:.2}°, Yaw: {:.2}°, Roll: {:.2}°",
//!     pose.angles.pitch, pose.angles.yaw, pose.angles.roll
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Using the Solver Directly
//!
//! ```
//! use head_pose_pnp::{
//!     camera::CameraIntrinsics,
//!     face_model::model_points,
//!     pnp::{self, Pose},
//! };
//! use nalgebra::Vector3;
//!
//! let camera = CameraIntrinsics::from_image_size(640, 480).unwrap();
//! let truth = Pose::new(Vector3::zeros(), Vector3::new(0.0, 0.0, 500.0));
//! let image_points = pnp::project_points(&model_points(), &truth, &camera);
//!
//! let solution = pnp::solve(&model_points(), &image_points, &camera);
//! assert!(solution.final_error < 0.01);
//! println!("Stopped after {} iterations: {:?}", solution.iterations, solution.termination);
//! ```

/// Pinhole camera intrinsics
pub mod camera;

/// Configuration management
pub mod config;

/// Constants used throughout the solver
pub mod constants;

/// Error types and result handling
pub mod error;

/// 3D face model and landmark selection
pub mod face_model;

/// Small dense linear system solving
pub mod linalg;

/// Perspective-n-Point solver
pub mod pnp;

/// Head pose estimation pipeline
pub mod pose_estimation;

/// Rotation vector, matrix and Euler angle conversions
pub mod rotation;

pub use error::{Error, Result};
pub use pnp::{solve, PnpSolution, SolverParams, Termination};
pub use pose_estimation::{HeadPose, PoseEstimator};
pub use rotation::EulerAngles;
