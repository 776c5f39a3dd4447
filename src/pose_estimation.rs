use crate::{
    camera::CameraIntrinsics,
    config::Config,
    constants::NUM_POSE_LANDMARKS,
    face_model::{model_points, select_pose_landmarks, to_image_points, NormalizedLandmark},
    pnp::{self, PnpSolution, SolverParams},
    rotation::EulerAngles,
    Error, Result,
};
use nalgebra::{Point2, Vector3};
use serde::{Deserialize, Serialize};

/// Pose of one frame: angles plus the underlying PnP solution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadPose {
    /// Pitch/yaw/roll in degrees
    pub angles: EulerAngles,
    /// Rotation, translation and solver diagnostics
    pub solution: PnpSolution,
}

/// Serializable view of a [`HeadPose`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseReport {
    /// Degrees
    pub pitch: f64,
    /// Degrees
    pub yaw: f64,
    /// Degrees
    pub roll: f64,
    /// Radians, axis-angle
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub rotation_vector: Option<[f64; 3]>,
    /// Millimetres
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub translation_vector: Option<[f64; 3]>,
    /// Sum of squared reprojection residuals, pixels²
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub final_error: Option<f64>,
    /// Residual evaluations
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub iterations: Option<usize>,
    /// Why refinement stopped
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub termination: Option<pnp::Termination>,
}

impl HeadPose {
    /// Build an output record, rounding to `precision` decimals
    #[must_use]
    pub fn report(&self, diagnostics: bool, precision: usize) -> PoseReport {
        let scale = 10f64.powi(i32::try_from(precision).unwrap_or(i32::MAX).min(15));
        let round = |value: f64| (value * scale).round() / scale;
        let round3 = |v: Vector3<f64>| [round(v.x), round(v.y), round(v.z)];

        PoseReport {
            pitch: round(self.angles.pitch),
            yaw: round(self.angles.yaw),
            roll: round(self.angles.roll),
            rotation_vector: diagnostics.then(|| round3(self.solution.rotation_vector)),
            translation_vector: diagnostics.then(|| round3(self.solution.translation_vector)),
            final_error: diagnostics.then_some(self.solution.final_error),
            iterations: diagnostics.then_some(self.solution.iterations),
            termination: diagnostics.then_some(self.solution.termination),
        }
    }
}

/// Head pose estimator for a fixed image size
///
/// Holds the assumed camera intrinsics and solver settings; the 3D face model
/// is built in. Each call to [`PoseEstimator::estimate_pose`] is independent.
pub struct PoseEstimator {
    camera: CameraIntrinsics,
    params: SolverParams,
    image_width: u32,
    image_height: u32,
}

impl PoseEstimator {
    /// Create a pose estimator for images of the given size
    ///
    /// # Errors
    ///
    /// Returns an error if either dimension is zero
    pub fn new(image_width: u32, image_height: u32) -> Result<Self> {
        let camera = CameraIntrinsics::from_image_size(image_width, image_height)?;
        log::info!(
            "Initializing PoseEstimator for {image_width}x{image_height} images (fx={}, cx={}, cy={})",
            camera.fx,
            camera.cx,
            camera.cy
        );

        Ok(Self {
            camera,
            params: SolverParams::default(),
            image_width,
            image_height,
        })
    }

    /// Create a pose estimator from a validated configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration fails validation
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config.camera.image_width, config.camera.image_height)?.with_params(config.solver.clone()))
    }

    /// Replace the solver settings
    #[must_use]
    pub fn with_params(mut self, params: SolverParams) -> Self {
        self.params = params;
        self
    }

    /// Camera intrinsics in use
    #[must_use]
    pub const fn camera(&self) -> &CameraIntrinsics {
        &self.camera
    }

    /// Solver settings in use
    #[must_use]
    pub const fn params(&self) -> &SolverParams {
        &self.params
    }

    /// Image size in pixels
    #[must_use]
    pub const fn image_size(&self) -> (u32, u32) {
        (self.image_width, self.image_height)
    }

    /// Estimate head pose from normalized landmarks
    ///
    /// Accepts either the six pose landmarks in solver order or a full face
    /// mesh from which they are selected.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The landmark count is neither six nor a full face mesh
    /// - Any coordinate is NaN or infinite
    pub fn estimate_pose(&self, landmarks: &[NormalizedLandmark]) -> Result<HeadPose> {
        let selected = select_pose_landmarks(landmarks)?;
        let image_points = to_image_points(&selected, self.image_width, self.image_height)?;
        Ok(self.solve(&image_points))
    }

    /// Estimate head pose from landmarks already in pixel coordinates
    ///
    /// # Errors
    ///
    /// Returns an error if the count is not six or a coordinate is not finite
    pub fn estimate_from_image_points(&self, image_points: &[Point2<f64>]) -> Result<HeadPose> {
        let points: [Point2<f64>; NUM_POSE_LANDMARKS] = image_points.try_into().map_err(|_| {
            Error::InvalidInput(format!(
                "Expected {NUM_POSE_LANDMARKS} image points, got {}",
                image_points.len()
            ))
        })?;
        if points.iter().any(|p| !(p.x.is_finite() && p.y.is_finite())) {
            return Err(Error::InvalidInput("Image points must be finite".to_string()));
        }
        Ok(self.solve(&points))
    }

    fn solve(&self, image_points: &[Point2<f64>; NUM_POSE_LANDMARKS]) -> HeadPose {
        let solution = pnp::solve_with_params(&model_points(), image_points, &self.camera, &self.params);
        HeadPose {
            angles: solution.euler_angles(),
            solution,
        }
    }
}
