//! Fixed 3D face template and landmark bookkeeping.
//!
//! The template is expressed in millimetres in a camera-aligned frame: X grows to
//! the image right, Y grows downwards and Z points away from the camera, with the
//! nose tip at the origin. A frontal, upright face therefore has a zero rotation.
//!
//! "Left" and "right" are relative to the image, not to the depicted person.

use crate::{constants::NUM_POSE_LANDMARKS, Error, Result};
use nalgebra::{Point2, Vector3};
use serde::{Deserialize, Serialize};

/// The six landmarks used for pose estimation, in solver order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceLandmark {
    NoseTip = 0,
    Chin = 1,
    LeftEyeOuterCorner = 2,
    LeftMouthCorner = 3,
    RightMouthCorner = 4,
    RightEyeOuterCorner = 5,
}

impl FaceLandmark {
    /// All landmarks in the order the solver expects them
    pub const ALL: [Self; NUM_POSE_LANDMARKS] = [
        Self::NoseTip,
        Self::Chin,
        Self::LeftEyeOuterCorner,
        Self::LeftMouthCorner,
        Self::RightMouthCorner,
        Self::RightEyeOuterCorner,
    ];

    /// Position in the correspondence set
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Index of this landmark in a MediaPipe face mesh (468 or 478 points)
    #[must_use]
    pub const fn mesh_index(self) -> usize {
        match self {
            Self::NoseTip => 1,
            Self::Chin => 152,
            Self::LeftEyeOuterCorner => 33,
            Self::LeftMouthCorner => 61,
            Self::RightMouthCorner => 291,
            Self::RightEyeOuterCorner => 263,
        }
    }

    /// Template position in millimetres
    #[must_use]
    pub fn model_point(self) -> Vector3<f64> {
        let [x, y, z] = FACE_MODEL_POINTS[self.index()];
        Vector3::new(x, y, z)
    }
}

/// 3D template, millimetres, indexed by [`FaceLandmark::index`]
pub const FACE_MODEL_POINTS: [[f64; 3]; NUM_POSE_LANDMARKS] = [
    [0.0, 0.0, 0.0],      // nose tip
    [0.0, 66.0, 13.0],    // chin
    [-45.0, -34.0, 27.0], // left eye outer corner
    [-30.0, 30.0, 25.0],  // left mouth corner
    [30.0, 30.0, 25.0],   // right mouth corner
    [45.0, -34.0, 27.0],  // right eye outer corner
];

/// Template as vectors, in solver order
#[must_use]
pub fn model_points() -> [Vector3<f64>; NUM_POSE_LANDMARKS] {
    FaceLandmark::ALL.map(FaceLandmark::model_point)
}

/// A detector landmark, normalized to `[0, 1]` by the image size
///
/// Extra fields such as a depth estimate are ignored when deserializing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedLandmark {
    /// Horizontal position, fraction of the image width
    pub x: f64,
    /// Vertical position, fraction of the image height
    pub y: f64,
}

impl NormalizedLandmark {
    /// Create a new normalized landmark
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Scale to pixel coordinates
    #[must_use]
    pub fn to_pixel(self, image_width: u32, image_height: u32) -> Point2<f64> {
        Point2::new(self.x * f64::from(image_width), self.y * f64::from(image_height))
    }
}

/// Pick the six pose landmarks out of a dense face mesh
///
/// Inputs of exactly six landmarks are taken to be already in solver order.
///
/// # Errors
///
/// Returns an error if the input is neither six landmarks nor a mesh long
/// enough to contain every pose landmark index
pub fn select_pose_landmarks(landmarks: &[NormalizedLandmark]) -> Result<[NormalizedLandmark; NUM_POSE_LANDMARKS]> {
    if landmarks.len() == NUM_POSE_LANDMARKS {
        let mut selected = [NormalizedLandmark::default(); NUM_POSE_LANDMARKS];
        selected.copy_from_slice(landmarks);
        return Ok(selected);
    }

    let required = FaceLandmark::ALL
        .iter()
        .map(|landmark| landmark.mesh_index())
        .max()
        .unwrap_or(0)
        + 1;
    if landmarks.len() < required {
        return Err(Error::InvalidInput(format!(
            "Expected {NUM_POSE_LANDMARKS} landmarks or a face mesh of at least {required} points, got {}",
            landmarks.len()
        )));
    }

    Ok(FaceLandmark::ALL.map(|landmark| landmarks[landmark.mesh_index()]))
}

/// Scale normalized landmarks to pixels, rejecting non-finite coordinates
///
/// # Errors
///
/// Returns an error if any coordinate is NaN or infinite
pub fn to_image_points(
    landmarks: &[NormalizedLandmark; NUM_POSE_LANDMARKS],
    image_width: u32,
    image_height: u32,
) -> Result<[Point2<f64>; NUM_POSE_LANDMARKS]> {
    if let Some((i, landmark)) = landmarks
        .iter()
        .enumerate()
        .find(|(_, landmark)| !(landmark.x.is_finite() && landmark.y.is_finite()))
    {
        return Err(Error::InvalidInput(format!(
            "Landmark {i} has non-finite coordinates ({}, {})",
            landmark.x, landmark.y
        )));
    }

    Ok((*landmarks).map(|landmark| landmark.to_pixel(image_width, image_height)))
}
