//! Pinhole camera intrinsics.
//!
//! The camera is never calibrated: the intrinsics are derived per frame from the
//! image size, with the focal length equal to the image width and the principal
//! point at the image center. No skew and no lens distortion are modelled.

use crate::{constants::CAMERA_CENTER_FACTOR, Error, Result};
use nalgebra::{Matrix3, Point2, Vector3};
use serde::{Deserialize, Serialize};

/// Pinhole intrinsics (fx, fy, cx, cy) in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    /// Focal length along the image x axis
    pub fx: f64,
    /// Focal length along the image y axis
    pub fy: f64,
    /// Principal point x
    pub cx: f64,
    /// Principal point y
    pub cy: f64,
}

impl CameraIntrinsics {
    /// Create intrinsics from explicit values
    #[must_use]
    pub const fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self { fx, fy, cx, cy }
    }

    /// Assume a camera for an image of the given size
    ///
    /// # Errors
    ///
    /// Returns an error if either dimension is zero
    pub fn from_image_size(image_width: u32, image_height: u32) -> Result<Self> {
        if image_width == 0 || image_height == 0 {
            return Err(Error::InvalidInput(format!(
                "Image dimensions must be non-zero, got {image_width}x{image_height}"
            )));
        }

        let focal_length = f64::from(image_width);
        Ok(Self::new(
            focal_length,
            focal_length,
            f64::from(image_width) / CAMERA_CENTER_FACTOR,
            f64::from(image_height) / CAMERA_CENTER_FACTOR,
        ))
    }

    /// Read intrinsics out of a 3x3 camera matrix
    ///
    /// Skew and the bottom row are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if a focal length is not strictly positive
    pub fn from_matrix(matrix: &Matrix3<f64>) -> Result<Self> {
        let (fx, fy) = (matrix[(0, 0)], matrix[(1, 1)]);
        if !(fx > 0.0 && fy > 0.0) {
            return Err(Error::InvalidInput(format!(
                "Camera matrix focal lengths must be positive, got fx={fx}, fy={fy}"
            )));
        }
        Ok(Self::new(fx, fy, matrix[(0, 2)], matrix[(1, 2)]))
    }

    /// The 3x3 camera matrix `K`
    #[must_use]
    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.fx, 0.0, self.cx,
            0.0, self.fy, self.cy,
            0.0, 0.0, 1.0,
        )
    }

    /// Project a camera-frame point to pixel coordinates
    #[must_use]
    pub fn project(&self, point: &Vector3<f64>) -> Point2<f64> {
        Point2::new(
            self.fx * point.x / point.z + self.cx,
            self.fy * point.y / point.z + self.cy,
        )
    }

    /// Back-project a pixel to the camera-frame point at the given depth
    #[must_use]
    pub fn back_project(&self, pixel: &Point2<f64>, depth: f64) -> Vector3<f64> {
        Vector3::new(
            (pixel.x - self.cx) / self.fx * depth,
            (pixel.y - self.cy) / self.fy * depth,
            depth,
        )
    }
}

impl Default for CameraIntrinsics {
    fn default() -> Self {
        Self::new(640.0, 640.0, 320.0, 240.0)
    }
}
