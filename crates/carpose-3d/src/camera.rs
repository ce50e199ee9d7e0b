use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for the camera projection model.
#[derive(Debug, Error, PartialEq)]
pub enum CameraError {
    /// The point lies on or behind the image plane and cannot be projected.
    #[error("Cannot project a point with non-positive depth (z = {0})")]
    NonPositiveDepth(f64),

    /// One of the point coordinates is NaN or infinite.
    #[error("Cannot project a point with non-finite coordinates: {0:?}")]
    NonFinitePoint([f64; 3]),
}

/// Represents the intrinsic parameters of a pinhole camera.
///
/// The default value is the calibration of the camera that recorded the
/// training data. Trained models only stay valid with the exact same numbers.
///
/// # Fields
///
/// * `fx` - The focal length in the x direction
/// * `fy` - The focal length in the y direction
/// * `cx` - The x coordinate of the principal point
/// * `cy` - The y coordinate of the principal point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsic {
    /// The focal length in the x direction
    pub fx: f64,
    /// The focal length in the y direction
    pub fy: f64,
    /// The x coordinate of the principal point
    pub cx: f64,
    /// The y coordinate of the principal point
    pub cy: f64,
}

impl Default for CameraIntrinsic {
    fn default() -> Self {
        Self {
            fx: 2304.5479,
            fy: 2305.8757,
            cx: 1686.2379,
            cy: 1354.9849,
        }
    }
}

impl CameraIntrinsic {
    /// Creates a new `CameraIntrinsic` from focal lengths and principal point.
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self { fx, fy, cx, cy }
    }

    /// Project a 3D point in camera coordinates to pixel coordinates.
    ///
    /// `u = x * fx / z + cx` and `v = y * fy / z + cy`.
    ///
    /// # Arguments
    ///
    /// * `point` - The point `[x, y, z]` in camera coordinates, z being the depth.
    ///
    /// # Returns
    ///
    /// The pixel `[u, v]` where `u` is the column and `v` the row.
    ///
    /// # Errors
    ///
    /// [`CameraError::NonPositiveDepth`] when `z <= 0` and
    /// [`CameraError::NonFinitePoint`] for NaN or infinite input.
    ///
    /// # Example
    ///
    /// ```
    /// use carpose_3d::CameraIntrinsic;
    ///
    /// let intrinsic = CameraIntrinsic::new(500.0, 500.0, 320.0, 240.0);
    /// let [u, v] = intrinsic.project(&[1.0, 2.0, 5.0]).unwrap();
    /// assert_eq!((u, v), (420.0, 440.0));
    /// ```
    pub fn project(&self, point: &[f64; 3]) -> Result<[f64; 2], CameraError> {
        let [x, y, z] = *point;
        if !(x.is_finite() && y.is_finite() && z.is_finite()) {
            return Err(CameraError::NonFinitePoint(*point));
        }
        if z <= 0.0 {
            return Err(CameraError::NonPositiveDepth(z));
        }
        let inv_z = 1.0 / z;
        Ok([x * self.fx * inv_z + self.cx, y * self.fy * inv_z + self.cy])
    }

    /// Project a batch of 3D points to pixel coordinates.
    ///
    /// The whole batch fails on the first point that cannot be projected.
    pub fn project_batch(&self, points: &[[f64; 3]]) -> Result<Vec<[f64; 2]>, CameraError> {
        points.iter().map(|p| self.project(p)).collect()
    }

    /// Back-project a pixel to the 3D point at the given depth.
    ///
    /// A single image only defines a ray through the pixel; the depth has to come
    /// from somewhere else (a regression output or a search).
    pub fn unproject(&self, pixel: &[f64; 2], depth: f64) -> Result<[f64; 3], CameraError> {
        if depth <= 0.0 {
            return Err(CameraError::NonPositiveDepth(depth));
        }
        let x = (pixel[0] - self.cx) * depth / self.fx;
        let y = (pixel[1] - self.cy) * depth / self.fy;
        Ok([x, y, depth])
    }
}
