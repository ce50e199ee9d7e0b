use serde::{Deserialize, Serialize};

use crate::{
    camera::{CameraError, CameraIntrinsic},
    linalg::transform_points,
    transforms::{euler_to_rotation_matrix, mat33_transpose},
};

/// Utility function to compute the Euclidean distance between two points.
///
/// # Arguments
///
/// * `a` - A point in 3D space.
/// * `b` - Another point in 3D space.
///
/// # Returns
///
/// The Euclidean distance between the two points.
///
/// Example:
/// ```
/// use carpose_3d::ops::euclidean_distance;
///
/// let a = [1.0, 2.0, 3.0];
/// let b = [4.0, 6.0, 3.0];
/// assert_eq!(euclidean_distance(&a, &b), 5.0);
/// ```
pub fn euclidean_distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)).sqrt()
}

/// Half extents of the generic car box in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CarBox {
    /// Half width along the car lateral axis.
    pub half_width: f64,
    /// Half height along the car vertical axis.
    pub half_height: f64,
    /// Half length along the car forward axis.
    pub half_length: f64,
}

impl Default for CarBox {
    fn default() -> Self {
        Self {
            half_width: 1.02,
            half_height: 0.80,
            half_length: 2.31,
        }
    }
}

impl CarBox {
    /// Returns the 8 box corners followed by the box center, in the car frame.
    ///
    /// The first four corners lie on the `-half_height` face, ordered
    /// front-right, back-right, back-left, front-left; the next four repeat the
    /// same order on the `+half_height` face.
    pub fn local_points(&self) -> [[f64; 3]; 9] {
        let (w, h, l) = (self.half_width, self.half_height, self.half_length);
        [
            [w, -h, -l],
            [w, -h, l],
            [-w, -h, l],
            [-w, -h, -l],
            [w, h, -l],
            [w, h, l],
            [-w, h, l],
            [-w, h, -l],
            [0.0, 0.0, 0.0],
        ]
    }

    /// Place the box at a car pose, returning the 9 points in camera coordinates.
    ///
    /// # Arguments
    ///
    /// * `position` - The car center `[x, y, z]` in meters.
    /// * `orientation` - The car `[yaw, pitch, roll]` in radians.
    ///
    /// The dataset angles are stored with yaw and pitch swapped relative to
    /// [`euler_to_rotation_matrix`], and the body frame is the inverse rotation,
    /// hence `R(-pitch, -yaw, -roll)^T`.
    pub fn camera_points(&self, position: &[f64; 3], orientation: &[f64; 3]) -> Vec<[f64; 3]> {
        let [yaw, pitch, roll] = *orientation;
        let rotation = mat33_transpose(&euler_to_rotation_matrix(-pitch, -yaw, -roll));
        transform_points(&self.local_points(), &rotation, position)
    }

    /// Project the placed box to pixel coordinates.
    ///
    /// # Returns
    ///
    /// 9 pixels `[u, v]`: the 8 corners then the center, see [`CarBox::local_points`].
    ///
    /// # Errors
    ///
    /// Fails when any of the points lies behind the camera.
    pub fn project(
        &self,
        intrinsic: &CameraIntrinsic,
        position: &[f64; 3],
        orientation: &[f64; 3],
    ) -> Result<Vec<[f64; 2]>, CameraError> {
        intrinsic.project_batch(&self.camera_points(position, orientation))
    }
}
