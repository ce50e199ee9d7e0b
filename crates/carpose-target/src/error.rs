use carpose_3d::CameraError;
use carpose_tensor::TensorError;

use crate::geometry::GeometryError;

/// Errors raised while encoding training targets.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum EncodeError {
    /// An instance could not be projected into the image.
    #[error(transparent)]
    Camera(#[from] CameraError),

    /// The frame geometry does not describe a valid grid.
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// Writing into the target grid failed.
    #[error(transparent)]
    Tensor(#[from] TensorError),
}
