#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Pinhole camera intrinsics and projection.
pub mod camera;

/// Linear algebra utilities.
pub mod linalg;

/// Operations on 3D car geometry.
pub mod ops;

/// 3D transforms algorithms.
pub mod transforms;

pub use camera::{CameraError, CameraIntrinsic};
