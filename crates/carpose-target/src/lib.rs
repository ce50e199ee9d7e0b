#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! The [`TargetEncoder`] projects every labelled car center through the camera,
//! maps the pixel onto the prediction grid with a [`FrameGeometry`] and writes the
//! encoded pose into a [`TargetTensor`].

/// Encoder error types.
pub mod error;

/// Target tensor encoding.
pub mod encoder;

/// Horizontal flipping of dense grids.
pub mod flip;

/// Mapping between source pixels and grid cells.
pub mod geometry;

pub use encoder::{EncodeStats, TargetEncoder, TargetTensor};
pub use error::EncodeError;
pub use geometry::{FrameGeometry, GeometryError, ImageSize};
