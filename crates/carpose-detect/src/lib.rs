#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Overview
//!
//! A [`DensePrediction`] holds one occupancy logit and the pose regression
//! values per grid cell. The [`CarPoseDecoder`] selects the confident cells,
//! decodes their poses, refines each position against its cell and a road
//! [`SlopePrior`], and removes duplicates.

/// Decoder configuration and pipeline.
pub mod decoder;

/// Error types for decoding, refinement and prior fitting.
pub mod error;

/// Duplicate removal.
pub mod nms;

/// Dense network output.
pub mod prediction;

/// Derivative-free position refinement.
pub mod refine;

/// Road surface priors.
pub mod slope;

pub use decoder::{CarPoseDecoder, DecodeConfig};
pub use error::{DecodeError, RefineError, SlopeError};
pub use nms::remove_neighbors;
pub use prediction::{DensePrediction, NUM_PREDICTION_CHANNELS};
pub use refine::{Minimizer, Minimum, PositionRefiner, Powell, RefineParams};
pub use slope::{LinearSlopePrior, SlopePrior};
