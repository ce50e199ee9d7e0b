#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! A [`CarPose`] is one vehicle instance: position in meters, Euler angles in
//! radians and, for decoded detections, a confidence. The [`codec`] module turns
//! it into the regression values a dense network predicts per grid cell and
//! back; the [`label`] module reads and writes the flat label strings of the
//! dataset.

/// Angle helpers.
pub mod angle;

/// Pose regression codec.
pub mod codec;

/// Error types for pose parsing and decoding.
pub mod error;

/// Flat label string parsing and formatting.
pub mod label;

/// Car pose records.
pub mod pose;

pub use angle::{sigmoid, wrap_angle};
pub use codec::{decode_pose, encode_pose, EncodedPose, PoseField, NUM_POSE_FIELDS, POSE_FIELDS};
pub use error::{LabelError, PoseError};
pub use label::{format_detections, parse_detections, parse_labels};
pub use pose::{CarPose, Orientation, Position};
