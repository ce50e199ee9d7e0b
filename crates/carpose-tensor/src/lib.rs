#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! Occupancy masks, regression targets and network outputs all travel as
//! [`Tensor`] values: owned, row-major and channel first.
//!
//! ```rust
//! use carpose_tensor::Tensor3;
//!
//! // one logit channel and one regression channel over a 2x3 grid
//! let grid = Tensor3::<f32>::from_shape_fn([2, 2, 3], |[c, r, col]| (c * 6 + r * 3 + col) as f32);
//!
//! assert_eq!(grid.get([0, 1, 2]), Some(&5.0));
//! assert_eq!(grid.get([1, 0, 0]), Some(&6.0));
//! ```

/// Binary encoding with bincode.
#[cfg(feature = "bincode")]
pub mod bincode;

/// Serde support, shape checked on deserialization.
#[cfg(feature = "serde")]
pub mod serde;

/// The tensor type and its errors.
pub mod tensor;

pub use crate::tensor::{row_major_strides, Tensor, TensorError};

/// A 2-dimensional tensor, used for `[rows, cols]` grids.
pub type Tensor2<T> = Tensor<T, 2>;

/// A 3-dimensional tensor, used for `[channels, rows, cols]` grids.
pub type Tensor3<T> = Tensor<T, 3>;
