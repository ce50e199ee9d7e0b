use carpose_target::GeometryError;
use carpose_tensor::TensorError;

/// Errors raised while decoding a dense prediction.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DecodeError {
    /// The configured frame geometry is invalid.
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// The prediction tensor is malformed.
    #[error(transparent)]
    Tensor(#[from] TensorError),

    /// The refinement parameters are unusable.
    #[error(transparent)]
    Refine(#[from] RefineError),

    /// The prediction does not have one logit channel plus the regression channels.
    #[error("Prediction has {actual} channels, expected {expected}")]
    InvalidChannels {
        /// Expected channel count.
        expected: usize,
        /// Channel count of the prediction.
        actual: usize,
    },

    /// The prediction grid does not match the configured frame geometry.
    #[error("Prediction grid is {actual:?} but the geometry expects {expected:?}")]
    GridMismatch {
        /// Expected `[rows, cols]`.
        expected: [usize; 2],
        /// `[rows, cols]` of the prediction.
        actual: [usize; 2],
    },
}

/// Errors raised by a [`crate::refine::Minimizer`].
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RefineError {
    /// The iteration budget ran out before the tolerance was met.
    #[error("Minimizer did not converge after {0} iterations")]
    NotConverged(usize),

    /// The minimum is NaN or infinite.
    #[error("Minimizer produced a non-finite value {value} at {point:?}")]
    NonFinite {
        /// Objective value at the returned point.
        value: f64,
        /// The returned point.
        point: Vec<f64>,
    },

    /// The start point and the bounds have different dimensions.
    #[error("Start point has {start} dimensions but {bounds} bounds were given")]
    DimensionMismatch {
        /// Dimension of the start point.
        start: usize,
        /// Number of bounds.
        bounds: usize,
    },

    /// A lower bound is above its upper bound or one of them is NaN.
    #[error("Bound {index} is invalid: [{lower}, {upper}]")]
    InvalidBounds {
        /// Coordinate the bound applies to.
        index: usize,
        /// Lower bound.
        lower: f64,
        /// Upper bound.
        upper: f64,
    },
}

/// Errors raised while fitting a slope prior.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SlopeError {
    /// Fewer samples than unknowns.
    #[error("Need at least {required} samples to fit the slope, got {actual}")]
    NotEnoughSamples {
        /// Minimum number of samples.
        required: usize,
        /// Number of samples given.
        actual: usize,
    },

    /// The samples do not span the plane, e.g. all on one line.
    #[error("Slope samples are degenerate, the design matrix is rank deficient")]
    Singular,

    /// A sample position is NaN or infinite.
    #[error("Slope samples must have finite positions")]
    NonFiniteSample,
}
