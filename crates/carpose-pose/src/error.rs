/// Errors raised while decoding a pose from regression values.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PoseError {
    /// The pitch sine/cosine pair is too close to the origin to recover an angle.
    #[error("Degenerate pitch encoding: sin = {sin}, cos = {cos}")]
    DegeneratePitch {
        /// The regressed pitch sine.
        sin: f64,
        /// The regressed pitch cosine.
        cos: f64,
    },

    /// The number of regression values does not match the field layout.
    #[error("Expected {expected} regression values, got {actual}")]
    InvalidFieldCount {
        /// Number of fields in the layout.
        expected: usize,
        /// Number of values provided.
        actual: usize,
    },
}

/// Errors raised while parsing label strings.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum LabelError {
    /// The token count is not a multiple of the record width.
    #[error("Label has {count} tokens, which is not a multiple of {width}")]
    InvalidTokenCount {
        /// Number of whitespace separated tokens.
        count: usize,
        /// Number of tokens per instance.
        width: usize,
    },

    /// A token could not be parsed as a finite number.
    #[error("Invalid number {token:?} at token {position}")]
    InvalidNumber {
        /// The offending token.
        token: String,
        /// Zero based token index in the label string.
        position: usize,
    },
}
