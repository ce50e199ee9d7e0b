use std::f64::consts::PI;

/// Add `reference` to `angle` and wrap the sum into `(-pi, pi]`.
///
/// The wrap is floor based, so negative sums and sums many turns away from zero
/// land in the same range.
///
/// # Arguments
///
/// * `angle` - The angle in radians.
/// * `reference` - The offset added before wrapping, in radians.
///
/// # Example
///
/// ```
/// use carpose_pose::wrap_angle;
///
/// let a = wrap_angle(3.0, 1.0);
/// assert!((a - (4.0 - 2.0 * std::f64::consts::PI)).abs() < 1e-12);
/// assert_eq!(wrap_angle(-std::f64::consts::PI, 0.0), std::f64::consts::PI);
/// ```
pub fn wrap_angle(angle: f64, reference: f64) -> f64 {
    let sum = angle + reference;
    let wrapped = sum - ((sum + PI) / (2.0 * PI)).floor() * 2.0 * PI;
    // the floor formula yields [-pi, pi)
    if wrapped <= -PI {
        wrapped + 2.0 * PI
    } else {
        wrapped
    }
}

/// Logistic function mapping an occupancy logit to a confidence in `(0, 1)`.
pub fn sigmoid(logit: f64) -> f64 {
    1.0 / (1.0 + (-logit).exp())
}

/// Sign with a zero for zero input.
pub(crate) fn sign(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}
