use carpose_pose::CarPose;
use faer::prelude::SpSolverLstsq;
use serde::{Deserialize, Serialize};

use crate::error::SlopeError;

// Relative size of the smallest singular value below which the samples
// do not span a plane.
const RANK_TOLERANCE: f64 = 1e-10;

/// Expected height of the road surface under a car.
///
/// Implementations must be usable from several threads at once.
pub trait SlopePrior: Send + Sync {
    /// Returns the expected `y` of a car at lateral offset `x` and depth `z`.
    fn predict(&self, x: f64, z: f64) -> f64;
}

/// A planar road model `y = coef_x * x + coef_z * z + intercept`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearSlopePrior {
    /// Slope along the lateral axis.
    pub coef_x: f64,
    /// Slope along the depth axis.
    pub coef_z: f64,
    /// Height at the camera position.
    pub intercept: f64,
}

impl LinearSlopePrior {
    /// Creates a new planar prior.
    pub fn new(coef_x: f64, coef_z: f64, intercept: f64) -> Self {
        Self {
            coef_x,
            coef_z,
            intercept,
        }
    }

    /// Least-squares fit of the plane through the positions of the given poses.
    ///
    /// # Errors
    ///
    /// [`SlopeError::NotEnoughSamples`] with fewer than 3 poses and
    /// [`SlopeError::Singular`] when the `(x, z)` samples are collinear and
    /// [`SlopeError::NonFiniteSample`] when a position holds NaN or infinity.
    ///
    /// # Example
    ///
    /// ```
    /// use carpose_detect::slope::{LinearSlopePrior, SlopePrior};
    /// use carpose_pose::{CarPose, Orientation, Position};
    ///
    /// let poses = [(0.0, 10.0), (5.0, 20.0), (-5.0, 40.0), (2.0, 60.0)]
    ///     .map(|(x, z)| CarPose::ground_truth(0, Position::new(x, 1.5 + 0.01 * z, z), Orientation::default()));
    /// let prior = LinearSlopePrior::fit(&poses).unwrap();
    /// assert!((prior.predict(0.0, 100.0) - 2.5).abs() < 1e-9);
    /// ```
    pub fn fit(poses: &[CarPose]) -> Result<Self, SlopeError> {
        if poses.len() < 3 {
            return Err(SlopeError::NotEnoughSamples {
                required: 3,
                actual: poses.len(),
            });
        }

        let finite = poses.iter().all(|pose| {
            let p = pose.position;
            p.x.is_finite() && p.y.is_finite() && p.z.is_finite()
        });
        if !finite {
            return Err(SlopeError::NonFiniteSample);
        }

        // design matrix with rows [x, z, 1]
        let design = faer::Mat::<f64>::from_fn(poses.len(), 3, |i, j| {
            let p = poses[i].position;
            [p.x, p.z, 1.0][j]
        });
        let heights = faer::Mat::<f64>::from_fn(poses.len(), 1, |i, _| poses[i].position.y);

        let singular_values = design.singular_values();
        let largest = singular_values.iter().copied().fold(0.0, f64::max);
        let smallest = singular_values.iter().copied().fold(f64::INFINITY, f64::min);
        if smallest <= largest * RANK_TOLERANCE {
            return Err(SlopeError::Singular);
        }

        let solution = design.qr().solve_lstsq(heights);
        Ok(Self::new(
            solution.read(0, 0),
            solution.read(1, 0),
            solution.read(2, 0),
        ))
    }
}

impl SlopePrior for LinearSlopePrior {
    fn predict(&self, x: f64, z: f64) -> f64 {
        self.coef_x * x + self.coef_z * z + self.intercept
    }
}
