use carpose_3d::CameraIntrinsic;
use carpose_pose::{decode_pose, sigmoid, CarPose};
use carpose_target::FrameGeometry;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    error::DecodeError,
    nms::remove_neighbors,
    prediction::DensePrediction,
    refine::{Minimizer, PositionRefiner, Powell, RefineParams},
    slope::{LinearSlopePrior, SlopePrior},
};

/// Configuration of the [`CarPoseDecoder`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    /// Cells with a logit strictly above this value become detections.
    pub threshold: f64,
    /// Detections closer than this many meters to a more confident one are dropped.
    pub dist_thresh: f64,
    /// Whether positions are refined against their cell and the slope prior.
    pub refine: bool,
    /// Camera the network was trained for.
    pub camera: CameraIntrinsic,
    /// Mapping between source pixels and grid cells.
    pub geometry: FrameGeometry,
    /// Refinement objective parameters.
    pub refine_params: RefineParams,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            threshold: 0.0,
            dist_thresh: 2.0,
            refine: true,
            camera: CameraIntrinsic::default(),
            geometry: FrameGeometry::default(),
            refine_params: RefineParams::default(),
        }
    }
}

impl DecodeConfig {
    /// Set the logit threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the duplicate removal distance.
    pub fn with_dist_thresh(mut self, dist_thresh: f64) -> Self {
        self.dist_thresh = dist_thresh;
        self
    }

    /// Enable or disable the position refinement.
    pub fn with_refine(mut self, refine: bool) -> Self {
        self.refine = refine;
        self
    }

    /// Set the camera intrinsics.
    pub fn with_camera(mut self, camera: CameraIntrinsic) -> Self {
        self.camera = camera;
        self
    }

    /// Set the frame geometry.
    pub fn with_geometry(mut self, geometry: FrameGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    /// Set the refinement parameters.
    pub fn with_refine_params(mut self, refine_params: RefineParams) -> Self {
        self.refine_params = refine_params;
        self
    }
}

/// Turns dense network predictions into car poses.
///
/// Decoding runs in four steps:
///
/// 1. select the cells whose occupancy logit is above the threshold,
/// 2. decode the regression values of each cell, the confidence being the
///    sigmoid of the logit,
/// 3. refine each position against its cell and the slope prior, keeping the
///    regressed position when the minimizer fails,
/// 4. remove duplicates closer than `dist_thresh`.
///
/// The decoder holds no per-call state and can be shared across threads.
///
/// # Example
///
/// ```
/// use carpose_detect::{CarPoseDecoder, DecodeConfig, DensePrediction, LinearSlopePrior};
/// use carpose_tensor::Tensor3;
///
/// let decoder = CarPoseDecoder::new(DecodeConfig::default(), LinearSlopePrior::default());
/// let prediction = DensePrediction::new(Tensor3::from_shape_val([8, 40, 128], -1.0)).unwrap();
/// assert!(decoder.decode(&prediction, false).unwrap().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct CarPoseDecoder<P = LinearSlopePrior, M = Powell> {
    config: DecodeConfig,
    prior: P,
    minimizer: M,
}

impl<P: SlopePrior> CarPoseDecoder<P, Powell> {
    /// Creates a decoder using Powell's method for the refinement.
    pub fn new(config: DecodeConfig, prior: P) -> Self {
        Self::with_minimizer(config, prior, Powell::default())
    }
}

impl<P: SlopePrior, M: Minimizer> CarPoseDecoder<P, M> {
    /// Creates a decoder with a custom minimizer.
    pub fn with_minimizer(config: DecodeConfig, prior: P, minimizer: M) -> Self {
        Self {
            config,
            prior,
            minimizer,
        }
    }

    /// Returns the decoder configuration.
    pub fn config(&self) -> &DecodeConfig {
        &self.config
    }

    /// Decode one prediction.
    ///
    /// # Arguments
    ///
    /// * `prediction` - The network output for one image.
    /// * `flipped` - Whether the network input was flipped horizontally.
    ///
    /// # Returns
    ///
    /// The detections surviving duplicate removal, in row-major cell order. An
    /// empty list is a valid result.
    ///
    /// # Errors
    ///
    /// Fails if the prediction grid does not match the configured geometry or
    /// the refinement bounds are invalid. Cells whose pitch encoding is
    /// degenerate are skipped with a warning, the other cells still decode.
    pub fn decode(
        &self,
        prediction: &DensePrediction,
        flipped: bool,
    ) -> Result<Vec<CarPose>, DecodeError> {
        let geometry = &self.config.geometry;
        geometry.validate()?;
        let grid = geometry.grid_size();
        let expected = [grid.height, grid.width];
        if prediction.grid_shape() != expected {
            return Err(DecodeError::GridMismatch {
                expected,
                actual: prediction.grid_shape(),
            });
        }

        if self.config.refine {
            self.config.refine_params.validate()?;
        }

        let refiner = PositionRefiner::new(
            &self.config.camera,
            geometry,
            &self.prior,
            &self.config.refine_params,
        );

        let mut detections = Vec::new();
        for cell in prediction.cells_above(self.config.threshold) {
            let (Some(logit), Some(encoded)) =
                (prediction.logit(cell), prediction.encoded_pose(cell))
            else {
                continue;
            };
            let decoded = match decode_pose(&encoded) {
                Ok(decoded) => decoded,
                Err(err) => {
                    log::warn!("skipping cell {:?}: {}", cell, err);
                    continue;
                }
            };
            let mut detection = CarPose::detection(
                decoded.position,
                decoded.orientation,
                sigmoid(logit as f64),
            );

            if self.config.refine {
                match refiner.refine(&self.minimizer, cell, &detection.position, flipped) {
                    Ok(position) => detection = detection.with_position(position),
                    Err(err) => {
                        log::debug!("keeping unrefined position for cell {:?}: {}", cell, err)
                    }
                }
            }
            detections.push(detection);
        }

        let num_candidates = detections.len();
        let detections = remove_neighbors(detections, self.config.dist_thresh);
        log::debug!(
            "decoded {} detections from {} candidates",
            detections.len(),
            num_candidates
        );

        Ok(detections)
    }

    /// Decode many predictions in parallel.
    ///
    /// The output keeps the order of `predictions`; the first error aborts the batch.
    pub fn decode_batch(
        &self,
        predictions: &[DensePrediction],
        flipped: bool,
    ) -> Result<Vec<Vec<CarPose>>, DecodeError> {
        predictions
            .par_iter()
            .map(|prediction| self.decode(prediction, flipped))
            .collect()
    }
}
