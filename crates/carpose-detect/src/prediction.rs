use carpose_pose::{EncodedPose, NUM_POSE_FIELDS};
use carpose_target::TargetTensor;
use carpose_tensor::{Tensor2, Tensor3};
use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// Number of channels of a dense prediction: the occupancy logit plus the regression fields.
pub const NUM_PREDICTION_CHANNELS: usize = 1 + NUM_POSE_FIELDS;

/// Raw network output for one image.
///
/// The tensor has shape `[NUM_PREDICTION_CHANNELS, rows, cols]`. Channel 0 holds
/// the occupancy logit, the remaining channels hold the pose regression in
/// `POSE_FIELDS` order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Tensor3<f32>", into = "Tensor3<f32>")]
pub struct DensePrediction {
    data: Tensor3<f32>,
}

impl DensePrediction {
    /// Wraps a network output tensor.
    ///
    /// # Errors
    ///
    /// [`DecodeError::InvalidChannels`] if the first dimension is not
    /// [`NUM_PREDICTION_CHANNELS`].
    pub fn new(data: Tensor3<f32>) -> Result<Self, DecodeError> {
        if data.shape[0] != NUM_PREDICTION_CHANNELS {
            return Err(DecodeError::InvalidChannels {
                expected: NUM_PREDICTION_CHANNELS,
                actual: data.shape[0],
            });
        }
        Ok(Self { data })
    }

    /// Builds a prediction from separate logit and regression grids.
    pub fn from_parts(
        logits: &Tensor2<f32>,
        regression: &Tensor3<f32>,
    ) -> Result<Self, DecodeError> {
        let [rows, cols] = logits.shape;
        if regression.shape[0] != NUM_POSE_FIELDS {
            return Err(DecodeError::InvalidChannels {
                expected: NUM_POSE_FIELDS,
                actual: regression.shape[0],
            });
        }
        if regression.shape[1..] != [rows, cols] {
            return Err(DecodeError::GridMismatch {
                expected: [rows, cols],
                actual: [regression.shape[1], regression.shape[2]],
            });
        }

        let mut data = Vec::with_capacity(NUM_PREDICTION_CHANNELS * rows * cols);
        data.extend_from_slice(logits.as_slice());
        data.extend_from_slice(regression.as_slice());
        Self::new(Tensor3::from_shape_vec([NUM_PREDICTION_CHANNELS, rows, cols], data)?)
    }

    /// Builds the prediction a perfect network would output for a training target.
    ///
    /// Occupied cells get `logit`, the others `-logit`.
    pub fn from_target(target: &TargetTensor, logit: f32) -> Result<Self, DecodeError> {
        let logits = target.mask.map(|&m| if m > 0.0 { logit } else { -logit });
        Self::from_parts(&logits, &target.regression)
    }

    /// Returns the `[rows, cols]` of the prediction grid.
    pub fn grid_shape(&self) -> [usize; 2] {
        [self.data.shape[1], self.data.shape[2]]
    }

    /// Returns the occupancy logit of a cell.
    pub fn logit(&self, cell: [usize; 2]) -> Option<f32> {
        self.data.get([0, cell[0], cell[1]]).copied()
    }

    /// Returns the regression values of a cell as an [`EncodedPose`].
    pub fn encoded_pose(&self, cell: [usize; 2]) -> Option<EncodedPose> {
        let mut values = [0.0; NUM_POSE_FIELDS];
        for (channel, value) in values.iter_mut().enumerate() {
            *value = *self.data.get([channel + 1, cell[0], cell[1]])? as f64;
        }
        Some(EncodedPose::from_values(values))
    }

    /// Returns the cells whose logit is strictly above `threshold`, in row-major order.
    pub fn cells_above(&self, threshold: f64) -> Vec<[usize; 2]> {
        let [rows, cols] = self.grid_shape();
        self.data.as_slice()[..rows * cols]
            .iter()
            .enumerate()
            .filter(|(_, logit)| **logit as f64 > threshold)
            .map(|(offset, _)| [offset / cols, offset % cols])
            .collect()
    }

    /// Returns the underlying tensor.
    pub fn as_tensor(&self) -> &Tensor3<f32> {
        &self.data
    }
}

impl TryFrom<Tensor3<f32>> for DensePrediction {
    type Error = DecodeError;

    fn try_from(data: Tensor3<f32>) -> Result<Self, Self::Error> {
        Self::new(data)
    }
}

impl From<DensePrediction> for Tensor3<f32> {
    fn from(prediction: DensePrediction) -> Self {
        prediction.data
    }
}

impl bincode::enc::Encode for DensePrediction {
    fn encode<E: bincode::enc::Encoder>(
        &self,
        encoder: &mut E,
    ) -> Result<(), bincode::error::EncodeError> {
        bincode::Encode::encode(&self.data, encoder)
    }
}

impl<C> bincode::de::Decode<C> for DensePrediction {
    fn decode<D: bincode::de::Decoder<Context = C>>(
        decoder: &mut D,
    ) -> Result<Self, bincode::error::DecodeError> {
        let data: Tensor3<f32> = bincode::Decode::decode(decoder)?;
        Self::new(data).map_err(|e| bincode::error::DecodeError::OtherString(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carpose_tensor::TensorError;

    fn prediction() -> Result<DensePrediction, DecodeError> {
        let data = Tensor3::from_shape_fn([NUM_PREDICTION_CHANNELS, 2, 3], |[c, r, col]| {
            if c == 0 {
                (r * 3 + col) as f32 - 2.5
            } else {
                (c * 100 + r * 10 + col) as f32
            }
        });
        DensePrediction::new(data)
    }

    #[test]
    fn test_new_checks_channels() {
        let res = DensePrediction::new(Tensor3::zeros([3, 2, 2]));
        assert_eq!(
            res,
            Err(DecodeError::InvalidChannels {
                expected: 8,
                actual: 3
            })
        );
    }

    #[test]
    fn test_accessors() -> Result<(), DecodeError> {
        let p = prediction()?;
        assert_eq!(p.grid_shape(), [2, 3]);
        assert_eq!(p.logit([1, 2]), Some(2.5));
        assert_eq!(p.logit([2, 0]), None);
        let encoded = p.encoded_pose([1, 0]).ok_or(TensorError::index_out_of_bounds(1, 2))?;
        assert_eq!(encoded.as_array(), &[110.0, 210.0, 310.0, 410.0, 510.0, 610.0, 710.0]);
        assert_eq!(p.cells_above(0.0), vec![[1, 0], [1, 1], [1, 2]]);
        assert_eq!(p.cells_above(1.0), vec![[1, 1], [1, 2]]);
        assert!(p.cells_above(10.0).is_empty());
        Ok(())
    }

    #[test]
    fn test_from_parts() -> Result<(), DecodeError> {
        let logits = Tensor2::from_shape_val([2, 2], 1.0);
        let regression = Tensor3::from_shape_val([NUM_POSE_FIELDS, 2, 2], 0.5);
        let p = DensePrediction::from_parts(&logits, &regression)?;
        assert_eq!(p.as_tensor().shape, [8, 2, 2]);
        assert_eq!(p.logit([1, 1]), Some(1.0));

        let bad = Tensor3::from_shape_val([NUM_POSE_FIELDS, 2, 3], 0.5);
        assert!(matches!(
            DensePrediction::from_parts(&logits, &bad),
            Err(DecodeError::GridMismatch { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_serialization() -> Result<(), Box<dyn std::error::Error>> {
        let p = prediction()?;

        let json = serde_json::to_string(&p)?;
        let from_json: DensePrediction = serde_json::from_str(&json)?;
        assert_eq!(from_json, p);

        let config = bincode::config::standard();
        let bytes = bincode::encode_to_vec(&p, config)?;
        let (from_bytes, _): (DensePrediction, usize) = bincode::decode_from_slice(&bytes, config)?;
        assert_eq!(from_bytes, p);

        let bad = r#"{"data":[0.0,0.0],"shape":[2,1,1]}"#;
        assert!(serde_json::from_str::<DensePrediction>(bad).is_err());
        Ok(())
    }
}
