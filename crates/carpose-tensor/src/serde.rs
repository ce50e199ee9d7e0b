use crate::Tensor;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// Wire layout: `{"shape": [..], "data": [..]}` with data in row-major order.
impl<T: Serialize, const N: usize> Serialize for Tensor<T, N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Tensor", 2)?;
        state.serialize_field("shape", &self.shape[..])?;
        state.serialize_field("data", self.as_slice())?;
        state.end()
    }
}

impl<'de, T: Deserialize<'de>, const N: usize> Deserialize<'de> for Tensor<T, N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw<T> {
            shape: Vec<usize>,
            data: Vec<T>,
        }

        let raw = Raw::<T>::deserialize(deserializer)?;
        let rank = raw.shape.len();
        let shape: [usize; N] = raw.shape.try_into().map_err(|_| {
            serde::de::Error::custom(format!("expected a shape of rank {N}, got rank {rank}"))
        })?;
        Tensor::from_shape_vec(shape, raw.data).map_err(serde::de::Error::custom)
    }
}
