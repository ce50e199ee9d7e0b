use crate::Tensor;

use bincode::de::{Decode, Decoder};
use bincode::enc::{Encode, Encoder};
use bincode::error::{DecodeError, EncodeError};

// The shape goes first so the decoder can validate the element count.
impl<T: Encode, const N: usize> Encode for Tensor<T, N> {
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        self.shape.encode(encoder)?;
        self.as_slice().encode(encoder)
    }
}

impl<T: Decode<C>, const N: usize, C> Decode<C> for Tensor<T, N> {
    fn decode<D: Decoder<Context = C>>(decoder: &mut D) -> Result<Self, DecodeError> {
        let shape = <[usize; N]>::decode(decoder)?;
        let data = Vec::<T>::decode(decoder)?;
        Tensor::from_shape_vec(shape, data).map_err(|e| DecodeError::OtherString(e.to_string()))
    }
}
