use thiserror::Error;

/// Error type for tensor operations.
#[derive(Error, Debug, PartialEq)]
pub enum TensorError {
    /// The data length does not match the number of elements of the shape.
    #[error("Shape {shape:?} holds {expected} elements but the data has {actual}")]
    InvalidShape {
        /// The requested shape.
        shape: Vec<usize>,
        /// Number of elements implied by the shape.
        expected: usize,
        /// Length of the provided data.
        actual: usize,
    },

    /// An index component is outside its dimension.
    #[error("Index {index} out of bounds for dimension of size {size}")]
    IndexOutOfBounds {
        /// The offending index component.
        index: usize,
        /// Size of the dimension.
        size: usize,
    },
}

impl TensorError {
    /// Shorthand for [`TensorError::IndexOutOfBounds`].
    pub fn index_out_of_bounds(index: usize, size: usize) -> Self {
        Self::IndexOutOfBounds { index, size }
    }
}

/// Row-major strides of a shape, in elements.
///
/// # Example
///
/// ```
/// use carpose_tensor::row_major_strides;
///
/// assert_eq!(row_major_strides([8, 40, 128]), [5120, 128, 1]);
/// ```
pub fn row_major_strides<const N: usize>(shape: [usize; N]) -> [usize; N] {
    let mut strides = [1; N];
    for axis in (0..N.saturating_sub(1)).rev() {
        strides[axis] = strides[axis + 1] * shape[axis + 1];
    }
    strides
}

/// An owned, contiguous, row-major N-dimensional array.
///
/// Dense grids are stored channel first, so a `Tensor<f32, 3>` of shape
/// `[channels, rows, cols]` keeps every channel plane contiguous.
///
/// ```rust
/// use carpose_tensor::Tensor2;
///
/// let t = Tensor2::<u8>::from_shape_vec([2, 2], vec![1, 2, 3, 4]).unwrap();
/// assert_eq!(t.shape, [2, 2]);
/// assert_eq!(t.strides, [2, 1]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T, const N: usize> {
    pub(crate) data: Vec<T>,
    /// Size of every dimension.
    pub shape: [usize; N],
    /// Distance in elements between consecutive indices of every dimension.
    pub strides: [usize; N],
}

impl<T, const N: usize> Tensor<T, N> {
    /// Wrap `data` with the given shape.
    ///
    /// # Errors
    ///
    /// [`TensorError::InvalidShape`] when `data` does not have exactly as many
    /// elements as the shape.
    pub fn from_shape_vec(shape: [usize; N], data: Vec<T>) -> Result<Self, TensorError> {
        let expected = shape.iter().product::<usize>();
        if expected != data.len() {
            return Err(TensorError::InvalidShape {
                shape: shape.to_vec(),
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            shape,
            strides: row_major_strides(shape),
        })
    }

    /// A tensor with every element set to `value`.
    pub fn from_shape_val(shape: [usize; N], value: T) -> Self
    where
        T: Clone,
    {
        Self {
            data: vec![value; shape.iter().product()],
            shape,
            strides: row_major_strides(shape),
        }
    }

    /// A tensor whose elements are produced from their index.
    ///
    /// ```
    /// use carpose_tensor::Tensor2;
    ///
    /// let t = Tensor2::<usize>::from_shape_fn([2, 3], |[r, c]| r * 10 + c);
    /// assert_eq!(t.as_slice(), &[0, 1, 2, 10, 11, 12]);
    /// ```
    pub fn from_shape_fn<F>(shape: [usize; N], f: F) -> Self
    where
        F: Fn([usize; N]) -> T,
    {
        let strides = row_major_strides(shape);
        let numel = shape.iter().product::<usize>();
        let data = (0..numel).map(|offset| f(unravel(offset, strides))).collect();
        Self {
            data,
            shape,
            strides,
        }
    }

    /// A tensor filled with zeros.
    pub fn zeros(shape: [usize; N]) -> Self
    where
        T: num_traits::Zero + Clone,
    {
        Self::from_shape_val(shape, T::zero())
    }

    /// Number of elements.
    #[inline]
    pub fn numel(&self) -> usize {
        self.data.len()
    }

    /// The elements in memory order.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// The elements in memory order, mutably.
    #[inline]
    pub fn as_slice_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    fn offset(&self, index: [usize; N]) -> Result<usize, TensorError> {
        index
            .iter()
            .zip(self.shape)
            .zip(self.strides)
            .try_fold(0, |offset, ((&idx, size), stride)| {
                if idx < size {
                    Ok(offset + idx * stride)
                } else {
                    Err(TensorError::index_out_of_bounds(idx, size))
                }
            })
    }

    /// The element at `index`, or `None` outside the tensor.
    ///
    /// ```
    /// use carpose_tensor::Tensor2;
    ///
    /// let t = Tensor2::<u8>::from_shape_vec([2, 2], vec![1, 2, 3, 4]).unwrap();
    /// assert_eq!(t.get([1, 0]), Some(&3));
    /// assert!(t.get([2, 0]).is_none());
    /// ```
    pub fn get(&self, index: [usize; N]) -> Option<&T> {
        let offset = self.offset(index).ok()?;
        self.data.get(offset)
    }

    /// Mutable access to the element at `index`, or `None` outside the tensor.
    pub fn get_mut(&mut self, index: [usize; N]) -> Option<&mut T> {
        let offset = self.offset(index).ok()?;
        self.data.get_mut(offset)
    }

    /// Overwrite the element at `index`.
    ///
    /// # Errors
    ///
    /// [`TensorError::IndexOutOfBounds`] for the first index component outside its dimension.
    pub fn set(&mut self, index: [usize; N], value: T) -> Result<(), TensorError> {
        let offset = self.offset(index)?;
        self.data[offset] = value;
        Ok(())
    }

    /// Element-wise conversion into a tensor of the same shape.
    pub fn map<U, F>(&self, f: F) -> Tensor<U, N>
    where
        F: Fn(&T) -> U,
    {
        Tensor {
            data: self.data.iter().map(f).collect(),
            shape: self.shape,
            strides: self.strides,
        }
    }

    /// Iterate over the elements in memory order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }
}

fn unravel<const N: usize>(mut offset: usize, strides: [usize; N]) -> [usize; N] {
    let mut index = [0; N];
    for (idx, stride) in index.iter_mut().zip(strides) {
        // zero-sized dimensions produce no offsets, so stride is never zero here
        *idx = offset / stride;
        offset %= stride;
    }
    index
}
