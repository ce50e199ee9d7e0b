use carpose_tensor::Tensor;
use rayon::{iter::ParallelIterator, slice::ParallelSliceMut};

/// Mirror a tensor along its last axis in place.
///
/// For a mask `[H, W]` this flips every row left-right; for a regression grid
/// `[C, H, W]` it flips every row of every channel.
///
/// # Example
///
/// ```
/// use carpose_target::flip::flip_columns;
/// use carpose_tensor::Tensor2;
///
/// let mut t = Tensor2::<u8>::from_shape_vec([2, 3], vec![1, 2, 3, 4, 5, 6]).unwrap();
/// flip_columns(&mut t);
/// assert_eq!(t.as_slice(), &[3, 2, 1, 6, 5, 4]);
/// ```
pub fn flip_columns<T, const N: usize>(tensor: &mut Tensor<T, N>)
where
    T: Send,
{
    let cols = match tensor.shape.last() {
        Some(&cols) if cols > 1 => cols,
        _ => return,
    };

    tensor
        .as_slice_mut()
        .par_chunks_exact_mut(cols)
        .for_each(|row| row.reverse());
}
