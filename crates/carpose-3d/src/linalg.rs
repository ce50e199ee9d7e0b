/// Transform a set of points using a rotation and translation.
///
/// Computes `dst = dst_R_src * src + dst_t_src` for every point with a single
/// 3xN matrix product.
///
/// # Arguments
///
/// * `src_points` - A set of points to be transformed.
/// * `dst_r_src` - A row-major rotation matrix.
/// * `dst_t_src` - A translation vector.
///
/// # Returns
///
/// The transformed points, in the same order as the input.
///
/// Example:
///
/// ```
/// use carpose_3d::linalg::transform_points;
///
/// let src_points = vec![[2.0, 2.0, 2.0], [3.0, 4.0, 5.0]];
/// let rotation = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
/// let translation = [1.0, 0.0, 0.0];
/// let dst_points = transform_points(&src_points, &rotation, &translation);
/// assert_eq!(dst_points[0], [3.0, 2.0, 2.0]);
/// ```
pub fn transform_points(
    src_points: &[[f64; 3]],
    dst_r_src: &[[f64; 3]; 3],
    dst_t_src: &[f64; 3],
) -> Vec<[f64; 3]> {
    let rotation = faer::Mat::<f64>::from_fn(3, 3, |i, j| dst_r_src[i][j]);
    // one column per point
    let points_in_src = faer::Mat::<f64>::from_fn(3, src_points.len(), |i, j| src_points[j][i]);

    let points_in_dst = &rotation * &points_in_src;

    (0..src_points.len())
        .map(|j| {
            [
                points_in_dst.read(0, j) + dst_t_src[0],
                points_in_dst.read(1, j) + dst_t_src[1],
                points_in_dst.read(2, j) + dst_t_src[2],
            ]
        })
        .collect()
}
