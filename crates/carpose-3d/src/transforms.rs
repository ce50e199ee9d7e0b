/// Compute the rotation matrix of a car body from its Euler angles.
///
/// The rotation is composed as `R = Ry(yaw) * Rx(pitch) * Rz(roll)`, with yaw
/// about the vertical camera axis, pitch about the lateral axis and roll about
/// the optical axis.
///
/// # Arguments
///
/// * `yaw` - Rotation about the y axis in radians.
/// * `pitch` - Rotation about the x axis in radians.
/// * `roll` - Rotation about the z axis in radians.
///
/// # Returns
///
/// The row-major rotation matrix.
///
/// Example:
///
/// ```
/// use carpose_3d::transforms::euler_to_rotation_matrix;
///
/// let rotation = euler_to_rotation_matrix(0.0, 0.0, 0.0);
/// assert_eq!(rotation, [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);
/// ```
pub fn euler_to_rotation_matrix(yaw: f64, pitch: f64, roll: f64) -> [[f64; 3]; 3] {
    let (sy, cy) = yaw.sin_cos();
    let (sp, cp) = pitch.sin_cos();
    let (sr, cr) = roll.sin_cos();

    let r_yaw = [[cy, 0.0, sy], [0.0, 1.0, 0.0], [-sy, 0.0, cy]];
    let r_pitch = [[1.0, 0.0, 0.0], [0.0, cp, -sp], [0.0, sp, cp]];
    let r_roll = [[cr, -sr, 0.0], [sr, cr, 0.0], [0.0, 0.0, 1.0]];

    mat33_mul(&r_yaw, &mat33_mul(&r_pitch, &r_roll))
}

/// Multiply two row-major 3x3 matrices.
pub fn mat33_mul(a: &[[f64; 3]; 3], b: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, val) in row.iter_mut().enumerate() {
            *val = (0..3).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    out
}

/// Transpose a row-major 3x3 matrix.
pub fn mat33_transpose(a: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, val) in row.iter_mut().enumerate() {
            *val = a[j][i];
        }
    }
    out
}
