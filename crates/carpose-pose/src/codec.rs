//! Regression codec between a [`CarPose`] and the per-cell network values.
//!
//! Encoding scales the translation down by [`TRANSLATION_SCALE`], rotates the
//! roll by half a turn and replaces the pitch by its sine and cosine. The values
//! are laid out in [`POSE_FIELDS`] order, which is the alphabetical order of the
//! field names. Target grids and network outputs share this layout, so the
//! order must never change independently on either side.
//!
//! Pitch recovery uses `acos(cos) * sign(sin)` on the renormalized pair. The
//! result is exact inside `(-pi, pi)`; at exactly `+-pi` the sine is numerically
//! zero and the sign is lost.

use std::f64::consts::PI;

use crate::{
    angle::{sign, wrap_angle},
    error::PoseError,
    pose::{CarPose, Orientation, Position},
};

/// Meters per regression unit for the translation fields.
pub const TRANSLATION_SCALE: f64 = 100.0;

/// Smallest accepted norm of the regressed pitch sine/cosine pair.
pub const MIN_PITCH_NORM: f64 = 1e-12;

/// Number of regression values per grid cell.
pub const NUM_POSE_FIELDS: usize = 7;

/// A named regression value.
///
/// The discriminant is the channel index of the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoseField {
    /// Cosine of the pitch.
    PitchCos = 0,
    /// Sine of the pitch.
    PitchSin = 1,
    /// Roll rotated by half a turn.
    Roll = 2,
    /// Scaled lateral position.
    X = 3,
    /// Scaled vertical position.
    Y = 4,
    /// Yaw, unchanged.
    Yaw = 5,
    /// Scaled depth.
    Z = 6,
}

/// Channel layout of the regression values, sorted by field name.
pub const POSE_FIELDS: [PoseField; NUM_POSE_FIELDS] = [
    PoseField::PitchCos,
    PoseField::PitchSin,
    PoseField::Roll,
    PoseField::X,
    PoseField::Y,
    PoseField::Yaw,
    PoseField::Z,
];

impl PoseField {
    /// Returns the field name.
    pub const fn name(&self) -> &'static str {
        match self {
            PoseField::PitchCos => "pitch_cos",
            PoseField::PitchSin => "pitch_sin",
            PoseField::Roll => "roll",
            PoseField::X => "x",
            PoseField::Y => "y",
            PoseField::Yaw => "yaw",
            PoseField::Z => "z",
        }
    }

    /// Returns the channel index of the field.
    #[inline]
    pub const fn index(&self) -> usize {
        *self as usize
    }
}

/// The regression values of one pose in [`POSE_FIELDS`] order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodedPose([f64; NUM_POSE_FIELDS]);

impl EncodedPose {
    /// Wraps values already laid out in [`POSE_FIELDS`] order.
    pub fn from_values(values: [f64; NUM_POSE_FIELDS]) -> Self {
        Self(values)
    }

    /// Builds an encoded pose from a slice in [`POSE_FIELDS`] order.
    ///
    /// # Errors
    ///
    /// [`PoseError::InvalidFieldCount`] if the slice length differs from
    /// [`NUM_POSE_FIELDS`].
    pub fn from_slice(values: &[f64]) -> Result<Self, PoseError> {
        let values: [f64; NUM_POSE_FIELDS] =
            values.try_into().map_err(|_| PoseError::InvalidFieldCount {
                expected: NUM_POSE_FIELDS,
                actual: values.len(),
            })?;
        Ok(Self(values))
    }

    /// Returns the value of a field.
    #[inline]
    pub fn get(&self, field: PoseField) -> f64 {
        self.0[field.index()]
    }

    /// Returns the values in [`POSE_FIELDS`] order.
    pub fn as_array(&self) -> &[f64; NUM_POSE_FIELDS] {
        &self.0
    }
}

/// Encode a pose into regression values.
///
/// # Arguments
///
/// * `pose` - The ground-truth pose.
/// * `flip` - Whether the image is mirrored left-right; negates x, pitch and roll.
///
/// # Example
///
/// ```
/// use carpose_pose::{encode_pose, CarPose, Orientation, PoseField, Position};
///
/// let pose = CarPose::ground_truth(1, Position::new(3.0, -1.5, 20.0), Orientation::new(0.1, 0.0, 0.0));
/// let encoded = encode_pose(&pose, false);
/// assert_eq!(encoded.get(PoseField::Z), 0.2);
/// assert_eq!(encoded.get(PoseField::PitchCos), 1.0);
/// ```
pub fn encode_pose(pose: &CarPose, flip: bool) -> EncodedPose {
    let Position { mut x, y, z } = pose.position;
    let Orientation {
        yaw,
        mut pitch,
        mut roll,
    } = pose.orientation;

    if flip {
        x = -x;
        pitch = -pitch;
        roll = -roll;
    }

    let mut values = [0.0; NUM_POSE_FIELDS];
    values[PoseField::X.index()] = x / TRANSLATION_SCALE;
    values[PoseField::Y.index()] = y / TRANSLATION_SCALE;
    values[PoseField::Z.index()] = z / TRANSLATION_SCALE;
    values[PoseField::Roll.index()] = wrap_angle(roll, PI);
    values[PoseField::PitchSin.index()] = pitch.sin();
    values[PoseField::PitchCos.index()] = pitch.cos();
    values[PoseField::Yaw.index()] = yaw;

    EncodedPose(values)
}

/// Decode regression values into a pose without id nor confidence.
///
/// The pitch sine and cosine are renormalized to the unit circle first, the
/// network output is not constrained to it.
///
/// # Errors
///
/// [`PoseError::DegeneratePitch`] when the sine/cosine pair has a norm below
/// [`MIN_PITCH_NORM`] or is not finite.
pub fn decode_pose(encoded: &EncodedPose) -> Result<CarPose, PoseError> {
    let sin = encoded.get(PoseField::PitchSin);
    let cos = encoded.get(PoseField::PitchCos);
    let norm = (sin * sin + cos * cos).sqrt();
    // also rejects NaN
    if !(norm >= MIN_PITCH_NORM) || !norm.is_finite() {
        return Err(PoseError::DegeneratePitch { sin, cos });
    }
    let (sin, cos) = (sin / norm, cos / norm);
    let pitch = cos.clamp(-1.0, 1.0).acos() * sign(sin);

    let position = Position::new(
        encoded.get(PoseField::X) * TRANSLATION_SCALE,
        encoded.get(PoseField::Y) * TRANSLATION_SCALE,
        encoded.get(PoseField::Z) * TRANSLATION_SCALE,
    );
    let orientation = Orientation::new(
        encoded.get(PoseField::Yaw),
        pitch,
        wrap_angle(encoded.get(PoseField::Roll), -PI),
    );

    Ok(CarPose {
        id: None,
        position,
        orientation,
        confidence: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn random_pose(rng: &mut StdRng) -> CarPose {
        CarPose::ground_truth(
            rng.random_range(0..1000),
            Position::new(
                rng.random_range(-40.0..40.0),
                rng.random_range(-2.0..15.0),
                rng.random_range(2.0..200.0),
            ),
            Orientation::new(
                rng.random_range(-3.1..3.1),
                rng.random_range(-3.1..3.1),
                rng.random_range(-3.1..3.1),
            ),
        )
    }

    #[test]
    fn test_field_order_is_alphabetical() {
        let names = POSE_FIELDS.iter().map(|f| f.name()).collect::<Vec<_>>();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        for (i, field) in POSE_FIELDS.iter().enumerate() {
            assert_eq!(field.index(), i);
        }
    }

    #[test]
    fn test_encode_values() {
        let pose = CarPose::ground_truth(
            1,
            Position::new(3.0, -1.5, 20.0),
            Orientation::new(0.1, 0.2, 0.05),
        );
        let encoded = encode_pose(&pose, false);
        assert_relative_eq!(encoded.get(PoseField::X), 0.03);
        assert_relative_eq!(encoded.get(PoseField::Y), -0.015);
        assert_relative_eq!(encoded.get(PoseField::Z), 0.2);
        assert_relative_eq!(encoded.get(PoseField::Yaw), 0.1);
        assert_relative_eq!(encoded.get(PoseField::PitchSin), 0.2f64.sin());
        assert_relative_eq!(encoded.get(PoseField::PitchCos), 0.2f64.cos());
        assert_relative_eq!(encoded.get(PoseField::Roll), 0.05 - PI, epsilon = 1e-12);
    }

    #[test]
    fn test_round_trip() -> Result<(), PoseError> {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..500 {
            let pose = random_pose(&mut rng);
            let decoded = decode_pose(&encode_pose(&pose, false))?;
            assert_eq!(decoded.id, None);
            assert_eq!(decoded.confidence, None);
            assert_relative_eq!(decoded.position.x, pose.position.x, epsilon = 1e-9);
            assert_relative_eq!(decoded.position.y, pose.position.y, epsilon = 1e-9);
            assert_relative_eq!(decoded.position.z, pose.position.z, epsilon = 1e-9);
            assert_relative_eq!(decoded.orientation.yaw, pose.orientation.yaw);
            assert_relative_eq!(decoded.orientation.pitch, pose.orientation.pitch, epsilon = 1e-9);
            assert_relative_eq!(decoded.orientation.roll, pose.orientation.roll, epsilon = 1e-9);
        }
        Ok(())
    }

    #[test]
    fn test_flip_symmetry() -> Result<(), PoseError> {
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..500 {
            let pose = random_pose(&mut rng);
            let decoded = decode_pose(&encode_pose(&pose, true))?;
            assert_relative_eq!(decoded.position.x, -pose.position.x, epsilon = 1e-9);
            assert_relative_eq!(decoded.position.y, pose.position.y, epsilon = 1e-9);
            assert_relative_eq!(decoded.position.z, pose.position.z, epsilon = 1e-9);
            assert_relative_eq!(decoded.orientation.yaw, pose.orientation.yaw);
            assert_relative_eq!(decoded.orientation.pitch, -pose.orientation.pitch, epsilon = 1e-9);
            assert_relative_eq!(
                decoded.orientation.roll,
                wrap_angle(-pose.orientation.roll, 0.0),
                epsilon = 1e-9
            );
        }
        Ok(())
    }

    #[test]
    fn test_decode_renormalizes_pitch() -> Result<(), PoseError> {
        let mut values = [0.0; NUM_POSE_FIELDS];
        values[PoseField::PitchSin.index()] = -3.0 * 0.4f64.sin();
        values[PoseField::PitchCos.index()] = 3.0 * 0.4f64.cos();
        values[PoseField::Z.index()] = 0.1;
        let decoded = decode_pose(&EncodedPose::from_values(values))?;
        assert_relative_eq!(decoded.orientation.pitch, -0.4, epsilon = 1e-12);
        assert_relative_eq!(decoded.position.z, 10.0, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn test_decode_zero_sine() -> Result<(), PoseError> {
        let mut values = [0.0; NUM_POSE_FIELDS];
        values[PoseField::PitchCos.index()] = 0.5;
        let decoded = decode_pose(&EncodedPose::from_values(values))?;
        assert_eq!(decoded.orientation.pitch, 0.0);
        Ok(())
    }

    #[test]
    fn test_decode_degenerate_pitch() {
        let values = [0.0; NUM_POSE_FIELDS];
        assert_eq!(
            decode_pose(&EncodedPose::from_values(values)),
            Err(PoseError::DegeneratePitch { sin: 0.0, cos: 0.0 })
        );

        let mut values = [0.0; NUM_POSE_FIELDS];
        values[PoseField::PitchSin.index()] = f64::NAN;
        assert!(matches!(
            decode_pose(&EncodedPose::from_values(values)),
            Err(PoseError::DegeneratePitch { .. })
        ));
    }

    #[test]
    fn test_from_slice() {
        assert!(EncodedPose::from_slice(&[0.0; NUM_POSE_FIELDS]).is_ok());
        assert_eq!(
            EncodedPose::from_slice(&[0.0; 6]),
            Err(PoseError::InvalidFieldCount {
                expected: 7,
                actual: 6
            })
        );
    }
}
