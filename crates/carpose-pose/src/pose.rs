use serde::{Deserialize, Serialize};

/// Car center in camera coordinates, in meters.
///
/// `x` points right, `y` points down and `z` is the depth along the optical axis.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Lateral offset.
    pub x: f64,
    /// Vertical offset.
    pub y: f64,
    /// Depth, positive in front of the camera.
    pub z: f64,
}

impl Position {
    /// Creates a new position.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Returns the position as `[x, y, z]`.
    pub fn to_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

/// Car body rotation as Euler angles in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Orientation {
    /// Yaw angle.
    pub yaw: f64,
    /// Pitch angle.
    pub pitch: f64,
    /// Roll angle.
    pub roll: f64,
}

impl Orientation {
    /// Creates a new orientation.
    pub fn new(yaw: f64, pitch: f64, roll: f64) -> Self {
        Self { yaw, pitch, roll }
    }

    /// Returns the orientation as `[yaw, pitch, roll]`.
    pub fn to_array(&self) -> [f64; 3] {
        [self.yaw, self.pitch, self.roll]
    }
}

/// One vehicle instance.
///
/// Ground-truth instances carry an `id` and no `confidence`; decoded detections
/// carry a `confidence` and no `id`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CarPose {
    /// Instance identifier from the label file.
    pub id: Option<i64>,
    /// Car center.
    pub position: Position,
    /// Car rotation.
    pub orientation: Orientation,
    /// Detection confidence in `[0, 1]`.
    pub confidence: Option<f64>,
}

impl CarPose {
    /// Creates a ground-truth pose.
    pub fn ground_truth(id: i64, position: Position, orientation: Orientation) -> Self {
        Self {
            id: Some(id),
            position,
            orientation,
            confidence: None,
        }
    }

    /// Creates a detected pose with a confidence.
    pub fn detection(position: Position, orientation: Orientation, confidence: f64) -> Self {
        Self {
            id: None,
            position,
            orientation,
            confidence: Some(confidence),
        }
    }

    /// Returns a copy with the position replaced.
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }
}
