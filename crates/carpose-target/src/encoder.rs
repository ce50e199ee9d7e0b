use carpose_3d::CameraIntrinsic;
use carpose_pose::{encode_pose, CarPose, NUM_POSE_FIELDS, POSE_FIELDS};
use carpose_tensor::{Tensor2, Tensor3};
use serde::{Deserialize, Serialize};

use crate::{
    error::EncodeError,
    flip::flip_columns,
    geometry::{FrameGeometry, ImageSize},
};

/// Dense training target for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetTensor {
    /// Occupancy mask with shape `[rows, cols]`, 1 at occupied cells and 0 elsewhere.
    pub mask: Tensor2<f32>,
    /// Encoded poses with shape `[NUM_POSE_FIELDS, rows, cols]` in `POSE_FIELDS`
    /// channel order, zero at unoccupied cells.
    pub regression: Tensor3<f32>,
}

impl TargetTensor {
    /// Creates an empty target for a grid of the given size.
    pub fn zeros(grid: ImageSize) -> Self {
        Self {
            mask: Tensor2::zeros([grid.height, grid.width]),
            regression: Tensor3::zeros([NUM_POSE_FIELDS, grid.height, grid.width]),
        }
    }

    /// Returns the `[row, col]` of every occupied cell in row-major order.
    pub fn occupied_cells(&self) -> Vec<[usize; 2]> {
        let cols = self.mask.shape[1];
        self.mask
            .iter()
            .enumerate()
            .filter(|(_, m)| **m > 0.0)
            .map(|(offset, _)| [offset / cols, offset % cols])
            .collect()
    }

    /// Returns the regression values stored at a cell, or `None` outside the grid.
    pub fn values_at(&self, cell: [usize; 2]) -> Option<[f32; NUM_POSE_FIELDS]> {
        let mut values = [0.0; NUM_POSE_FIELDS];
        for (channel, value) in values.iter_mut().enumerate() {
            *value = *self.regression.get([channel, cell[0], cell[1]])?;
        }
        Some(values)
    }
}

/// Counters describing what happened to the instances of one image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeStats {
    /// Instances written into the target.
    pub encoded: usize,
    /// Instances whose cell falls outside the grid.
    pub out_of_bounds: usize,
    /// Instances that replaced an earlier instance at the same cell.
    pub overwritten: usize,
}

/// Turns ground-truth instances into an occupancy mask and a regression grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetEncoder {
    /// Camera used to project the instance centers.
    pub camera: CameraIntrinsic,
    /// Mapping between source pixels and grid cells.
    pub geometry: FrameGeometry,
}

impl TargetEncoder {
    /// Creates a new encoder.
    pub fn new(camera: CameraIntrinsic, geometry: FrameGeometry) -> Self {
        Self { camera, geometry }
    }

    /// Encode the instances of one image.
    ///
    /// Each instance center is projected into the source image and assigned to
    /// the nearest grid cell. When two instances share a cell the later one wins.
    /// With `flip` the poses are encoded mirrored and both grids are flipped
    /// left-right afterwards, matching a horizontally flipped input image.
    ///
    /// # Arguments
    ///
    /// * `image_size` - Size of the source image the labels refer to.
    /// * `instances` - The ground-truth poses.
    /// * `flip` - Whether the input image is flipped horizontally.
    ///
    /// # Returns
    ///
    /// The target tensors and the drop/collision counters.
    ///
    /// # Errors
    ///
    /// Fails if an instance lies behind the camera or the geometry is invalid
    /// for `image_size`.
    pub fn encode(
        &self,
        image_size: ImageSize,
        instances: &[CarPose],
        flip: bool,
    ) -> Result<(TargetTensor, EncodeStats), EncodeError> {
        let geometry = self.geometry.with_source_size(image_size);
        geometry.validate()?;

        let mut target = TargetTensor::zeros(geometry.grid_size());
        let mut stats = EncodeStats::default();

        for instance in instances {
            let pixel = self.camera.project(&instance.position.to_array())?;
            let grid = geometry.pixel_to_grid(&pixel);
            let Some([row, col]) = geometry.cell_of(&grid) else {
                log::debug!(
                    "dropping instance {:?} at grid {:?}: outside of the grid",
                    instance.id,
                    grid
                );
                stats.out_of_bounds += 1;
                continue;
            };

            if let Some(occupied) = target.mask.get_mut([row, col]) {
                if *occupied > 0.0 {
                    log::warn!(
                        "instance {:?} overwrites an earlier instance at cell [{}, {}]",
                        instance.id,
                        row,
                        col
                    );
                    stats.overwritten += 1;
                }
                *occupied = 1.0;
            }

            let encoded = encode_pose(instance, flip);
            for field in POSE_FIELDS {
                target
                    .regression
                    .set([field.index(), row, col], encoded.get(field) as f32)?;
            }
            stats.encoded += 1;
        }

        if flip {
            flip_columns(&mut target.mask);
            flip_columns(&mut target.regression);
        }

        Ok((target, stats))
    }
}
