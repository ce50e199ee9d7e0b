use serde::{Deserialize, Serialize};

/// Image size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    /// Width of the image in pixels.
    pub width: usize,
    /// Height of the image in pixels.
    pub height: usize,
}

/// Error types for the frame geometry.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GeometryError {
    /// The source image is too small to be cropped and padded.
    #[error("Source image {0}x{1} is too small, it needs at least 6x2 pixels")]
    SourceTooSmall(usize, usize),

    /// The model scale does not leave at least one grid cell.
    #[error("Input size {width}x{height} with model scale {scale} gives an empty grid")]
    EmptyGrid {
        /// Network input width.
        width: usize,
        /// Network input height.
        height: usize,
        /// Downsampling factor.
        scale: usize,
    },
}

/// The mapping between source image pixels and prediction grid cells.
///
/// The network input is produced from the source image by
///
/// 1. keeping the lower half of the rows,
/// 2. padding `width / 6` columns on each side,
/// 3. resizing to `input_size`,
///
/// and the prediction grid is the input downsampled by `model_scale`.
///
/// Grid coordinates are `[row, col]` while pixels are `[u, v]` with `u` the
/// column, so the axes swap between the two.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameGeometry {
    /// Size of the camera image.
    pub source_size: ImageSize,
    /// Size of the network input.
    pub input_size: ImageSize,
    /// Downsampling factor between the network input and its output grid.
    pub model_scale: usize,
}

impl Default for FrameGeometry {
    fn default() -> Self {
        const INPUT_WIDTH: usize = 1024;
        Self {
            source_size: ImageSize {
                width: 3384,
                height: 2710,
            },
            input_size: ImageSize {
                width: INPUT_WIDTH,
                height: INPUT_WIDTH / 16 * 5,
            },
            model_scale: 8,
        }
    }
}

impl FrameGeometry {
    /// Returns a copy using another source image size.
    pub fn with_source_size(mut self, source_size: ImageSize) -> Self {
        self.source_size = source_size;
        self
    }

    /// Returns a copy using another network input size.
    pub fn with_input_size(mut self, input_size: ImageSize) -> Self {
        self.input_size = input_size;
        self
    }

    /// Returns a copy using another model scale.
    pub fn with_model_scale(mut self, model_scale: usize) -> Self {
        self.model_scale = model_scale;
        self
    }

    /// Check that the crop, padding and downsampling are well defined.
    pub fn validate(&self) -> Result<(), GeometryError> {
        if self.source_size.width < 6 || self.source_size.height < 2 {
            return Err(GeometryError::SourceTooSmall(
                self.source_size.width,
                self.source_size.height,
            ));
        }
        let grid = self.grid_size();
        if self.model_scale == 0 || grid.width == 0 || grid.height == 0 {
            return Err(GeometryError::EmptyGrid {
                width: self.input_size.width,
                height: self.input_size.height,
                scale: self.model_scale,
            });
        }
        Ok(())
    }

    /// Size of the prediction grid.
    pub fn grid_size(&self) -> ImageSize {
        if self.model_scale == 0 {
            return ImageSize {
                width: 0,
                height: 0,
            };
        }
        ImageSize {
            width: self.input_size.width / self.model_scale,
            height: self.input_size.height / self.model_scale,
        }
    }

    /// Number of rows cropped away at the top of the source image.
    #[inline]
    pub fn crop_rows(&self) -> usize {
        self.source_size.height / 2
    }

    /// Number of columns padded on each side of the source image.
    #[inline]
    pub fn pad_cols(&self) -> usize {
        self.source_size.width / 6
    }

    fn row_factor(&self) -> f64 {
        self.input_size.height as f64 / self.crop_rows() as f64 / self.model_scale as f64
    }

    fn col_factor(&self) -> f64 {
        self.input_size.width as f64
            / (self.source_size.width as f64 * 4.0 / 3.0)
            / self.model_scale as f64
    }

    /// Map a source pixel `[u, v]` to continuous grid coordinates `[row, col]`.
    ///
    /// # Example
    ///
    /// ```
    /// use carpose_target::FrameGeometry;
    ///
    /// let geometry = FrameGeometry::default();
    /// let [row, col] = geometry.pixel_to_grid(&[-564.0, 1355.0]);
    /// assert_eq!((row, col), (0.0, 0.0));
    /// ```
    pub fn pixel_to_grid(&self, pixel: &[f64; 2]) -> [f64; 2] {
        let [u, v] = *pixel;
        let row = (v - self.crop_rows() as f64) * self.row_factor();
        let col = (u + self.pad_cols() as f64) * self.col_factor();
        [row, col]
    }

    /// Map continuous grid coordinates `[row, col]` back to a source pixel `[u, v]`.
    pub fn grid_to_pixel(&self, grid: &[f64; 2]) -> [f64; 2] {
        let [row, col] = *grid;
        let u = col / self.col_factor() - self.pad_cols() as f64;
        let v = row / self.row_factor() + self.crop_rows() as f64;
        [u, v]
    }

    /// Round grid coordinates to the nearest cell.
    ///
    /// Halves round to even, like the tooling that produced the training data.
    ///
    /// # Returns
    ///
    /// `None` when the cell falls outside the grid.
    pub fn cell_of(&self, grid: &[f64; 2]) -> Option<[usize; 2]> {
        let size = self.grid_size();
        let row = round_half_even(grid[0]);
        let col = round_half_even(grid[1]);
        let inside = row >= 0.0
            && col >= 0.0
            && row < size.height as f64
            && col < size.width as f64;
        inside.then_some([row as usize, col as usize])
    }
}

fn round_half_even(value: f64) -> f64 {
    let rounded = value.round();
    if (rounded - value).abs() == 0.5 {
        2.0 * (value / 2.0).round()
    } else {
        rounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn test_default_grid() -> Result<(), GeometryError> {
        let geometry = FrameGeometry::default();
        geometry.validate()?;
        assert_eq!(
            geometry.grid_size(),
            ImageSize {
                width: 128,
                height: 40
            }
        );
        assert_eq!(geometry.crop_rows(), 1355);
        assert_eq!(geometry.pad_cols(), 564);
        Ok(())
    }

    #[test]
    fn test_pixel_to_grid_known_values() {
        let geometry = FrameGeometry::default();
        let [row, col] = geometry.pixel_to_grid(&[2031.920085, 1931.453825]);
        assert_relative_eq!(row, 17.017087, epsilon = 1e-5);
        assert_relative_eq!(col, 73.643123, epsilon = 1e-5);
        assert_eq!(geometry.cell_of(&[row, col]), Some([17, 74]));
    }

    #[test]
    fn test_cell_of_bounds() {
        let geometry = FrameGeometry::default();
        assert_eq!(geometry.cell_of(&[-0.4, 0.0]), Some([0, 0]));
        assert_eq!(geometry.cell_of(&[-0.6, 0.0]), None);
        assert_eq!(geometry.cell_of(&[39.4, 127.4]), Some([39, 127]));
        assert_eq!(geometry.cell_of(&[39.6, 10.0]), None);
        assert_eq!(geometry.cell_of(&[10.0, 127.6]), None);
        assert_eq!(geometry.cell_of(&[f64::NAN, 10.0]), None);
    }

    #[test]
    fn test_round_half_even() {
        assert_eq!(round_half_even(2.5), 2.0);
        assert_eq!(round_half_even(3.5), 4.0);
        assert_eq!(round_half_even(-0.5), 0.0);
        assert_eq!(round_half_even(-1.5), -2.0);
        assert_eq!(round_half_even(1.4999), 1.0);
    }

    #[test]
    fn test_grid_mapping_round_trip() {
        let geometry = FrameGeometry::default();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..1000 {
            // pixels inside the visible lower half
            let pixel = [rng.random_range(0.0..3384.0), rng.random_range(1355.0..2710.0)];
            let grid = geometry.pixel_to_grid(&pixel);
            let back = geometry.grid_to_pixel(&grid);
            assert_relative_eq!(back[0], pixel[0], epsilon = 1e-6);
            assert_relative_eq!(back[1], pixel[1], epsilon = 1e-6);

            let Some(cell) = geometry.cell_of(&grid) else {
                continue;
            };
            let center = geometry.grid_to_pixel(&[cell[0] as f64, cell[1] as f64]);
            let Some(again) = geometry.cell_of(&geometry.pixel_to_grid(&center)) else {
                panic!("cell center {center:?} maps outside the grid");
            };
            assert!(again[0].abs_diff(cell[0]) <= 1);
            assert!(again[1].abs_diff(cell[1]) <= 1);
        }
    }

    #[test]
    fn test_validate() {
        let geometry = FrameGeometry::default().with_source_size(ImageSize {
            width: 4,
            height: 100,
        });
        assert_eq!(geometry.validate(), Err(GeometryError::SourceTooSmall(4, 100)));

        let geometry = FrameGeometry::default().with_model_scale(0);
        assert!(matches!(
            geometry.validate(),
            Err(GeometryError::EmptyGrid { scale: 0, .. })
        ));
    }
}
