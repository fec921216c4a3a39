//! Embedding a resampled field in the full frame of its base image.

use ndarray::{Array2, ArrayView2, s};
use tracing::debug;

use crate::error::BoundsError;
use crate::grid::SampleGrid;
use crate::resampler::{IntensityResampler, ResampledField};

/// Pixel size of the full base image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameSize {
    pub width: usize,
    pub height: usize,
}

impl FrameSize {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }
}

/// Sub-rectangle of a frame, top-left anchored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropRect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl CropRect {
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Check that the rectangle is non-empty and lies inside `frame`.
    pub fn validate(&self, frame: FrameSize) -> Result<(), BoundsError> {
        if self.width == 0 || self.height == 0 {
            return Err(BoundsError::EmptyCrop {
                x: self.x,
                y: self.y,
                width: self.width,
                height: self.height,
            });
        }
        let fits_x = self
            .x
            .checked_add(self.width)
            .is_some_and(|right| right <= frame.width);
        let fits_y = self
            .y
            .checked_add(self.height)
            .is_some_and(|bottom| bottom <= frame.height);
        if !fits_x || !fits_y {
            return Err(BoundsError::CropOutOfBounds {
                x: self.x,
                y: self.y,
                width: self.width,
                height: self.height,
                frame_width: frame.width,
                frame_height: frame.height,
            });
        }
        Ok(())
    }
}

/// Full-frame intensity array aligned 1:1 with the base image. Cells without
/// data are NaN and must be rendered transparent.
#[derive(Clone, Debug, PartialEq)]
pub struct CompositeField {
    data: Array2<f64>,
}

impl CompositeField {
    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    /// `(height, width)`
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    pub fn get(&self, col: usize, row: usize) -> Option<f64> {
        self.data.get([row, col]).copied()
    }

    /// Number of cells carrying a value.
    pub fn data_cells(&self) -> usize {
        self.data.iter().filter(|v| !v.is_nan()).count()
    }

    pub fn into_array(self) -> Array2<f64> {
        self.data
    }
}

pub struct CompositeFrameBuilder;

impl CompositeFrameBuilder {
    /// Place `resampled` in a frame of `full_size`.
    ///
    /// Without a crop the field must already cover the whole frame. With a
    /// crop the field must be exactly the crop's size; it is written into the
    /// crop rectangle and every other cell is NaN.
    ///
    /// # Errors
    ///
    /// Returns [`BoundsError`] when the crop is empty or leaves the frame, or
    /// when the field's shape does not match. Nothing is written on error.
    pub fn composite(
        resampled: &ResampledField,
        full_size: FrameSize,
        crop: Option<CropRect>,
    ) -> Result<CompositeField, BoundsError> {
        let Some(crop) = crop else {
            Self::expect_shape(resampled, full_size.width, full_size.height)?;
            return Ok(CompositeField {
                data: resampled.view().to_owned(),
            });
        };

        crop.validate(full_size)?;
        Self::expect_shape(resampled, crop.width, crop.height)?;

        let mut data = Array2::from_elem((full_size.height, full_size.width), f64::NAN);
        data.slice_mut(s![
            crop.y..crop.y + crop.height,
            crop.x..crop.x + crop.width
        ])
        .assign(&resampled.view());

        debug!(?crop, ?full_size, "composited cropped field");
        Ok(CompositeField { data })
    }

    /// Resample `grid` to the crop (or the whole frame) and composite it.
    ///
    /// Returns `Ok(None)` when the grid is empty.
    pub fn build(
        resampler: &mut IntensityResampler,
        grid: &SampleGrid,
        full_size: FrameSize,
        crop: Option<CropRect>,
    ) -> Result<Option<CompositeField>, BoundsError> {
        let (width, height) = match crop {
            Some(crop) => {
                crop.validate(full_size)?;
                (crop.width, crop.height)
            }
            None => (full_size.width, full_size.height),
        };

        resampler
            .resample(grid, width, height)?
            .map(|field| Self::composite(field, full_size, crop))
            .transpose()
    }

    fn expect_shape(
        resampled: &ResampledField,
        width: usize,
        height: usize,
    ) -> Result<(), BoundsError> {
        if resampled.shape() != (height, width) {
            return Err(BoundsError::ShapeMismatch {
                expected_width: width,
                expected_height: height,
                actual_width: resampled.width(),
                actual_height: resampled.height(),
            });
        }
        Ok(())
    }
}
