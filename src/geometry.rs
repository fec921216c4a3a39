//! Placement of patient-space points on a 2D reference raster.
//!
//! Pixel coordinates follow image indexing everywhere in this crate: `(0, 0)`
//! is the centre of the top-left pixel, columns grow to the right and rows
//! grow downwards.

use crate::error::GeometryError;

const DEGENERATE_LENGTH: f64 = 1e-12;

/// Physical placement of a raster, as carried by DICOM image planes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RasterGeometry {
    /// Patient position of the first transmitted pixel (ImagePositionPatient).
    pub origin: [f64; 3],
    /// Direction cosines from ImageOrientationPatient: `[0]` points along a
    /// row (increasing column index), `[1]` down a column (increasing row
    /// index).
    pub orientation: [[f64; 3]; 2],
    /// `(row spacing, column spacing)` in PixelSpacing order.
    pub spacing: (f64, f64),
}

impl RasterGeometry {
    pub fn new(origin: [f64; 3], orientation: [[f64; 3]; 2], spacing: (f64, f64)) -> Self {
        Self {
            origin,
            orientation,
            spacing,
        }
    }

    /// Build from the flat DICOM attribute values. Returns `None` when a list
    /// has too few entries.
    pub fn from_dicom_values(
        image_position: &[f64],
        image_orientation: &[f64],
        pixel_spacing: &[f64],
    ) -> Option<Self> {
        if image_position.len() < 3 || image_orientation.len() < 6 || pixel_spacing.len() < 2 {
            return None;
        }
        Some(Self {
            origin: [image_position[0], image_position[1], image_position[2]],
            orientation: [
                [
                    image_orientation[0],
                    image_orientation[1],
                    image_orientation[2],
                ],
                [
                    image_orientation[3],
                    image_orientation[4],
                    image_orientation[5],
                ],
            ],
            spacing: (pixel_spacing[0], pixel_spacing[1]),
        })
    }

    fn validate(&self) -> Result<(), GeometryError> {
        let (row, column) = self.spacing;
        if !row.is_finite() || !column.is_finite() || row == 0.0 || column == 0.0 {
            return Err(GeometryError::InvalidSpacing { row, column });
        }
        for direction in &self.orientation {
            let length = dot(direction, direction).sqrt();
            if !length.is_finite() || length < DEGENERATE_LENGTH {
                return Err(GeometryError::DegenerateOrientation(*direction));
            }
        }
        Ok(())
    }
}

/// A base image: pixel dimensions and, when known, its patient geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Raster {
    pub width: usize,
    pub height: usize,
    pub geometry: Option<RasterGeometry>,
}

impl Raster {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            geometry: None,
        }
    }

    pub fn with_geometry(mut self, geometry: RasterGeometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    /// `(width, height)`
    pub fn dim(&self) -> (usize, usize) {
        (self.width, self.height)
    }
}

/// Sub-pixel position on a raster.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelCoord {
    pub col: f64,
    pub row: f64,
}

impl PixelCoord {
    pub fn new(col: f64, row: f64) -> Self {
        Self { col, row }
    }

    /// Whether the coordinate falls on a pixel of a `width`×`height` raster.
    pub fn is_within(&self, width: usize, height: usize) -> bool {
        self.col >= -0.5
            && self.row >= -0.5
            && self.col < width as f64 - 0.5
            && self.row < height as f64 - 0.5
    }
}

pub struct CoordinateMapper;

impl CoordinateMapper {
    /// Project a patient-space point onto the pixel grid of `raster`.
    ///
    /// The displacement from the raster origin is projected onto each
    /// in-plane direction cosine and divided by the matching spacing. The
    /// orientation vectors are assumed to form an orthonormal basis, so no
    /// rotation is solved for. The result is not rounded.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] when the raster has no geometry, a spacing
    /// is zero or non-finite, or an orientation vector is degenerate. Callers
    /// are expected to skip the annotation in that case.
    pub fn world_to_pixel(point: [f64; 3], raster: &Raster) -> Result<PixelCoord, GeometryError> {
        let geometry = raster
            .geometry
            .as_ref()
            .ok_or(GeometryError::MissingGeometry)?;
        Self::project(point, geometry)
    }

    pub fn project(point: [f64; 3], geometry: &RasterGeometry) -> Result<PixelCoord, GeometryError> {
        geometry.validate()?;
        if point.iter().any(|c| !c.is_finite()) {
            return Err(GeometryError::NonFinitePoint(point));
        }

        let displacement = [
            point[0] - geometry.origin[0],
            point[1] - geometry.origin[1],
            point[2] - geometry.origin[2],
        ];
        let (row_spacing, column_spacing) = geometry.spacing;
        let [along_row, along_column] = &geometry.orientation;

        Ok(PixelCoord {
            col: dot(&displacement, along_row) / column_spacing,
            row: dot(&displacement, along_column) / row_spacing,
        })
    }
}

#[inline]
fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0].mul_add(b[0], a[1].mul_add(b[1], a[2] * b[2]))
}
