use thiserror::Error;

/// Raster geometry that cannot be used to place a world point.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Raster has no patient geometry")]
    MissingGeometry,

    #[error("Invalid pixel spacing (row {row}, column {column})")]
    InvalidSpacing { row: f64, column: f64 },

    #[error("Degenerate orientation vector {0:?}")]
    DegenerateOrientation([f64; 3]),

    #[error("Non-finite point {0:?}")]
    NonFinitePoint([f64; 3]),
}

/// A field, crop rectangle or target size that does not fit its frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BoundsError {
    #[error("Target size {width}x{height} is empty")]
    EmptyTarget { width: usize, height: usize },

    #[error("Crop rectangle {width}x{height} at ({x}, {y}) is empty")]
    EmptyCrop {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },

    #[error(
        "Crop rectangle {width}x{height} at ({x}, {y}) exceeds frame {frame_width}x{frame_height}"
    )]
    CropOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        frame_width: usize,
        frame_height: usize,
    },

    #[error("Field of {actual_width}x{actual_height} does not match expected {expected_width}x{expected_height}")]
    ShapeMismatch {
        expected_width: usize,
        expected_height: usize,
        actual_width: usize,
        actual_height: usize,
    },
}

/// A table cell that is not a number.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Empty cell")]
    Empty,

    #[error("Invalid number {0:?}")]
    Invalid(String),

    #[error("Cell ({row}, {col}): {source}")]
    AtCell {
        row: usize,
        col: usize,
        #[source]
        source: Box<ParseError>,
    },
}
