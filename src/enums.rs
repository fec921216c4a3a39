/// How a sample grid is stretched onto a target pixel grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Interpolation {
    /// Order-1 interpolation with corner-aligned sampling. Single-sample grids
    /// fall back to [`Interpolation::Nearest`].
    #[default]
    Bilinear,
    /// Replicate each source cell `ceil(scale)` times and crop to size.
    Nearest,
}

/// Ordering applied to the instances of a series before they are turned
/// into a curve.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortBy {
    ImagePositionPatient,
    TablePosition,
    #[default]
    InstanceNumber,
    None,
}

/// What to do with a table cell that does not parse as a number.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CellPolicy {
    /// Fail the whole import with the cell's position.
    #[default]
    Reject,
    /// Treat the cell as `0.0`.
    Zero,
    /// Treat the cell as "no data".
    Nan,
}
