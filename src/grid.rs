//! Sample grids: the small tables of readings that get stretched over an
//! image.

use std::{fs::File, io::Read, path::Path};

use csv::ReaderBuilder;
use ndarray::{Array1, Array2, ArrayView2, Axis, s};
use tracing::debug;

use crate::enums::CellPolicy;
use crate::error::ParseError;
use crate::loader::LoaderError;

/// Parse one table cell as a number.
///
/// Surrounding whitespace is ignored. Whether an empty or malformed cell
/// becomes zero, NaN or a rejected edit is up to the caller; see
/// [`CellPolicy`].
pub fn parse_cell(text: &str) -> Result<f64, ParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }
    trimmed
        .parse::<f64>()
        .map_err(|_| ParseError::Invalid(trimmed.to_owned()))
}

fn resolve_cell(text: &str, policy: CellPolicy, row: usize, col: usize) -> Result<f64, ParseError> {
    match (parse_cell(text), policy) {
        (Ok(value), _) => Ok(value),
        (Err(_), CellPolicy::Zero) => Ok(0.0),
        (Err(_), CellPolicy::Nan) => Ok(f64::NAN),
        (Err(source), CellPolicy::Reject) => Err(ParseError::AtCell {
            row,
            col,
            source: Box::new(source),
        }),
    }
}

/// Dense `rows × cols` table of scalar readings.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampleGrid {
    data: Array2<f64>,
}

impl SampleGrid {
    pub fn new(data: Array2<f64>) -> Self {
        Self { data }
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            data: Array2::zeros((rows, cols)),
        }
    }

    /// A single-row grid, e.g. one reading per slice of a series.
    pub fn from_row(values: &[f64]) -> Self {
        Self {
            data: Array1::from(values.to_vec()).insert_axis(Axis(0)),
        }
    }

    /// Build from row vectors. Short rows are padded with NaN.
    pub fn from_rows(rows: &[Vec<f64>]) -> Self {
        let cols = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut data = Array2::from_elem((rows.len(), cols), f64::NAN);
        for (r, row) in rows.iter().enumerate() {
            for (c, &value) in row.iter().enumerate() {
                data[[r, c]] = value;
            }
        }
        Self { data }
    }

    /// Parse a headerless delimited table, as exported by a spreadsheet or
    /// pasted from the clipboard (tab separated).
    ///
    /// Ragged rows are padded to the widest row with empty cells, which then
    /// go through `policy` like any other unparsable cell.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::Table`] wrapping [`ParseError::AtCell`] for the
    /// first bad cell when `policy` is [`CellPolicy::Reject`].
    pub fn from_delimited(
        text: &str,
        delimiter: u8,
        policy: CellPolicy,
    ) -> Result<Self, LoaderError> {
        Self::from_reader(text.as_bytes(), delimiter, policy)
    }

    /// Read a comma separated table from disk.
    pub fn from_csv_path(path: impl AsRef<Path>, policy: CellPolicy) -> Result<Self, LoaderError> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(file, b',', policy)
    }

    /// Read a headerless delimited table from any byte source. A record that
    /// cannot be read (e.g. invalid UTF-8) fails the whole table.
    pub fn from_reader(
        source: impl Read,
        delimiter: u8,
        policy: CellPolicy,
    ) -> Result<Self, LoaderError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(source);

        let mut records = Vec::new();
        for record in reader.records() {
            records.push(record?.iter().map(str::to_owned).collect::<Vec<_>>());
        }

        Ok(Self::from_records(&records, policy)?)
    }

    fn from_records(records: &[Vec<String>], policy: CellPolicy) -> Result<Self, ParseError> {
        let rows = records.len();
        let cols = records.iter().map(Vec::len).max().unwrap_or(0);
        let mut data = Array2::zeros((rows, cols));

        for (r, record) in records.iter().enumerate() {
            for c in 0..cols {
                let text = record.get(c).map(String::as_str).unwrap_or("");
                data[[r, c]] = resolve_cell(text, policy, r, c)?;
            }
        }

        debug!(rows, cols, "parsed sample grid");
        Ok(Self { data })
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// `(rows, cols)`
    pub fn dim(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn is_empty(&self) -> bool {
        self.rows() == 0 || self.cols() == 0
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.data.get([row, col]).copied()
    }

    /// Overwrite one cell. Returns `false` when the cell does not exist.
    pub fn set(&mut self, row: usize, col: usize, value: f64) -> bool {
        match self.data.get_mut([row, col]) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }

    /// Append a row of zeros.
    pub fn push_row(&mut self) {
        let cols = self.cols().max(1);
        let mut data = Array2::zeros((self.rows() + 1, cols));
        if !self.is_empty() {
            data.slice_mut(s![..self.rows(), ..]).assign(&self.data);
        }
        self.data = data;
    }

    /// Remove a row. Returns `false` when `row` is out of range.
    pub fn remove_row(&mut self, row: usize) -> bool {
        if row >= self.rows() {
            return false;
        }
        let kept: Vec<usize> = (0..self.rows()).filter(|&r| r != row).collect();
        self.data = self.data.select(Axis(0), &kept);
        true
    }

    /// Bit patterns of the cells in row-major order; equal iff the content is
    /// byte-identical.
    pub(crate) fn content_bits(&self) -> Vec<u64> {
        self.data.iter().map(|v| v.to_bits()).collect()
    }
}

impl From<Array2<f64>> for SampleGrid {
    fn from(data: Array2<f64>) -> Self {
        Self::new(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::io::Write;

    #[test]
    fn parse_cell_trims_and_rejects() {
        assert_eq!(parse_cell(" 12.5 "), Ok(12.5));
        assert_eq!(parse_cell("-3e2"), Ok(-300.0));
        assert_eq!(parse_cell("   "), Err(ParseError::Empty));
        assert_eq!(parse_cell("12 mGy"), Err(ParseError::Invalid("12 mGy".into())));
    }

    #[test]
    fn delimited_text_pads_ragged_rows() {
        let grid = SampleGrid::from_delimited("1,2,3\n4,5\n", b',', CellPolicy::Zero).unwrap();
        assert_eq!(grid.dim(), (2, 3));
        assert_eq!(grid.view(), array![[1.0, 2.0, 3.0], [4.0, 5.0, 0.0]]);
    }

    #[test]
    fn clipboard_paste_uses_tabs() {
        let grid = SampleGrid::from_delimited("0.5\t1.5\n2.5\t\n", b'\t', CellPolicy::Nan).unwrap();
        assert_eq!(grid.get(0, 1), Some(1.5));
        assert!(grid.get(1, 1).unwrap().is_nan());
    }

    #[test]
    fn reject_policy_reports_cell_position() {
        let err = SampleGrid::from_delimited("1,2\n3,abc\n", b',', CellPolicy::Reject).unwrap_err();
        match err {
            LoaderError::Table(ParseError::AtCell { row, col, source }) => {
                assert_eq!((row, col), (1, 1));
                assert_eq!(*source, ParseError::Invalid("abc".into()));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn unreadable_record_fails_the_table() {
        let bytes: &[u8] = b"1,2\n\xff\xfe,3\n4,5\n";
        let result = SampleGrid::from_reader(bytes, b',', CellPolicy::Zero);
        assert!(matches!(result, Err(LoaderError::Csv(_))));
    }

    #[test]
    fn empty_text_gives_empty_grid() {
        let grid = SampleGrid::from_delimited("", b',', CellPolicy::Reject).unwrap();
        assert!(grid.is_empty());
    }

    #[test]
    fn csv_file_is_read_without_headers() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "10,20").unwrap();
        writeln!(file, "30,40").unwrap();
        let grid = SampleGrid::from_csv_path(file.path(), CellPolicy::Reject).unwrap();
        assert_eq!(grid.view(), array![[10.0, 20.0], [30.0, 40.0]]);
    }

    #[test]
    fn editing_rows() {
        let mut grid = SampleGrid::new(array![[1.0, 2.0], [3.0, 4.0]]);
        grid.push_row();
        assert_eq!(grid.dim(), (3, 2));
        assert_eq!(grid.get(2, 0), Some(0.0));
        assert!(grid.remove_row(0));
        assert_eq!(grid.view(), array![[3.0, 4.0], [0.0, 0.0]]);
        assert!(!grid.remove_row(5));
        assert!(grid.set(0, 1, 9.0));
        assert!(!grid.set(4, 4, 9.0));
        assert_eq!(grid.get(0, 1), Some(9.0));
    }

    #[test]
    fn push_row_on_empty_grid_creates_one_cell() {
        let mut grid = SampleGrid::default();
        grid.push_row();
        assert_eq!(grid.dim(), (1, 1));
    }

    #[test]
    fn from_rows_pads_with_nan() {
        let grid = SampleGrid::from_rows(&[vec![1.0], vec![2.0, 3.0]]);
        assert_eq!(grid.dim(), (2, 2));
        assert!(grid.get(0, 1).unwrap().is_nan());
    }

    #[test]
    fn content_bits_distinguish_signed_zero() {
        let a = SampleGrid::from_row(&[0.0]);
        let b = SampleGrid::from_row(&[-0.0]);
        assert_ne!(a.content_bits(), b.content_bits());
    }
}
