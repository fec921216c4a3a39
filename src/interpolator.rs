use ndarray::{Array2, ArrayView2, Axis};
use rayon::prelude::*;

pub(crate) struct Interpolator;

impl Interpolator {
    /// Source coordinate sampled by output index `index` when `source_len`
    /// samples are stretched over `target_len` pixels. Corner-aligned: the
    /// first and last output pixels land exactly on the first and last
    /// source samples.
    #[inline]
    pub(crate) fn source_coordinate(index: usize, source_len: usize, target_len: usize) -> f64 {
        if source_len < 2 || target_len < 2 {
            return 0.0;
        }
        let last = (source_len - 1) as f64;
        (index as f64 * last / (target_len - 1) as f64).min(last)
    }

    #[inline]
    fn lerp(a: f64, b: f64, t: f64) -> f64 {
        // Zero-weight samples must not leak NaN into the result.
        if t == 0.0 {
            a
        } else if t == 1.0 {
            b
        } else {
            a.mul_add(1.0 - t, b * t)
        }
    }

    #[inline]
    pub(crate) fn bilinear_interpolate(grid: &ArrayView2<f64>, y: f64, x: f64) -> f64 {
        let (height, width) = grid.dim();

        let y0 = y.floor() as usize;
        let x0 = x.floor() as usize;
        let y1 = (y0 + 1).min(height - 1);
        let x1 = (x0 + 1).min(width - 1);

        let dy = y - y0 as f64;
        let dx = x - x0 as f64;

        let v0 = Self::lerp(grid[[y0, x0]], grid[[y0, x1]], dx);
        let v1 = if dy == 0.0 {
            v0
        } else {
            Self::lerp(grid[[y1, x0]], grid[[y1, x1]], dx)
        };

        Self::lerp(v0, v1, dy)
    }

    /// Stretch `grid` to `(height, width)` with order-1 interpolation.
    pub(crate) fn bilinear(grid: &ArrayView2<f64>, width: usize, height: usize) -> Array2<f64> {
        let (rows, cols) = grid.dim();
        let mut data = Array2::zeros((height, width));

        data.axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(y, mut row)| {
                let src_y = Self::source_coordinate(y, rows, height);
                for (x, value) in row.iter_mut().enumerate() {
                    let src_x = Self::source_coordinate(x, cols, width);
                    *value = Self::bilinear_interpolate(grid, src_y, src_x);
                }
            });

        data
    }

    /// Repeat each source cell `ceil(scale)` times along both axes and crop to
    /// `(height, width)`.
    pub(crate) fn nearest(grid: &ArrayView2<f64>, width: usize, height: usize) -> Array2<f64> {
        let (rows, cols) = grid.dim();
        let repeat_y = height.div_ceil(rows).max(1);
        let repeat_x = width.div_ceil(cols).max(1);

        Array2::from_shape_fn((height, width), |(y, x)| {
            let src_y = (y / repeat_y).min(rows - 1);
            let src_x = (x / repeat_x).min(cols - 1);
            grid[[src_y, src_x]]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn source_coordinates_are_corner_aligned() {
        assert_eq!(Interpolator::source_coordinate(0, 2, 4), 0.0);
        assert_eq!(Interpolator::source_coordinate(3, 2, 4), 1.0);
        assert_eq!(Interpolator::source_coordinate(5, 1, 8), 0.0);
        assert_eq!(Interpolator::source_coordinate(0, 5, 1), 0.0);
    }

    #[test]
    fn bilinear_hits_midpoints() {
        let grid = array![[0.0, 10.0], [20.0, 30.0]];
        let view = grid.view();
        assert_eq!(Interpolator::bilinear_interpolate(&view, 0.5, 0.5), 15.0);
        assert_eq!(Interpolator::bilinear_interpolate(&view, 0.0, 0.5), 5.0);
        assert_eq!(Interpolator::bilinear_interpolate(&view, 1.0, 1.0), 30.0);
    }

    #[test]
    fn nan_neighbour_does_not_leak_into_exact_samples() {
        let grid = array![[1.0, f64::NAN], [3.0, 4.0]];
        let view = grid.view();
        assert_eq!(Interpolator::bilinear_interpolate(&view, 0.0, 0.0), 1.0);
        assert_eq!(Interpolator::bilinear_interpolate(&view, 1.0, 0.0), 3.0);
        assert!(Interpolator::bilinear_interpolate(&view, 0.5, 0.5).is_nan());
    }

    #[test]
    fn bilinear_upsamples_a_row() {
        let grid = array![[0.0, 4.0]];
        let out = Interpolator::bilinear(&grid.view(), 5, 2);
        assert_eq!(out, array![[0.0, 1.0, 2.0, 3.0, 4.0], [0.0, 1.0, 2.0, 3.0, 4.0]]);
    }

    #[test]
    fn every_output_row_is_interpolated() {
        let grid = Array2::from_shape_fn((3, 5), |(r, c)| (r * 5 + c) as f64);
        let view = grid.view();
        let out = Interpolator::bilinear(&view, 11, 7);

        assert_eq!(out.dim(), (7, 11));
        for ((y, x), value) in out.indexed_iter() {
            let src_y = Interpolator::source_coordinate(y, 3, 7);
            let src_x = Interpolator::source_coordinate(x, 5, 11);
            assert_eq!(*value, Interpolator::bilinear_interpolate(&view, src_y, src_x));
        }
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn nearest_replicates_and_crops() {
        let grid = array![[1.0, 2.0], [3.0, 4.0]];
        let out = Interpolator::nearest(&grid.view(), 3, 5);
        assert_eq!(out.dim(), (5, 3));
        assert_eq!(out.row(0).to_vec(), vec![1.0, 1.0, 2.0]);
        assert_eq!(out.row(2).to_vec(), vec![1.0, 1.0, 2.0]);
        assert_eq!(out.row(3).to_vec(), vec![3.0, 3.0, 4.0]);
        assert_eq!(out.row(4).to_vec(), vec![3.0, 3.0, 4.0]);
    }

    #[test]
    fn nearest_downsamples_by_taking_leading_cells() {
        let grid = array![[1.0, 2.0, 3.0, 4.0]];
        let out = Interpolator::nearest(&grid.view(), 2, 1);
        assert_eq!(out, array![[1.0, 2.0]]);
    }
}
