//! Placing a per-slice curve (e.g. tube current) over a scout image.

use crate::color::ValueRange;
use crate::geometry::PixelCoord;

/// Pixel positions of `values` stretched across a `width × height` scout.
///
/// On a landscape scout (`width >= height`) samples are spread evenly along
/// the columns and the value sets the row, highest value at the top. On a
/// portrait scout samples run down the rows and the value sets the column,
/// highest value at the right. NaN samples keep their slot but produce no
/// point.
///
/// Returns `None` when there is nothing to draw: an empty scout or no finite
/// sample. A curve whose samples are all equal is drawn at the top of its
/// scale: the top row on a landscape scout, the last column on a portrait
/// one.
pub fn curve_pixels(values: &[f64], width: usize, height: usize) -> Option<Vec<PixelCoord>> {
    if width == 0 || height == 0 {
        return None;
    }
    let range = ValueRange::from_values(values.iter().copied())?;
    let last_col = (width - 1) as f64;
    let last_row = (height - 1) as f64;
    let landscape = width >= height;

    let points = values
        .iter()
        .enumerate()
        .filter(|(_, value)| value.is_finite())
        .map(|(i, &value)| {
            let t = if range.width() > 0.0 {
                range.normalize(value)
            } else {
                1.0
            };
            if landscape {
                PixelCoord::new(spread(i, values.len(), last_col), last_row * (1.0 - t))
            } else {
                PixelCoord::new(last_col * t, spread(i, values.len(), last_row))
            }
        })
        .collect();

    Some(points)
}

/// Position of sample `index` of `count` on `[0, last]`, endpoints included.
fn spread(index: usize, count: usize, last: f64) -> f64 {
    if count < 2 {
        return 0.0;
    }
    index as f64 * last / (count - 1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landscape_curve_spans_columns() {
        let points = curve_pixels(&[100.0, 200.0, 150.0], 11, 5).unwrap();
        assert_eq!(
            points,
            vec![
                PixelCoord::new(0.0, 4.0),
                PixelCoord::new(5.0, 0.0),
                PixelCoord::new(10.0, 2.0),
            ]
        );
    }

    #[test]
    fn portrait_curve_spans_rows() {
        let points = curve_pixels(&[0.0, 10.0], 5, 9).unwrap();
        assert_eq!(
            points,
            vec![PixelCoord::new(0.0, 0.0), PixelCoord::new(4.0, 8.0)]
        );
    }

    #[test]
    fn nan_samples_keep_their_slot() {
        let points = curve_pixels(&[1.0, f64::NAN, 3.0], 5, 3).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].col, 4.0);
    }

    #[test]
    fn nothing_to_draw() {
        assert!(curve_pixels(&[], 10, 10).is_none());
        assert!(curve_pixels(&[f64::NAN, f64::NAN], 10, 10).is_none());
        assert!(curve_pixels(&[1.0], 0, 10).is_none());
    }

    #[test]
    fn flat_curve_is_drawn_at_the_top_of_the_scale() {
        let landscape = curve_pixels(&[120.0, 120.0], 8, 4).unwrap();
        assert!(landscape.iter().all(|p| p.row == 0.0));

        let portrait = curve_pixels(&[120.0, f64::NAN, 120.0], 4, 8).unwrap();
        assert_eq!(portrait.len(), 2);
        assert!(portrait.iter().all(|p| p.col == 3.0));
    }
}
