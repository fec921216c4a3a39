use dicom_overlay::{
    BoundsError, CompositeFrameBuilder, CoordinateMapper, CropRect, FrameSize, IntensityResampler,
    PixelCoord, Raster, RasterGeometry, SampleGrid,
    color::ValueRange,
    enums::CellPolicy,
};
use ndarray::{Array2, array};

fn grid_3x5() -> SampleGrid {
    SampleGrid::new(Array2::from_shape_fn((3, 5), |(r, c)| (r * 5 + c) as f64 * 1.5))
}

#[test]
fn raster_origin_is_pixel_zero() {
    let rasters = [
        RasterGeometry::new([0.0; 3], [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]], (1.0, 1.0)),
        RasterGeometry::new(
            [-199.6, -180.2, 1450.0],
            [[1.0, 0.0, 0.0], [0.0, 0.0, -1.0]],
            (0.78, 0.78),
        ),
        RasterGeometry::new(
            [12.0, -40.5, 3.25],
            [[0.0, 1.0, 0.0], [0.0, 0.0, -1.0]],
            (2.5, 0.4),
        ),
    ];
    for geometry in rasters {
        let raster = Raster::new(512, 512).with_geometry(geometry);
        let pixel = CoordinateMapper::world_to_pixel(geometry.origin, &raster).unwrap();
        assert_eq!(pixel, PixelCoord::new(0.0, 0.0));
    }
}

#[test]
fn identity_geometry_scenario() {
    let raster = Raster::new(64, 64).with_geometry(RasterGeometry::new(
        [0.0, 0.0, 0.0],
        [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        (1.0, 1.0),
    ));
    let pixel = CoordinateMapper::world_to_pixel([5.0, 3.0, 0.0], &raster).unwrap();
    assert_eq!((pixel.col, pixel.row), (5.0, 3.0));
}

#[test]
fn resample_shape_matches_every_target() {
    let mut resampler = IntensityResampler::default();
    for grid in [SampleGrid::from_row(&[1.0]), SampleGrid::from_row(&[1.0, 2.0]), grid_3x5()] {
        for (w, h) in [(1, 1), (2, 9), (33, 17), (300, 200)] {
            let field = resampler.resample(&grid, w, h).unwrap().unwrap();
            assert_eq!(field.shape(), (h, w));
        }
    }
}

#[test]
fn second_resample_is_cached_and_bit_identical() {
    let mut resampler = IntensityResampler::default();
    let grid = grid_3x5();
    let first: Vec<u64> = resampler
        .resample(&grid, 41, 23)
        .unwrap()
        .unwrap()
        .view()
        .iter()
        .map(|v| v.to_bits())
        .collect();
    let recomputed = resampler.cache().recomputations();

    let second: Vec<u64> = resampler
        .resample(&grid_3x5(), 41, 23)
        .unwrap()
        .unwrap()
        .view()
        .iter()
        .map(|v| v.to_bits())
        .collect();

    assert_eq!(first, second);
    assert_eq!(resampler.cache().recomputations(), recomputed);
    assert_eq!(resampler.cache().hits(), 1);
}

#[test]
fn single_cell_edit_changes_the_result() {
    let mut resampler = IntensityResampler::default();
    let mut grid = grid_3x5();
    let stale = resampler.resample(&grid, 9, 5).unwrap().unwrap().clone();

    // Source cell (1, 2) lands exactly on output pixel (2, 4).
    grid.set(1, 2, 1000.0);
    let fresh = resampler.resample(&grid, 9, 5).unwrap().unwrap().clone();

    assert_eq!(resampler.cache().recomputations(), 2);
    assert_eq!(fresh.view()[[2, 4]], 1000.0);
    assert_ne!(stale.view()[[2, 4]], fresh.view()[[2, 4]]);
}

#[test]
fn composite_inside_crop_equals_resampled_field() {
    let (w, h) = (30, 40);
    let mut resampler = IntensityResampler::default();
    let grid = grid_3x5();
    let resampled = resampler.resample(&grid, w, h).unwrap().unwrap().clone();

    let composite = CompositeFrameBuilder::composite(
        &resampled,
        FrameSize::new(100, 100),
        Some(CropRect::new(10, 20, w, h)),
    )
    .unwrap();

    for ((row, col), value) in composite.view().indexed_iter() {
        let inside = (20..20 + h).contains(&row) && (10..10 + w).contains(&col);
        if inside {
            assert_eq!(*value, resampled.view()[[row - 20, col - 10]]);
        } else {
            assert!(value.is_nan());
        }
    }
    assert_eq!(composite.data_cells(), w * h);
}

#[test]
fn crop_past_the_frame_is_a_bounds_error() {
    let mut resampler = IntensityResampler::default();
    let resampled = resampler.resample(&grid_3x5(), 50, 50).unwrap().unwrap().clone();
    let result = CompositeFrameBuilder::composite(
        &resampled,
        FrameSize::new(100, 100),
        Some(CropRect::new(90, 90, 50, 50)),
    );
    assert!(matches!(result, Err(BoundsError::CropOutOfBounds { .. })));
}

#[test]
fn two_by_two_scenario() {
    let grid = SampleGrid::from_delimited("0,10\n20,30", b',', CellPolicy::Reject).unwrap();
    assert_eq!(grid.view(), array![[0.0, 10.0], [20.0, 30.0]]);

    let mut resampler = IntensityResampler::default();
    let field = resampler.resample(&grid, 4, 4).unwrap().unwrap();
    let data = field.view();

    assert!((data[[0, 0]] - 0.0).abs() < 1e-9);
    assert!((data[[3, 3]] - 30.0).abs() < 1e-9);
    for r in 0..4 {
        for c in 0..4 {
            if c > 0 {
                assert!(data[[r, c]] > data[[r, c - 1]]);
            }
            if r > 0 {
                assert!(data[[r, c]] > data[[r - 1, c]]);
            }
        }
    }
}

#[test]
fn colour_range_ignores_no_data_cells() {
    let mut resampler = IntensityResampler::default();
    let composite = CompositeFrameBuilder::build(
        &mut resampler,
        &SampleGrid::new(array![[5.0, 7.0]]),
        FrameSize::new(50, 50),
        Some(CropRect::new(0, 0, 10, 10)),
    )
    .unwrap()
    .unwrap();

    assert_eq!(
        ValueRange::of(&composite.view()),
        Some(ValueRange::new(5.0, 7.0))
    );
}
