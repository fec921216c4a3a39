//! Cache-aware stretching of a [`SampleGrid`] onto a target pixel grid.

use ndarray::{Array2, ArrayView2};
use tracing::debug;

use crate::enums::Interpolation;
use crate::error::BoundsError;
use crate::grid::SampleGrid;
use crate::interpolator::Interpolator;

/// A sample grid stretched to exactly `(height, width)` of a target raster.
#[derive(Clone, Debug, PartialEq)]
pub struct ResampledField {
    data: Array2<f64>,
}

impl ResampledField {
    pub(crate) fn new(data: Array2<f64>) -> Self {
        Self { data }
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    /// `(height, width)`, matching array indexing.
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    pub fn into_array(self) -> Array2<f64> {
        self.data
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct CacheKey {
    dim: (usize, usize),
    content: Vec<u64>,
    target: (usize, usize),
    interpolation: Interpolation,
}

/// Memo of the most recent resample.
///
/// Keys compare by value: the bit pattern of every grid cell, the grid shape,
/// the target size and the interpolation mode. Owned by a single
/// [`IntensityResampler`] and mutated only through it.
#[derive(Debug, Default)]
pub struct ResampleCache {
    entry: Option<(CacheKey, ResampledField)>,
    hits: u64,
    recomputations: u64,
}

impl ResampleCache {
    /// Drop the cached field. Call whenever the source table or the base
    /// image is replaced.
    pub fn invalidate(&mut self) {
        if self.entry.take().is_some() {
            debug!("resample cache invalidated");
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }

    /// Number of resamples served without recomputation.
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Number of resamples that had to interpolate.
    pub fn recomputations(&self) -> u64 {
        self.recomputations
    }
}

/// Stretches sample grids onto a target pixel size, remembering the last
/// result.
///
/// Resampling takes `&mut self`; one resampler belongs to one owner (the UI
/// thread that redraws) and is not meant to be shared.
#[derive(Debug, Default)]
pub struct IntensityResampler {
    interpolation: Interpolation,
    cache: ResampleCache,
}

impl IntensityResampler {
    pub fn new(interpolation: Interpolation) -> Self {
        Self {
            interpolation,
            cache: ResampleCache::default(),
        }
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    pub fn set_interpolation(&mut self, interpolation: Interpolation) {
        self.interpolation = interpolation;
    }

    pub fn cache(&self) -> &ResampleCache {
        &self.cache
    }

    pub fn invalidate(&mut self) {
        self.cache.invalidate();
    }

    /// Stretch `grid` to `target_height × target_width`.
    ///
    /// An empty grid has nothing to draw and yields `Ok(None)`. A call with
    /// byte-identical grid content, target size and interpolation mode is
    /// answered from the cache.
    ///
    /// # Errors
    ///
    /// Returns [`BoundsError::EmptyTarget`] when either target dimension is
    /// zero.
    pub fn resample(
        &mut self,
        grid: &SampleGrid,
        target_width: usize,
        target_height: usize,
    ) -> Result<Option<&ResampledField>, BoundsError> {
        if grid.is_empty() {
            debug!(dim = ?grid.dim(), "empty sample grid, nothing to resample");
            return Ok(None);
        }
        if target_width == 0 || target_height == 0 {
            return Err(BoundsError::EmptyTarget {
                width: target_width,
                height: target_height,
            });
        }

        let key = CacheKey {
            dim: grid.dim(),
            content: grid.content_bits(),
            target: (target_height, target_width),
            interpolation: self.interpolation,
        };

        let cached = matches!(&self.cache.entry, Some((cached_key, _)) if *cached_key == key);
        if cached {
            self.cache.hits += 1;
            debug!(size = ?key.target, "resample served from cache");
        } else {
            let field = Self::compute(grid, target_width, target_height, self.interpolation);
            self.cache.recomputations += 1;
            debug!(
                dim = ?key.dim,
                size = ?key.target,
                recomputations = self.cache.recomputations,
                "resampled sample grid"
            );
            self.cache.entry = Some((key, field));
        }

        Ok(self.cache.entry.as_ref().map(|(_, field)| field))
    }

    fn compute(
        grid: &SampleGrid,
        target_width: usize,
        target_height: usize,
        interpolation: Interpolation,
    ) -> ResampledField {
        let view = grid.view();
        let single_sample = grid.rows() == 1 && grid.cols() == 1;

        let data = match interpolation {
            Interpolation::Bilinear if !single_sample => {
                Interpolator::bilinear(&view, target_width, target_height)
            }
            Interpolation::Bilinear => {
                debug!("single-sample grid, replicating instead of interpolating");
                Interpolator::nearest(&view, target_width, target_height)
            }
            Interpolation::Nearest => Interpolator::nearest(&view, target_width, target_height),
        };

        ResampledField::new(data)
    }
}
