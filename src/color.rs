//! Colour scales for turning an intensity field into an overlay.
//!
//! NaN cells never take a colour: value ranges skip them and blending leaves
//! the base pixel untouched.

use std::str::FromStr;

use image::{Rgba, RgbaImage};
use ndarray::ArrayView2;
use rayon::prelude::*;
use thiserror::Error;
use tracing::debug;

use crate::composite::CompositeField;
use crate::error::{BoundsError, ParseError};
use crate::grid::parse_cell;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ColorScaleError {
    #[error("Unknown colour scale {0:?}")]
    UnknownScale(String),

    #[error("Invalid threshold: {0}")]
    InvalidThreshold(#[from] ParseError),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum OverlayError {
    #[error("Overlay opacity must be a finite number, got {0}")]
    InvalidAlpha(f64),

    #[error(transparent)]
    Bounds(#[from] BoundsError),
}

/// Built-in continuous scales.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NamedScale {
    Gray,
    Hot,
    #[default]
    Jet,
    Cool,
}

impl NamedScale {
    /// Colour of a normalised value `t` in `[0, 1]`.
    pub fn color(&self, t: f64) -> [u8; 3] {
        let t = t.clamp(0.0, 1.0);
        let rgb = match self {
            NamedScale::Gray => [t, t, t],
            NamedScale::Hot => [
                (t * 3.0).min(1.0),
                (t * 3.0 - 1.0).clamp(0.0, 1.0),
                (t * 3.0 - 2.0).clamp(0.0, 1.0),
            ],
            NamedScale::Jet => [
                (1.5 - (4.0 * t - 3.0).abs()).clamp(0.0, 1.0),
                (1.5 - (4.0 * t - 2.0).abs()).clamp(0.0, 1.0),
                (1.5 - (4.0 * t - 1.0).abs()).clamp(0.0, 1.0),
            ],
            NamedScale::Cool => [t, 1.0 - t, 1.0],
        };
        rgb.map(|c| (c * 255.0).round() as u8)
    }
}

/// One step of a custom scale: values at or above `value` take `color`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Threshold {
    pub value: f64,
    pub color: [u8; 3],
}

const THRESHOLD_PALETTE: [[u8; 3]; 6] = [
    [255, 255, 255],
    [0, 0, 0],
    [255, 0, 0],
    [255, 255, 0],
    [0, 128, 0],
    [0, 255, 255],
];

/// How intensities become colours.
#[derive(Clone, Debug, PartialEq)]
pub enum ColorScale {
    Preset(NamedScale),
    /// Stepped scale, sorted ascending by value. Values below the first
    /// threshold stay uncoloured.
    Thresholds(Vec<Threshold>),
}

impl Default for ColorScale {
    fn default() -> Self {
        ColorScale::Preset(NamedScale::default())
    }
}

impl ColorScale {
    /// Stepped scale from a comma separated list such as `"10, 20, 30"`.
    /// Colours cycle through a fixed palette.
    pub fn thresholds_from_list(text: &str) -> Result<Self, ColorScaleError> {
        let mut thresholds = text
            .split(',')
            .enumerate()
            .map(|(i, part)| {
                Ok(Threshold {
                    value: parse_cell(part)?,
                    color: THRESHOLD_PALETTE[i % THRESHOLD_PALETTE.len()],
                })
            })
            .collect::<Result<Vec<_>, ColorScaleError>>()?;
        thresholds.sort_by(|a, b| a.value.total_cmp(&b.value));
        Ok(ColorScale::Thresholds(thresholds))
    }

    /// Colour for `value`, or `None` when the cell stays transparent.
    pub fn color(&self, value: f64, range: &ValueRange) -> Option<[u8; 3]> {
        if value.is_nan() {
            return None;
        }
        match self {
            ColorScale::Preset(scale) => Some(scale.color(range.normalize(value))),
            ColorScale::Thresholds(thresholds) => thresholds
                .iter()
                .rev()
                .find(|threshold| value >= threshold.value)
                .map(|threshold| threshold.color),
        }
    }
}

impl FromStr for ColorScale {
    type Err = ColorScaleError;

    /// `gray`, `hot`, `jet`, `cool`, or `thresholds:<v1>,<v2>,...`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(list) = trimmed.strip_prefix("thresholds:") {
            return Self::thresholds_from_list(list);
        }
        let named = match trimmed.to_ascii_lowercase().as_str() {
            "gray" | "grey" => NamedScale::Gray,
            "hot" => NamedScale::Hot,
            "jet" => NamedScale::Jet,
            "cool" => NamedScale::Cool,
            _ => return Err(ColorScaleError::UnknownScale(trimmed.to_owned())),
        };
        Ok(ColorScale::Preset(named))
    }
}

/// Closed interval of intensities mapped onto a colour scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Range of the finite values in `values`, or `None` when there are none.
    pub fn of(values: &ArrayView2<f64>) -> Option<Self> {
        Self::from_values(values.iter().copied())
    }

    /// Range of the finite values yielded by `values`.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold(None, |range: Option<Self>, v| {
                Some(match range {
                    Some(r) => Self::new(r.min.min(v), r.max.max(v)),
                    None => Self::new(v, v),
                })
            })
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    /// Position of `value` within the range, clamped to `[0, 1]`. A
    /// zero-width range maps everything to 0.
    pub fn normalize(&self, value: f64) -> f64 {
        let width = self.width();
        if width <= 0.0 || !width.is_finite() {
            return 0.0;
        }
        ((value - self.min) / width).clamp(0.0, 1.0)
    }
}

/// Blending settings for [`blend_overlay`].
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayOptions {
    /// Opacity of the overlay, clamped to `0.0..=1.0`. Must be finite.
    pub alpha: f64,
    pub scale: ColorScale,
    /// Fixed range; the field's own finite range when `None`.
    pub range: Option<ValueRange>,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            scale: ColorScale::default(),
            range: None,
        }
    }
}

/// Alpha-blend `field` over `base`. NaN cells keep the base pixel.
///
/// Returns the base unchanged when the field has no finite value.
///
/// # Errors
///
/// Returns [`OverlayError::InvalidAlpha`] for a NaN or infinite opacity and
/// [`BoundsError::ShapeMismatch`] when the field does not cover the base
/// image pixel for pixel.
pub fn blend_overlay(
    base: &RgbaImage,
    field: &CompositeField,
    options: &OverlayOptions,
) -> Result<RgbaImage, OverlayError> {
    if !options.alpha.is_finite() {
        return Err(OverlayError::InvalidAlpha(options.alpha));
    }
    let (width, height) = (base.width() as usize, base.height() as usize);
    if field.shape() != (height, width) {
        return Err(OverlayError::Bounds(BoundsError::ShapeMismatch {
            expected_width: width,
            expected_height: height,
            actual_width: field.width(),
            actual_height: field.height(),
        }));
    }

    let view = field.view();
    let Some(range) = options.range.or_else(|| ValueRange::of(&view)) else {
        debug!("overlay has no finite values, skipping blend");
        return Ok(base.clone());
    };
    let alpha = options.alpha.clamp(0.0, 1.0);

    let mut out = base.clone();
    out.par_enumerate_pixels_mut().for_each(|(x, y, pixel)| {
        let value = view[[y as usize, x as usize]];
        if let Some(color) = options.scale.color(value, &range) {
            *pixel = blend_pixel(*pixel, color, alpha);
        }
    });
    Ok(out)
}

#[inline]
fn blend_pixel(base: Rgba<u8>, color: [u8; 3], alpha: f64) -> Rgba<u8> {
    let mix = |b: u8, c: u8| (b as f64 * (1.0 - alpha) + c as f64 * alpha).round() as u8;
    Rgba([
        mix(base[0], color[0]),
        mix(base[1], color[1]),
        mix(base[2], color[2]),
        base[3],
    ])
}
