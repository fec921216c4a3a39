use crate::{
    enums::SortBy,
    error::ParseError,
    geometry::{CoordinateMapper, PixelCoord, Raster, RasterGeometry},
    grid::SampleGrid,
};

use dicom::{
    core::Tag,
    object::{DefaultDicomObject, InMemDicomObject, open_file},
};
use dicom_dictionary_std::tags;
use image::RgbaImage;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{info, warn};

/// X-Ray Tube Current in mA, (0018,1151).
const X_RAY_TUBE_CURRENT: Tag = Tag(0x0018, 0x1151);
/// X-Ray Tube Current in mA as a float, (0018,9330).
const X_RAY_TUBE_CURRENT_IN_MA: Tag = Tag(0x0018, 0x9330);

const LOCALIZER_KEYWORDS: [&str; 3] = ["scout", "topogram", "localiz"];

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("No valid DICOM instances found")]
    NoValidInstances,

    #[error("Missing image dimensions")]
    MissingDimensions,

    #[error("Invalid table: {0}")]
    Table(#[from] ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DICOM error: {0}")]
    Dicom(#[from] dicom::object::ReadError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

pub struct ScoutLoader;

impl ScoutLoader {
    /// Build the reference raster of a scout image.
    ///
    /// Rows and Columns are required. The patient geometry is attached only
    /// when ImagePositionPatient, ImageOrientationPatient and PixelSpacing are
    /// all present; without it the raster can still carry overlays but not
    /// slice markers.
    pub fn raster_from_object(dicom_object: &InMemDicomObject) -> Result<Raster, LoaderError> {
        let rows = Self::get_u32(dicom_object, tags::ROWS).ok_or(LoaderError::MissingDimensions)?;
        let columns =
            Self::get_u32(dicom_object, tags::COLUMNS).ok_or(LoaderError::MissingDimensions)?;
        let raster = Raster::new(columns as usize, rows as usize);

        match Self::get_geometry(dicom_object) {
            Some(geometry) => Ok(raster.with_geometry(geometry)),
            None => {
                warn!(rows, columns, "scout has no usable patient geometry");
                Ok(raster)
            }
        }
    }

    pub fn raster_from_file(path: impl AsRef<Path>) -> Result<Raster, LoaderError> {
        let dicom_object = open_file(path.as_ref())?;
        Self::raster_from_object(&dicom_object)
    }

    /// Load a base image for overlay blending, together with its raster.
    pub fn load_base_image(path: impl AsRef<Path>) -> Result<(RgbaImage, Raster), LoaderError> {
        let image = image::open(path.as_ref())?.to_rgba8();
        let raster = Raster::new(image.width() as usize, image.height() as usize);
        info!(width = raster.width, height = raster.height, "loaded base image");
        Ok((image, raster))
    }

    /// Whether the description or image type marks the object as a
    /// scout / topogram / localizer.
    pub fn is_localizer(dicom_object: &InMemDicomObject) -> bool {
        [tags::SERIES_DESCRIPTION, tags::IMAGE_TYPE]
            .into_iter()
            .filter_map(|tag| Self::get_string(dicom_object, tag))
            .any(|text| {
                let text = text.to_ascii_lowercase();
                LOCALIZER_KEYWORDS.iter().any(|keyword| text.contains(keyword))
            })
    }

    /// A series is a localizer when any instance says so, or when it holds a
    /// single image numbered 0.
    pub fn is_localizer_series<'a>(
        dicom_objects: impl IntoIterator<Item = &'a InMemDicomObject>,
    ) -> bool {
        let objects: Vec<_> = dicom_objects.into_iter().collect();
        if objects.iter().any(|object| Self::is_localizer(object)) {
            return true;
        }
        matches!(
            objects.as_slice(),
            [single] if Self::get_i32(single, tags::INSTANCE_NUMBER) == Some(0)
        )
    }

    fn get_geometry(dicom_object: &InMemDicomObject) -> Option<RasterGeometry> {
        let position = Self::get_f64_vec(dicom_object, tags::IMAGE_POSITION_PATIENT)?;
        let orientation = Self::get_f64_vec(dicom_object, tags::IMAGE_ORIENTATION_PATIENT)?;
        let spacing = Self::get_f64_vec(dicom_object, tags::PIXEL_SPACING)?;
        RasterGeometry::from_dicom_values(&position, &orientation, &spacing)
    }

    fn get_f64_vec(dicom_object: &InMemDicomObject, tag: Tag) -> Option<Vec<f64>> {
        dicom_object.element(tag).ok()?.to_multi_float64().ok()
    }

    fn get_f64(dicom_object: &InMemDicomObject, tag: Tag) -> Option<f64> {
        dicom_object.element(tag).ok()?.to_float64().ok()
    }

    fn get_u32(dicom_object: &InMemDicomObject, tag: Tag) -> Option<u32> {
        dicom_object.element(tag).ok()?.to_int::<u32>().ok()
    }

    fn get_i32(dicom_object: &InMemDicomObject, tag: Tag) -> Option<i32> {
        dicom_object.element(tag).ok()?.to_int::<i32>().ok()
    }

    fn get_string(dicom_object: &InMemDicomObject, tag: Tag) -> Option<String> {
        dicom_object
            .element(tag)
            .ok()?
            .to_str()
            .ok()
            .map(|s| s.trim_end_matches(['\0', ' ']).to_owned())
    }
}

/// Per-instance readings of an acquisition series.
#[derive(Clone, Debug, PartialEq)]
pub struct AecInstance {
    pub instance_number: Option<i32>,
    pub position: Option<[f64; 3]>,
    pub table_position: Option<f64>,
    /// Tube current in mA, NaN when the instance does not record it.
    pub tube_current: f64,
}

impl AecInstance {
    pub fn from_object(dicom_object: &InMemDicomObject) -> Self {
        let tube_current = [X_RAY_TUBE_CURRENT, X_RAY_TUBE_CURRENT_IN_MA]
            .into_iter()
            .find_map(|tag| ScoutLoader::get_f64(dicom_object, tag))
            .unwrap_or(f64::NAN);

        let position = ScoutLoader::get_f64_vec(dicom_object, tags::IMAGE_POSITION_PATIENT)
            .filter(|v| v.len() >= 3)
            .map(|v| [v[0], v[1], v[2]]);

        Self {
            instance_number: ScoutLoader::get_i32(dicom_object, tags::INSTANCE_NUMBER),
            position,
            table_position: ScoutLoader::get_f64(dicom_object, tags::TABLE_POSITION),
            tube_current,
        }
    }

    fn sort_key(&self, sort_by: SortBy) -> Option<f64> {
        match sort_by {
            SortBy::ImagePositionPatient => self.position.map(|p| p[2]),
            SortBy::TablePosition => self.table_position,
            SortBy::InstanceNumber => self.instance_number.map(f64::from),
            SortBy::None => Some(0.0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarkerKind {
    Begin,
    End,
}

impl MarkerKind {
    pub fn label(&self) -> &'static str {
        match self {
            MarkerKind::Begin => "Begin",
            MarkerKind::End => "End",
        }
    }
}

/// Where the first or last slice of a series crosses the scout.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SliceMarker {
    pub kind: MarkerKind,
    pub pixel: PixelCoord,
}

/// An acquisition series reduced to what the AEC overlay needs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AecSeries {
    series_uid: Option<String>,
    description: Option<String>,
    instances: Vec<AecInstance>,
}

impl AecSeries {
    pub fn new(mut instances: Vec<AecInstance>, sort_by: SortBy) -> Self {
        Self::sort_instances(&mut instances, sort_by);
        Self {
            series_uid: None,
            description: None,
            instances,
        }
    }

    /// Read every instance of a series.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::NoValidInstances`] when no object is given.
    pub fn from_dicom_objects<'a>(
        dicom_objects: impl IntoIterator<Item = &'a InMemDicomObject>,
        sort_by: SortBy,
    ) -> Result<Self, LoaderError> {
        let objects: Vec<_> = dicom_objects.into_iter().collect();
        let Some(first) = objects.first() else {
            return Err(LoaderError::NoValidInstances);
        };

        let instances = objects
            .iter()
            .map(|object| AecInstance::from_object(object))
            .collect();

        Ok(Self {
            series_uid: ScoutLoader::get_string(first, tags::SERIES_INSTANCE_UID),
            description: ScoutLoader::get_string(first, tags::SERIES_DESCRIPTION),
            ..Self::new(instances, sort_by)
        })
    }

    /// Read the given files as the instances of one series.
    pub fn from_file_paths(
        paths: &[impl AsRef<Path>],
        sort_by: SortBy,
    ) -> Result<Self, LoaderError> {
        let objects: Result<Vec<_>, _> =
            paths.iter().map(|path| open_file(path.as_ref())).collect();
        let objects = objects?;

        Self::from_dicom_objects(objects.iter().map(|object| &**object), sort_by)
    }

    /// Load every acquisition series found among the .dcm files of a
    /// directory.
    ///
    /// Instances are grouped by SeriesInstanceUID and the groups returned in
    /// UID order. Localizer series (scouts, topograms) are left out.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::NoValidInstances`] when no acquisition series
    /// remains.
    pub fn series_from_directory(
        path: impl AsRef<Path>,
        sort_by: SortBy,
    ) -> Result<Vec<Self>, LoaderError> {
        let mut groups: BTreeMap<String, Vec<DefaultDicomObject>> = BTreeMap::new();
        for path in Self::dicom_paths(path.as_ref())? {
            let object = open_file(&path)?;
            let uid = ScoutLoader::get_string(&object, tags::SERIES_INSTANCE_UID)
                .unwrap_or_default();
            groups.entry(uid).or_default().push(object);
        }

        let mut series = Vec::new();
        for (uid, objects) in &groups {
            let objects: Vec<&InMemDicomObject> = objects.iter().map(|object| &**object).collect();
            if ScoutLoader::is_localizer_series(objects.iter().copied()) {
                info!(series = %uid, "skipping localizer series");
                continue;
            }
            series.push(Self::from_dicom_objects(objects, sort_by)?);
        }

        if series.is_empty() {
            return Err(LoaderError::NoValidInstances);
        }
        info!(series = series.len(), "loaded acquisition series");
        Ok(series)
    }

    fn dicom_paths(dir: &Path) -> Result<Vec<PathBuf>, LoaderError> {
        let mut paths: Vec<_> = fs::read_dir(dir)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|s| s.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("dcm"))
            })
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(LoaderError::NoValidInstances);
        }
        Ok(paths)
    }

    fn sort_instances(instances: &mut [AecInstance], sort_by: SortBy) {
        if !matches!(sort_by, SortBy::None) {
            instances.sort_by(|a, b| {
                a.sort_key(sort_by)
                    .partial_cmp(&b.sort_key(sort_by))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        if matches!(sort_by, SortBy::ImagePositionPatient) {
            instances.reverse();
        }
    }

    pub fn series_uid(&self) -> Option<&str> {
        self.series_uid.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn instances(&self) -> &[AecInstance] {
        &self.instances
    }

    /// Instance numbers in series order; missing numbers take their index.
    pub fn instance_numbers(&self) -> Vec<i32> {
        self.instances
            .iter()
            .enumerate()
            .map(|(i, instance)| instance.instance_number.unwrap_or(i as i32))
            .collect()
    }

    pub fn tube_currents(&self) -> Vec<f64> {
        self.instances.iter().map(|i| i.tube_current).collect()
    }

    /// Tube current per instance as a `1 × n` grid.
    pub fn tube_current_grid(&self) -> SampleGrid {
        SampleGrid::from_row(&self.tube_currents())
    }

    /// Begin and end markers of the series on `scout`.
    ///
    /// Instances whose position is missing or cannot be mapped onto the
    /// scout are skipped.
    pub fn slice_markers(&self, scout: &Raster) -> Vec<SliceMarker> {
        let ends = match self.instances.as_slice() {
            [] => return Vec::new(),
            [only] => vec![(MarkerKind::Begin, only)],
            [first, .., last] => vec![(MarkerKind::Begin, first), (MarkerKind::End, last)],
        };

        ends.into_iter()
            .filter_map(|(kind, instance)| {
                let Some(position) = instance.position else {
                    warn!(marker = kind.label(), "slice has no ImagePositionPatient");
                    return None;
                };
                match CoordinateMapper::world_to_pixel(position, scout) {
                    Ok(pixel) => Some(SliceMarker { kind, pixel }),
                    Err(err) => {
                        warn!(marker = kind.label(), %err, "skipping slice marker");
                        None
                    }
                }
            })
            .collect()
    }
}
