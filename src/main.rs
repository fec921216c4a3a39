use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dicom_overlay::{
    AecSeries, CompositeFrameBuilder, CropRect, FrameSize, IntensityResampler, SampleGrid,
    ScoutLoader,
    color::{ColorScale, OverlayOptions, blend_overlay},
    curve::curve_pixels,
    enums::{CellPolicy, Interpolation, SortBy},
};

#[derive(Parser, Debug)]
#[command(name = "dicom-overlay", about = "Overlay measurements on DICOM and base images")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Blend a table of readings over an image as a heat map
    Heatmap {
        /// Base image (PNG, JPEG, ...)
        image: PathBuf,
        /// Comma separated table of readings
        table: PathBuf,
        #[arg(short, long, default_value = "blended.png")]
        output: PathBuf,
        /// Crop rectangle as x,y,width,height
        #[arg(long, value_parser = parse_crop)]
        crop: Option<CropRect>,
        /// Overlay opacity, 0 to 1
        #[arg(long, default_value_t = 0.5, value_parser = parse_alpha)]
        alpha: f64,
        /// gray, hot, jet, cool or thresholds:<v1>,<v2>,...
        #[arg(long, default_value = "jet")]
        scale: ColorScale,
        #[arg(long, value_enum, default_value_t = BlankCells::Reject)]
        blank: BlankCells,
        #[arg(long)]
        nearest: bool,
    },
    /// Print where each series starts and ends on a scout, and its mA curve
    Scout {
        scout: PathBuf,
        /// Directory holding the .dcm files of one or more series
        series: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BlankCells {
    Reject,
    Zero,
    Nan,
}

impl From<BlankCells> for CellPolicy {
    fn from(blank: BlankCells) -> Self {
        match blank {
            BlankCells::Reject => CellPolicy::Reject,
            BlankCells::Zero => CellPolicy::Zero,
            BlankCells::Nan => CellPolicy::Nan,
        }
    }
}

fn parse_crop(text: &str) -> Result<CropRect, String> {
    let parts = text
        .split(',')
        .map(|part| part.trim().parse::<usize>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| err.to_string())?;
    match parts.as_slice() {
        &[x, y, width, height] => Ok(CropRect::new(x, y, width, height)),
        _ => Err("expected x,y,width,height".to_string()),
    }
}

fn parse_alpha(text: &str) -> Result<f64, String> {
    let alpha: f64 = text.trim().parse().map_err(|err| format!("{err}"))?;
    if !alpha.is_finite() {
        return Err("alpha must be a finite number".to_string());
    }
    Ok(alpha)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Heatmap {
            image,
            table,
            output,
            crop,
            alpha,
            scale,
            blank,
            nearest,
        } => {
            let (base, raster) = ScoutLoader::load_base_image(&image)
                .with_context(|| format!("loading {}", image.display()))?;
            let grid = SampleGrid::from_csv_path(&table, blank.into())
                .with_context(|| format!("loading {}", table.display()))?;

            let interpolation = if nearest {
                Interpolation::Nearest
            } else {
                Interpolation::Bilinear
            };
            let mut resampler = IntensityResampler::new(interpolation);
            let frame = FrameSize::new(raster.width, raster.height);
            let Some(composite) = CompositeFrameBuilder::build(&mut resampler, &grid, frame, crop)?
            else {
                bail!("{} holds no readings", table.display());
            };

            let options = OverlayOptions {
                alpha,
                scale,
                range: None,
            };
            blend_overlay(&base, &composite, &options)?.save(&output)?;
            info!(output = %output.display(), "saved blended image");
        }
        Command::Scout { scout, series } => {
            let raster = ScoutLoader::raster_from_file(&scout)?;

            for series in AecSeries::series_from_directory(&series, SortBy::InstanceNumber)? {
                println!(
                    "{} ({} instances)",
                    series.description().unwrap_or("Unnamed series"),
                    series.len()
                );

                let markers = series.slice_markers(&raster);
                if markers.is_empty() {
                    warn!(
                        series = series.series_uid().unwrap_or_default(),
                        "no slice position could be mapped onto the scout"
                    );
                }
                for marker in markers {
                    let note = if marker.pixel.is_within(raster.width, raster.height) {
                        ""
                    } else {
                        " (outside scout)"
                    };
                    println!(
                        "  {:<5} col {:8.2} row {:8.2}{note}",
                        marker.kind.label(),
                        marker.pixel.col,
                        marker.pixel.row
                    );
                }

                match curve_pixels(&series.tube_currents(), raster.width, raster.height) {
                    Some(points) => println!("  mA curve: {} points", points.len()),
                    None => println!("  No valid mA data"),
                }
            }
        }
    }

    Ok(())
}
