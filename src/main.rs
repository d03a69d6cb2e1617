mod prompt;

use std::{
    io::Write,
    num::NonZeroU32,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use gridcut::{
    io::{list_image_files, normalize_output_path},
    merge_images, split_file, validate_canvas_size_with, CanvasSize, Grid, GridSpec, MergeConfig,
    Progress, SizeLimits, SplitConfig, MAX_CANVAS_DIMENSION, SOFT_DIMENSION_LIMIT,
};
use tracing_subscriber::EnvFilter;

// Status lines already go to stdout, so only errors are logged by default
const DEFAULT_LOG_FILTER: &str = "gridcut=error";

/// Split an image into a grid of cells, or merge cells back into one image.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Runs the interactive prompts when omitted.
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Split an image into rows × columns PNG cells.
    Split(SplitArgs),
    /// Merge a folder of cell images into one PNG.
    Merge(MergeArgs),
}

#[derive(Args, Debug)]
struct SplitArgs {
    /// Image to split (PNG, JPG, JPEG or BMP).
    image: PathBuf,

    /// Number of rows.
    #[arg(short, long)]
    rows: NonZeroU32,

    /// Number of columns.
    #[arg(short, long)]
    columns: NonZeroU32,

    /// Reject grids finer than the image instead of skipping empty cells.
    #[arg(long)]
    strict: bool,

    /// Folder to create the output folder in, next to the image by default.
    #[arg(long, value_name = "DIR")]
    output_root: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct MergeArgs {
    /// Folder holding the cell images, merged in file-name order.
    frames: PathBuf,

    /// Number of rows.
    #[arg(short, long)]
    rows: NonZeroU32,

    /// Number of columns.
    #[arg(short, long)]
    columns: NonZeroU32,

    /// Result file; `.png` is appended when missing.
    #[arg(short, long)]
    output: PathBuf,

    /// Largest width or height accepted for the result.
    #[arg(long, default_value_t = MAX_CANVAS_DIMENSION)]
    max_dimension: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Command::Split(args)) => run_split(
            &args.image,
            grid_spec(args.rows, args.columns)?,
            args.output_root.as_deref(),
            SplitConfig::new(args.strict),
        ),
        Some(Command::Merge(args)) => {
            let config = MergeConfig {
                limits: SizeLimits {
                    max_dimension: args.max_dimension,
                    warn_dimension: SOFT_DIMENSION_LIMIT,
                },
                ..MergeConfig::default()
            };
            run_merge(
                &args.frames,
                grid_spec(args.rows, args.columns)?,
                &args.output,
                &config,
            )
        }
        None => run_interactive(),
    }
}

fn grid_spec(rows: NonZeroU32, columns: NonZeroU32) -> Result<GridSpec> {
    Ok(GridSpec::new(rows.get(), columns.get())?)
}

fn print_progress(label: &'static str) -> impl FnMut(Progress) {
    move |progress| {
        print!("\r{label}: {}/{}", progress.current, progress.total);
        let _ = std::io::stdout().flush();
    }
}

/// Reads only the header, sniffing the format from the content like the library does.
fn header_dimensions(path: &Path) -> Result<(u32, u32)> {
    let dimensions = image::ImageReader::open(path)?
        .with_guessed_format()?
        .into_dimensions()
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(dimensions)
}

/// Source dimensions and base cell size of a split, read from the image header.
fn planned_split(image: &Path, spec: GridSpec) -> Result<((u32, u32), (u32, u32))> {
    let (width, height) = header_dimensions(image)?;
    let grid = Grid::uniform(width, height, spec)?;
    Ok(((width, height), grid.base_cell_size()))
}

/// Cell size and canvas of a merge, fixed by the header of the first image.
fn planned_merge(
    first: &Path,
    spec: GridSpec,
    limits: SizeLimits,
) -> Result<((u32, u32), CanvasSize)> {
    let (cell_width, cell_height) = header_dimensions(first)?;
    let canvas =
        validate_canvas_size_with(limits, cell_width, cell_height, spec.rows, spec.columns)?;
    Ok(((cell_width, cell_height), canvas))
}

fn run_split(
    image: &Path,
    spec: GridSpec,
    output_root: Option<&Path>,
    config: SplitConfig,
) -> Result<()> {
    if !image.is_file() {
        bail!("File not found: {}", image.display());
    }
    // Unsupported files are reported by split_file with a clearer message
    if let Ok(((width, height), (cell_width, cell_height))) = planned_split(image, spec) {
        println!("Image loaded: {width}x{height} pixels");
        println!("Size of each cell: {cell_width}x{cell_height} pixels");
    }

    let report = split_file(
        image,
        spec,
        output_root,
        &config,
        print_progress("Processed cells"),
    )
    .with_context(|| format!("Failed to split {}", image.display()))?;
    println!();

    if !report.skipped.is_empty() {
        println!(
            "Skipped {} cells without pixels (grid finer than image)",
            report.skipped.len()
        );
    }
    println!(
        "Image successfully split into {} cells!",
        report.written.len()
    );
    println!("Results saved to folder: {}", report.output_dir.display());
    Ok(())
}

fn run_merge(frames: &Path, spec: GridSpec, output: &Path, config: &MergeConfig) -> Result<()> {
    let files = list_image_files(frames)
        .with_context(|| format!("Failed to read folder {}", frames.display()))?;
    if files.is_empty() {
        bail!("No images found in {}", frames.display());
    }
    println!("Found {} images", files.len());

    let capacity = spec.cell_count();
    if capacity != files.len() as u64 {
        println!(
            "Warning: Number of cells ({capacity}) does not match number of images ({})",
            files.len()
        );
        println!(
            "The first {} images will be used",
            capacity.min(files.len() as u64)
        );
    }

    let ((cell_width, cell_height), canvas) = planned_merge(&files[0], spec, config.limits)
        .context("Failed to create final image")?;
    println!("Size of each cell: {cell_width}x{cell_height} pixels");
    println!("Final image size: {}x{} pixels", canvas.width, canvas.height);
    if canvas.oversized {
        println!("Warning: Very large image may cause memory issues!");
    }

    let report = merge_images(
        &files,
        spec,
        output,
        config,
        print_progress("Processed images"),
    )
    .context("Failed to create final image")?;
    println!();

    if report.alpha {
        println!("Transparency detected in images - preserved in result");
    }
    for diagnostic in &report.diagnostics {
        println!("Error: {diagnostic}");
    }
    println!("Frames successfully merged!");
    println!("Result saved: {}", report.output.display());
    Ok(())
}

fn run_interactive() -> Result<()> {
    println!("=== Image Processing Program ===");
    println!();
    match prompt::work_mode()? {
        prompt::Mode::Split => {
            println!("\n=== Image Splitting Mode ===");
            let image = prompt::path("Enter path to image file: ")?;
            let rows = prompt::positive_integer("Enter number of rows: ")?;
            let columns = prompt::positive_integer("Enter number of columns: ")?;
            run_split(
                &image,
                GridSpec::new(rows, columns)?,
                None,
                SplitConfig::default(),
            )
        }
        prompt::Mode::Merge => {
            println!("\n=== Frame Merging Mode ===");
            let frames = prompt::existing_dir("Enter path to frames folder: ")?;
            let rows = prompt::positive_integer("Enter number of rows: ")?;
            let columns = prompt::positive_integer("Enter number of columns: ")?;
            let output = prompt::retry(
                "Enter path to save result (with .png extension): ",
                |input| match prompt::strip_quotes(input) {
                    "" => Err("Path cannot be empty!".to_string()),
                    path => normalize_output_path(path).map_err(|e| e.to_string()),
                },
            )?;
            run_merge(
                &frames,
                GridSpec::new(rows, columns)?,
                &output,
                &MergeConfig::default(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_default_filter_only_logs_errors() {
        let filter = EnvFilter::new(DEFAULT_LOG_FILTER);
        assert_eq!(
            filter.max_level_hint(),
            Some(tracing_subscriber::filter::LevelFilter::ERROR)
        );
    }

    #[test]
    fn test_split_sizes_are_known_before_splitting() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sheet.png");
        RgbImage::from_pixel(10, 7, Rgb([1, 2, 3])).save(&path).unwrap();

        let planned = planned_split(&path, GridSpec::new(2, 3).unwrap()).unwrap();
        assert_eq!(planned, ((10, 7), (3, 3)));
        assert!(planned_split(&dir.path().join("missing.png"), GridSpec::new(1, 1).unwrap()).is_err());
    }

    #[test]
    fn test_merge_sizes_are_known_before_merging() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cell_001.png");
        RgbImage::from_pixel(4, 3, Rgb([1, 2, 3])).save(&path).unwrap();

        let spec = GridSpec::new(2, 5).unwrap();
        let (cell, canvas) = planned_merge(&path, spec, SizeLimits::default()).unwrap();
        assert_eq!(cell, (4, 3));
        assert_eq!((canvas.width, canvas.height), (20, 6));
        assert!(!canvas.oversized);

        let tight = SizeLimits {
            max_dimension: 10,
            warn_dimension: 5,
        };
        assert!(planned_merge(&path, spec, tight).is_err());
    }
}
