use std::path::{Path, PathBuf};

use image::DynamicImage;
use tracing::*;

use crate::{
    compose::Progress,
    extract::extract_cell,
    grid::{CellRect, Grid, GridSpec},
    grid_like::GridLike,
    io, GridError,
};

/// Configuration for splitting.
///
/// # Example
/// ```
/// use gridcut::SplitConfig;
///
/// let config = SplitConfig::default();
/// assert!(!config.strict);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SplitConfig {
    /// Reject grids finer than the image instead of skipping the empty cells.
    pub strict: bool,
}

impl SplitConfig {
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }
}

/// What a split wrote.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SplitReport {
    pub output_dir: PathBuf,
    pub grid: GridSpec,
    /// Size of the cells that do not absorb a remainder.
    pub base_cell_size: (u32, u32),
    /// Files written, in row-major order.
    pub written: Vec<PathBuf>,
    /// Cells without pixels, which are not written.
    pub skipped: Vec<CellRect>,
}

/// File name of a split cell; all three numbers are 1-based.
///
/// # Example
/// ```
/// use gridcut::cell_file_name;
///
/// assert_eq!(cell_file_name(7, 2, 3), "cell_007_row02_col03.png");
/// ```
pub fn cell_file_name(sequence: usize, row: u32, column: u32) -> String {
    format!("cell_{sequence:03}_row{row:02}_col{column:02}.png")
}

/// Splits `source` into `spec` cells and writes each one as a PNG into `output_dir`.
///
/// Cells are written one at a time, so a failure leaves the cells written so
/// far in place.
pub fn split_image(
    source: &DynamicImage,
    spec: GridSpec,
    output_dir: &Path,
    config: &SplitConfig,
    mut on_progress: impl FnMut(Progress),
) -> Result<SplitReport, GridError> {
    let (width, height) = (source.width(), source.height());
    if config.strict {
        spec.validate_against(width, height)?;
    }
    let grid = Grid::uniform(width, height, spec)?;
    let base_cell_size = grid.base_cell_size();
    let total = grid.cell_count();
    info!(
        "Splitting {}x{} image into {} cells of {}x{}",
        width, height, total, base_cell_size.0, base_cell_size.1
    );
    if grid.empty_cell_count() > 0 {
        warn!(
            "{} of {} cells have no pixels and will be skipped",
            grid.empty_cell_count(),
            total
        );
    }

    let mut written = Vec::with_capacity(total);
    let mut skipped = Vec::new();
    for (index, rect) in grid.cells().enumerate() {
        // Empty cells keep their sequence number so names stay positional
        if rect.is_empty() {
            skipped.push(rect);
        } else {
            let cell = extract_cell(source, &rect)?;
            let path = output_dir.join(cell_file_name(index + 1, rect.row + 1, rect.column + 1));
            io::save_png(&cell, &path)?;
            written.push(path);
        }
        on_progress(Progress {
            current: index + 1,
            total,
        });
    }

    Ok(SplitReport {
        output_dir: output_dir.to_path_buf(),
        grid: spec,
        base_cell_size,
        written,
        skipped,
    })
}

/// Loads the image at `path`, creates `{stem}_split_{timestamp}` next to it (or
/// under `output_root`) and splits into it.
pub fn split_file(
    path: impl AsRef<Path>,
    spec: GridSpec,
    output_root: Option<&Path>,
    config: &SplitConfig,
    on_progress: impl FnMut(Progress),
) -> Result<SplitReport, GridError> {
    let path = path.as_ref();
    if !io::is_supported_image(path) {
        return Err(GridError::Path {
            path: path.to_path_buf(),
            reason: format!(
                "unsupported file format, expected one of: {}",
                io::SUPPORTED_EXTENSIONS.join(", ")
            ),
        });
    }
    let loaded = io::load_image(path)?;
    info!(
        "Image loaded: {}x{} pixels",
        loaded.image.width(),
        loaded.image.height()
    );
    spec.validate()?;
    if config.strict {
        spec.validate_against(loaded.image.width(), loaded.image.height())?;
    }
    let output_dir = io::create_output_dir(path, output_root, &io::timestamp_now())?;
    split_image(&loaded.image, spec, &output_dir, config, on_progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn checker(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 10) as u8, (y * 10) as u8, ((x + y) % 2 * 255) as u8])
        }))
    }

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_cell_file_name_padding() {
        assert_eq!(cell_file_name(1, 1, 1), "cell_001_row01_col01.png");
        assert_eq!(cell_file_name(1234, 100, 7), "cell_1234_row100_col07.png");
    }

    #[test]
    fn test_split_writes_one_file_per_cell() {
        let dir = TempDir::new().unwrap();
        let source = checker(10, 7);
        let spec = GridSpec::new(2, 3).unwrap();
        let report = split_image(&source, spec, dir.path(), &SplitConfig::default(), |_| {}).unwrap();

        assert_eq!(report.base_cell_size, (3, 3));
        assert_eq!(
            names(&report.written),
            vec![
                "cell_001_row01_col01.png",
                "cell_002_row01_col02.png",
                "cell_003_row01_col03.png",
                "cell_004_row02_col01.png",
                "cell_005_row02_col02.png",
                "cell_006_row02_col03.png",
            ]
        );

        let last = image::open(&report.written[5]).unwrap();
        assert_eq!(last.dimensions(), (4, 4));
        assert_eq!(last.get_pixel(0, 0), source.get_pixel(6, 3));
    }

    #[test]
    fn test_permissive_split_skips_empty_cells() {
        let dir = TempDir::new().unwrap();
        let spec = GridSpec::new(1, 4).unwrap();
        let report = split_image(&checker(2, 2), spec, dir.path(), &SplitConfig::default(), |_| {}).unwrap();

        assert_eq!(names(&report.written), vec!["cell_004_row01_col04.png"]);
        assert_eq!(report.skipped.len(), 3);
    }

    #[test]
    fn test_strict_split_rejects_fine_grid() {
        let dir = TempDir::new().unwrap();
        let spec = GridSpec::new(1, 4).unwrap();
        let err = split_image(&checker(2, 2), spec, dir.path(), &SplitConfig::new(true), |_| {})
            .unwrap_err();
        assert!(matches!(err, GridError::InvalidGrid { rows: 1, columns: 4 }));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_progress_reports_each_cell() {
        let dir = TempDir::new().unwrap();
        let spec = GridSpec::new(2, 2).unwrap();
        let mut seen = Vec::new();
        split_image(&checker(4, 4), spec, dir.path(), &SplitConfig::default(), |p| {
            seen.push(p.current)
        })
        .unwrap();
        assert_eq!(seen, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_split_file_creates_timestamped_folder() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("sheet.png");
        checker(6, 6).save(&source).unwrap();

        let spec = GridSpec::new(3, 2).unwrap();
        let report = split_file(&source, spec, None, &SplitConfig::default(), |_| {}).unwrap();

        let folder = report.output_dir.file_name().unwrap().to_string_lossy().into_owned();
        assert!(folder.starts_with("sheet_split_"));
        assert_eq!(folder.len(), "sheet_split_".len() + "yyyyMMdd_HHmmss".len());
        assert_eq!(report.output_dir.parent(), Some(dir.path()));
        assert_eq!(report.written.len(), 6);
    }

    #[test]
    fn test_split_file_rejects_unsupported_extension() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("sheet.gif");
        std::fs::write(&source, b"GIF89a").unwrap();

        let spec = GridSpec::new(1, 1).unwrap();
        let err = split_file(&source, spec, None, &SplitConfig::default(), |_| {}).unwrap_err();
        assert!(matches!(err, GridError::Path { .. }));
    }
}
