use std::{
    iter,
    path::{Path, PathBuf},
};

use image::{imageops::FilterType, GenericImageView};
use tracing::*;

use crate::{
    alpha::AlphaProbe,
    compose::{CellDiagnostic, Canvas, Composer, Progress, DEFAULT_RESIZE_FILTER},
    grid::GridSpec,
    guard::{validate_canvas_size_with, CanvasSize, SizeLimits},
    io, GridError,
};

/// Configuration for merging.
///
/// # Example
/// ```
/// use gridcut::MergeConfig;
///
/// let config = MergeConfig::default();
/// assert_eq!(config.limits.max_dimension, 65_535);
/// assert_eq!(config.probe.file_limit, 5);
/// ```
#[derive(Debug, Clone)]
pub struct MergeConfig {
    pub limits: SizeLimits,
    pub probe: AlphaProbe,
    /// Filter used to stretch cells that do not match the first image's size.
    pub resize_filter: FilterType,
}

impl MergeConfig {
    pub fn new(limits: SizeLimits, probe: AlphaProbe, resize_filter: FilterType) -> Self {
        Self {
            limits,
            probe,
            resize_filter,
        }
    }
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self::new(
            SizeLimits::default(),
            AlphaProbe::default(),
            DEFAULT_RESIZE_FILTER,
        )
    }
}

/// What a merge produced.
#[derive(Debug)]
pub struct MergeReport {
    pub output: PathBuf,
    pub canvas: CanvasSize,
    pub cell_size: (u32, u32),
    pub alpha: bool,
    /// Number of inputs consumed, at most `rows * columns`.
    pub cells_used: usize,
    pub placed: usize,
    pub diagnostics: Vec<CellDiagnostic>,
}

/// Merges the images at `paths` into one PNG at `output`, laid out on `spec`.
///
/// The first image fixes the cell size; every other cell is stretched to it.
/// The whole merge fails when the grid is invalid, the first image cannot be
/// decoded, the canvas is too large or cannot be allocated. Any other failing
/// cell is replaced by the background and reported in
/// [`MergeReport::diagnostics`]. Nothing is written on failure.
pub fn merge_images<P: AsRef<Path>>(
    paths: &[P],
    spec: GridSpec,
    output: impl AsRef<Path>,
    config: &MergeConfig,
    on_progress: impl FnMut(Progress),
) -> Result<MergeReport, GridError> {
    let first_path = paths.first().ok_or(GridError::EmptyInput)?.as_ref();
    spec.validate()?;
    let output = io::normalize_output_path(output)?;

    let capacity = spec.cell_count();
    if capacity != paths.len() as u64 {
        warn!(
            "Number of cells ({}) does not match number of images ({}), the first {} images will be used",
            capacity,
            paths.len(),
            capacity.min(paths.len() as u64)
        );
    }

    let first = io::load_image(first_path).inspect_err(|e| {
        error!("First file {} could not be loaded: {}", first_path.display(), e)
    })?;
    let (cell_width, cell_height) = first.image.dimensions();
    let canvas_size =
        validate_canvas_size_with(config.limits, cell_width, cell_height, spec.rows, spec.columns)?;
    info!(
        "Size of each cell: {}x{} pixels, final image size: {}x{} pixels",
        cell_width, cell_height, canvas_size.width, canvas_size.height
    );

    // The first image is already decoded, so only the rest of the probe window is read again
    let rest_probe = AlphaProbe {
        file_limit: config.probe.file_limit.saturating_sub(1),
        ..config.probe
    };
    let alpha = config.probe.file_limit > 0
        && (config.probe.image_has_alpha(&first) || rest_probe.requires_alpha(&paths[1..]));

    let canvas = Canvas::allocate(canvas_size, alpha)?;
    let cells = iter::once(Ok(first.image)).chain(
        paths[1..]
            .iter()
            .map(|path| io::load_image(path.as_ref()).map(|loaded| loaded.image)),
    );
    let composition = Composer::new(config.resize_filter).compose(
        canvas,
        cells,
        spec,
        cell_width,
        cell_height,
        on_progress,
    );

    let cells_used = composition.placed + composition.diagnostics.len();
    io::save_png(&composition.canvas.into_image(), &output)?;
    info!("Result saved: {}", output.display());

    Ok(MergeReport {
        output,
        canvas: canvas_size,
        cell_size: (cell_width, cell_height),
        alpha,
        cells_used,
        placed: composition.placed,
        diagnostics: composition.diagnostics,
    })
}
