//! This crate splits raster images into a rectangular grid of cells and merges
//! ordered cell images back into a single canvas.
//! It uses the `image` and `imageproc` crates for pixel work and `tracing` for diagnostics.
//!
//! The two pipelines share the same grid geometry:
//!
//! - [`split`]: source image → [`Grid`] → cropped cells → one PNG per cell.
//! - [`merge`]: cell files → alpha probe → size guard → [`Canvas`] → one PNG.
//!
//! # Example
//! ```
//! use gridcut::compute_cells;
//!
//! let cells = compute_cells(10, 7, 2, 3).unwrap();
//! assert_eq!(cells.len(), 6);
//!
//! // The last column and the last row absorb the remainder.
//! let last = cells.last().unwrap();
//! assert_eq!((last.x, last.y, last.width, last.height), (6, 3, 4, 4));
//! ```

/// Probing merge inputs for transparency.
pub mod alpha;
/// Drawing cell images onto a merge canvas.
pub mod compose;
/// Cropping single cells out of a source image.
pub mod extract;
/// Grid geometry: rows, columns and cell rectangles.
pub mod grid;
/// Row and column access shared by grid types.
pub mod grid_like;
/// Canvas dimension validation.
pub mod guard;
/// File-system collaborators: enumeration, decoding, encoding and output paths.
pub mod io;
/// The merge pipeline.
pub mod merge;
/// The split pipeline.
pub mod split;

use std::path::PathBuf;

use image::ImageError;
use thiserror::Error;

pub use alpha::{
    format_implies_alpha, format_may_encode_alpha, requires_alpha,
    sampled_region_has_transparency, AlphaProbe, ALPHA_PROBE_FILE_LIMIT, ALPHA_PROBE_SAMPLE_SIZE,
};
pub use compose::{compose, Canvas, CellDiagnostic, Composer, Composition, Progress};
pub use extract::extract_cell;
pub use grid::{compute_cells, CellRect, Column, Grid, GridSpec, LineInfo, LineTrait, Row, SmallVecLine};
pub use grid_like::GridLike;
pub use guard::{
    validate_canvas_size, validate_canvas_size_with, CanvasSize, SizeLimits,
    MAX_CANVAS_DIMENSION, SOFT_DIMENSION_LIMIT,
};
pub use merge::{merge_images, MergeConfig, MergeReport};
pub use split::{cell_file_name, split_file, split_image, SplitConfig, SplitReport};

// Rows and columns rarely exceed this, so line lists stay on the stack
const DEFAULT_SMALLVEC_SIZE: usize = 32;

#[derive(Error, Debug)]
pub enum GridError {
    #[error("Invalid number of rows or columns: rows={rows}, columns={columns}")]
    InvalidGrid { rows: u32, columns: u32 },

    #[error("Invalid cell dimensions: width={width}, height={height}")]
    InvalidCellSize { width: u32, height: u32 },

    #[error(
        "Cell {width}x{height} at ({x}, {y}) lies outside the {source_width}x{source_height} source"
    )]
    CellOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        source_width: u32,
        source_height: u32,
    },

    #[error("Final image size {width}x{height} is too large (maximum dimension is {max})")]
    SizeOverflow { width: u64, height: u64, max: u64 },

    #[error("Failed to decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: ImageError,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: ImageError,
    },

    #[error("Insufficient memory: {0}")]
    ResourceExhausted(String),

    #[error("{}: {reason}", .path.display())]
    Path { path: PathBuf, reason: String },

    #[error("No images to merge")]
    EmptyInput,
}
