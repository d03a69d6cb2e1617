use tracing::*;

use crate::GridError;

/// Largest canvas side accepted: the biggest dimension every supported output
/// codec (PNG, JPEG, BMP) can represent.
pub const MAX_CANVAS_DIMENSION: u64 = u16::MAX as u64;
/// Canvas sides above this still work but may exhaust memory.
pub const SOFT_DIMENSION_LIMIT: u64 = 32_767;

/// Validated dimensions of a merge canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
    /// Set when a side exceeds the soft limit.
    pub oversized: bool,
}

/// Hard and soft ceilings for canvas dimensions.
///
/// # Example
/// ```
/// use gridcut::SizeLimits;
///
/// let limits = SizeLimits::default();
/// assert_eq!(limits.max_dimension, 65_535);
/// assert_eq!(limits.warn_dimension, 32_767);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeLimits {
    pub max_dimension: u64,
    pub warn_dimension: u64,
}

impl Default for SizeLimits {
    fn default() -> Self {
        Self {
            max_dimension: MAX_CANVAS_DIMENSION,
            warn_dimension: SOFT_DIMENSION_LIMIT,
        }
    }
}

/// Validates the canvas for `rows × columns` cells of `cell_width × cell_height`
/// against the default [`SizeLimits`].
///
/// # Example
/// ```
/// use gridcut::{validate_canvas_size, GridError};
///
/// let size = validate_canvas_size(20_000, 20_000, 2, 1).unwrap();
/// assert_eq!((size.width, size.height), (20_000, 40_000));
/// assert!(size.oversized);
///
/// let err = validate_canvas_size(40_000, 40_000, 2, 2).unwrap_err();
/// assert!(matches!(err, GridError::SizeOverflow { .. }));
/// ```
pub fn validate_canvas_size(
    cell_width: u32,
    cell_height: u32,
    rows: u32,
    columns: u32,
) -> Result<CanvasSize, GridError> {
    validate_canvas_size_with(SizeLimits::default(), cell_width, cell_height, rows, columns)
}

/// Validates canvas dimensions against custom limits.
///
/// Checks run in order: cell size, grid counts, hard ceiling, soft ceiling.
/// Only the last one is non-fatal.
pub fn validate_canvas_size_with(
    limits: SizeLimits,
    cell_width: u32,
    cell_height: u32,
    rows: u32,
    columns: u32,
) -> Result<CanvasSize, GridError> {
    if cell_width == 0 || cell_height == 0 {
        error!(
            "Invalid cell dimensions: width={}, height={}",
            cell_width, cell_height
        );
        return Err(GridError::InvalidCellSize {
            width: cell_width,
            height: cell_height,
        });
    }
    if rows == 0 || columns == 0 {
        error!("Invalid grid: rows={}, columns={}", rows, columns);
        return Err(GridError::InvalidGrid { rows, columns });
    }

    let total_width = u64::from(cell_width) * u64::from(columns);
    let total_height = u64::from(cell_height) * u64::from(rows);
    // The ceiling is also clamped to u32 so the casts below cannot truncate
    let max = limits.max_dimension.min(u64::from(u32::MAX));
    if total_width > max || total_height > max {
        error!(
            "Final image size {}x{} exceeds the maximum dimension {}",
            total_width, total_height, max
        );
        return Err(GridError::SizeOverflow {
            width: total_width,
            height: total_height,
            max,
        });
    }

    let oversized = total_width > limits.warn_dimension || total_height > limits.warn_dimension;
    if oversized {
        warn!(
            "Very large image ({}x{}) may cause memory issues",
            total_width, total_height
        );
    }

    Ok(CanvasSize {
        width: total_width as u32,
        height: total_height as u32,
        oversized,
    })
}
