use image::{DynamicImage, GenericImageView};
use tracing::*;

use crate::{grid::CellRect, GridError};

/// Copies the pixels under `rect` into a new image of exactly
/// `rect.width × rect.height`, keeping the source color type.
///
/// The copy is pixel-exact; nothing is resampled. A rect reaching outside the
/// source is rejected instead of being clipped.
///
/// # Example
/// ```
/// use gridcut::{compute_cells, extract_cell};
/// use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
///
/// let source = DynamicImage::ImageRgb8(RgbImage::from_fn(4, 4, |x, y| Rgb([x as u8, y as u8, 0])));
/// let cells = compute_cells(4, 4, 2, 2).unwrap();
///
/// let cell = extract_cell(&source, &cells[3]).unwrap();
/// assert_eq!(cell.dimensions(), (2, 2));
/// assert_eq!(cell.get_pixel(0, 0).0, [2, 2, 0, 255]);
/// ```
pub fn extract_cell(source: &DynamicImage, rect: &CellRect) -> Result<DynamicImage, GridError> {
    let (source_width, source_height) = source.dimensions();
    let fits_x = rect
        .x
        .checked_add(rect.width)
        .is_some_and(|right| right <= source_width);
    let fits_y = rect
        .y
        .checked_add(rect.height)
        .is_some_and(|bottom| bottom <= source_height);
    if !fits_x || !fits_y {
        error!(
            "Cell {}x{} at ({}, {}) lies outside the {}x{} source",
            rect.width, rect.height, rect.x, rect.y, source_width, source_height
        );
        return Err(GridError::CellOutOfBounds {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            source_width,
            source_height,
        });
    }

    trace!(
        "Extracting cell row={} column={} ({}x{} at {}, {})",
        rect.row,
        rect.column,
        rect.width,
        rect.height,
        rect.x,
        rect.y
    );
    Ok(source.crop_imm(rect.x, rect.y, rect.width, rect.height))
}
