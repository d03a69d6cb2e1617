//! This module draws an ordered sequence of cell images onto a merge canvas.
//!
//! Each grid position is resolved independently: a cell that fails to decode is
//! replaced by the background and recorded as a [`CellDiagnostic`], and composition
//! carries on with the next position.
//!
//! # Examples
//!
//! ```rust
//! use gridcut::{compose, validate_canvas_size, Canvas, GridError, GridSpec};
//! use image::{DynamicImage, Rgb, RgbImage};
//!
//! let spec = GridSpec::new(1, 2).unwrap();
//! let size = validate_canvas_size(4, 4, spec.rows, spec.columns).unwrap();
//! let canvas = Canvas::allocate(size, false).unwrap();
//!
//! let red = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([255, 0, 0])));
//! let cells: Vec<Result<DynamicImage, GridError>> = vec![Ok(red), Err(GridError::EmptyInput)];
//!
//! let composition = compose(canvas, cells, spec, 4, 4);
//! assert_eq!(composition.placed, 1);
//! assert_eq!(composition.diagnostics.len(), 1);
//! ```

use std::fmt;

use image::{
    imageops::{self, FilterType},
    DynamicImage, GenericImageView, Rgba, RgbaImage,
};
use imageproc::{drawing::draw_filled_rect_mut, rect::Rect};
use tracing::*;

use crate::{grid::CellRect, guard::CanvasSize, GridError, GridSpec};

/// Background of a canvas that keeps an alpha channel.
pub const TRANSPARENT_BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 0]);
/// Background of an opaque canvas.
pub const OPAQUE_BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
/// Filter used when a cell has to be stretched to the canvas cell size.
pub const DEFAULT_RESIZE_FILTER: FilterType = FilterType::Triangle;

/// The pixel buffer a merge is composed into.
///
/// The buffer is owned by the canvas alone; cells are copied into it and never
/// borrowed from it.
#[derive(Debug, Clone)]
pub struct Canvas {
    buffer: RgbaImage,
    alpha: bool,
}

impl Canvas {
    /// Allocates a canvas and fills it with the background: transparent when
    /// `alpha` is set, opaque white otherwise.
    ///
    /// Fails with [`GridError::ResourceExhausted`] instead of aborting when the
    /// buffer cannot be reserved.
    pub fn allocate(size: CanvasSize, alpha: bool) -> Result<Self, GridError> {
        let exhausted = |reason: String| {
            error!("Insufficient memory to create final image: {}", reason);
            GridError::ResourceExhausted(format!(
                "cannot allocate a {}x{} canvas: {reason}",
                size.width, size.height
            ))
        };

        let len = u64::from(size.width) * u64::from(size.height) * 4;
        let len = usize::try_from(len).map_err(|e| exhausted(e.to_string()))?;
        let mut raw: Vec<u8> = Vec::new();
        raw.try_reserve_exact(len)
            .map_err(|e| exhausted(e.to_string()))?;

        let background = background_for(alpha);
        raw.extend(background.0.iter().copied().cycle().take(len));
        let buffer = RgbaImage::from_raw(size.width, size.height, raw)
            .ok_or_else(|| exhausted("buffer size mismatch".to_string()))?;

        debug!(
            "Allocated {}x{} canvas (alpha={})",
            size.width, size.height, alpha
        );
        Ok(Self { buffer, alpha })
    }

    pub fn has_alpha(&self) -> bool {
        self.alpha
    }

    pub fn background(&self) -> Rgba<u8> {
        background_for(self.alpha)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    /// Read-only view of the pixels composed so far.
    pub fn as_rgba(&self) -> &RgbaImage {
        &self.buffer
    }

    /// Freezes the canvas: RGBA when alpha is kept, RGB otherwise.
    pub fn into_image(self) -> DynamicImage {
        if self.alpha {
            DynamicImage::ImageRgba8(self.buffer)
        } else {
            DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(self.buffer).into_rgb8())
        }
    }

    /// Draws `cell` into `rect`, stretching it when the sizes differ.
    fn draw_cell(&mut self, cell: &DynamicImage, rect: &CellRect, filter: FilterType) {
        let pixels = if cell.dimensions() == (rect.width, rect.height) {
            cell.to_rgba8()
        } else {
            trace!(
                "Stretching {}x{} cell to {}x{}",
                cell.width(),
                cell.height(),
                rect.width,
                rect.height
            );
            imageops::resize(cell, rect.width, rect.height, filter)
        };

        let (x, y) = (i64::from(rect.x), i64::from(rect.y));
        if self.alpha {
            // The region is still clear, so source-over reduces to a copy
            imageops::replace(&mut self.buffer, &pixels, x, y);
        } else {
            imageops::overlay(&mut self.buffer, &pixels, x, y);
        }
    }

    /// Resets `rect` to the background.
    fn clear_cell(&mut self, rect: &CellRect) {
        let background = self.background();
        if let Ok(area) = Rect::try_from(rect) {
            draw_filled_rect_mut(&mut self.buffer, area, background);
        }
    }
}

fn background_for(alpha: bool) -> Rgba<u8> {
    if alpha {
        TRANSPARENT_BACKGROUND
    } else {
        OPAQUE_BACKGROUND
    }
}

/// Advisory progress of a split or merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
}

/// A grid position that was filled with the background instead of its image.
#[derive(Debug)]
pub struct CellDiagnostic {
    /// Zero-based position in the input sequence.
    pub index: usize,
    pub row: u32,
    pub column: u32,
    pub error: GridError,
}

impl fmt::Display for CellDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cell {} (row {}, column {}): {}",
            self.index + 1,
            self.row + 1,
            self.column + 1,
            self.error
        )
    }
}

/// The outcome of [`compose`].
#[derive(Debug)]
pub struct Composition {
    pub canvas: Canvas,
    /// Number of positions drawn from an image.
    pub placed: usize,
    /// One entry per position that fell back to the background.
    pub diagnostics: Vec<CellDiagnostic>,
}

/// Composes cells onto a canvas with a configurable resize filter.
#[derive(Debug, Clone, Copy)]
pub struct Composer {
    pub filter: FilterType,
}

impl Default for Composer {
    fn default() -> Self {
        Self::new(DEFAULT_RESIZE_FILTER)
    }
}

impl Composer {
    pub fn new(filter: FilterType) -> Self {
        Self { filter }
    }

    /// Draws `cells` onto `canvas` in row-major order, one `cell_width × cell_height`
    /// slot per grid position.
    ///
    /// The iterator is pulled lazily, one image at a time. Composition stops when
    /// it runs dry, leaving the remaining slots as background, and entries beyond
    /// `spec.rows * spec.columns` are never pulled.
    pub fn compose<I>(
        &self,
        mut canvas: Canvas,
        cells: I,
        spec: GridSpec,
        cell_width: u32,
        cell_height: u32,
        mut on_progress: impl FnMut(Progress),
    ) -> Composition
    where
        I: IntoIterator<Item = Result<DynamicImage, GridError>>,
    {
        let cells = cells.into_iter();
        let positions = spec.cell_count().min(usize::MAX as u64) as usize;
        let total = cells.size_hint().1.map_or(positions, |n| n.min(positions));

        let slots = (0..spec.rows).flat_map(move |row| {
            (0..spec.columns).map(move |column| CellRect {
                row,
                column,
                x: column.saturating_mul(cell_width),
                y: row.saturating_mul(cell_height),
                width: cell_width,
                height: cell_height,
            })
        });

        let mut placed = 0;
        let mut diagnostics = Vec::new();
        for (index, (rect, cell)) in slots.zip(cells).enumerate() {
            match self.place(&mut canvas, cell, &rect) {
                Ok(_) => placed += 1,
                Err(error) => {
                    canvas.clear_cell(&rect);
                    warn!(
                        "Cell {} (row {}, column {}) replaced by background: {}",
                        index + 1,
                        rect.row + 1,
                        rect.column + 1,
                        error
                    );
                    diagnostics.push(CellDiagnostic {
                        index,
                        row: rect.row,
                        column: rect.column,
                        error,
                    });
                }
            }
            on_progress(Progress {
                current: index + 1,
                total,
            });
        }

        info!(
            "Composed {} cells, {} replaced by background",
            placed,
            diagnostics.len()
        );
        Composition {
            canvas,
            placed,
            diagnostics,
        }
    }

    fn place(
        &self,
        canvas: &mut Canvas,
        cell: Result<DynamicImage, GridError>,
        rect: &CellRect,
    ) -> Result<CellRect, GridError> {
        let image = cell?;
        canvas.draw_cell(&image, rect, self.filter);
        Ok(*rect)
    }
}

/// Composes with the default filter and no progress reporting.
pub fn compose<I>(
    canvas: Canvas,
    cells: I,
    spec: GridSpec,
    cell_width: u32,
    cell_height: u32,
) -> Composition
where
    I: IntoIterator<Item = Result<DynamicImage, GridError>>,
{
    Composer::default().compose(canvas, cells, spec, cell_width, cell_height, |_| {})
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::validate_canvas_size;
    use image::{Rgb, RgbImage};
    use pretty_assertions::assert_eq;
    use std::cell::Cell;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    fn solid(width: u32, height: u32, color: Rgba<u8>) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, color))
    }

    fn canvas(spec: GridSpec, cell: u32, alpha: bool) -> Canvas {
        let size = validate_canvas_size(cell, cell, spec.rows, spec.columns).unwrap();
        Canvas::allocate(size, alpha).unwrap()
    }

    fn slot_color(canvas: &Canvas, row: u32, column: u32, cell: u32) -> Rgba<u8> {
        *canvas.as_rgba().get_pixel(column * cell + 1, row * cell + 1)
    }

    #[test]
    fn test_background_fill() {
        let spec = GridSpec::new(1, 1).unwrap();
        let opaque = canvas(spec, 3, false);
        assert!(opaque.as_rgba().pixels().all(|p| *p == OPAQUE_BACKGROUND));
        let clear = canvas(spec, 3, true);
        assert!(clear.as_rgba().pixels().all(|p| *p == TRANSPARENT_BACKGROUND));
    }

    #[test]
    fn test_cells_land_in_row_major_slots() {
        let spec = GridSpec::new(2, 2).unwrap();
        let cells = [RED, GREEN, BLUE, RED].map(|c| Ok(solid(4, 4, c)));
        let composition = compose(canvas(spec, 4, false), cells, spec, 4, 4);

        assert_eq!(composition.placed, 4);
        assert!(composition.diagnostics.is_empty());
        let c = &composition.canvas;
        assert_eq!(slot_color(c, 0, 0, 4), RED);
        assert_eq!(slot_color(c, 0, 1, 4), GREEN);
        assert_eq!(slot_color(c, 1, 0, 4), BLUE);
        assert_eq!(slot_color(c, 1, 1, 4), RED);
    }

    #[test]
    fn test_short_input_leaves_background() {
        let spec = GridSpec::new(2, 2).unwrap();
        let cells = [RED, GREEN, BLUE].map(|c| Ok(solid(4, 4, c)));
        let composition = compose(canvas(spec, 4, false), cells, spec, 4, 4);

        assert_eq!(composition.placed, 3);
        assert!(composition.diagnostics.is_empty());
        assert_eq!(slot_color(&composition.canvas, 1, 1, 4), OPAQUE_BACKGROUND);
    }

    #[test]
    fn test_excess_input_is_never_pulled() {
        let spec = GridSpec::new(1, 2).unwrap();
        let pulled = Cell::new(0);
        let cells = (0..10).map(|_| {
            pulled.set(pulled.get() + 1);
            Ok(solid(2, 2, GREEN))
        });
        let composition = compose(canvas(spec, 2, false), cells, spec, 2, 2);

        assert_eq!(composition.placed, 2);
        assert_eq!(pulled.get(), 2);
    }

    #[test]
    fn test_failed_cell_is_background_and_reported() {
        let spec = GridSpec::new(2, 2).unwrap();
        let cells = vec![
            Ok(solid(4, 4, RED)),
            Err(GridError::ResourceExhausted("cell 2".to_string())),
            Ok(solid(4, 4, GREEN)),
            Ok(solid(4, 4, BLUE)),
        ];
        let composition = compose(canvas(spec, 4, true), cells, spec, 4, 4);

        assert_eq!(composition.placed, 3);
        assert_eq!(composition.diagnostics.len(), 1);
        let diagnostic = &composition.diagnostics[0];
        assert_eq!((diagnostic.index, diagnostic.row, diagnostic.column), (1, 0, 1));
        assert_eq!(
            diagnostic.to_string(),
            "cell 2 (row 1, column 2): Insufficient memory: cell 2"
        );

        let c = &composition.canvas;
        assert_eq!(slot_color(c, 0, 0, 4), RED);
        assert_eq!(slot_color(c, 0, 1, 4), TRANSPARENT_BACKGROUND);
        assert_eq!(slot_color(c, 1, 0, 4), GREEN);
        assert_eq!(slot_color(c, 1, 1, 4), BLUE);
    }

    #[test]
    fn test_mismatched_cell_is_stretched() {
        let spec = GridSpec::new(1, 2).unwrap();
        let cells = vec![Ok(solid(4, 4, RED)), Ok(solid(1, 2, BLUE))];
        let composition = compose(canvas(spec, 4, false), cells, spec, 4, 4);

        let c = composition.canvas.as_rgba();
        for y in 0..4 {
            for x in 4..8 {
                assert_eq!(*c.get_pixel(x, y), BLUE);
            }
        }
    }

    #[test]
    fn test_transparent_pixels_are_kept_on_alpha_canvas() {
        let spec = GridSpec::new(1, 1).unwrap();
        let half = Rgba([10, 20, 30, 128]);
        let composition = compose(canvas(spec, 2, true), vec![Ok(solid(2, 2, half))], spec, 2, 2);
        assert_eq!(*composition.canvas.as_rgba().get_pixel(0, 0), half);
    }

    #[test]
    fn test_transparent_pixels_blend_onto_white_canvas() {
        let spec = GridSpec::new(1, 1).unwrap();
        let invisible = Rgba([10, 20, 30, 0]);
        let composition =
            compose(canvas(spec, 2, false), vec![Ok(solid(2, 2, invisible))], spec, 2, 2);
        assert_eq!(*composition.canvas.as_rgba().get_pixel(1, 1), OPAQUE_BACKGROUND);
    }

    #[test]
    fn test_into_image_drops_alpha_when_opaque() {
        let spec = GridSpec::new(1, 1).unwrap();
        let image = canvas(spec, 2, false).into_image();
        assert_eq!(image.color(), image::ColorType::Rgb8);
        assert_eq!(image.to_rgb8().get_pixel(0, 0), &Rgb([255, 255, 255]));

        let image = canvas(spec, 2, true).into_image();
        assert_eq!(image.color(), image::ColorType::Rgba8);
    }

    #[test]
    fn test_progress_counts_every_position() {
        let spec = GridSpec::new(2, 3).unwrap();
        let cells: Vec<_> = (0..4)
            .map(|_| Ok(DynamicImage::ImageRgb8(RgbImage::new(1, 1))))
            .collect();
        let mut seen = Vec::new();
        Composer::default().compose(canvas(spec, 1, false), cells, spec, 1, 1, |p| seen.push(p));

        assert_eq!(seen.len(), 4);
        assert_eq!(seen.last(), Some(&Progress { current: 4, total: 4 }));
    }
}
