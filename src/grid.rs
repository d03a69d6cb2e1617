use crate::{grid_like::GridLike, GridError, DEFAULT_SMALLVEC_SIZE};
use imageproc::rect::Rect;
use smallvec::SmallVec;
use tracing::*;

/// A type alias for SmallVec with an optimized stack-allocated buffer size.
pub type SmallVecLine<T> = SmallVec<[T; DEFAULT_SMALLVEC_SIZE]>;

/// Number of rows and columns a grid is made of.
///
/// # Example
/// ```
/// use gridcut::GridSpec;
///
/// let spec = GridSpec::new(2, 3).unwrap();
/// assert_eq!(spec.cell_count(), 6);
/// assert!(GridSpec::new(0, 3).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct GridSpec {
    pub rows: u32,
    pub columns: u32,
}

impl GridSpec {
    /// Creates a grid spec, rejecting zero rows or columns.
    pub fn new(rows: u32, columns: u32) -> Result<Self, GridError> {
        let spec = Self { rows, columns };
        spec.validate()?;
        Ok(spec)
    }

    /// Checks that both counts are at least one.
    pub fn validate(&self) -> Result<(), GridError> {
        if self.rows == 0 || self.columns == 0 {
            error!(
                "Invalid grid: rows={}, columns={}",
                self.rows, self.columns
            );
            return Err(GridError::InvalidGrid {
                rows: self.rows,
                columns: self.columns,
            });
        }
        Ok(())
    }

    /// Rejects grids finer than the image, where some cells would have no pixels.
    ///
    /// [`compute_cells`] itself is permissive and produces such degenerate cells;
    /// this is the opt-in strict check.
    ///
    /// # Example
    /// ```
    /// use gridcut::GridSpec;
    ///
    /// let spec = GridSpec::new(2, 8).unwrap();
    /// assert!(spec.validate_against(8, 2).is_ok());
    /// assert!(spec.validate_against(7, 2).is_err());
    /// ```
    pub fn validate_against(&self, width: u32, height: u32) -> Result<(), GridError> {
        self.validate()?;
        if self.columns > width || self.rows > height {
            warn!(
                "Grid {}x{} is finer than the {}x{} image",
                self.rows, self.columns, width, height
            );
            return Err(GridError::InvalidGrid {
                rows: self.rows,
                columns: self.columns,
            });
        }
        Ok(())
    }

    /// Total number of grid positions.
    pub fn cell_count(&self) -> u64 {
        u64::from(self.rows) * u64::from(self.columns)
    }
}

/// A contiguous span along one axis of the grid.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LineInfo {
    pub start: u32,
    pub length: u32,
}

impl LineInfo {
    /// Creates a new `LineInfo` with the given start position and length.
    ///
    /// # Example
    /// ```
    /// use gridcut::LineInfo;
    ///
    /// let line = LineInfo::new(0, 10);
    /// assert_eq!(line.start, 0);
    /// assert_eq!(line.length, 10);
    /// ```
    pub fn new(start: u32, length: u32) -> Self {
        Self { start, length }
    }
}

/// Represents a row in the grid.
#[derive(Debug, PartialEq, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Row {
    pub y: u32,
    pub height: u32,
}

/// Represents a column in the grid.
#[derive(Debug, PartialEq, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Column {
    pub x: u32,
    pub width: u32,
}

/// A trait providing a factory method to create instances from a [`LineInfo`].
///
/// This trait is implemented by [`Row`] and [`Column`] so that both axes are
/// partitioned by the same code in [`Grid::partition_axis`].
///
/// # Examples
///
/// ```
/// use gridcut::{LineTrait, LineInfo, Row, Column};
///
/// let line_info = LineInfo::new(0, 100);
/// let row = Row::new(line_info.clone());
/// let column = Column::new(line_info);
/// assert_eq!(row.height, column.width);
/// ```
pub trait LineTrait {
    /// Creates a new instance from the given `LineInfo`.
    fn new(line: LineInfo) -> Self;
}

impl LineTrait for Row {
    fn new(line: LineInfo) -> Self {
        Row {
            y: line.start,
            height: line.length,
        }
    }
}

impl LineTrait for Column {
    fn new(line: LineInfo) -> Self {
        Column {
            x: line.start,
            width: line.length,
        }
    }
}

/// One rectangular cell of a grid, in source or canvas pixel coordinates.
///
/// `row` and `column` are zero-based grid indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CellRect {
    pub row: u32,
    pub column: u32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CellRect {
    /// Builds the cell at the intersection of `row` and `column`.
    pub fn from_lines(row_index: u32, row: &Row, column_index: u32, column: &Column) -> Self {
        Self {
            row: row_index,
            column: column_index,
            x: column.x,
            y: row.y,
            width: column.width,
            height: row.height,
        }
    }

    /// Whether the cell covers no pixels at all.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of pixels covered by the cell.
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl TryFrom<&CellRect> for Rect {
    type Error = GridError;

    fn try_from(cell: &CellRect) -> Result<Self, Self::Error> {
        // Rect::of_size panics on zero sizes and Rect::at takes i32 coordinates
        let x = i32::try_from(cell.x);
        let y = i32::try_from(cell.y);
        match (x, y) {
            (Ok(x), Ok(y)) if !cell.is_empty() => Ok(Rect::at(x, y).of_size(cell.width, cell.height)),
            _ => Err(GridError::InvalidCellSize {
                width: cell.width,
                height: cell.height,
            }),
        }
    }
}

/// The rows and columns a `width × height` image is partitioned into.
///
/// # Example
/// ```
/// use gridcut::{Grid, GridSpec, GridLike};
///
/// let grid = Grid::uniform(100, 50, GridSpec::new(2, 3).unwrap()).unwrap();
/// assert_eq!(grid.row_count(), 2);
/// assert_eq!(grid.column_count(), 3);
/// assert_eq!(grid.columns[2].width, 34);
/// ```
#[derive(Debug, PartialEq, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Grid {
    pub rows: SmallVecLine<Row>,
    pub columns: SmallVecLine<Column>,
}

impl Grid {
    /// Creates a new `Grid` from rows and columns.
    pub fn new(rows: SmallVecLine<Row>, columns: SmallVecLine<Column>) -> Self {
        Self { rows, columns }
    }

    /// Partitions a `width × height` area into `spec.rows × spec.columns` cells.
    ///
    /// Every cell but the last in each axis gets the truncated base size; the last
    /// row and column absorb the division remainder so the union of all cells
    /// covers the area exactly.
    pub fn uniform(width: u32, height: u32, spec: GridSpec) -> Result<Self, GridError> {
        trace!(
            "Partitioning {}x{} into {} rows and {} columns",
            width,
            height,
            spec.rows,
            spec.columns
        );
        spec.validate()?;
        let rows = Self::partition_axis::<Row>(height, spec.rows);
        let columns = Self::partition_axis::<Column>(width, spec.columns);
        Ok(Grid { rows, columns })
    }

    /// Splits `total` pixels into `count` consecutive lines.
    ///
    /// `count` must be non-zero; the last line absorbs `total % count`.
    pub fn partition_axis<T: LineTrait>(total: u32, count: u32) -> SmallVecLine<T> {
        debug!("Partitioning axis of {} pixels into {} lines", total, count);
        if count == 0 {
            return SmallVecLine::new();
        }
        let base = total / count;
        (0..count)
            .map(|i| {
                // i * base <= (count - 1) * (total / count) <= total
                let start = i * base;
                let length = if i == count - 1 { total - start } else { base };
                T::new(LineInfo::new(start, length))
            })
            .collect()
    }

    /// Size of the top-left cell, which never absorbs a remainder unless it is
    /// also the last one in its axis.
    pub fn base_cell_size(&self) -> (u32, u32) {
        let width = self.columns.first().map_or(0, |c| c.width);
        let height = self.rows.first().map_or(0, |r| r.height);
        (width, height)
    }

    /// Sum of all column widths.
    pub fn total_width(&self) -> u32 {
        self.columns.iter().map(|c| c.width).sum()
    }

    /// Sum of all row heights.
    pub fn total_height(&self) -> u32 {
        self.rows.iter().map(|r| r.height).sum()
    }

    /// Returns the cell at the given zero-based indices.
    pub fn cell(&self, row: u32, column: u32) -> Option<CellRect> {
        let r = self.rows.get(row as usize)?;
        let c = self.columns.get(column as usize)?;
        Some(CellRect::from_lines(row, r, column, c))
    }

    /// Iterates over all cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = CellRect> + '_ {
        self.rows.iter().enumerate().flat_map(move |(ri, row)| {
            self.columns
                .iter()
                .enumerate()
                .map(move |(ci, column)| CellRect::from_lines(ri as u32, row, ci as u32, column))
        })
    }
}

impl GridLike for Grid {
    fn rows_iter(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }

    fn columns_iter(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter()
    }
}

/// Computes the cells of a `source_width × source_height` image in row-major order.
///
/// Fails with [`GridError::InvalidGrid`] when `rows` or `columns` is zero. Grids finer
/// than the image are not rejected: the surplus cells come out with zero width or
/// height. Use [`GridSpec::validate_against`] to forbid that.
pub fn compute_cells(
    source_width: u32,
    source_height: u32,
    rows: u32,
    columns: u32,
) -> Result<Vec<CellRect>, GridError> {
    let spec = GridSpec::new(rows, columns)?;
    let grid = Grid::uniform(source_width, source_height, spec)?;
    Ok(grid.cells().collect())
}
