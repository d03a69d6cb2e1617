use crate::grid::{Column, Row};

/// A trait for types that provide access to rows and columns.
pub trait GridLike {
    /// Returns an iterator over all rows.
    fn rows_iter(&self) -> impl Iterator<Item = &Row>;

    /// Returns an iterator over all columns.
    fn columns_iter(&self) -> impl Iterator<Item = &Column>;

    /// Returns the number of rows.
    fn row_count(&self) -> usize {
        self.rows_iter().count()
    }

    /// Returns the number of columns.
    fn column_count(&self) -> usize {
        self.columns_iter().count()
    }

    /// Returns the number of cells, one per row and column pair.
    fn cell_count(&self) -> usize {
        self.row_count() * self.column_count()
    }

    /// Returns the number of cells that cover no pixels, which only happens when the grid
    /// is finer than the image it partitions.
    fn empty_cell_count(&self) -> usize {
        let empty_rows = self.rows_iter().filter(|r| r.height == 0).count();
        let empty_columns = self.columns_iter().filter(|c| c.width == 0).count();
        // Inclusion-exclusion over rows and columns with zero extent
        empty_rows * self.column_count() + empty_columns * self.row_count()
            - empty_rows * empty_columns
    }
}
