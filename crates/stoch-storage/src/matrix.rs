//! Compressed-sparse-row transition matrices.
//!
//! Rows are choices. For deterministic models every state owns exactly one
//! row; for nondeterministic models consecutive rows belonging to the same
//! state form a row group.

use thiserror::Error;

/// One nonzero entry of a sparse matrix row.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixEntry<T> {
    pub column: usize,
    pub value: T,
}

impl<T> MatrixEntry<T> {
    pub fn new(column: usize, value: T) -> Self {
        Self { column, value }
    }
}

/// Errors raised while assembling a matrix.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MatrixError {
    /// Entries must be added row-major with strictly increasing columns
    /// within a row.
    #[error("entry at row {row}, column {column} added out of order")]
    OutOfOrder { row: usize, column: usize },
    /// Row groups must start at or after the current row.
    #[error("row group starting at row {row} overlaps previous group")]
    BadRowGroup { row: usize },
}

/// An immutable CSR matrix with optional row grouping.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix<T> {
    entries: Vec<MatrixEntry<T>>,
    /// `row_indications[i]..row_indications[i + 1]` indexes row `i`'s
    /// entries. Always has `row_count + 1` elements.
    row_indications: Vec<usize>,
    /// Start row of each group plus a trailing sentinel; `None` for
    /// matrices without nondeterminism.
    row_group_indices: Option<Vec<usize>>,
}

impl<T> SparseMatrix<T> {
    /// Number of rows (choices).
    pub fn row_count(&self) -> usize {
        self.row_indications.len() - 1
    }

    /// Number of nonzero entries.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Number of row groups. Equals `row_count` when the matrix has no
    /// explicit grouping.
    pub fn row_group_count(&self) -> usize {
        match &self.row_group_indices {
            Some(indices) => indices.len() - 1,
            None => self.row_count(),
        }
    }

    pub fn has_row_groups(&self) -> bool {
        self.row_group_indices.is_some()
    }

    /// The entries of row `row`.
    pub fn row(&self, row: usize) -> &[MatrixEntry<T>] {
        &self.entries[self.row_indications[row]..self.row_indications[row + 1]]
    }

    /// The row range of group `group`.
    pub fn row_group(&self, group: usize) -> std::ops::Range<usize> {
        match &self.row_group_indices {
            Some(indices) => indices[group]..indices[group + 1],
            None => group..group + 1,
        }
    }

    /// Iterate over all rows in order.
    pub fn rows(&self) -> impl Iterator<Item = &[MatrixEntry<T>]> {
        (0..self.row_count()).map(|i| self.row(i))
    }
}

/// Incremental CSR builder.
///
/// Entries are appended row-major; rows and row groups may be skipped, the
/// builder fills the gaps with empty rows.
#[derive(Debug)]
pub struct SparseMatrixBuilder<T> {
    entries: Vec<MatrixEntry<T>>,
    row_indications: Vec<usize>,
    row_group_indices: Option<Vec<usize>>,
    current_row: usize,
    last_column: Option<usize>,
}

impl<T> SparseMatrixBuilder<T> {
    /// A builder for a matrix without row groups (DTMC, CTMC).
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            row_indications: vec![0],
            row_group_indices: None,
            current_row: 0,
            last_column: None,
        }
    }

    /// A builder for a row-grouped matrix (MDP).
    pub fn with_row_groups() -> Self {
        Self {
            row_group_indices: Some(Vec::new()),
            ..Self::new()
        }
    }

    /// Open a new row group starting at `row`.
    pub fn new_row_group(&mut self, row: usize) -> Result<(), MatrixError> {
        if row < self.current_row {
            return Err(MatrixError::BadRowGroup { row });
        }
        let indices = self.row_group_indices.get_or_insert_with(Vec::new);
        indices.push(row);
        Ok(())
    }

    /// Append the entry `(row, column) = value`.
    ///
    /// Rows must be visited in nondecreasing order and columns within a row
    /// in strictly increasing order.
    pub fn add_next_value(&mut self, row: usize, column: usize, value: T) -> Result<(), MatrixError> {
        if row < self.current_row {
            return Err(MatrixError::OutOfOrder { row, column });
        }
        if row > self.current_row {
            self.seal_rows_up_to(row);
            self.last_column = None;
        }
        if let Some(last) = self.last_column {
            if column <= last {
                return Err(MatrixError::OutOfOrder { row, column });
            }
        }
        self.entries.push(MatrixEntry::new(column, value));
        self.last_column = Some(column);
        Ok(())
    }

    fn seal_rows_up_to(&mut self, row: usize) {
        while self.current_row < row {
            self.row_indications.push(self.entries.len());
            self.current_row += 1;
        }
    }

    /// Finish the matrix with at least `row_count` rows, padding trailing
    /// rows empty.
    pub fn build(mut self, row_count: usize) -> SparseMatrix<T> {
        self.seal_rows_up_to(row_count.max(self.current_row + 1));
        let row_group_indices = self.row_group_indices.map(|mut indices| {
            indices.push(self.row_indications.len() - 1);
            indices
        });
        SparseMatrix {
            entries: self.entries,
            row_indications: self.row_indications,
            row_group_indices,
        }
    }
}

impl<T> Default for SparseMatrixBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_simple_matrix() {
        let mut builder = SparseMatrixBuilder::new();
        builder.add_next_value(0, 1, 0.5).unwrap();
        builder.add_next_value(0, 2, 0.5).unwrap();
        builder.add_next_value(1, 1, 1.0).unwrap();
        builder.add_next_value(2, 2, 1.0).unwrap();
        let matrix = builder.build(3);

        assert_eq!(matrix.row_count(), 3);
        assert_eq!(matrix.entry_count(), 4);
        assert_eq!(matrix.row(0).len(), 2);
        assert_eq!(matrix.row(0)[0], MatrixEntry::new(1, 0.5));
        assert_eq!(matrix.row(1), &[MatrixEntry::new(1, 1.0)]);
    }

    #[test]
    fn test_skipped_rows_are_empty() {
        let mut builder = SparseMatrixBuilder::new();
        builder.add_next_value(0, 0, 1.0).unwrap();
        builder.add_next_value(2, 0, 1.0).unwrap();
        let matrix = builder.build(4);

        assert_eq!(matrix.row_count(), 4);
        assert!(matrix.row(1).is_empty());
        assert!(matrix.row(3).is_empty());
    }

    #[test]
    fn test_out_of_order_rejected() {
        let mut builder = SparseMatrixBuilder::new();
        builder.add_next_value(0, 3, 1.0).unwrap();
        assert_eq!(
            builder.add_next_value(0, 1, 1.0),
            Err(MatrixError::OutOfOrder { row: 0, column: 1 })
        );
        assert_eq!(
            builder.add_next_value(0, 3, 1.0),
            Err(MatrixError::OutOfOrder { row: 0, column: 3 })
        );
    }

    #[test]
    fn test_row_groups() {
        let mut builder = SparseMatrixBuilder::with_row_groups();
        builder.new_row_group(0).unwrap();
        builder.add_next_value(0, 1, 1.0).unwrap();
        builder.add_next_value(1, 0, 0.5).unwrap();
        builder.add_next_value(1, 1, 0.5).unwrap();
        builder.new_row_group(2).unwrap();
        builder.add_next_value(2, 0, 1.0).unwrap();
        let matrix = builder.build(3);

        assert_eq!(matrix.row_group_count(), 2);
        assert_eq!(matrix.row_group(0), 0..2);
        assert_eq!(matrix.row_group(1), 2..3);
        assert_eq!(matrix.entry_count(), 4);
    }

    #[test]
    fn test_ungrouped_matrix_reports_trivial_groups() {
        let mut builder = SparseMatrixBuilder::new();
        builder.add_next_value(0, 0, 1.0).unwrap();
        let matrix = builder.build(2);
        assert!(!matrix.has_row_groups());
        assert_eq!(matrix.row_group_count(), 2);
        assert_eq!(matrix.row_group(1), 1..2);
    }
}
