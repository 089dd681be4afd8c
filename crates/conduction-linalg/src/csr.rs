//! Compressed sparse row storage for one rank's rows.
//!
//! Three arrays:
//! - `row_ptr`: length `n_rows + 1`; row `i` occupies
//!   `row_ptr[i]..row_ptr[i + 1]` of the other two
//! - `col_idx`: column of each stored entry, sorted within a row
//! - `values`: value of each stored entry
//!
//! The sparsity pattern is fixed once built; only values change.

/// A CSR matrix with a fixed sparsity pattern.
#[derive(Clone, Debug, PartialEq)]
pub struct CsrMatrix {
    n_rows: usize,
    n_cols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

impl CsrMatrix {
    /// Build from raw CSR arrays.
    ///
    /// `row_ptr` must have `n_rows + 1` entries ending at `col_idx.len()`,
    /// `col_idx` and `values` must have equal length, and columns must be
    /// sorted within each row.
    pub fn from_raw(
        n_rows: usize,
        n_cols: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<f64>,
    ) -> Self {
        debug_assert_eq!(row_ptr.len(), n_rows + 1, "row_ptr must have n_rows + 1 entries");
        debug_assert_eq!(col_idx.len(), values.len(), "col_idx and values must match");
        debug_assert_eq!(row_ptr[n_rows], col_idx.len(), "row_ptr must end at nnz");
        Self {
            n_rows,
            n_cols,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of columns.
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.col_idx.len()
    }

    /// Row pointer array.
    pub fn row_ptr(&self) -> &[usize] {
        &self.row_ptr
    }

    /// Column indices of row `row`.
    pub fn row_indices(&self, row: usize) -> &[usize] {
        &self.col_idx[self.row_ptr[row]..self.row_ptr[row + 1]]
    }

    /// Values of row `row`.
    pub fn row_values(&self, row: usize) -> &[f64] {
        &self.values[self.row_ptr[row]..self.row_ptr[row + 1]]
    }

    /// Mutable values of row `row`.
    pub fn row_values_mut(&mut self, row: usize) -> &mut [f64] {
        let (start, end) = (self.row_ptr[row], self.row_ptr[row + 1]);
        &mut self.values[start..end]
    }

    /// All stored values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// All stored values, mutable.
    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// Storage position of `(row, col)`, if it is in the pattern.
    pub fn find_index(&self, row: usize, col: usize) -> Option<usize> {
        let start = self.row_ptr[row];
        self.row_indices(row)
            .binary_search(&col)
            .ok()
            .map(|k| start + k)
    }

    /// Value at `(row, col)`; `None` outside the pattern.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.find_index(row, col).map(|k| self.values[k])
    }

    /// Multiply every stored value by `alpha`.
    pub fn scale(&mut self, alpha: f64) {
        for v in self.values.iter_mut() {
            *v *= alpha;
        }
    }

    /// `y = A * x` with `x.len() == n_cols`, `y.len() == n_rows`.
    pub fn mul_vec(&self, x: &[f64], y: &mut [f64]) {
        debug_assert_eq!(x.len(), self.n_cols);
        debug_assert_eq!(y.len(), self.n_rows);
        for (row, out) in y.iter_mut().enumerate() {
            let (start, end) = (self.row_ptr[row], self.row_ptr[row + 1]);
            *out = self.col_idx[start..end]
                .iter()
                .zip(&self.values[start..end])
                .map(|(&c, &v)| v * x[c])
                .sum();
        }
    }

    /// Same pattern, every value replaced by `value`.
    pub fn with_values(&self, value: f64) -> Self {
        Self {
            values: vec![value; self.values.len()],
            ..self.clone()
        }
    }
}
