//! Row-partitioned distributed matrices.
//!
//! Each rank owns the rows of its owned nodes. Column indices are positions
//! in the rank's ghosted buffer, so a product needs the input's halo pulled
//! first. Row `i` of the local block is owned node `i`; its diagonal column
//! is `halo.owned_to_ghosted(i)`.

use std::sync::Arc;

use conduction_core::{GridError, SolveError};
use conduction_mesh::HaloExchange;

use crate::csr::CsrMatrix;

/// Collects `(row, col, value)` entries and assembles a [`DistMatrix`].
///
/// Entries use insert semantics: setting an existing `(row, col)` replaces
/// it. Negative columns are the off-grid sentinel and are skipped.
#[derive(Debug)]
pub struct MatrixAssembler {
    halo: Arc<HaloExchange>,
    rows: Vec<Vec<(usize, f64)>>,
}

impl MatrixAssembler {
    /// An empty assembler over `halo`'s owned rows.
    pub fn new(halo: Arc<HaloExchange>) -> Self {
        let rows = vec![Vec::new(); halo.owned_len()];
        Self { halo, rows }
    }

    /// Insert `vals[j]` at `(row, cols[j])` for every non-negative column.
    ///
    /// # Errors
    ///
    /// [`SolveError::DimensionMismatch`] if `cols` and `vals` differ in
    /// length, [`SolveError::ColumnOutOfRange`] for a column beyond the
    /// ghosted layout, [`SolveError::Grid`] for a row beyond the owned
    /// range.
    pub fn set_values(&mut self, row: usize, cols: &[i64], vals: &[f64]) -> Result<(), SolveError> {
        if cols.len() != vals.len() {
            return Err(SolveError::DimensionMismatch {
                what: "values",
                expected: cols.len(),
                got: vals.len(),
            });
        }
        let n_rows = self.rows.len();
        let n_cols = self.halo.ghosted_len();
        let entries = self.rows.get_mut(row).ok_or(GridError::IndexOutOfRange {
            index: row,
            len: n_rows,
        })?;
        for (&c, &v) in cols.iter().zip(vals) {
            if c < 0 {
                continue;
            }
            let col = c as usize;
            if col >= n_cols {
                return Err(SolveError::ColumnOutOfRange { row, col, n_cols });
            }
            match entries.binary_search_by_key(&col, |&(c, _)| c) {
                Ok(k) => entries[k].1 = v,
                Err(k) => entries.insert(k, (col, v)),
            }
        }
        Ok(())
    }

    /// Finish assembly. Collective: every rank waits at a barrier before
    /// the matrix is usable.
    pub fn assemble(self) -> Result<DistMatrix, SolveError> {
        self.halo.comm().barrier()?;

        let n_rows = self.rows.len();
        let nnz = self.rows.iter().map(Vec::len).sum();
        let mut row_ptr = Vec::with_capacity(n_rows + 1);
        let mut col_idx = Vec::with_capacity(nnz);
        let mut values = Vec::with_capacity(nnz);
        row_ptr.push(0);
        for entries in self.rows {
            for (c, v) in entries {
                col_idx.push(c);
                values.push(v);
            }
            row_ptr.push(col_idx.len());
        }
        log::debug!(
            "rank {}: assembled {n_rows} rows, {nnz} entries",
            self.halo.comm().rank()
        );

        let local = CsrMatrix::from_raw(n_rows, self.halo.ghosted_len(), row_ptr, col_idx, values);
        Ok(DistMatrix::from_local(self.halo, local))
    }
}

/// A square matrix distributed by owned rows over a [`HaloExchange`] layout.
#[derive(Clone, Debug)]
pub struct DistMatrix {
    halo: Arc<HaloExchange>,
    local: CsrMatrix,
    /// Storage position of each row's diagonal entry.
    diag_pos: Vec<Option<usize>>,
}

impl DistMatrix {
    fn from_local(halo: Arc<HaloExchange>, local: CsrMatrix) -> Self {
        let diag_pos = (0..local.n_rows())
            .map(|i| local.find_index(i, halo.owned_to_ghosted(i)))
            .collect();
        Self {
            halo,
            local,
            diag_pos,
        }
    }

    /// The layout rows and columns refer to.
    pub fn halo(&self) -> &Arc<HaloExchange> {
        &self.halo
    }

    /// This rank's block.
    pub fn local(&self) -> &CsrMatrix {
        &self.local
    }

    /// Owned rows.
    pub fn n_owned(&self) -> usize {
        self.local.n_rows()
    }

    /// Ghosted columns.
    pub fn n_ghosted(&self) -> usize {
        self.local.n_cols()
    }

    /// Stored entries on this rank.
    pub fn nnz(&self) -> usize {
        self.local.nnz()
    }

    /// Entry `(row, col)` with `row` owned-local and `col` ghosted-local.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.local.get(row, col)
    }

    /// Multiply every entry by `alpha`.
    pub fn scale(&mut self, alpha: f64) {
        self.local.scale(alpha);
    }

    /// Same pattern and layout, zero off-diagonals, unit diagonal.
    pub fn identity_like(&self) -> Self {
        let mut local = self.local.with_values(0.0);
        for &k in self.diag_pos.iter().flatten() {
            local.values_mut()[k] = 1.0;
        }
        Self {
            halo: Arc::clone(&self.halo),
            local,
            diag_pos: self.diag_pos.clone(),
        }
    }

    /// Owned-length copy of the diagonal; rows without a stored diagonal
    /// read as zero.
    pub fn diagonal(&self) -> Vec<f64> {
        let values = self.local.values();
        self.diag_pos
            .iter()
            .map(|p| p.map_or(0.0, |k| values[k]))
            .collect()
    }

    fn diag_index(&self, row: usize) -> Result<usize, SolveError> {
        self.diag_pos[row].ok_or(SolveError::MissingDiagonal { row })
    }

    /// Replace the diagonal with an owned-length vector.
    pub fn set_diagonal(&mut self, diag: &[f64]) -> Result<(), SolveError> {
        if diag.len() != self.n_owned() {
            return Err(SolveError::DimensionMismatch {
                what: "diagonal",
                expected: self.n_owned(),
                got: diag.len(),
            });
        }
        for (row, &d) in diag.iter().enumerate() {
            let k = self.diag_index(row)?;
            self.local.values_mut()[k] = d;
        }
        Ok(())
    }

    /// Add `alpha` to every diagonal entry.
    pub fn shift_diagonal(&mut self, alpha: f64) -> Result<(), SolveError> {
        for row in 0..self.n_owned() {
            let k = self.diag_index(row)?;
            self.local.values_mut()[k] += alpha;
        }
        Ok(())
    }

    /// `y = A x` for owned-length `x` and `y`.
    ///
    /// `ghost` is a ghosted-length scratch buffer that receives `x` plus
    /// its halo. Collective.
    pub fn mul_vec(&self, x: &[f64], y: &mut [f64], ghost: &mut [f64]) -> Result<(), SolveError> {
        if y.len() != self.n_owned() {
            return Err(SolveError::DimensionMismatch {
                what: "product",
                expected: self.n_owned(),
                got: y.len(),
            });
        }
        self.halo.global_to_local(x, ghost)?;
        self.local.mul_vec(ghost, y);
        Ok(())
    }
}
