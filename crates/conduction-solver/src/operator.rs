//! Steady-state spatial operators.
//!
//! A [`SpatialOperator`] turns a diffusivity field into the sparse matrix
//! of `div(kappa grad ·)` on a grid. The time-stepping engine scales and
//! shifts that matrix; it never builds stencils itself.

use std::fmt;
use std::sync::Arc;

use conduction_core::SolveError;
use conduction_linalg::{DistMatrix, MatrixAssembler};
use conduction_mesh::StructuredGrid;

/// Builds the discrete diffusion operator `L` for a grid.
pub trait SpatialOperator: fmt::Debug + Send + Sync {
    /// Assemble `L` over the grid's owned rows.
    ///
    /// `diffusivity` and `dirichlet_mask` are ghosted-length. Rows at
    /// masked nodes must come back with every entry zero so the caller can
    /// install its own boundary row. With `derivative` set the operator is
    /// built for unit diffusivity, i.e. `dL/dkappa` under a uniform scaling.
    ///
    /// Every row must store its diagonal. Collective.
    fn construct_matrix(
        &self,
        grid: &StructuredGrid,
        diffusivity: &[f64],
        dirichlet_mask: &[bool],
        derivative: bool,
    ) -> Result<DistMatrix, SolveError>;
}

/// Second-order centred differences on the star stencil.
///
/// For node `c` and in-grid neighbour `n` at distance `d` the coupling is
/// `w = 0.5 (kappa_n + kappa_c) / d^2`. Row `c` holds `+w` at each
/// neighbour and `-sum(w)` on the diagonal.
#[derive(Clone, Copy, Debug, Default)]
pub struct FiniteDifferenceOperator;

/// Squared Euclidean distance between two ghosted nodes, floored away from
/// zero.
pub(crate) fn distance_sq(grid: &StructuredGrid, a: usize, b: usize) -> f64 {
    let d2: f64 = grid
        .node_coord(a)
        .iter()
        .zip(grid.node_coord(b))
        .map(|(p, q)| (p - q).powi(2))
        .sum();
    if d2 == 0.0 {
        1e-24
    } else {
        d2
    }
}

impl SpatialOperator for FiniteDifferenceOperator {
    fn construct_matrix(
        &self,
        grid: &StructuredGrid,
        diffusivity: &[f64],
        dirichlet_mask: &[bool],
        derivative: bool,
    ) -> Result<DistMatrix, SolveError> {
        let ghosted = grid.ghosted_len();
        for (what, len) in [("diffusivity", diffusivity.len()), ("mask", dirichlet_mask.len())] {
            if len != ghosted {
                return Err(SolveError::DimensionMismatch {
                    what,
                    expected: ghosted,
                    got: len,
                });
            }
        }

        let stencil = grid.stencil();
        let centre = stencil.centre();
        let halo = grid.halo();
        let kappa = |g: usize| if derivative { 1.0 } else { diffusivity[g] };

        let mut asm = MatrixAssembler::new(Arc::clone(halo));
        let mut cols = Vec::with_capacity(stencil.width());
        let mut vals = Vec::with_capacity(stencil.width());

        for i in 0..stencil.owned_len() {
            let c = halo.owned_to_ghosted(i);
            let masked = dirichlet_mask[c];
            cols.clear();
            vals.clear();

            let mut diag = 0.0;
            for k in 0..stencil.width() {
                if k == centre {
                    continue;
                }
                let n = stencil.neighbours(k)[i];
                if n < 0 {
                    continue;
                }
                let n = n as usize;
                let w = 0.5 * (kappa(n) + kappa(c)) / distance_sq(grid, c, n);
                cols.push(n as i64);
                vals.push(if masked { 0.0 } else { w });
                diag -= w;
            }
            cols.push(c as i64);
            vals.push(if masked { 0.0 } else { diag });

            asm.set_values(i, &cols, &vals)?;
        }

        asm.assemble()
    }
}
