//! Distributed linear algebra for Conduction.
//!
//! - [`CsrMatrix`]: compressed sparse rows over one rank's owned rows, with
//!   columns in the rank's ghosted index space.
//! - [`DistMatrix`] and [`MatrixAssembler`]: a row-partitioned matrix over a
//!   [`HaloExchange`](conduction_mesh::HaloExchange) layout, with the
//!   diagonal and scaling operations the time-stepping engine needs.
//! - [`LinearSolver`]: preconditioned Krylov solves (BiCGSTAB, CG) and a
//!   Jacobi iteration, configured by [`SolverOptions`].
//!
//! Dot products and norms are global reductions; matrix-vector products
//! pull the halo of their input. Both are collectives.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod csr;
pub mod krylov;
pub mod matrix;
pub mod options;
pub mod vector_ops;

pub use csr::CsrMatrix;
pub use krylov::{LinearSolver, SolveReport, SolveStatus};
pub use matrix::{DistMatrix, MatrixAssembler};
pub use options::{KrylovMethod, Preconditioner, SolverOptions};
