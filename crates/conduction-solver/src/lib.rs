//! Implicit heat diffusion for Conduction.
//!
//! [`DiffusionSolver`] advances `dT/dt = div(kappa grad T) + H` with the
//! theta method on a [`StructuredGrid`](conduction_mesh::StructuredGrid)
//! split across the ranks of a
//! [`Communicator`](conduction_core::Communicator). The spatial operator is
//! supplied by a [`SpatialOperator`]; [`FiniteDifferenceOperator`] is the
//! second-order star stencil.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod boundary;
pub mod config;
pub mod diffusion;
pub mod operator;

pub use boundary::{BoundaryCondition, BoundaryConditions};
pub use config::DiffusionConfig;
pub use diffusion::{DiffusionSolver, SolverState};
pub use operator::{FiniteDifferenceOperator, SpatialOperator};
