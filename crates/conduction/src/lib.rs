//! Conduction: distributed implicit heat diffusion on structured grids.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Conduction sub-crates.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use conduction::prelude::*;
//!
//! // A 1-D rod on [0, 4], held at 0 and 1 at its ends.
//! let config = DiffusionConfig::new(&[0.0], &[4.0], &[5]);
//! let mut solver = DiffusionSolver::new(config, Arc::new(SerialComm)).unwrap();
//! solver.diffusivity_mut().write(1.0).unwrap();
//! solver.boundary_condition(Wall::MinX, 0.0, false).unwrap();
//! solver.boundary_condition(Wall::MaxX, 1.0, false).unwrap();
//!
//! let temperature = solver.timestep(50, None).unwrap();
//! assert!((temperature.global()[1] - 0.25).abs() < 1e-2);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `conduction-core` | `Communicator`, `Wall`, error enums |
//! | [`comm`] | `conduction-comm` | Serial and threaded communicators |
//! | [`mesh`] | `conduction-mesh` | Domains, slabs, halo exchange, fields |
//! | [`linalg`] | `conduction-linalg` | Distributed matrices and Krylov solvers |
//! | [`solver`] | `conduction-solver` | Spatial operators and the diffusion solver |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core traits, wall identifiers and errors (`conduction-core`).
pub use conduction_core as types;

/// Communicator implementations (`conduction-comm`).
///
/// [`comm::SerialComm`] for one process, [`comm::ThreadComm`] and
/// [`comm::run_threaded`] for in-process rank groups.
pub use conduction_comm as comm;

/// Grids, partitions and distributed fields (`conduction-mesh`).
pub use conduction_mesh as mesh;

/// Distributed sparse matrices and linear solvers (`conduction-linalg`).
pub use conduction_linalg as linalg;

/// The time-stepping engine (`conduction-solver`).
pub use conduction_solver as solver;

/// Common imports for typical Conduction usage.
///
/// ```rust
/// use conduction::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use conduction_core::{Communicator, ReduceOp, Wall};

    // Errors
    pub use conduction_core::{CommError, ConfigError, DiffusionError, GridError, SolveError};

    // Communicators
    pub use conduction_comm::{run_threaded, SerialComm, ThreadComm};

    // Mesh
    pub use conduction_mesh::{Assign, DistributedField, Domain, StructuredGrid};

    // Linear algebra
    pub use conduction_linalg::{KrylovMethod, Preconditioner, SolveReport, SolverOptions};

    // Solver
    pub use conduction_solver::{
        DiffusionConfig, DiffusionSolver, FiniteDifferenceOperator, SolverState, SpatialOperator,
    };
}
