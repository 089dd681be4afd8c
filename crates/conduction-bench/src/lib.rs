//! Benchmark profiles for the Conduction diffusion solver.
//!
//! - [`reference_profile`]: 100x100 plate (10K nodes)
//! - [`stress_profile`]: 316x316 plate (~100K nodes)
//! - [`prepared_solver`]: a solver with layered diffusivity, a point heat
//!   source and one cold wall

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::Arc;

use conduction_core::{Communicator, DiffusionError, Wall};
use conduction_linalg::SolverOptions;
use conduction_solver::{DiffusionConfig, DiffusionSolver};

/// 100x100 plate on the unit square, Crank–Nicolson.
pub fn reference_profile() -> DiffusionConfig {
    DiffusionConfig::new(&[0.0, 0.0], &[1.0, 1.0], &[100, 100])
        .with_solver(SolverOptions::default().with_rtol(1e-6))
}

/// 316x316 plate on the unit square, Crank–Nicolson.
pub fn stress_profile() -> DiffusionConfig {
    DiffusionConfig::new(&[0.0, 0.0], &[1.0, 1.0], &[316, 316])
        .with_solver(SolverOptions::default().with_rtol(1e-6))
}

/// Build a solver for `config` with two diffusivity layers, a heat source
/// at the centre node and the `MinX` wall held at zero.
pub fn prepared_solver(
    config: DiffusionConfig,
    comm: Arc<dyn Communicator>,
) -> Result<DiffusionSolver, DiffusionError> {
    let mut solver = DiffusionSolver::new(config, comm)?;
    let dim = solver.grid().dim();
    let coords = solver.grid().coords();

    let mut kappa = Vec::with_capacity(coords.len() / dim);
    let mut heat = Vec::with_capacity(coords.len() / dim);
    for node in coords.chunks(dim) {
        kappa.push(if node[dim - 1] < 0.5 { 1.0 } else { 3.0 });
        let centred = node.iter().all(|&c| (c - 0.5).abs() < 1e-2);
        heat.push(if centred { 10.0 } else { 0.0 });
    }
    solver.update_properties(&kappa, &heat)?;
    solver.boundary_condition(Wall::MinX, 0.0, false)?;
    Ok(solver)
}
