//! Relax a heated rod towards its steady state on several in-process ranks.
//!
//! ```text
//! RUST_LOG=debug cargo run -p conduction --example rod -- 4
//! ```

use std::sync::Arc;

use conduction::prelude::*;

const NODES: usize = 41;
const STEPS: usize = 200;

fn run(comm: ThreadComm) -> Result<Vec<f64>, DiffusionError> {
    let rank = comm.rank();
    let config = DiffusionConfig::new(&[0.0], &[1.0], &[NODES])
        .with_theta(0.5)
        .with_solver(SolverOptions::default().with_rtol(1e-10));
    let mut solver = DiffusionSolver::new(config, Arc::new(comm))?;

    let ghosted = solver.grid().ghosted_len();
    let kappa: Vec<f64> = solver
        .grid()
        .coords()
        .iter()
        .map(|&x| if x < 0.5 { 1.0 } else { 4.0 })
        .collect();
    solver.update_properties(&kappa, &vec![0.0; ghosted])?;
    solver.boundary_condition(Wall::MinX, 0.0, false)?;
    solver.boundary_condition(Wall::MaxX, 1.0, false)?;

    let dt = solver.calculate_dt()?;
    if rank == 0 {
        log::info!("dt = {dt:.4e}, {STEPS} steps");
    }
    for chunk in 0..4 {
        solver.timestep(STEPS / 4, Some(dt))?;
        if let Some(report) = solver.last_solve() {
            log::info!(
                "rank {rank}: chunk {chunk}, last solve {:?} in {} iterations",
                report.status,
                report.iterations
            );
        }
    }
    Ok(solver.temperature().global().to_vec())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let ranks: usize = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(2);

    let parts = run_threaded(ranks, run);
    let mut temperature = Vec::with_capacity(NODES);
    for (rank, part) in parts.into_iter().enumerate() {
        match part {
            Ok(values) => temperature.extend(values),
            Err(e) => {
                eprintln!("rank {rank} failed: {e}");
                std::process::exit(1);
            }
        }
    }

    for (i, t) in temperature.iter().enumerate().step_by(5) {
        let x = i as f64 / (NODES - 1) as f64;
        println!("x = {x:.3}  T = {t:.5}");
    }
}
