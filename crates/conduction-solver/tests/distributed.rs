//! Multi-rank behaviour of the diffusion solver.
//!
//! Every scenario runs the same closure on one rank and on several ranks
//! and checks that the gathered owned data agree.

use std::sync::Arc;

use conduction_core::{Communicator, Wall};
use conduction_linalg::SolverOptions;
use conduction_solver::{DiffusionConfig, DiffusionSolver, SolverState};
use conduction_test_utils::fixtures::{linear_profile, GridSpec};
use conduction_test_utils::{assert_close, gather, on_ranks, CountingComm};

fn config(spec: &GridSpec, theta: f64) -> DiffusionConfig {
    DiffusionConfig::new(&spec.min_coord, &spec.max_coord, &spec.resolution)
        .with_theta(theta)
        .with_solver(SolverOptions::default().with_rtol(1e-12))
}

/// 5-node rod pinned at 0 and 1, Crank–Nicolson, 50 default-size steps.
fn pinned_rod(comm: Arc<dyn Communicator>) -> Vec<f64> {
    let spec = GridSpec::rod(5);
    let mut solver = DiffusionSolver::new(config(&spec, 0.5), comm).unwrap();
    solver.diffusivity_mut().write(1.0).unwrap();
    solver.boundary_condition(Wall::MinX, 0.0, false).unwrap();
    solver.boundary_condition(Wall::MaxX, 1.0, false).unwrap();
    let t = solver.timestep(50, None).unwrap().global().to_vec();
    assert_eq!(solver.state(), SolverState::Stepped);
    t
}

#[test]
fn rod_reaches_linear_profile_on_one_rank() {
    let t = gather(on_ranks(1, pinned_rod));
    assert_close(&t, &linear_profile(5, 0.0, 1.0), 1e-2);
}

#[test]
fn rod_is_identical_on_two_ranks() {
    let serial = gather(on_ranks(1, pinned_rod));
    let split = gather(on_ranks(2, pinned_rod));
    assert_close(&split, &linear_profile(5, 0.0, 1.0), 1e-2);
    assert_close(&split, &serial, 1e-8);
}

/// Heated plate: hot spot in the middle, cold left wall, insulated
/// elsewhere, non-uniform diffusivity.
fn heated_plate(comm: Arc<dyn Communicator>) -> Vec<f64> {
    let spec = GridSpec::plate(9, 6);
    let mut solver = DiffusionSolver::new(config(&spec, 0.5), comm).unwrap();

    let halo = Arc::clone(solver.grid().halo());
    let dim = solver.grid().dim();
    let mut kappa = Vec::with_capacity(halo.ghosted_len());
    let mut heat = Vec::with_capacity(halo.ghosted_len());
    for g in 0..halo.ghosted_len() {
        let xy = &solver.grid().coords()[g * dim..(g + 1) * dim];
        kappa.push(1.0 + 0.1 * xy[0] + 0.05 * xy[1]);
        heat.push(if xy[0] == 4.0 && xy[1] == 2.0 { 5.0 } else { 0.0 });
    }
    solver.update_properties(&kappa, &heat).unwrap();
    solver.boundary_condition(Wall::MinX, 0.0, false).unwrap();

    solver.timestep(10, None).unwrap();
    solver.timestep(5, Some(0.1)).unwrap().global().to_vec()
}

#[test]
fn plate_agrees_across_partitions() {
    let serial = gather(on_ranks(1, heated_plate));
    assert!(serial.iter().all(|v| v.is_finite()));
    for ranks in [2, 3] {
        let split = gather(on_ranks(ranks, heated_plate));
        assert_close(&split, &serial, 1e-8);
    }
}

#[test]
fn halo_holds_neighbour_temperature() {
    let out = on_ranks(3, |comm| {
        let spec = GridSpec::plate(6, 3);
        let mut solver = DiffusionSolver::new(config(&spec, 0.5), comm).unwrap();
        let halo = Arc::clone(solver.grid().halo());
        let owned: Vec<f64> = (0..halo.owned_len())
            .map(|i| (halo.global_offset() + i) as f64)
            .collect();
        let field = solver.temperature_mut();
        field.write_global(&owned).unwrap();
        let ghosted = field.read().unwrap().to_vec();
        (0..halo.ghosted_len())
            .all(|g| ghosted[g] == halo.ghosted_to_global(g) as f64)
    });
    assert!(out.into_iter().all(|ok| ok));
}

#[test]
fn calculate_dt_is_one_reduction() {
    let counts = on_ranks(2, |comm| {
        let counting = Arc::new(CountingComm::new(comm));
        let spec = GridSpec::rod(4);
        let solver = DiffusionSolver::new(config(&spec, 0.5), counting.clone()).unwrap();
        let before = counting.counts();
        let dt = solver.calculate_dt().unwrap();
        let after = counting.counts();
        (dt, after.reductions - before.reductions, after.sends - before.sends)
    });
    for (dt, reductions, sends) in counts {
        assert!(!dt.is_finite());
        assert_eq!(reductions, 1);
        // The reduction is counted above the point-to-point layer.
        assert_eq!(sends, 0);
    }
}
