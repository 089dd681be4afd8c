//! The implicit theta-method time-stepping engine.
//!
//! Each step solves
//!
//! ```text
//! (I - dt (1 - theta) L) T_new = T + dt theta (L T + H)
//! ```
//!
//! where `L` is the spatial operator, then pins fixed-value walls and adds
//! flux walls on the right-hand side. `theta = 0` is backward Euler,
//! `theta = 1` forward Euler, `theta = 0.5` Crank–Nicolson.
//!
//! The implicit scale is `dt (1 - theta)`, not `dt theta`. Weighting the
//! implicit side by `theta` would invert the Euler limits above.
//!
//! Every public operation that touches field halos, reductions or the
//! linear solve is a collective: all ranks call it in the same order with
//! the same arguments.

use std::sync::Arc;

use conduction_core::{Communicator, ConfigError, DiffusionError, Wall};
use conduction_linalg::{DistMatrix, LinearSolver, SolveReport};
use conduction_mesh::domain::AxisVec;
use conduction_mesh::{DistributedField, StructuredGrid};

use crate::boundary::BoundaryConditions;
use crate::config::DiffusionConfig;
use crate::operator::{distance_sq, FiniteDifferenceOperator, SpatialOperator};

/// Where the solver is in its build/step cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SolverState {
    /// Constructed, no matrix yet.
    #[default]
    Idle,
    /// A coefficient matrix is cached.
    MatrixBuilt,
    /// At least one step has been taken since the last build.
    Stepped,
}

/// Per-closure-entry scratch for the explicit stencil sum.
///
/// `cols[k * owned + i]` is the ghosted neighbour of owned node `i` for
/// closure entry `k`, `vals` the matching contribution. Both are
/// overwritten in full by every right-hand-side build and carry nothing
/// between builds.
#[derive(Debug)]
struct StencilWorkspace {
    cols: Vec<i64>,
    vals: Vec<f64>,
}

/// Distributed implicit solver for `dT/dt = div(kappa grad T) + H`.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use conduction_comm::SerialComm;
/// use conduction_core::Wall;
/// use conduction_solver::{DiffusionConfig, DiffusionSolver};
///
/// let config = DiffusionConfig::new(&[0.0], &[4.0], &[5]);
/// let mut solver = DiffusionSolver::new(config, Arc::new(SerialComm)).unwrap();
/// solver.diffusivity_mut().write(1.0).unwrap();
/// solver.boundary_condition(Wall::MinX, 0.0, false).unwrap();
/// solver.boundary_condition(Wall::MaxX, 1.0, false).unwrap();
///
/// let t = solver.timestep(50, None).unwrap();
/// assert!((t.global()[2] - 0.5).abs() < 1e-2);
/// ```
#[derive(Debug)]
pub struct DiffusionSolver {
    grid: StructuredGrid,
    operator: Box<dyn SpatialOperator>,
    diffusivity: DistributedField,
    temperature: DistributedField,
    temperature_new: DistributedField,
    heat_sources: DistributedField,
    rhs: DistributedField,
    theta: f64,
    delta: AxisVec<f64>,
    workspace: StencilWorkspace,
    /// Ghosted copy of the diagonal for the boundary overwrite.
    diag_scratch: Vec<f64>,
    bcs: BoundaryConditions,
    matrix: Option<DistMatrix>,
    linear: LinearSolver,
    state: SolverState,
    last_solve: Option<SolveReport>,
}

impl DiffusionSolver {
    /// Build a solver with the finite-difference operator.
    ///
    /// Collective: partitions the grid over `comm` and reduces the maximum
    /// node spacing per axis.
    ///
    /// # Errors
    ///
    /// [`DiffusionError::Config`] for theta outside `[0, 1]`, a bad domain
    /// or bad solver options; [`DiffusionError::Grid`] if the domain cannot
    /// be split over `comm`.
    pub fn new(config: DiffusionConfig, comm: Arc<dyn Communicator>) -> Result<Self, DiffusionError> {
        Self::with_operator(config, comm, FiniteDifferenceOperator)
    }

    /// Build a solver around a custom spatial operator.
    pub fn with_operator(
        config: DiffusionConfig,
        comm: Arc<dyn Communicator>,
        operator: impl SpatialOperator + 'static,
    ) -> Result<Self, DiffusionError> {
        let domain = config.domain()?;
        config.solver.validate()?;

        let grid = StructuredGrid::new(domain, comm)?;
        let delta = grid.max_spacing()?;
        let owned = grid.owned_len();
        let width = grid.stencil().width();

        log::debug!(
            "rank {}: diffusion solver on {:?} nodes, theta {}, delta {:?}",
            grid.rank(),
            grid.domain().resolution(),
            config.theta,
            delta.as_slice()
        );

        Ok(Self {
            diffusivity: grid.create_field("diffusivity"),
            temperature: grid.create_field("temperature"),
            temperature_new: grid.create_field("temperature_new"),
            heat_sources: grid.create_field("heat_sources"),
            rhs: grid.create_field("rhs"),
            theta: config.theta,
            delta,
            workspace: StencilWorkspace {
                cols: vec![0; width * owned],
                vals: vec![0.0; width * owned],
            },
            diag_scratch: vec![0.0; grid.ghosted_len()],
            bcs: BoundaryConditions::insulated(&grid),
            matrix: None,
            linear: LinearSolver::new(config.solver),
            state: SolverState::Idle,
            last_solve: None,
            operator: Box::new(operator),
            grid,
        })
    }

    /// Largest stable explicit timestep, `sum(delta^2) / (4 max(kappa))`.
    ///
    /// Collective (global maximum of the diffusivity). Returns a
    /// non-finite value when the diffusivity is zero everywhere.
    pub fn calculate_dt(&self) -> Result<f64, DiffusionError> {
        let max_kappa = self.diffusivity.global_max()?;
        let spacing: f64 = self.delta.iter().map(|d| d * d).sum();
        Ok(spacing / (4.0 * max_kappa))
    }

    /// Build and cache `A = I - scale L`, with unit diagonal at every
    /// fixed-value boundary node.
    ///
    /// For `scale <= 0` the operator is only used for its sparsity pattern
    /// and `A` is the identity on it. `derivative` builds the operator for
    /// unit diffusivity. Collective.
    pub fn construct_matrix(&mut self, derivative: bool, scale: f64) -> Result<&DistMatrix, DiffusionError> {
        let matrix = self.build_matrix(derivative, scale)?;
        Ok(self.matrix.insert(matrix))
    }

    fn build_matrix(&mut self, derivative: bool, scale: f64) -> Result<DistMatrix, DiffusionError> {
        let mask = self.dirichlet_mask();
        let kappa = self.diffusivity.read()?;
        let op = self
            .operator
            .construct_matrix(&self.grid, kappa, &mask, derivative)?;

        let mut mat = if scale > 0.0 {
            let mut mat = op;
            mat.scale(-scale);
            mat
        } else {
            let mut mat = op.identity_like();
            mat.scale(0.0);
            mat
        };
        mat.shift_diagonal(1.0)?;

        let mut diag = mat.diagonal();
        let halo = self.grid.halo();
        halo.global_to_local(&diag, &mut self.diag_scratch)?;
        for (d, &fixed) in self.diag_scratch.iter_mut().zip(&mask) {
            if fixed {
                *d = 1.0;
            }
        }
        halo.local_to_global(&self.diag_scratch, &mut diag)?;
        mat.set_diagonal(&diag)?;

        self.state = SolverState::MatrixBuilt;
        log::debug!(
            "rank {}: matrix built (scale {scale}, derivative {derivative}, {} entries)",
            self.grid.rank(),
            mat.nnz()
        );
        Ok(mat)
    }

    /// Build the right-hand side into the solver's `rhs` field.
    ///
    /// `scale` multiplies the explicit stencil term and the heat sources;
    /// for `scale <= 0` only the current temperature and the boundary
    /// conditions contribute. Collective.
    pub fn construct_rhs(&mut self, scale: f64) -> Result<&DistributedField, DiffusionError> {
        let vec = self.assemble_rhs(scale)?;
        self.rhs.write_global(&vec)?;
        self.rhs.read()?;
        Ok(&self.rhs)
    }

    /// As [`construct_rhs`](Self::construct_rhs), into a new field named
    /// `"rhs"` that the caller owns.
    pub fn construct_rhs_detached(&mut self, scale: f64) -> Result<DistributedField, DiffusionError> {
        let vec = self.assemble_rhs(scale)?;
        let mut rhs = self.grid.create_field("rhs");
        rhs.write_global(&vec)?;
        rhs.read()?;
        Ok(rhs)
    }

    /// Owned-length right-hand side.
    fn assemble_rhs(&mut self, scale: f64) -> Result<Vec<f64>, DiffusionError> {
        let owned = self.grid.owned_len();
        let halo = self.grid.halo();
        let mut vec = vec![0.0; owned];

        if scale > 0.0 {
            let temp = self.temperature.read()?;
            let kappa = self.diffusivity.read()?;
            let stencil = self.grid.stencil();
            let centre = stencil.centre();
            let ws = &mut self.workspace;

            for k in 0..stencil.width() {
                let neighbours = stencil.neighbours(k);
                let cols = &mut ws.cols[k * owned..(k + 1) * owned];
                let vals = &mut ws.vals[k * owned..(k + 1) * owned];
                cols.copy_from_slice(neighbours);
                for i in 0..owned {
                    let n = cols[i];
                    if n < 0 || k == centre {
                        vals[i] = 0.0;
                        continue;
                    }
                    let (n, c) = (n as usize, halo.owned_to_ghosted(i));
                    let flux = 0.5 * (kappa[n] + kappa[c]) * (temp[n] - temp[c]);
                    vals[i] = scale / distance_sq(&self.grid, c, n) * flux;
                }
            }

            for (i, v) in vec.iter_mut().enumerate() {
                *v = (0..stencil.width()).map(|k| ws.vals[k * owned + i]).sum();
            }
            for (v, &h) in vec.iter_mut().zip(self.heat_sources.global()) {
                *v += scale * h;
            }
        }

        for (v, &t) in vec.iter_mut().zip(self.temperature.global()) {
            *v += t;
        }

        for (_, bc) in self.bcs.iter() {
            for (i, v) in vec.iter_mut().enumerate() {
                if bc.mask[halo.owned_to_ghosted(i)] {
                    if bc.flux {
                        *v += bc.value;
                    } else {
                        *v = bc.value;
                    }
                }
            }
        }
        Ok(vec)
    }

    /// Advance `steps` steps of size `dt` (default:
    /// [`calculate_dt`](Self::calculate_dt)) and return the temperature.
    ///
    /// The matrix is built once for all steps. `steps == 0` only builds
    /// it. A linear solve that misses its tolerance is logged and the step
    /// kept.
    ///
    /// # Errors
    ///
    /// [`DiffusionError::InvalidTimestep`] if `dt` is not finite and
    /// positive; communication and assembly failures otherwise.
    pub fn timestep(&mut self, steps: usize, dt: Option<f64>) -> Result<&DistributedField, DiffusionError> {
        let dt = match dt {
            Some(dt) => dt,
            None => self.calculate_dt()?,
        };
        if !(dt.is_finite() && dt > 0.0) {
            return Err(DiffusionError::InvalidTimestep { dt });
        }

        let lscale = dt * (1.0 - self.theta);
        let rscale = dt * self.theta;
        log::debug!(
            "rank {}: {steps} step(s), dt {dt:.6e}, implicit scale {lscale:.6e}, explicit scale {rscale:.6e}",
            self.grid.rank()
        );

        let matrix = self.build_matrix(false, lscale)?;
        let stepped = (0..steps).try_for_each(|_| self.advance(&matrix, rscale));
        self.matrix = Some(matrix);
        stepped?;
        Ok(&self.temperature)
    }

    fn advance(&mut self, matrix: &DistMatrix, rscale: f64) -> Result<(), DiffusionError> {
        let rhs = self.assemble_rhs(rscale)?;
        self.rhs.write_global(&rhs)?;
        self.temperature_new.write_global(self.temperature.global())?;

        let report = self
            .linear
            .solve(matrix, self.rhs.global(), self.temperature_new.global_mut())?;
        self.temperature.write_global(self.temperature_new.global())?;

        self.last_solve = Some(report);
        self.state = SolverState::Stepped;
        Ok(())
    }

    /// Set the condition on one wall. `flux` selects flux type; otherwise
    /// the wall is held at `value`.
    pub fn boundary_condition(&mut self, wall: Wall, value: f64, flux: bool) -> Result<(), ConfigError> {
        self.bcs.set(wall, value, flux)
    }

    /// The boundary table.
    pub fn boundary_conditions(&self) -> &BoundaryConditions {
        &self.bcs
    }

    /// Assign diffusivity and heat sources from ghosted-length buffers.
    pub fn update_properties(&mut self, diffusivity: &[f64], heat_sources: &[f64]) -> Result<(), DiffusionError> {
        self.diffusivity.write(diffusivity)?;
        self.heat_sources.write(heat_sources)?;
        Ok(())
    }

    /// Ghosted-length mask of every fixed-value boundary node.
    pub fn dirichlet_mask(&self) -> Vec<bool> {
        self.bcs.dirichlet_mask(self.grid.ghosted_len())
    }

    /// The temperature field.
    pub fn temperature(&self) -> &DistributedField {
        &self.temperature
    }

    /// Mutable temperature, for initial conditions.
    pub fn temperature_mut(&mut self) -> &mut DistributedField {
        &mut self.temperature
    }

    /// Mutable diffusivity.
    pub fn diffusivity_mut(&mut self) -> &mut DistributedField {
        &mut self.diffusivity
    }

    /// Mutable heat sources.
    pub fn heat_sources_mut(&mut self) -> &mut DistributedField {
        &mut self.heat_sources
    }

    /// The right-hand side of the most recent build.
    pub fn rhs(&self) -> &DistributedField {
        &self.rhs
    }

    /// The most recently built matrix.
    pub fn matrix(&self) -> Option<&DistMatrix> {
        self.matrix.as_ref()
    }

    /// The grid.
    pub fn grid(&self) -> &StructuredGrid {
        &self.grid
    }

    /// Time weighting.
    pub fn theta(&self) -> f64 {
        self.theta
    }

    /// Largest node spacing per axis over the whole domain.
    pub fn delta(&self) -> &[f64] {
        &self.delta
    }

    /// Build/step state.
    pub fn state(&self) -> SolverState {
        self.state
    }

    /// Report of the most recent linear solve.
    pub fn last_solve(&self) -> Option<&SolveReport> {
        self.last_solve.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduction_comm::SerialComm;
    use proptest::prelude::*;
    use conduction_core::GridError;

    fn rod(theta: f64) -> DiffusionSolver {
        let config = DiffusionConfig::new(&[0.0], &[4.0], &[5]).with_theta(theta);
        let mut solver = DiffusionSolver::new(config, Arc::new(SerialComm)).unwrap();
        solver.diffusivity_mut().write(1.0).unwrap();
        solver
    }

    fn pinned_rod(theta: f64) -> DiffusionSolver {
        let mut solver = rod(theta);
        solver.boundary_condition(Wall::MinX, 0.0, false).unwrap();
        solver.boundary_condition(Wall::MaxX, 1.0, false).unwrap();
        solver
    }

    #[test]
    fn dirichlet_diagonal_is_one() {
        let mut solver = pinned_rod(0.5);
        let m = solver.construct_matrix(false, 2.0).unwrap();
        let diag = m.diagonal();
        assert_eq!(diag[0], 1.0);
        assert_eq!(diag[4], 1.0);
        // interior: 1 + 2 * (1 + 1)
        assert!((diag[2] - 5.0).abs() < 1e-12);
        assert_eq!(m.get(0, 1), Some(0.0));
        assert_eq!(m.get(2, 1), Some(-2.0));
        assert_eq!(solver.state(), SolverState::MatrixBuilt);
    }

    #[test]
    fn non_positive_scale_gives_identity() {
        let mut solver = pinned_rod(0.5);
        for scale in [0.0, -1.0] {
            let m = solver.construct_matrix(false, scale).unwrap();
            assert_eq!(m.diagonal(), vec![1.0; 5]);
            assert_eq!(m.get(1, 0), Some(0.0));
            assert_eq!(m.get(1, 2), Some(0.0));
        }
    }

    #[test]
    fn derivative_matrix_uses_unit_diffusivity() {
        let mut solver = rod(0.5);
        solver.diffusivity_mut().write(10.0).unwrap();
        let m = solver.construct_matrix(true, 1.0).unwrap();
        assert_eq!(m.get(2, 1), Some(-1.0));
        assert!((m.get(2, 2).unwrap() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn dt_follows_stability_bound() {
        let mut solver = rod(0.5);
        assert!((solver.calculate_dt().unwrap() - 0.25).abs() < 1e-12);

        let mut last = f64::INFINITY;
        for k in [0.5, 1.0, 2.0, 8.0] {
            solver.diffusivity_mut().write(k).unwrap();
            let dt = solver.calculate_dt().unwrap();
            assert!(dt < last);
            last = dt;
        }
    }

    proptest! {
        #[test]
        fn dt_shrinks_as_peak_diffusivity_grows(
            base in 0.01f64..10.0,
            factor in 1.01f64..100.0,
        ) {
            let mut solver = rod(0.5);
            solver.diffusivity_mut().write(base).unwrap();
            let slow = solver.calculate_dt().unwrap();
            solver.diffusivity_mut().set(2, base * factor).unwrap();
            let fast = solver.calculate_dt().unwrap();
            prop_assert!(fast < slow);
            prop_assert!((slow * base - 0.25).abs() < 1e-9);
        }
    }

    #[test]
    fn zero_diffusivity_rejects_default_dt() {
        let mut solver = rod(0.5);
        solver.diffusivity_mut().write(0.0).unwrap();
        assert!(!solver.calculate_dt().unwrap().is_finite());
        assert!(matches!(
            solver.timestep(1, None),
            Err(DiffusionError::InvalidTimestep { .. })
        ));
        for dt in [0.0, -1.0, f64::NAN] {
            assert!(matches!(
                solver.timestep(1, Some(dt)),
                Err(DiffusionError::InvalidTimestep { .. })
            ));
        }
    }

    #[test]
    fn rhs_stencil_term() {
        let mut solver = rod(0.5);
        solver
            .temperature_mut()
            .write(&vec![0.0, 1.0, 4.0, 9.0, 16.0])
            .unwrap();
        let rhs = solver.construct_rhs(0.5).unwrap().global().to_vec();
        // interior: T + 0.5 * second difference (= 2)
        assert!((rhs[1] - 2.0).abs() < 1e-12);
        assert!((rhs[2] - 5.0).abs() < 1e-12);
        // ends see one neighbour only
        assert!((rhs[0] - 0.5).abs() < 1e-12);
        assert!((rhs[4] - (16.0 - 0.5 * 7.0)).abs() < 1e-12);
    }

    #[test]
    fn rhs_heat_sources_are_scaled() {
        let mut solver = rod(0.5);
        solver.update_properties(&[1.0; 5], &[2.0; 5]).unwrap();
        let rhs = solver.construct_rhs(0.25).unwrap().global().to_vec();
        assert!(rhs.iter().all(|&v| (v - 0.5).abs() < 1e-12));
        let none = solver.construct_rhs(0.0).unwrap().global().to_vec();
        assert!(none.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn rhs_walls_add_flux_and_pin_values() {
        let mut solver = rod(0.5);
        solver.temperature_mut().write(3.0).unwrap();
        solver.boundary_condition(Wall::MinX, 0.5, true).unwrap();
        solver.boundary_condition(Wall::MaxX, -2.0, false).unwrap();
        let rhs = solver.construct_rhs_detached(0.0).unwrap();
        assert_eq!(rhs.name(), "rhs");
        assert_eq!(rhs.global(), &[3.5, 3.0, 3.0, 3.0, -2.0]);
        assert!(solver.rhs().global().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn backward_euler_has_no_explicit_term() {
        let mut solver = rod(0.0);
        solver.temperature_mut().write(&vec![0.0, 0.0, 1.0, 0.0, 0.0]).unwrap();
        let before = solver.temperature().global().to_vec();
        solver.timestep(1, Some(0.1)).unwrap();
        // insulated walls add zero flux, so the rhs is the old temperature
        assert_eq!(solver.rhs().global(), before.as_slice());
        let t = solver.temperature().global().to_vec();
        // implicit smoothing keeps the peak positive and spreads it
        assert!(t[2] < 1.0 && t[2] > 0.0);
        assert!(t[1] > 0.0 && t[3] > 0.0);
        let total: f64 = t.iter().sum();
        assert!(total > 0.0);
    }

    #[test]
    fn forward_euler_matrix_is_identity() {
        let mut solver = pinned_rod(1.0);
        solver.temperature_mut().write(&vec![0.0, 0.5, 0.5, 0.5, 1.0]).unwrap();
        solver.timestep(1, Some(0.25)).unwrap();
        let m = solver.matrix().unwrap();
        assert_eq!(m.diagonal(), vec![1.0; 5]);
        assert_eq!(m.get(2, 1), Some(0.0));
        // explicit update: T + dt * second difference
        let t = solver.temperature().global();
        assert!((t[1] - 0.375).abs() < 1e-9);
        assert!((t[2] - 0.5).abs() < 1e-9);
        assert!((t[3] - 0.625).abs() < 1e-9);
    }

    #[test]
    fn zero_steps_only_build_the_matrix() {
        let mut solver = pinned_rod(0.5);
        solver.temperature_mut().write(0.25).unwrap();
        let t = solver.timestep(0, None).unwrap().global().to_vec();
        assert_eq!(t, vec![0.25; 5]);
        assert_eq!(solver.state(), SolverState::MatrixBuilt);
        assert!(solver.last_solve().is_none());
        assert!(solver.matrix().is_some());
    }

    #[test]
    fn rod_relaxes_to_linear_profile() {
        let mut solver = pinned_rod(0.5);
        assert_eq!(solver.state(), SolverState::Idle);
        let t = solver.timestep(50, None).unwrap().global().to_vec();
        for (i, v) in t.iter().enumerate() {
            assert!((v - i as f64 / 4.0).abs() < 1e-2, "node {i}: {v}");
        }
        assert_eq!(solver.state(), SolverState::Stepped);
        assert!(solver.last_solve().unwrap().is_converged());
    }

    #[test]
    fn update_properties_checks_length() {
        let mut solver = rod(0.5);
        let err = solver.update_properties(&[1.0; 4], &[0.0; 5]).unwrap_err();
        assert!(matches!(
            err,
            DiffusionError::Grid(GridError::LengthMismatch { expected: 5, got: 4, .. })
        ));
    }

    #[test]
    fn mask_tracks_boundary_table() {
        let mut solver = rod(0.5);
        assert!(solver.dirichlet_mask().iter().all(|&m| !m));
        solver.boundary_condition(Wall::MaxX, 1.0, false).unwrap();
        assert_eq!(solver.dirichlet_mask(), vec![false, false, false, false, true]);
        assert!(matches!(
            solver.boundary_condition(Wall::MinY, 0.0, false),
            Err(ConfigError::UnknownWall { .. })
        ));
    }

    #[test]
    fn construction_validates_theta() {
        let config = DiffusionConfig::new(&[0.0], &[1.0], &[3]).with_theta(2.0);
        let err = DiffusionSolver::new(config, Arc::new(SerialComm)).unwrap_err();
        assert_eq!(
            err,
            DiffusionError::Config(ConfigError::ThetaOutOfRange { theta: 2.0 })
        );
        let rod = rod(0.5);
        assert_eq!(rod.delta(), &[1.0]);
        assert_eq!(rod.theta(), 0.5);
    }
}
