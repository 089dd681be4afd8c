//! Construction parameters for [`DiffusionSolver`](crate::DiffusionSolver).

use conduction_core::ConfigError;
use conduction_linalg::SolverOptions;
use conduction_mesh::Domain;

/// Domain, time discretization and linear-solver settings.
///
/// `theta` weights the explicit part of each step: 0 is backward Euler,
/// 0.5 Crank–Nicolson, 1 forward Euler.
#[derive(Clone, Debug, PartialEq)]
pub struct DiffusionConfig {
    /// Lower corner, one entry per axis.
    pub min_coord: Vec<f64>,
    /// Upper corner, one entry per axis.
    pub max_coord: Vec<f64>,
    /// Nodes per axis.
    pub resolution: Vec<usize>,
    /// Time-weighting in `[0, 1]`. Default: 0.5.
    pub theta: f64,
    /// Linear solve settings.
    pub solver: SolverOptions,
}

impl Default for DiffusionConfig {
    fn default() -> Self {
        Self {
            min_coord: vec![0.0],
            max_coord: vec![1.0],
            resolution: vec![2],
            theta: 0.5,
            solver: SolverOptions::default(),
        }
    }
}

impl DiffusionConfig {
    /// A config for the box `[min_coord, max_coord]` with default theta
    /// and solver settings.
    pub fn new(min_coord: &[f64], max_coord: &[f64], resolution: &[usize]) -> Self {
        Self {
            min_coord: min_coord.to_vec(),
            max_coord: max_coord.to_vec(),
            resolution: resolution.to_vec(),
            ..Self::default()
        }
    }

    /// Set theta.
    pub fn with_theta(mut self, theta: f64) -> Self {
        self.theta = theta;
        self
    }

    /// Set the linear solver options.
    pub fn with_solver(mut self, solver: SolverOptions) -> Self {
        self.solver = solver;
        self
    }

    /// Check theta, the domain and the solver options.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.domain()?;
        self.solver.validate()
    }

    /// The validated domain.
    pub fn domain(&self) -> Result<Domain, ConfigError> {
        if !(0.0..=1.0).contains(&self.theta) {
            return Err(ConfigError::ThetaOutOfRange { theta: self.theta });
        }
        Ok(Domain::new(
            &self.min_coord,
            &self.max_coord,
            &self.resolution,
        )?)
    }
}
