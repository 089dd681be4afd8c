//! Linear solver configuration.

use conduction_core::ConfigError;

/// Iteration used by [`LinearSolver`](crate::LinearSolver).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KrylovMethod {
    /// Stabilized bi-conjugate gradient. Handles non-symmetric systems,
    /// which the Dirichlet row overwrite produces.
    #[default]
    BiCgStab,
    /// Conjugate gradient, for symmetric positive definite systems.
    Cg,
    /// Plain Jacobi iteration. Needs a diagonally dominant matrix.
    Jacobi,
}

/// Preconditioner applied by the Krylov methods.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Preconditioner {
    /// No preconditioning.
    None,
    /// Inverse of the matrix diagonal.
    #[default]
    Jacobi,
}

/// Tolerances and method selection for the linear solve.
///
/// Convergence is declared when the residual norm drops below
/// `max(atol, rtol * ||b||)`.
#[derive(Clone, Debug, PartialEq)]
pub struct SolverOptions {
    /// Iteration.
    pub method: KrylovMethod,
    /// Preconditioner.
    pub preconditioner: Preconditioner,
    /// Relative tolerance. Default: 1e-8.
    pub rtol: f64,
    /// Absolute tolerance. Default: 1e-14.
    pub atol: f64,
    /// Iteration cap. Default: 1000.
    pub max_iter: usize,
    /// Log the residual of every iteration at `trace` level.
    pub verbose: bool,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            method: KrylovMethod::default(),
            preconditioner: Preconditioner::default(),
            rtol: 1e-8,
            atol: 1e-14,
            max_iter: 1000,
            verbose: false,
        }
    }
}

impl SolverOptions {
    /// Set the iteration.
    pub fn with_method(mut self, method: KrylovMethod) -> Self {
        self.method = method;
        self
    }

    /// Set the preconditioner.
    pub fn with_preconditioner(mut self, preconditioner: Preconditioner) -> Self {
        self.preconditioner = preconditioner;
        self
    }

    /// Set the relative tolerance.
    pub fn with_rtol(mut self, rtol: f64) -> Self {
        self.rtol = rtol;
        self
    }

    /// Set the absolute tolerance.
    pub fn with_atol(mut self, atol: f64) -> Self {
        self.atol = atol;
        self
    }

    /// Set the iteration cap.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Enable per-iteration residual logging.
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    /// Check that tolerances are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.rtol.is_finite() && self.rtol >= 0.0) {
            return Err(ConfigError::InvalidSolverOptions {
                reason: format!("rtol must be finite and non-negative, got {}", self.rtol),
            });
        }
        if !(self.atol.is_finite() && self.atol >= 0.0) {
            return Err(ConfigError::InvalidSolverOptions {
                reason: format!("atol must be finite and non-negative, got {}", self.atol),
            });
        }
        if self.rtol == 0.0 && self.atol == 0.0 {
            return Err(ConfigError::InvalidSolverOptions {
                reason: "rtol and atol cannot both be zero".to_string(),
            });
        }
        if self.max_iter == 0 {
            return Err(ConfigError::InvalidSolverOptions {
                reason: "max_iter must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
