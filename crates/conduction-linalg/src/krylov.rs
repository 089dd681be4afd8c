//! Iterative solvers for `A x = b` on a [`DistMatrix`].
//!
//! All scalar decisions (convergence, breakdown) are taken on globally
//! reduced values, so every rank follows the same branch and the
//! collectives inside each iteration stay matched.

use conduction_core::{Communicator, SolveError};

use crate::matrix::DistMatrix;
use crate::options::{KrylovMethod, Preconditioner, SolverOptions};
use crate::vector_ops::{axpy, dot, hadamard, norm2, sub};

/// Below this magnitude an inner product is treated as a breakdown.
const BREAKDOWN_TOL: f64 = 1e-300;

/// How a solve ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolveStatus {
    /// The residual met the tolerance.
    Converged,
    /// The iteration cap was hit first.
    MaxIterationsReached,
    /// An inner product vanished; the iterate is the last good one.
    Breakdown,
}

/// Outcome of one [`LinearSolver::solve`].
#[derive(Clone, Debug, PartialEq)]
pub struct SolveReport {
    /// Iteration that was run.
    pub method: KrylovMethod,
    /// Termination reason.
    pub status: SolveStatus,
    /// Iterations performed.
    pub iterations: usize,
    /// Residual norm of the initial guess.
    pub initial_residual_norm: f64,
    /// Residual norm at exit.
    pub residual_norm: f64,
}

impl SolveReport {
    /// `true` if the tolerance was met.
    pub fn is_converged(&self) -> bool {
        self.status == SolveStatus::Converged
    }
}

/// Owned-length work vectors plus one ghosted scratch for products.
#[derive(Debug, Default)]
struct Workspace {
    r: Vec<f64>,
    r0: Vec<f64>,
    p: Vec<f64>,
    v: Vec<f64>,
    s: Vec<f64>,
    t: Vec<f64>,
    p_hat: Vec<f64>,
    s_hat: Vec<f64>,
    inv_diag: Vec<f64>,
    ghost: Vec<f64>,
}

impl Workspace {
    fn resize(&mut self, owned: usize, ghosted: usize) {
        for v in [
            &mut self.r,
            &mut self.r0,
            &mut self.p,
            &mut self.v,
            &mut self.s,
            &mut self.t,
            &mut self.p_hat,
            &mut self.s_hat,
            &mut self.inv_diag,
        ] {
            v.clear();
            v.resize(owned, 0.0);
        }
        self.ghost.clear();
        self.ghost.resize(ghosted, 0.0);
    }
}

/// A reusable Krylov solver. Work vectors are kept between solves and
/// resized when the matrix layout changes.
#[derive(Debug)]
pub struct LinearSolver {
    options: SolverOptions,
    ws: Workspace,
}

impl LinearSolver {
    /// A solver with the given options. Call
    /// [`SolverOptions::validate`] first; invalid tolerances make every
    /// solve end at the iteration cap.
    pub fn new(options: SolverOptions) -> Self {
        Self {
            options,
            ws: Workspace::default(),
        }
    }

    /// The active options.
    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    /// Solve `a x = b`. `x` holds the initial guess on entry and the
    /// solution on return. Both are owned-length. Collective.
    ///
    /// A solve that does not converge is not an error: the report says so
    /// and `x` holds the last iterate.
    pub fn solve(
        &mut self,
        a: &DistMatrix,
        b: &[f64],
        x: &mut [f64],
    ) -> Result<SolveReport, SolveError> {
        let n = a.n_owned();
        for (what, len) in [("rhs", b.len()), ("solution", x.len())] {
            if len != n {
                return Err(SolveError::DimensionMismatch {
                    what,
                    expected: n,
                    got: len,
                });
            }
        }
        self.ws.resize(n, a.n_ghosted());
        self.setup_preconditioner(a);

        let report = match self.options.method {
            KrylovMethod::BiCgStab => self.bicgstab(a, b, x)?,
            KrylovMethod::Cg => self.cg(a, b, x)?,
            KrylovMethod::Jacobi => self.jacobi(a, b, x)?,
        };

        if report.is_converged() {
            log::debug!(
                "{:?}: converged in {} iterations, residual {:.3e}",
                report.method,
                report.iterations,
                report.residual_norm
            );
        } else {
            log::warn!(
                "{:?}: {:?} after {} iterations, residual {:.3e} (initial {:.3e})",
                report.method,
                report.status,
                report.iterations,
                report.residual_norm,
                report.initial_residual_norm
            );
        }
        Ok(report)
    }

    fn setup_preconditioner(&mut self, a: &DistMatrix) {
        let use_diag = self.options.preconditioner == Preconditioner::Jacobi
            || self.options.method == KrylovMethod::Jacobi;
        if use_diag {
            for (inv, d) in self.ws.inv_diag.iter_mut().zip(a.diagonal()) {
                *inv = if d.abs() > BREAKDOWN_TOL { 1.0 / d } else { 1.0 };
            }
        } else {
            self.ws.inv_diag.fill(1.0);
        }
    }

    fn tolerance(&self, comm: &dyn Communicator, b: &[f64]) -> Result<f64, SolveError> {
        let b_norm = norm2(comm, b)?;
        Ok(self.options.atol.max(self.options.rtol * b_norm))
    }

    fn trace(&self, method: &str, iter: usize, residual: f64) {
        if self.options.verbose {
            log::trace!("{method} iter {}: residual = {residual:.6e}", iter + 1);
        }
    }

    /// `r = b - A x`, returning `||r||`.
    fn residual(&mut self, a: &DistMatrix, b: &[f64], x: &[f64]) -> Result<f64, SolveError> {
        let ws = &mut self.ws;
        a.mul_vec(x, &mut ws.t, &mut ws.ghost)?;
        sub(b, &ws.t, &mut ws.r);
        Ok(norm2(a.halo().comm(), &ws.r)?)
    }

    fn report(
        &self,
        status: SolveStatus,
        iterations: usize,
        initial: f64,
        residual: f64,
    ) -> SolveReport {
        SolveReport {
            method: self.options.method,
            status,
            iterations,
            initial_residual_norm: initial,
            residual_norm: residual,
        }
    }

    fn bicgstab(
        &mut self,
        a: &DistMatrix,
        b: &[f64],
        x: &mut [f64],
    ) -> Result<SolveReport, SolveError> {
        let comm = a.halo().comm();
        let tol = self.tolerance(comm, b)?;
        let initial = self.residual(a, b, x)?;
        if initial <= tol {
            return Ok(self.report(SolveStatus::Converged, 0, initial, initial));
        }

        let ws = &mut self.ws;
        ws.r0.copy_from_slice(&ws.r);
        ws.p.fill(0.0);
        ws.v.fill(0.0);
        let (mut rho, mut alpha, mut omega) = (1.0, 1.0, 1.0);
        let mut res_norm = initial;

        for iter in 0..self.options.max_iter {
            let ws = &mut self.ws;
            let rho_new = dot(comm, &ws.r0, &ws.r)?;
            if rho_new.abs() < BREAKDOWN_TOL {
                return Ok(self.report(SolveStatus::Breakdown, iter, initial, res_norm));
            }

            // p = r + beta (p - omega v)
            let beta = (rho_new / rho) * (alpha / omega);
            for ((p, &r), &v) in ws.p.iter_mut().zip(&ws.r).zip(&ws.v) {
                *p = r + beta * (*p - omega * v);
            }

            hadamard(&ws.inv_diag, &ws.p, &mut ws.p_hat);
            a.mul_vec(&ws.p_hat, &mut ws.v, &mut ws.ghost)?;
            let r0v = dot(comm, &ws.r0, &ws.v)?;
            if r0v.abs() < BREAKDOWN_TOL {
                return Ok(self.report(SolveStatus::Breakdown, iter, initial, res_norm));
            }
            alpha = rho_new / r0v;

            // s = r - alpha v
            ws.s.copy_from_slice(&ws.r);
            axpy(-alpha, &ws.v, &mut ws.s);
            let s_norm = norm2(comm, &ws.s)?;
            if s_norm <= tol {
                axpy(alpha, &ws.p_hat, x);
                self.trace("BiCGSTAB", iter, s_norm);
                return Ok(self.report(SolveStatus::Converged, iter + 1, initial, s_norm));
            }

            hadamard(&ws.inv_diag, &ws.s, &mut ws.s_hat);
            a.mul_vec(&ws.s_hat, &mut ws.t, &mut ws.ghost)?;
            let tt = dot(comm, &ws.t, &ws.t)?;
            if tt.abs() < BREAKDOWN_TOL {
                axpy(alpha, &ws.p_hat, x);
                return Ok(self.report(SolveStatus::Breakdown, iter + 1, initial, s_norm));
            }
            omega = dot(comm, &ws.t, &ws.s)? / tt;

            axpy(alpha, &ws.p_hat, x);
            axpy(omega, &ws.s_hat, x);

            // r = s - omega t
            ws.r.copy_from_slice(&ws.s);
            axpy(-omega, &ws.t, &mut ws.r);
            res_norm = norm2(comm, &ws.r)?;
            self.trace("BiCGSTAB", iter, res_norm);

            if res_norm <= tol {
                return Ok(self.report(SolveStatus::Converged, iter + 1, initial, res_norm));
            }
            if omega.abs() < BREAKDOWN_TOL {
                return Ok(self.report(SolveStatus::Breakdown, iter + 1, initial, res_norm));
            }
            rho = rho_new;
        }

        Ok(self.report(
            SolveStatus::MaxIterationsReached,
            self.options.max_iter,
            initial,
            res_norm,
        ))
    }

    fn cg(&mut self, a: &DistMatrix, b: &[f64], x: &mut [f64]) -> Result<SolveReport, SolveError> {
        let comm = a.halo().comm();
        let tol = self.tolerance(comm, b)?;
        let initial = self.residual(a, b, x)?;
        if initial <= tol {
            return Ok(self.report(SolveStatus::Converged, 0, initial, initial));
        }

        // z lives in s, Ap in v.
        let ws = &mut self.ws;
        hadamard(&ws.inv_diag, &ws.r, &mut ws.s);
        ws.p.copy_from_slice(&ws.s);
        let mut rz = dot(comm, &ws.r, &ws.s)?;
        let mut res_norm = initial;

        for iter in 0..self.options.max_iter {
            let ws = &mut self.ws;
            a.mul_vec(&ws.p, &mut ws.v, &mut ws.ghost)?;
            let pap = dot(comm, &ws.p, &ws.v)?;
            if pap.abs() < BREAKDOWN_TOL {
                return Ok(self.report(SolveStatus::Breakdown, iter, initial, res_norm));
            }
            let alpha = rz / pap;
            axpy(alpha, &ws.p, x);
            axpy(-alpha, &ws.v, &mut ws.r);

            res_norm = norm2(comm, &ws.r)?;
            self.trace("CG", iter, res_norm);
            if res_norm <= tol {
                return Ok(self.report(SolveStatus::Converged, iter + 1, initial, res_norm));
            }

            let ws = &mut self.ws;
            hadamard(&ws.inv_diag, &ws.r, &mut ws.s);
            let rz_new = dot(comm, &ws.r, &ws.s)?;
            let beta = rz_new / rz;
            rz = rz_new;
            for (p, &z) in ws.p.iter_mut().zip(&ws.s) {
                *p = z + beta * *p;
            }
        }

        Ok(self.report(
            SolveStatus::MaxIterationsReached,
            self.options.max_iter,
            initial,
            res_norm,
        ))
    }

    fn jacobi(
        &mut self,
        a: &DistMatrix,
        b: &[f64],
        x: &mut [f64],
    ) -> Result<SolveReport, SolveError> {
        let comm = a.halo().comm();
        let tol = self.tolerance(comm, b)?;
        let initial = self.residual(a, b, x)?;
        if initial <= tol {
            return Ok(self.report(SolveStatus::Converged, 0, initial, initial));
        }

        let mut res_norm = initial;
        for iter in 0..self.options.max_iter {
            // x += D^-1 r
            let ws = &mut self.ws;
            for ((xi, &r), &inv) in x.iter_mut().zip(&ws.r).zip(&ws.inv_diag) {
                *xi += inv * r;
            }
            res_norm = self.residual(a, b, x)?;
            self.trace("Jacobi", iter, res_norm);
            if res_norm <= tol {
                return Ok(self.report(SolveStatus::Converged, iter + 1, initial, res_norm));
            }
            if !res_norm.is_finite() {
                return Ok(self.report(SolveStatus::Breakdown, iter + 1, initial, res_norm));
            }
        }

        Ok(self.report(
            SolveStatus::MaxIterationsReached,
            self.options.max_iter,
            initial,
            res_norm,
        ))
    }
}
