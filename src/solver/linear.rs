//! Iterative linear solvers for the per-iteration Newton system.
//!
//! The driver hands the solver a borrowed CSR view of `Jr` (sharing the
//! mesh's `Mp`/`Mi` arrays) and the residual as right-hand side. Solvers
//! start from a zero initial guess and report
//! [`AquiferError::LinearSolverDidNotConverge`] when they run out of
//! iterations or break down.

use log::trace;

use crate::error::{AquiferError, Result};
use crate::mesh::MeshTopology;

use super::{DEFAULT_LINEAR_ATOL, DEFAULT_LINEAR_MAX_ITER, DEFAULT_LINEAR_RTOL};

/// Pivot magnitude below which a Krylov iteration is considered broken down.
const BREAKDOWN_TOL: f64 = 1e-300;

/// Borrowed CSR operator `(Np, Mp, Mi, values)`.
#[derive(Debug, Clone, Copy)]
pub struct SparseOperator<'a> {
    pub row_ptr: &'a [usize],
    pub col_idx: &'a [usize],
    pub values: &'a [f64],
}

impl<'a> SparseOperator<'a> {
    /// View `values` through the pattern of a mesh topology.
    pub fn new(topology: &'a MeshTopology, values: &'a [f64]) -> Self {
        Self {
            row_ptr: topology.row_ptr(),
            col_idx: topology.col_idx(),
            values,
        }
    }

    /// Number of rows (`Np`).
    #[inline]
    pub fn num_rows(&self) -> usize {
        self.row_ptr.len() - 1
    }

    /// y = A * x
    pub fn mul_vec(&self, x: &[f64], y: &mut [f64]) {
        for (i, yi) in y.iter_mut().enumerate().take(self.num_rows()) {
            *yi = (self.row_ptr[i]..self.row_ptr[i + 1])
                .map(|j| self.values[j] * x[self.col_idx[j]])
                .sum();
        }
    }
}

/// Configuration shared by the iterative solvers.
#[derive(Debug, Clone)]
pub struct LinearSolverConfig {
    /// Relative tolerance on the residual norm, relative to the rhs norm
    pub rtol: f64,
    /// Absolute tolerance on the residual norm
    pub atol: f64,
    /// Maximum Krylov iterations per solve
    pub max_iter: usize,
}

impl Default for LinearSolverConfig {
    fn default() -> Self {
        Self {
            rtol: DEFAULT_LINEAR_RTOL,
            atol: DEFAULT_LINEAR_ATOL,
            max_iter: DEFAULT_LINEAR_MAX_ITER,
        }
    }
}

impl LinearSolverConfig {
    /// Create a configuration with the given relative tolerance and budget.
    pub fn new(rtol: f64, max_iter: usize) -> Self {
        Self {
            rtol,
            max_iter,
            ..Default::default()
        }
    }

    /// Set the absolute tolerance.
    pub fn with_atol(mut self, atol: f64) -> Self {
        self.atol = atol;
        self
    }

    fn threshold(&self, rhs_norm: f64) -> f64 {
        self.atol.max(self.rtol * rhs_norm)
    }
}

/// Which built-in solver the driver should construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinearSolverKind {
    /// Conjugate gradient, for the symmetric systems the default Jacobian gives
    #[default]
    ConjugateGradient,
    /// BiCGStab, for nonsymmetric systems
    BiCgStab,
}

/// Solves `A x = b` for a sparse operator.
pub trait LinearSolver {
    /// Solve into `solution`, overwriting it. Returns the iteration count.
    fn solve(&mut self, operator: &SparseOperator<'_>, rhs: &[f64], solution: &mut [f64]) -> Result<usize>;

    /// Solver name for diagnostics.
    fn name(&self) -> &'static str;
}

impl<L: LinearSolver + ?Sized> LinearSolver for Box<L> {
    fn solve(&mut self, operator: &SparseOperator<'_>, rhs: &[f64], solution: &mut [f64]) -> Result<usize> {
        (**self).solve(operator, rhs, solution)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Build the solver selected by `kind`.
pub fn build_solver(kind: LinearSolverKind, config: LinearSolverConfig) -> Box<dyn LinearSolver> {
    match kind {
        LinearSolverKind::ConjugateGradient => Box::new(ConjugateGradient::new(config)),
        LinearSolverKind::BiCgStab => Box::new(BiCgStab::new(config)),
    }
}

#[inline]
fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[inline]
fn norm2(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

/// y += alpha * x
#[inline]
fn axpy(alpha: f64, x: &[f64], y: &mut [f64]) {
    for (yi, xi) in y.iter_mut().zip(x) {
        *yi += alpha * xi;
    }
}

/// Conjugate gradient method.
///
/// Suited to symmetric positive definite systems.
#[derive(Debug, Clone)]
pub struct ConjugateGradient {
    config: LinearSolverConfig,
    r: Vec<f64>,
    p: Vec<f64>,
    ap: Vec<f64>,
}

impl Default for ConjugateGradient {
    fn default() -> Self {
        Self::new(LinearSolverConfig::default())
    }
}

impl ConjugateGradient {
    /// Create a CG solver.
    pub fn new(config: LinearSolverConfig) -> Self {
        Self {
            config,
            r: Vec::new(),
            p: Vec::new(),
            ap: Vec::new(),
        }
    }

    fn ensure_workspace(&mut self, n: usize) {
        if self.r.len() != n {
            self.r = vec![0.0; n];
            self.p = vec![0.0; n];
            self.ap = vec![0.0; n];
        }
    }
}

impl LinearSolver for ConjugateGradient {
    fn solve(&mut self, operator: &SparseOperator<'_>, rhs: &[f64], solution: &mut [f64]) -> Result<usize> {
        let n = rhs.len();
        self.ensure_workspace(n);
        solution.fill(0.0);

        // x0 = 0, so r = b
        self.r.copy_from_slice(rhs);
        let threshold = self.config.threshold(norm2(rhs));
        if norm2(&self.r) <= threshold {
            return Ok(0);
        }

        self.p.copy_from_slice(&self.r);
        let mut rr = dot(&self.r, &self.r);

        for iter in 0..self.config.max_iter {
            operator.mul_vec(&self.p, &mut self.ap);

            let pap = dot(&self.p, &self.ap);
            if pap.abs() < BREAKDOWN_TOL {
                return Err(AquiferError::not_converged(iter, norm2(&self.r)));
            }
            let alpha = rr / pap;

            axpy(alpha, &self.p, solution);
            axpy(-alpha, &self.ap, &mut self.r);

            let res_norm = norm2(&self.r);
            trace!("CG iter {}: residual = {:.6e}", iter + 1, res_norm);
            if res_norm <= threshold {
                return Ok(iter + 1);
            }

            let rr_new = dot(&self.r, &self.r);
            let beta = rr_new / rr;
            rr = rr_new;

            for (pi, ri) in self.p.iter_mut().zip(&self.r) {
                *pi = ri + beta * *pi;
            }
        }

        Err(AquiferError::not_converged(self.config.max_iter, norm2(&self.r)))
    }

    fn name(&self) -> &'static str {
        "CG"
    }
}

/// Biconjugate gradient stabilized method.
///
/// Handles nonsymmetric systems, such as a Jacobian assembled from a
/// conductance matrix that is not symmetric.
#[derive(Debug, Clone)]
pub struct BiCgStab {
    config: LinearSolverConfig,
    r: Vec<f64>,
    r0: Vec<f64>,
    p: Vec<f64>,
    v: Vec<f64>,
    s: Vec<f64>,
    t: Vec<f64>,
}

impl Default for BiCgStab {
    fn default() -> Self {
        Self::new(LinearSolverConfig::default())
    }
}

impl BiCgStab {
    /// Create a BiCGStab solver.
    pub fn new(config: LinearSolverConfig) -> Self {
        Self {
            config,
            r: Vec::new(),
            r0: Vec::new(),
            p: Vec::new(),
            v: Vec::new(),
            s: Vec::new(),
            t: Vec::new(),
        }
    }

    fn ensure_workspace(&mut self, n: usize) {
        if self.r.len() != n {
            self.r = vec![0.0; n];
            self.r0 = vec![0.0; n];
            self.p = vec![0.0; n];
            self.v = vec![0.0; n];
            self.s = vec![0.0; n];
            self.t = vec![0.0; n];
        }
    }
}

impl LinearSolver for BiCgStab {
    fn solve(&mut self, operator: &SparseOperator<'_>, rhs: &[f64], solution: &mut [f64]) -> Result<usize> {
        let n = rhs.len();
        self.ensure_workspace(n);
        solution.fill(0.0);

        self.r.copy_from_slice(rhs);
        let threshold = self.config.threshold(norm2(rhs));
        if norm2(&self.r) <= threshold {
            return Ok(0);
        }

        // Shadow residual stays fixed
        self.r0.copy_from_slice(&self.r);
        self.p.fill(0.0);
        self.v.fill(0.0);

        let mut rho_old = 1.0;
        let mut alpha = 1.0;
        let mut omega = 1.0;

        for iter in 0..self.config.max_iter {
            let rho = dot(&self.r0, &self.r);
            if rho.abs() < BREAKDOWN_TOL {
                return Err(AquiferError::not_converged(iter, norm2(&self.r)));
            }

            let beta = if iter == 0 {
                0.0
            } else {
                (rho / rho_old) * (alpha / omega)
            };
            rho_old = rho;

            for i in 0..n {
                self.p[i] = self.r[i] + beta * (self.p[i] - omega * self.v[i]);
            }

            operator.mul_vec(&self.p, &mut self.v);
            let r0v = dot(&self.r0, &self.v);
            if r0v.abs() < BREAKDOWN_TOL {
                return Err(AquiferError::not_converged(iter, norm2(&self.r)));
            }
            alpha = rho / r0v;

            for i in 0..n {
                self.s[i] = self.r[i] - alpha * self.v[i];
            }

            let s_norm = norm2(&self.s);
            if s_norm <= threshold {
                axpy(alpha, &self.p, solution);
                trace!("BiCGStab iter {}: residual = {:.6e}", iter + 1, s_norm);
                return Ok(iter + 1);
            }

            operator.mul_vec(&self.s, &mut self.t);
            let tt = dot(&self.t, &self.t);
            if tt < BREAKDOWN_TOL {
                return Err(AquiferError::not_converged(iter + 1, s_norm));
            }
            omega = dot(&self.t, &self.s) / tt;

            axpy(alpha, &self.p, solution);
            axpy(omega, &self.s, solution);

            for i in 0..n {
                self.r[i] = self.s[i] - omega * self.t[i];
            }

            let res_norm = norm2(&self.r);
            trace!("BiCGStab iter {}: residual = {:.6e}", iter + 1, res_norm);
            if res_norm <= threshold {
                return Ok(iter + 1);
            }
            if omega.abs() < BREAKDOWN_TOL {
                return Err(AquiferError::not_converged(iter + 1, res_norm));
            }
        }

        Err(AquiferError::not_converged(self.config.max_iter, norm2(&self.r)))
    }

    fn name(&self) -> &'static str {
        "BiCGStab"
    }
}
