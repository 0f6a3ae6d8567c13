//! Driver configuration.

use crate::assembly::{JacobianStrategy, StorageModel};
use crate::error::{AquiferError, Result};

use super::linear::{LinearSolverConfig, LinearSolverKind};
use super::{DEFAULT_DELTA_T, DEFAULT_SIM_TIME, DEFAULT_TOLERANCE, MIN_NEWTON_ITERATIONS};

/// How the inner Newton loop decides whether to iterate again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContinuationRule {
    /// Continue while `max|R| > tol` OR fewer than `min_iterations` have run.
    /// Always runs at least `min_iterations` times and has no ceiling of
    /// its own when the residual stays high.
    #[default]
    Literal,
    /// Continue while `max|R| > tol` AND fewer than `min_iterations` have
    /// run, so `min_iterations` acts as a cap.
    Strict,
}

impl ContinuationRule {
    /// Whether another inner iteration should run.
    pub fn should_continue(&self, max_residual: f64, tolerance: f64, iterations: usize, min_iterations: usize) -> bool {
        let above_tolerance = max_residual > tolerance;
        let below_minimum = iterations < min_iterations;
        match self {
            ContinuationRule::Literal => above_tolerance || below_minimum,
            ContinuationRule::Strict => above_tolerance && below_minimum,
        }
    }
}

/// Configuration for the Newton driver.
#[derive(Debug, Clone)]
pub struct NewtonConfig {
    /// Time step
    pub delta_t: f64,
    /// Total simulated time
    pub sim_time: f64,
    /// Convergence tolerance on `max|R|`
    pub tolerance: f64,
    /// Iteration count used by the continuation rule
    pub min_iterations: usize,
    /// Hard ceiling on inner iterations, applied after the continuation rule
    pub max_iterations: Option<usize>,
    /// Inner loop continuation rule
    pub continuation: ContinuationRule,
    /// Off-diagonal Jacobian assembly
    pub jacobian: JacobianStrategy,
    /// Fields used for the storage term
    pub storage: StorageModel,
    /// Built-in linear solver to construct
    pub linear_solver: LinearSolverKind,
    /// Linear solver tolerances
    pub linear: LinearSolverConfig,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            delta_t: DEFAULT_DELTA_T,
            sim_time: DEFAULT_SIM_TIME,
            tolerance: DEFAULT_TOLERANCE,
            min_iterations: MIN_NEWTON_ITERATIONS,
            max_iterations: None,
            continuation: ContinuationRule::default(),
            jacobian: JacobianStrategy::default(),
            storage: StorageModel::default(),
            linear_solver: LinearSolverKind::default(),
            linear: LinearSolverConfig::default(),
        }
    }
}

impl NewtonConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the time step.
    pub fn with_delta_t(mut self, delta_t: f64) -> Self {
        self.delta_t = delta_t;
        self
    }

    /// Set the total simulated time.
    pub fn with_sim_time(mut self, sim_time: f64) -> Self {
        self.sim_time = sim_time;
        self
    }

    /// Set the residual tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the iteration count the continuation rule compares against.
    pub fn with_min_iterations(mut self, min_iterations: usize) -> Self {
        self.min_iterations = min_iterations;
        self
    }

    /// Cap the inner loop at `max_iterations`.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    /// Set the continuation rule.
    pub fn with_continuation(mut self, continuation: ContinuationRule) -> Self {
        self.continuation = continuation;
        self
    }

    /// Set the Jacobian assembly strategy.
    pub fn with_jacobian(mut self, jacobian: JacobianStrategy) -> Self {
        self.jacobian = jacobian;
        self
    }

    /// Set the storage model.
    pub fn with_storage(mut self, storage: StorageModel) -> Self {
        self.storage = storage;
        self
    }

    /// Select the built-in linear solver.
    pub fn with_linear_solver(mut self, kind: LinearSolverKind) -> Self {
        self.linear_solver = kind;
        self
    }

    /// Set the linear solver tolerances.
    pub fn with_linear_config(mut self, linear: LinearSolverConfig) -> Self {
        self.linear = linear;
        self
    }

    /// Check the configuration for values the driver cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !(self.delta_t.is_finite() && self.delta_t > 0.0) {
            return Err(AquiferError::invalid_config(format!(
                "time step must be positive, got {}",
                self.delta_t
            )));
        }
        if !(self.sim_time.is_finite() && self.sim_time >= 0.0) {
            return Err(AquiferError::invalid_config(format!(
                "simulated time must be non-negative, got {}",
                self.sim_time
            )));
        }
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(AquiferError::invalid_config(format!(
                "tolerance must be non-negative, got {}",
                self.tolerance
            )));
        }
        if self.max_iterations == Some(0) {
            return Err(AquiferError::invalid_config(
                "iteration cap must allow at least one iteration",
            ));
        }
        Ok(())
    }

    /// Whether the inner loop should run again after `iterations` iterations.
    pub fn should_continue(&self, max_residual: f64, iterations: usize) -> bool {
        if self.max_iterations.is_some_and(|cap| iterations >= cap) {
            return false;
        }
        self.continuation
            .should_continue(max_residual, self.tolerance, iterations, self.min_iterations)
    }

    /// Number of time steps in `[0, sim_time)`.
    pub fn num_steps(&self) -> usize {
        let mut steps = 0;
        while (steps as f64) * self.delta_t < self.sim_time {
            steps += 1;
        }
        steps
    }
}
