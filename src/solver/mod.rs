//! Newton-Raphson time stepping and the linear solvers it drives.
//!
//! ## Control loop
//!
//! Each time step moves through the phases of [`NewtonPhase`]:
//!
//! ```text
//! Assembling -> Solving -> Updating -> ConvergenceCheck -+-> Solving
//!                                                        +-> next step / Done
//! ```
//!
//! - `Assembling`: `T`, `b` from the head at the start of the step, then `R`
//!   and `Jr`
//! - `Solving`: `Jr * delta = R` via a [`LinearSolver`]
//! - `Updating`: `new = old - delta`, reassemble `R` and `Jr` at `new`,
//!   swap the head buffers
//! - `ConvergenceCheck`: apply the [`ContinuationRule`]

mod config;
mod linear;
mod newton;

pub use config::{ContinuationRule, NewtonConfig};
pub use linear::{
    build_solver, BiCgStab, ConjugateGradient, LinearSolver, LinearSolverConfig, LinearSolverKind,
    SparseOperator,
};
pub use newton::{NewtonDriver, NewtonPhase, RunSummary, StepReport};

/// Default time step.
pub const DEFAULT_DELTA_T: f64 = 1.0;

/// Default total simulated time.
pub const DEFAULT_SIM_TIME: f64 = 2.0;

/// Default convergence tolerance on `max|R|`.
pub const DEFAULT_TOLERANCE: f64 = 1e-5;

/// Inner iteration count the continuation rule compares against.
pub const MIN_NEWTON_ITERATIONS: usize = 4;

/// Default relative tolerance of the linear solvers.
pub const DEFAULT_LINEAR_RTOL: f64 = 1e-10;

/// Default absolute tolerance of the linear solvers.
pub const DEFAULT_LINEAR_ATOL: f64 = 1e-14;

/// Default iteration budget of the linear solvers.
pub const DEFAULT_LINEAR_MAX_ITER: usize = 1000;
