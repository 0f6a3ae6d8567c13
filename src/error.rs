//! Error types for the Boussinesq aquifer solver.
//!
//! This module provides a unified error type [`AquiferError`]. The numerical
//! core has exactly one runtime failure, a linear solve that does not
//! converge; the remaining variants cover building a mesh and configuring
//! the driver.

use thiserror::Error;

/// Result type alias using [`AquiferError`].
pub type Result<T> = std::result::Result<T, AquiferError>;

/// Unified error type for all aquifer solver operations.
#[derive(Error, Debug)]
pub enum AquiferError {
    // ============ Simulation Errors ============
    /// The iterative linear solver exhausted its budget without converging.
    /// Fatal to the enclosing Newton step.
    #[error("Linear solver did not converge after {iterations} iterations (residual: {residual:.2e})")]
    LinearSolverDidNotConverge { iterations: usize, residual: f64 },

    // ============ Setup Errors ============
    /// Invalid driver configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Mesh could not be constructed from the given description
    #[error("Invalid mesh description: {message}")]
    InvalidMesh { message: String },
}

impl AquiferError {
    /// Create a linear solver convergence failure
    pub fn not_converged(iterations: usize, residual: f64) -> Self {
        Self::LinearSolverDidNotConverge {
            iterations,
            residual,
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an invalid mesh error
    pub fn invalid_mesh(message: impl Into<String>) -> Self {
        Self::InvalidMesh {
            message: message.into(),
        }
    }
}
