//! # Boussinesq Core
//!
//! A mass-conservative finite-volume solver for the unconfined-aquifer
//! (Boussinesq) groundwater equation on unstructured polygonal meshes.
//!
//! This library provides:
//! - A mesh description with CSR adjacency and tagged diagonal slots
//! - Assembly of the conductance matrix, mass-balance residual and
//!   approximate Jacobian for a trial head field
//! - Conjugate gradient and BiCGStab linear solvers
//! - A Newton-Raphson driver advancing the head field in fixed time steps
//!
//! ## Architecture
//!
//! - [`mesh`] - Topology, per-cell and per-edge fields, mesh builder
//! - [`assembly`] - `T`, `b`, `R` and `Jr` assembly
//! - [`solver`] - Newton driver, configuration and linear solvers
//!
//! ## Usage
//!
//! ```no_run
//! use boussinesq_core::mesh::{CellProperties, EdgeProperties, Mesh};
//! use boussinesq_core::{NewtonConfig, NewtonDriver};
//!
//! let mesh = Mesh::chain(
//!     [12.0, 10.0, 8.0].map(|h| CellProperties::new(h, 0.0, 1.0)),
//!     EdgeProperties::new(1.0, 1.0, 1.0),
//! )?;
//! let mut driver = NewtonDriver::new(mesh, NewtonConfig::new().with_sim_time(10.0))?;
//! driver.run()?;
//! println!("{:?}", driver.heads());
//! # Ok::<(), boussinesq_core::AquiferError>(())
//! ```
//!
//! ## Discretization
//!
//! For each time step of length dt, with `eta` the head at the start of the
//! step:
//!
//! 1. `T[i,k] = -dt * K * L / d * max(eta_k - z_k, eta_i - z_i)` on each
//!    edge, `T[i,i] = -sum_k T[i,k]`
//! 2. `b[i] = (eta_i - z_i) * A_i + dt * A_i * S_i`
//! 3. `R[i] = p_i * (h_i - z_i) + sum_k T[i,k] h_k - b[i]` is driven to zero
//!    by Newton iteration with `Jr = T + diag(p)`

pub mod assembly;
pub mod error;
pub mod mesh;
pub mod solver;

// Re-export main types for convenience
pub use error::{AquiferError, Result};
pub use mesh::Mesh;
pub use solver::{NewtonConfig, NewtonDriver};

// WASM bindings
#[cfg(feature = "wasm")]
mod wasm;

#[cfg(feature = "wasm")]
pub use wasm::WasmAquiferSim;
