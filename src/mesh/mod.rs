//! Polygonal mesh description consumed by the solver.
//!
//! The mesh is built once, outside the numerical core, and read-only from
//! then on. It bundles:
//!
//! - a [`MeshTopology`] holding the CSR adjacency (`Mp`, `Mi`) with each slot
//!   tagged as [`SlotKind::Diagonal`] or [`SlotKind::OffDiagonal`]
//! - [`CellFields`] with one value per cell
//! - [`EdgeFields`] indexed by the [`EdgeId`] found in off-diagonal slots

mod builder;
mod fields;
mod topology;
mod types;

pub use builder::MeshBuilder;
pub use fields::{CellFields, CellProperties, EdgeFields, EdgeProperties};
pub use topology::MeshTopology;
pub use types::{CellId, EdgeId, SlotKind};

use crate::error::{AquiferError, Result};

/// A complete mesh ready for simulation.
#[derive(Debug, Clone)]
pub struct Mesh {
    /// Sparse adjacency structure
    pub topology: MeshTopology,
    /// Per-cell properties
    pub cells: CellFields,
    /// Per-edge properties
    pub edges: EdgeFields,
}

impl Mesh {
    /// Assemble a mesh from prebuilt parts.
    ///
    /// Only the cell count is cross-checked; edge ids referenced by the
    /// topology are trusted.
    pub fn new(topology: MeshTopology, cells: CellFields, edges: EdgeFields) -> Result<Self> {
        if cells.len() != topology.num_cells() {
            return Err(AquiferError::invalid_mesh(format!(
                "topology has {} rows but {} cells were supplied",
                topology.num_cells(),
                cells.len()
            )));
        }
        Ok(Self {
            topology,
            cells,
            edges,
        })
    }

    /// Number of cells (`Np`).
    pub fn num_cells(&self) -> usize {
        self.topology.num_cells()
    }

    /// Number of stored matrix entries (`SIZE`).
    pub fn nnz(&self) -> usize {
        self.topology.nnz()
    }
}
