//! Incremental construction of a [`Mesh`] from cells and connections.

use super::fields::{CellFields, CellProperties, EdgeFields, EdgeProperties};
use super::topology::MeshTopology;
use super::types::{CellId, EdgeId, SlotKind};
use super::Mesh;
use crate::error::{AquiferError, Result};

/// Builder that assembles the CSR adjacency from a list of cells and the
/// edges connecting them.
///
/// Each row is laid out in ascending column order with the diagonal slot in
/// its natural position.
#[derive(Debug, Default)]
pub struct MeshBuilder {
    cells: CellFields,
    edges: EdgeFields,
    connections: Vec<(usize, usize)>,
}

impl MeshBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a cell and return its id.
    pub fn add_cell(&mut self, cell: CellProperties) -> CellId {
        self.cells.push(cell);
        CellId(self.cells.len() - 1)
    }

    /// Connect two distinct cells through a shared edge.
    pub fn connect(&mut self, a: CellId, b: CellId, edge: EdgeProperties) -> Result<EdgeId> {
        let n = self.cells.len();
        if a.0 >= n || b.0 >= n {
            return Err(AquiferError::invalid_mesh(format!(
                "cannot connect {} and {}: only {} cells were added",
                a, b, n
            )));
        }
        if a == b {
            return Err(AquiferError::invalid_mesh(format!(
                "cannot connect {} to itself",
                a
            )));
        }
        self.edges.push(edge);
        self.connections.push((a.0, b.0));
        Ok(EdgeId(self.edges.len() - 1))
    }

    /// Finish the mesh.
    pub fn build(self) -> Result<Mesh> {
        let n = self.cells.len();

        let mut rows: Vec<Vec<(usize, SlotKind)>> =
            (0..n).map(|i| vec![(i, SlotKind::Diagonal)]).collect();
        for (e, &(a, b)) in self.connections.iter().enumerate() {
            rows[a].push((b, SlotKind::OffDiagonal(EdgeId(e))));
            rows[b].push((a, SlotKind::OffDiagonal(EdgeId(e))));
        }

        let size = rows.iter().map(Vec::len).sum();
        let mut row_ptr = Vec::with_capacity(n + 1);
        let mut col_idx = Vec::with_capacity(size);
        let mut slots = Vec::with_capacity(size);
        row_ptr.push(0);
        for mut row in rows {
            row.sort_by_key(|&(col, _)| col);
            for (col, slot) in row {
                col_idx.push(col);
                slots.push(slot);
            }
            row_ptr.push(col_idx.len());
        }

        let topology = MeshTopology::new(row_ptr, col_idx, slots)?;
        Ok(Mesh {
            topology,
            cells: self.cells,
            edges: self.edges,
        })
    }
}

impl Mesh {
    /// Build a chain of cells, each connected to the next through an edge
    /// with the same properties.
    pub fn chain(
        cells: impl IntoIterator<Item = CellProperties>,
        edge: EdgeProperties,
    ) -> Result<Mesh> {
        let mut builder = MeshBuilder::new();
        let ids: Vec<CellId> = cells.into_iter().map(|c| builder.add_cell(c)).collect();
        for pair in ids.windows(2) {
            builder.connect(pair[0], pair[1], edge)?;
        }
        builder.build()
    }
}
