//! Sparse adjacency pattern shared by the conductance and Jacobian matrices.

use std::ops::Range;

use super::types::{CellId, SlotKind};
use crate::error::{AquiferError, Result};

/// Compressed-sparse-row adjacency of a polygonal mesh.
///
/// Row `i` spans `row_ptr[i]..row_ptr[i + 1]`. Slot `j` couples cell `i` to
/// cell `col_idx[j]`, and `slots[j]` says whether it is the row's diagonal or
/// an edge to a neighbor. Matrices assembled on this mesh are flat arrays of
/// length [`nnz`](Self::nnz) indexed by slot.
///
/// The pattern is taken as given: a row without a diagonal slot, or with
/// more than one, is a precondition violation and leaves that row's diagonal
/// entry undefined after assembly.
#[derive(Debug, Clone)]
pub struct MeshTopology {
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    slots: Vec<SlotKind>,
    /// Diagonal slot per row
    diagonal: Vec<Option<usize>>,
    /// Slot holding `(col_idx[j], row(j))` for each slot `j`
    mirror: Vec<Option<usize>>,
}

impl MeshTopology {
    /// Build a topology from a CSR pattern with tagged slots.
    pub fn new(row_ptr: Vec<usize>, col_idx: Vec<usize>, slots: Vec<SlotKind>) -> Result<Self> {
        let Some(&size) = row_ptr.last() else {
            return Err(AquiferError::invalid_mesh("row pointer array is empty"));
        };
        if col_idx.len() != size || slots.len() != size {
            return Err(AquiferError::invalid_mesh(format!(
                "row pointer ends at {} but there are {} column indices and {} slot labels",
                size,
                col_idx.len(),
                slots.len()
            )));
        }

        let num_cells = row_ptr.len() - 1;
        let diagonal = (0..num_cells)
            .map(|i| (row_ptr[i]..row_ptr[i + 1]).find(|&j| slots[j].is_diagonal()))
            .collect();

        let mut topology = Self {
            row_ptr,
            col_idx,
            slots,
            diagonal,
            mirror: Vec::new(),
        };
        topology.mirror = topology.compute_mirrors();
        Ok(topology)
    }

    /// Build a topology from raw `Mp`, `Mi`, `Ml` arrays, where a negative
    /// `Ml` entry marks the diagonal slot.
    pub fn from_raw(mp: Vec<usize>, mi: Vec<usize>, ml: &[i64]) -> Result<Self> {
        let slots = ml.iter().map(|&label| SlotKind::from_raw(label)).collect();
        Self::new(mp, mi, slots)
    }

    fn compute_mirrors(&self) -> Vec<Option<usize>> {
        let mut mirror = vec![None; self.nnz()];
        for i in 0..self.num_cells() {
            for j in self.row(i) {
                if self.slots[j].is_diagonal() {
                    continue;
                }
                let k = self.col_idx[j];
                mirror[j] = self
                    .row(k)
                    .find(|&m| self.col_idx[m] == i && !self.slots[m].is_diagonal());
            }
        }
        mirror
    }

    /// Number of cells (`Np`).
    #[inline]
    pub fn num_cells(&self) -> usize {
        self.row_ptr.len() - 1
    }

    /// Number of stored entries (`SIZE`).
    #[inline]
    pub fn nnz(&self) -> usize {
        self.col_idx.len()
    }

    /// Row pointer array (`Mp`).
    #[inline]
    pub fn row_ptr(&self) -> &[usize] {
        &self.row_ptr
    }

    /// Column index array (`Mi`).
    #[inline]
    pub fn col_idx(&self) -> &[usize] {
        &self.col_idx
    }

    /// Slot labels, parallel to [`col_idx`](Self::col_idx).
    #[inline]
    pub fn slots(&self) -> &[SlotKind] {
        &self.slots
    }

    /// Slot range of row `i`.
    #[inline]
    pub fn row(&self, i: usize) -> Range<usize> {
        self.row_ptr[i]..self.row_ptr[i + 1]
    }

    /// Diagonal slot of row `i`, if the row has one.
    #[inline]
    pub fn diagonal_slot(&self, i: usize) -> Option<usize> {
        self.diagonal[i]
    }

    /// Slot of the transposed entry, if the neighbor lists this cell back.
    #[inline]
    pub fn mirror_slot(&self, j: usize) -> Option<usize> {
        self.mirror[j]
    }

    /// Cell addressed by slot `j`.
    #[inline]
    pub fn neighbor(&self, j: usize) -> CellId {
        CellId(self.col_idx[j])
    }

    /// Raw `Ml` labels with [`SlotKind::RAW_DIAGONAL`] on the diagonal.
    pub fn raw_labels(&self) -> Vec<i64> {
        self.slots
            .iter()
            .map(|slot| match slot {
                SlotKind::Diagonal => SlotKind::RAW_DIAGONAL,
                SlotKind::OffDiagonal(edge) => edge.0 as i64,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::EdgeId;

    /// Three cells in a row: 0 - 1 - 2, edges e0 = (0,1), e1 = (1,2).
    fn chain_topology() -> MeshTopology {
        MeshTopology::from_raw(
            vec![0, 2, 5, 7],
            vec![0, 1, 0, 1, 2, 1, 2],
            &[-1, 0, 0, -1, 1, 1, -1],
        )
        .unwrap()
    }

    #[test]
    fn test_counts_and_rows() {
        let topo = chain_topology();
        assert_eq!(topo.num_cells(), 3);
        assert_eq!(topo.nnz(), 7);
        assert_eq!(topo.row(1), 2..5);
        assert_eq!(topo.neighbor(4), CellId(2));
    }

    #[test]
    fn test_diagonal_slots_are_precomputed() {
        let topo = chain_topology();
        assert_eq!(topo.diagonal_slot(0), Some(0));
        assert_eq!(topo.diagonal_slot(1), Some(3));
        assert_eq!(topo.diagonal_slot(2), Some(6));
    }

    #[test]
    fn test_mirror_slots() {
        let topo = chain_topology();
        assert_eq!(topo.mirror_slot(1), Some(2));
        assert_eq!(topo.mirror_slot(2), Some(1));
        assert_eq!(topo.mirror_slot(4), Some(5));
        assert_eq!(topo.mirror_slot(0), None);
    }

    #[test]
    fn test_missing_diagonal_is_not_rejected() {
        let topo = MeshTopology::from_raw(vec![0, 1, 2], vec![1, 0], &[0, 0]).unwrap();
        assert_eq!(topo.diagonal_slot(0), None);
        assert_eq!(topo.slots()[0], SlotKind::OffDiagonal(EdgeId(0)));
    }

    #[test]
    fn test_raw_labels_round_trip() {
        let topo = chain_topology();
        assert_eq!(topo.raw_labels(), vec![-1, 0, 0, -1, 1, 1, -1]);
    }

    #[test]
    fn test_mismatched_lengths() {
        assert!(MeshTopology::from_raw(vec![0, 2], vec![0], &[-1]).is_err());
        assert!(MeshTopology::from_raw(vec![], vec![], &[]).is_err());
    }
}
