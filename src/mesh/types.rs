//! Core identifier types for mesh representation.

use std::fmt;

/// Index of a polygonal cell in the mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(pub usize);

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Index of a shared edge between two cells.
/// Per-edge properties (distance, conductivity, length) are looked up by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub usize);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// What a slot of the sparse pattern stands for.
///
/// Every row holds exactly one `Diagonal` slot; the remaining slots couple the
/// row's cell to a neighbor through an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    /// The row's own diagonal entry
    Diagonal,
    /// Coupling to the neighbor in `col_idx` through this edge
    OffDiagonal(EdgeId),
}

impl SlotKind {
    /// Sentinel used in raw `Ml` arrays to mark the diagonal slot.
    pub const RAW_DIAGONAL: i64 = -1;

    /// Decode a raw `Ml` entry.
    pub fn from_raw(label: i64) -> Self {
        if label < 0 {
            SlotKind::Diagonal
        } else {
            SlotKind::OffDiagonal(EdgeId(label as usize))
        }
    }

    /// Check if this is the diagonal slot.
    pub fn is_diagonal(&self) -> bool {
        matches!(self, SlotKind::Diagonal)
    }

    /// Edge behind an off-diagonal slot.
    pub fn edge(&self) -> Option<EdgeId> {
        match self {
            SlotKind::Diagonal => None,
            SlotKind::OffDiagonal(edge) => Some(*edge),
        }
    }
}
