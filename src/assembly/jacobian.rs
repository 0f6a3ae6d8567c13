//! Approximate Newton Jacobian `Jr`.

use crate::mesh::MeshTopology;

/// How off-diagonal Jacobian entries are taken from `T`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JacobianStrategy {
    /// `Jr[j] = T[j]`.
    #[default]
    SamePosition,
    /// `Jr[j] = T[m]` where `m` is the slot of the transposed entry
    /// `(neighbor, i)`. Falls back to `T[j]` when the neighbor does not list
    /// the cell back.
    Mirrored,
}

/// Assemble `Jr` on the sparsity pattern of `T`.
///
/// Only the storage term is differentiated: the diagonal is `T_ii + p[i]`
/// and off-diagonal entries copy `T`. The flux terms' dependence on the
/// upwind thickness is ignored, so Newton converges linearly at best when
/// `T` itself changes with head.
pub fn assemble_jacobian(
    topology: &MeshTopology,
    t: &[f64],
    storage: &[f64],
    strategy: JacobianStrategy,
    jr: &mut [f64],
) {
    for i in 0..topology.num_cells() {
        let diagonal = topology.diagonal_slot(i);
        for j in topology.row(i) {
            if Some(j) == diagonal {
                jr[j] = t[j] + storage[i];
                continue;
            }
            let source = match strategy {
                JacobianStrategy::SamePosition => j,
                JacobianStrategy::Mirrored => topology.mirror_slot(j).unwrap_or(j),
            };
            jr[j] = t[source];
        }
    }
}
