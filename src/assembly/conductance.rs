//! Conductance matrix `T` and explicit right-hand side `b`.

use crate::mesh::{Mesh, SlotKind};

/// Assemble the conductance matrix and the explicit term for head field `eta`.
///
/// For an off-diagonal slot `j` in row `i` with neighbor `k` through edge `e`:
///
/// ```text
/// T[j] = -dt * K_e * L_e / d_e * max(eta[k] - bottom[k], eta[i] - bottom[i])
/// ```
///
/// The diagonal slot receives the negated sum of the row's off-diagonal
/// entries, so every row of `T` sums to zero. At the same time
///
/// ```text
/// b[i] = (eta[i] - bottom[i]) * area[i] + dt * area[i] * source[i]
/// ```
///
/// Both outputs are fully overwritten.
pub fn assemble_conductance(mesh: &Mesh, eta: &[f64], delta_t: f64, t: &mut [f64], b: &mut [f64]) {
    let topology = &mesh.topology;
    let cells = &mesh.cells;
    let edges = &mesh.edges;

    for i in 0..topology.num_cells() {
        let area = cells.plan_area[i];
        let thickness_i = cells.thickness(i, eta[i]);
        b[i] = thickness_i * area + delta_t * area * cells.source_sink[i];

        let mut row_sum = 0.0;
        for j in topology.row(i) {
            let SlotKind::OffDiagonal(edge) = topology.slots()[j] else {
                continue;
            };
            let k = topology.col_idx()[j];
            // Upwind: the wetter side carries the flux
            let thickness = cells.thickness(k, eta[k]).max(thickness_i);
            t[j] = -delta_t * edges.conductance_factor(edge.0) * thickness;
            row_sum += t[j];
        }

        if let Some(d) = topology.diagonal_slot(i) {
            t[d] = -row_sum;
        }
    }
}
