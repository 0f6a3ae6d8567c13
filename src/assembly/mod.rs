//! Finite-volume assembly of the discrete Boussinesq system.
//!
//! For a trial head field `eta` the scheme builds:
//!
//! - `T`, the conductance (flux) matrix, and `b`, the explicit storage plus
//!   source term ([`assemble_conductance`])
//! - `R`, the mass-balance residual ([`assemble_residual`])
//! - `Jr`, the approximate Jacobian of `R` ([`assemble_jacobian`])
//!
//! `T` and `Jr` share the mesh's sparsity pattern and are stored as flat
//! arrays indexed by slot. Assembly order is a strict chain: `T`/`b` first,
//! then `R` and `Jr`.

mod conductance;
mod jacobian;
mod residual;

pub use conductance::assemble_conductance;
pub use jacobian::{assemble_jacobian, JacobianStrategy};
pub use residual::{assemble_residual, StorageModel, StorageTerms};

use crate::mesh::{Mesh, MeshTopology};

/// Matrices and vectors of the discrete system, sized once for a mesh and
/// overwritten in place on every assembly.
#[derive(Debug, Clone)]
pub struct FlowSystem {
    /// Conductance matrix values, one per slot
    pub t: Vec<f64>,
    /// Jacobian values, one per slot
    pub jr: Vec<f64>,
    /// Explicit right-hand side, one per cell
    pub b: Vec<f64>,
    /// Residual, one per cell
    pub residual: Vec<f64>,
}

impl FlowSystem {
    /// Allocate storage for `num_cells` cells and `nnz` slots.
    pub fn new(num_cells: usize, nnz: usize) -> Self {
        Self {
            t: vec![0.0; nnz],
            jr: vec![0.0; nnz],
            b: vec![0.0; num_cells],
            residual: vec![0.0; num_cells],
        }
    }

    /// Allocate storage matching a mesh.
    pub fn for_mesh(mesh: &Mesh) -> Self {
        Self::new(mesh.num_cells(), mesh.nnz())
    }

    /// Rebuild `T` and `b` from `eta`.
    pub fn assemble_conductance(&mut self, mesh: &Mesh, eta: &[f64], delta_t: f64) {
        assemble_conductance(mesh, eta, delta_t, &mut self.t, &mut self.b);
    }

    /// Rebuild `R` at `eta` using the current `T` and `b`.
    pub fn assemble_residual(&mut self, topology: &MeshTopology, eta: &[f64], terms: StorageTerms<'_>) {
        assemble_residual(topology, &self.t, &self.b, eta, terms, &mut self.residual);
    }

    /// Rebuild `Jr` from the current `T`.
    pub fn assemble_jacobian(
        &mut self,
        topology: &MeshTopology,
        storage: &[f64],
        strategy: JacobianStrategy,
    ) {
        assemble_jacobian(topology, &self.t, storage, strategy, &mut self.jr);
    }

    /// Largest absolute residual entry.
    pub fn max_abs_residual(&self) -> f64 {
        self.residual.iter().fold(0.0f64, |acc, r| acc.max(r.abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{CellProperties, EdgeProperties, MeshBuilder};
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn chain(heads: &[f64], bottom: f64) -> Mesh {
        Mesh::chain(
            heads.iter().map(|&h| CellProperties::new(h, bottom, 1.0)),
            EdgeProperties::new(1.0, 1.0, 1.0),
        )
        .unwrap()
    }

    /// A closed ring of four cells with varied geometry.
    fn ring(heads: [f64; 4]) -> Mesh {
        let mut builder = MeshBuilder::new();
        let ids: Vec<_> = heads
            .iter()
            .enumerate()
            .map(|(i, &h)| builder.add_cell(CellProperties::new(h, 0.5 * i as f64, 1.0 + i as f64)))
            .collect();
        for i in 0..4 {
            let edge = EdgeProperties::new(1.0 + 0.25 * i as f64, 2.0 + i as f64, 0.5);
            builder.connect(ids[i], ids[(i + 1) % 4], edge).unwrap();
        }
        builder.build().unwrap()
    }

    fn row_sums(mesh: &Mesh, t: &[f64]) -> Vec<f64> {
        (0..mesh.num_cells())
            .map(|i| mesh.topology.row(i).map(|j| t[j]).sum::<f64>())
            .collect()
    }

    #[test]
    fn test_conductance_rows_sum_to_zero() {
        let mesh = ring([3.0, 5.0, 2.5, 4.0]);
        let mut system = FlowSystem::for_mesh(&mesh);
        system.assemble_conductance(&mesh, &mesh.cells.eta, 0.5);

        for sum in row_sums(&mesh, &system.t) {
            assert!(sum.abs() < 1e-12);
        }
    }

    #[test]
    fn test_conductance_entries_for_chain() {
        let mesh = chain(&[4.0, 2.0, 3.0], 1.0);
        let mut system = FlowSystem::for_mesh(&mesh);
        system.assemble_conductance(&mesh, &mesh.cells.eta, 2.0);

        // Slots: [d0, (0,1), (1,0), d1, (1,2), (2,1), d2]
        // Edge 0 upwind thickness max(3, 1) = 3, edge 1 max(1, 2) = 2
        let expected = [6.0, -6.0, -6.0, 10.0, -4.0, -4.0, 4.0];
        for (got, want) in system.t.iter().zip(expected) {
            assert_relative_eq!(*got, want, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_explicit_term() {
        let mut builder = MeshBuilder::new();
        builder.add_cell(CellProperties::new(6.0, 2.0, 3.0).with_source(0.5));
        let mesh = builder.build().unwrap();
        let mut system = FlowSystem::for_mesh(&mesh);
        system.assemble_conductance(&mesh, &mesh.cells.eta, 2.0);

        // (6 - 2) * 3 + 2 * 3 * 0.5
        assert_relative_eq!(system.b[0], 15.0, epsilon = 1e-12);
        assert_eq!(system.t, vec![0.0]);
    }

    #[test]
    fn test_upwind_uses_wet_side_when_neighbor_is_dry() {
        // Cell 1 sits exactly at bedrock, cell 0 has thickness 2
        let mesh = chain(&[3.0, 1.0], 1.0);
        let mut system = FlowSystem::for_mesh(&mesh);
        system.assemble_conductance(&mesh, &mesh.cells.eta, 1.0);

        let off_diagonal = [system.t[1], system.t[2]];
        for value in off_diagonal {
            assert_relative_eq!(value, -2.0, epsilon = 1e-12);
            assert!(value <= 0.0);
        }
        assert!(system.t[0] >= 0.0);
        assert!(system.t[3] >= 0.0);
    }

    #[test]
    fn test_upwind_ignores_side_below_bedrock() {
        let mesh = chain(&[0.2, 2.5], 1.0);
        let mut system = FlowSystem::for_mesh(&mesh);
        system.assemble_conductance(&mesh, &mesh.cells.eta, 1.0);

        assert_relative_eq!(system.t[1], -1.5, epsilon = 1e-12);
        assert_relative_eq!(system.t[2], -1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_conductance_is_idempotent() {
        let mesh = ring([3.0, 5.0, 2.5, 4.0]);
        let mut system = FlowSystem::for_mesh(&mesh);

        system.assemble_conductance(&mesh, &mesh.cells.eta, 1.0);
        let (t1, b1) = (system.t.clone(), system.b.clone());
        system.assemble_conductance(&mesh, &mesh.cells.eta, 1.0);

        assert_eq!(system.t, t1);
        assert_eq!(system.b, b1);
    }

    #[test]
    fn test_residual_single_cell() {
        let mut builder = MeshBuilder::new();
        builder.add_cell(CellProperties::new(6.0, 2.0, 3.0).with_source(0.5));
        let mesh = builder.build().unwrap();
        let mut system = FlowSystem::for_mesh(&mesh);
        system.assemble_conductance(&mesh, &mesh.cells.eta, 2.0);

        let trial = [7.0];
        system.assemble_residual(&mesh.topology, &trial, StorageModel::PlanArea.terms(&mesh.cells));

        // p * (eta - z) - b = 3 * 5 - 15
        assert_relative_eq!(system.residual[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(system.max_abs_residual(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_residual_zero_for_symmetric_pair() {
        let mesh = chain(&[5.0, 5.0], 1.0);
        let mut system = FlowSystem::for_mesh(&mesh);
        system.assemble_conductance(&mesh, &mesh.cells.eta, 1.0);
        system.assemble_residual(
            &mesh.topology,
            &mesh.cells.eta,
            StorageModel::PlanArea.terms(&mesh.cells),
        );

        assert_eq!(system.max_abs_residual(), 0.0);
    }

    #[test]
    fn test_storage_model_coefficients() {
        let mut builder = MeshBuilder::new();
        builder.add_cell(CellProperties::new(6.0, 2.0, 3.0).with_storage(0.25, 4.0));
        let mesh = builder.build().unwrap();
        let mut system = FlowSystem::for_mesh(&mesh);
        system.assemble_conductance(&mesh, &mesh.cells.eta, 1.0);
        system.assemble_residual(
            &mesh.topology,
            &mesh.cells.eta,
            StorageModel::Coefficients.terms(&mesh.cells),
        );

        // 0.25 * (6 - 4) - (6 - 2) * 3
        assert_relative_eq!(system.residual[0], -11.5, epsilon = 1e-12);
    }

    #[test]
    fn test_jacobian_adds_storage_to_diagonal() {
        let mesh = chain(&[4.0, 2.0, 3.0], 1.0);
        let mut system = FlowSystem::for_mesh(&mesh);
        system.assemble_conductance(&mesh, &mesh.cells.eta, 1.0);
        let storage = vec![0.5, 1.5, 2.5];
        system.assemble_jacobian(&mesh.topology, &storage, JacobianStrategy::SamePosition);

        for i in 0..3 {
            let d = mesh.topology.diagonal_slot(i).unwrap();
            assert_relative_eq!(system.jr[d], system.t[d] + storage[i], epsilon = 1e-12);
        }
        for j in [1, 2, 4, 5] {
            assert_eq!(system.jr[j], system.t[j]);
        }
    }

    #[test]
    fn test_jacobian_strategies_agree_on_symmetric_conductance() {
        let mesh = ring([3.0, 5.0, 2.5, 4.0]);
        let mut system = FlowSystem::for_mesh(&mesh);
        system.assemble_conductance(&mesh, &mesh.cells.eta, 1.0);

        system.assemble_jacobian(&mesh.topology, &mesh.cells.plan_area, JacobianStrategy::SamePosition);
        let same = system.jr.clone();
        system.assemble_jacobian(&mesh.topology, &mesh.cells.plan_area, JacobianStrategy::Mirrored);

        assert_eq!(same, system.jr);
    }

    #[test]
    fn test_jacobian_mirrored_reads_transposed_slot() {
        let mesh = chain(&[4.0, 2.0], 1.0);
        let mut system = FlowSystem::for_mesh(&mesh);
        system.t = vec![1.0, -1.0, -3.0, 3.0];
        system.assemble_jacobian(&mesh.topology, &[0.0, 0.0], JacobianStrategy::Mirrored);

        assert_eq!(system.jr, vec![1.0, -3.0, -1.0, 3.0]);
    }

    proptest! {
        #[test]
        fn prop_conductance_conserves(
            heads in prop::array::uniform4(-5.0f64..20.0),
            delta_t in 0.01f64..10.0,
        ) {
            let mesh = ring(heads);
            let mut system = FlowSystem::for_mesh(&mesh);
            system.assemble_conductance(&mesh, &heads, delta_t);

            for sum in row_sums(&mesh, &system.t) {
                let scale = system.t.iter().fold(1.0f64, |acc, v| acc.max(v.abs()));
                prop_assert!(sum.abs() <= 1e-12 * scale);
            }
        }
    }
}
