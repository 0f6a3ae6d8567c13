//! Nonlinear mass-balance residual `R`.

use crate::mesh::{CellFields, MeshTopology};

/// Which per-cell fields play the storage coefficient `p` and datum `z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageModel {
    /// `p = plan area`, `z = bottom elevation`. Balances the storage term
    /// `(eta - bottom) * area` that goes into `b`.
    #[default]
    PlanArea,
    /// `p = storage coefficient`, `z = datum` as stored on each cell.
    Coefficients,
}

impl StorageModel {
    /// Resolve the storage and datum fields for this model.
    pub fn terms<'a>(&self, cells: &'a CellFields) -> StorageTerms<'a> {
        match self {
            StorageModel::PlanArea => StorageTerms {
                storage: &cells.plan_area,
                datum: &cells.bottom_elevation,
            },
            StorageModel::Coefficients => StorageTerms {
                storage: &cells.storage_coefficient,
                datum: &cells.datum,
            },
        }
    }
}

/// Storage coefficient `p` and datum `z` per cell.
#[derive(Debug, Clone, Copy)]
pub struct StorageTerms<'a> {
    pub storage: &'a [f64],
    pub datum: &'a [f64],
}

/// Evaluate `R[i] = p[i] * (eta[i] - z[i]) + sum_j T[j] * eta[col(j)] - b[i]`.
///
/// `t` and `b` must have been assembled for the head field the caller
/// intends `R` to be consistent with.
pub fn assemble_residual(
    topology: &MeshTopology,
    t: &[f64],
    b: &[f64],
    eta: &[f64],
    terms: StorageTerms<'_>,
    residual: &mut [f64],
) {
    let col_idx = topology.col_idx();
    for i in 0..topology.num_cells() {
        let flux: f64 = topology.row(i).map(|j| t[j] * eta[col_idx[j]]).sum();
        residual[i] = terms.storage[i] * (eta[i] - terms.datum[i]) + flux - b[i];
    }
}
