//! Time stepping with a Newton-Raphson inner loop.

use std::mem;

use log::{debug, info, warn};

use crate::assembly::FlowSystem;
use crate::error::Result;
use crate::mesh::Mesh;

use super::config::NewtonConfig;
use super::linear::{build_solver, LinearSolver, SparseOperator};

/// Where the driver is in its control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewtonPhase {
    /// Building `T`, `b`, `R` and `Jr`
    Assembling,
    /// Solving `Jr * delta = R`
    Solving,
    /// Applying the Newton update and reassembling `R` and `Jr`
    Updating,
    /// Testing the continuation rule
    ConvergenceCheck,
    /// Simulated time exhausted
    Done,
}

/// Outcome of one time step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    /// Zero-based step index
    pub step: usize,
    /// Simulated time at the end of the step
    pub time: f64,
    /// Inner Newton iterations performed
    pub iterations: usize,
    /// `max|R|` at the head field the step ended with
    pub max_residual: f64,
    /// Whether `max_residual` is within tolerance
    pub converged: bool,
}

/// Outcome of a full run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// One report per time step
    pub steps: Vec<StepReport>,
}

impl RunSummary {
    /// Report of the last step, if any step ran.
    pub fn last(&self) -> Option<&StepReport> {
        self.steps.last()
    }

    /// Total inner iterations across all steps.
    pub fn total_iterations(&self) -> usize {
        self.steps.iter().map(|s| s.iterations).sum()
    }

    /// Whether every step ended within tolerance.
    pub fn all_converged(&self) -> bool {
        self.steps.iter().all(|s| s.converged)
    }
}

/// Newton-Raphson driver for the Boussinesq equation.
///
/// Owns the mesh, the assembled system and two head buffers. Each time step
/// assembles `T` and `b` from the head at the start of the step and keeps
/// them fixed while the inner loop solves `Jr * delta = R`, updates
/// `new = old - delta`, reassembles `R` and `Jr`, and swaps the buffers.
pub struct NewtonDriver<L: LinearSolver = Box<dyn LinearSolver>> {
    mesh: Mesh,
    config: NewtonConfig,
    solver: L,
    system: FlowSystem,
    /// Head at the start of the current inner iteration
    sol_old: Vec<f64>,
    /// Head produced by the current inner iteration
    sol_new: Vec<f64>,
    /// Newton correction
    delta: Vec<f64>,
    steps_taken: usize,
    phase: NewtonPhase,
}

impl NewtonDriver {
    /// Create a driver using the linear solver selected in `config`.
    pub fn new(mesh: Mesh, config: NewtonConfig) -> Result<Self> {
        let solver = build_solver(config.linear_solver, config.linear.clone());
        Self::with_solver(mesh, config, solver)
    }
}

impl<L: LinearSolver> NewtonDriver<L> {
    /// Create a driver with a caller-supplied linear solver.
    pub fn with_solver(mesh: Mesh, config: NewtonConfig, solver: L) -> Result<Self> {
        config.validate()?;

        let num_cells = mesh.num_cells();
        info!("Number of cells: {}", num_cells);
        info!("Number of elements of T: {}", mesh.nnz());

        let system = FlowSystem::for_mesh(&mesh);
        let sol_old = mesh.cells.eta.clone();

        Ok(Self {
            mesh,
            config,
            solver,
            system,
            sol_old,
            sol_new: vec![0.0; num_cells],
            delta: vec![0.0; num_cells],
            steps_taken: 0,
            phase: NewtonPhase::Assembling,
        })
    }

    /// Current head field.
    pub fn heads(&self) -> &[f64] {
        &self.sol_old
    }

    /// Simulated time reached so far.
    pub fn time(&self) -> f64 {
        self.steps_taken as f64 * self.config.delta_t
    }

    /// Number of completed time steps.
    pub fn steps_taken(&self) -> usize {
        self.steps_taken
    }

    /// Current control-loop phase.
    pub fn phase(&self) -> NewtonPhase {
        self.phase
    }

    /// The assembled system as of the last iteration.
    pub fn system(&self) -> &FlowSystem {
        &self.system
    }

    /// The mesh being simulated.
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// Driver configuration.
    pub fn config(&self) -> &NewtonConfig {
        &self.config
    }

    /// Name of the linear solver in use.
    pub fn solver_name(&self) -> &'static str {
        self.solver.name()
    }

    /// Restart from the mesh's head field at time zero.
    pub fn reset(&mut self) {
        self.sol_old.copy_from_slice(&self.mesh.cells.eta);
        self.steps_taken = 0;
        self.phase = NewtonPhase::Assembling;
    }

    /// Advance one time step.
    ///
    /// A linear solver failure aborts the step and leaves the head buffers
    /// as they were after the last completed inner iteration.
    pub fn step(&mut self) -> Result<StepReport> {
        let delta_t = self.config.delta_t;
        let topology = &self.mesh.topology;
        let terms = self.config.storage.terms(&self.mesh.cells);

        self.phase = NewtonPhase::Assembling;
        self.system.assemble_conductance(&self.mesh, &self.sol_old, delta_t);
        self.system.assemble_residual(topology, &self.sol_old, terms);
        self.system.assemble_jacobian(topology, terms.storage, self.config.jacobian);

        let mut iterations = 0;
        let max_residual = loop {
            self.phase = NewtonPhase::Solving;
            let operator = SparseOperator::new(topology, &self.system.jr);
            let linear_iterations = self
                .solver
                .solve(&operator, &self.system.residual, &mut self.delta)?;

            self.phase = NewtonPhase::Updating;
            for ((new, old), d) in self.sol_new.iter_mut().zip(&self.sol_old).zip(&self.delta) {
                *new = old - d;
            }
            self.system.assemble_residual(topology, &self.sol_new, terms);
            self.system.assemble_jacobian(topology, terms.storage, self.config.jacobian);
            mem::swap(&mut self.sol_old, &mut self.sol_new);
            iterations += 1;

            self.phase = NewtonPhase::ConvergenceCheck;
            let max_residual = self.system.max_abs_residual();
            debug!(
                "Newton iteration {}: max|R| = {:.6e} ({} {} iterations)",
                iterations,
                max_residual,
                self.solver.name(),
                linear_iterations
            );
            if !self.config.should_continue(max_residual, iterations) {
                break max_residual;
            }
        };

        let converged = max_residual <= self.config.tolerance;
        if !converged {
            warn!(
                "Step {} stopped after {} iterations with max|R| = {:.6e} above tolerance {:.1e}",
                self.steps_taken, iterations, max_residual, self.config.tolerance
            );
        }

        let report = StepReport {
            step: self.steps_taken,
            time: (self.steps_taken + 1) as f64 * delta_t,
            iterations,
            max_residual,
            converged,
        };
        self.steps_taken += 1;
        self.phase = NewtonPhase::Assembling;

        info!(
            "t = {}: {} iterations, max|R| = {:.6e}",
            report.time, report.iterations, report.max_residual
        );
        Ok(report)
    }

    /// Advance from the current time until `sim_time` is reached.
    pub fn run(&mut self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        while self.time() < self.config.sim_time {
            summary.steps.push(self.step()?);
        }
        self.phase = NewtonPhase::Done;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::JacobianStrategy;
    use crate::error::AquiferError;
    use crate::mesh::{CellProperties, EdgeProperties, MeshBuilder};
    use crate::solver::{ContinuationRule, LinearSolverKind};
    use approx::assert_relative_eq;

    fn chain(heads: &[f64]) -> Mesh {
        Mesh::chain(
            heads.iter().map(|&h| CellProperties::new(h, 0.0, 1.0)),
            EdgeProperties::new(1.0, 1.0, 1.0),
        )
        .unwrap()
    }

    fn single_cell() -> Mesh {
        let mut builder = MeshBuilder::new();
        builder.add_cell(CellProperties::new(5.0, 1.0, 2.0).with_source(0.25));
        builder.build().unwrap()
    }

    /// Returns a zero correction, so the residual never moves.
    struct Stalled;

    impl LinearSolver for Stalled {
        fn solve(&mut self, _: &SparseOperator<'_>, _: &[f64], solution: &mut [f64]) -> Result<usize> {
            solution.fill(0.0);
            Ok(1)
        }

        fn name(&self) -> &'static str {
            "stalled"
        }
    }

    struct Failing;

    impl LinearSolver for Failing {
        fn solve(&mut self, _: &SparseOperator<'_>, _: &[f64], _: &mut [f64]) -> Result<usize> {
            Err(AquiferError::not_converged(100, 1.0))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    #[test]
    fn test_one_cell_converges_in_first_iteration() {
        let config = NewtonConfig::new().with_continuation(ContinuationRule::Strict);
        let mut driver = NewtonDriver::new(single_cell(), config).unwrap();

        let summary = driver.run().unwrap();

        assert_eq!(summary.steps.len(), 2);
        for report in &summary.steps {
            assert_eq!(report.iterations, 1);
            assert!(report.converged);
        }
        // Each step adds dt * source
        assert_relative_eq!(driver.heads()[0], 5.5, epsilon = 1e-12);
        assert_eq!(driver.system().t, vec![0.0]);
    }

    #[test]
    fn test_literal_rule_always_runs_four_iterations() {
        let mut driver = NewtonDriver::new(single_cell(), NewtonConfig::default()).unwrap();

        let report = driver.step().unwrap();

        assert_eq!(report.iterations, 4);
        assert!(report.converged);
        assert_relative_eq!(driver.heads()[0], 5.25, epsilon = 1e-12);
    }

    #[test]
    fn test_symmetric_pair_stays_at_fixed_point() {
        let mut driver = NewtonDriver::new(chain(&[5.0, 5.0]), NewtonConfig::default()).unwrap();

        let summary = driver.run().unwrap();

        assert!(summary.all_converged());
        assert_eq!(driver.heads(), &[5.0, 5.0]);
        assert_eq!(summary.last().unwrap().max_residual, 0.0);
    }

    #[test]
    fn test_three_cell_chain_reaches_steady_state() {
        let config = NewtonConfig::new().with_sim_time(30.0);
        let mut driver = NewtonDriver::new(chain(&[12.0, 10.0, 8.0]), config).unwrap();

        let summary = driver.run().unwrap();

        assert_eq!(summary.steps.len(), 30);
        let last = summary.last().unwrap();
        assert!(last.max_residual <= 1e-5);
        for &h in driver.heads() {
            assert_relative_eq!(h, 10.0, epsilon = 1e-6);
        }
        assert_eq!(driver.phase(), NewtonPhase::Done);
    }

    #[test]
    fn test_closed_mesh_conserves_stored_water() {
        let mesh = Mesh::chain(
            [
                CellProperties::new(9.0, 1.0, 2.0),
                CellProperties::new(4.0, 0.5, 1.0),
                CellProperties::new(6.0, 2.0, 3.0),
                CellProperties::new(3.0, 0.0, 1.5),
            ],
            EdgeProperties::new(2.0, 0.5, 1.0),
        )
        .unwrap();
        let stored = |mesh: &Mesh, heads: &[f64]| -> f64 {
            (0..mesh.num_cells())
                .map(|i| mesh.cells.plan_area[i] * mesh.cells.thickness(i, heads[i]))
                .sum()
        };
        let initial = stored(&mesh, &mesh.cells.eta);

        let config = NewtonConfig::new().with_delta_t(0.5).with_sim_time(5.0);
        let mut driver = NewtonDriver::new(mesh, config).unwrap();
        driver.run().unwrap();

        let final_storage = stored(driver.mesh(), driver.heads());
        assert_relative_eq!(final_storage, initial, epsilon = 1e-7);
    }

    #[test]
    fn test_strategies_and_solvers_agree() {
        let heads = [7.0, 3.0, 5.0, 4.0];
        let reference = {
            let mut driver = NewtonDriver::new(chain(&heads), NewtonConfig::default()).unwrap();
            driver.run().unwrap();
            driver.heads().to_vec()
        };

        let config = NewtonConfig::default()
            .with_jacobian(JacobianStrategy::Mirrored)
            .with_linear_solver(LinearSolverKind::BiCgStab);
        let mut driver = NewtonDriver::new(chain(&heads), config).unwrap();
        driver.run().unwrap();

        assert_eq!(driver.solver_name(), "BiCGStab");
        for (a, b) in driver.heads().iter().zip(&reference) {
            assert_relative_eq!(*a, *b, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_strict_rule_stops_at_minimum_when_stalled() {
        let config = NewtonConfig::new().with_continuation(ContinuationRule::Strict);
        let mut driver = NewtonDriver::with_solver(chain(&[8.0, 2.0]), config, Stalled).unwrap();

        let report = driver.step().unwrap();

        assert_eq!(report.iterations, 4);
        assert!(!report.converged);
        assert_eq!(driver.heads(), &[8.0, 2.0]);
    }

    #[test]
    fn test_iteration_cap_bounds_literal_rule() {
        let config = NewtonConfig::new().with_max_iterations(7);
        let mut driver = NewtonDriver::with_solver(single_cell(), config, Stalled).unwrap();

        let report = driver.step().unwrap();

        assert_eq!(report.iterations, 7);
        assert!(!report.converged);
    }

    #[test]
    fn test_solver_failure_propagates() {
        let mut driver =
            NewtonDriver::with_solver(chain(&[8.0, 2.0]), NewtonConfig::default(), Failing).unwrap();

        let err = driver.run().unwrap_err();

        assert!(matches!(err, AquiferError::LinearSolverDidNotConverge { .. }));
        assert_eq!(driver.steps_taken(), 0);
        assert_eq!(driver.phase(), NewtonPhase::Solving);
    }

    #[test]
    fn test_reset_restores_initial_heads() {
        let mut driver = NewtonDriver::new(chain(&[8.0, 2.0]), NewtonConfig::default()).unwrap();
        driver.run().unwrap();
        assert!(driver.time() >= 2.0);

        driver.reset();

        assert_eq!(driver.heads(), &[8.0, 2.0]);
        assert_eq!(driver.time(), 0.0);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = NewtonConfig::new().with_delta_t(-1.0);
        assert!(matches!(
            NewtonDriver::new(single_cell(), config),
            Err(AquiferError::InvalidConfig { .. })
        ));
    }
}
