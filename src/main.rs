//! Boussinesq - groundwater flow on a chain of cells
//!
//! Runs the Newton driver on a straight chain of identical cells with a
//! linear initial head profile and prints the final head per cell.
//!
//! # Usage
//!
//! ```bash
//! boussinesq --cells 10 --head-start 12 --head-end 8 --sim-time 50 --log-level debug
//! ```

use clap::{Parser, ValueEnum};
use log::LevelFilter;

use boussinesq_core::{
    assembly::JacobianStrategy,
    error::Result,
    mesh::{CellProperties, EdgeProperties, Mesh},
    solver::{ContinuationRule, LinearSolverKind},
    NewtonConfig, NewtonDriver,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum JacobianArg {
    SamePosition,
    Mirrored,
}

impl From<JacobianArg> for JacobianStrategy {
    fn from(arg: JacobianArg) -> Self {
        match arg {
            JacobianArg::SamePosition => JacobianStrategy::SamePosition,
            JacobianArg::Mirrored => JacobianStrategy::Mirrored,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SolverArg {
    Cg,
    Bicgstab,
}

impl From<SolverArg> for LinearSolverKind {
    fn from(arg: SolverArg) -> Self {
        match arg {
            SolverArg::Cg => LinearSolverKind::ConjugateGradient,
            SolverArg::Bicgstab => LinearSolverKind::BiCgStab,
        }
    }
}

/// Boussinesq groundwater equation solver
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of cells in the chain
    #[arg(long, default_value_t = 3)]
    cells: usize,

    /// Distance between neighboring cell centers
    #[arg(long, default_value_t = 1.0)]
    spacing: f64,

    /// Saturated hydraulic conductivity
    #[arg(long, default_value_t = 1.0)]
    conductivity: f64,

    /// Length of the edge shared by neighboring cells
    #[arg(long, default_value_t = 1.0)]
    edge_length: f64,

    /// Initial head of the first cell
    #[arg(long, default_value_t = 12.0)]
    head_start: f64,

    /// Initial head of the last cell
    #[arg(long, default_value_t = 8.0)]
    head_end: f64,

    /// Bedrock elevation of every cell
    #[arg(long, default_value_t = 0.0)]
    bottom: f64,

    /// Source/sink rate applied to every cell
    #[arg(long, default_value_t = 0.0)]
    source: f64,

    /// Time step
    #[arg(long, default_value_t = boussinesq_core::solver::DEFAULT_DELTA_T)]
    delta_t: f64,

    /// Total simulated time
    #[arg(long, default_value_t = boussinesq_core::solver::DEFAULT_SIM_TIME)]
    sim_time: f64,

    /// Convergence tolerance on max|R|
    #[arg(long, default_value_t = boussinesq_core::solver::DEFAULT_TOLERANCE)]
    tolerance: f64,

    /// Inner iteration count used by the continuation rule
    #[arg(long, default_value_t = boussinesq_core::solver::MIN_NEWTON_ITERATIONS)]
    min_iterations: usize,

    /// Hard cap on inner iterations
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Stop iterating once the residual is within tolerance or the minimum
    /// count is reached, whichever comes first
    #[arg(long)]
    strict: bool,

    /// Off-diagonal Jacobian assembly
    #[arg(long, value_enum, default_value_t = JacobianArg::SamePosition)]
    jacobian: JacobianArg,

    /// Linear solver
    #[arg(long, value_enum, default_value_t = SolverArg::Cg)]
    solver: SolverArg,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn build_mesh(&self) -> Result<Mesh> {
        let n = self.cells.max(1);
        let step = if n > 1 {
            (self.head_end - self.head_start) / (n - 1) as f64
        } else {
            0.0
        };
        let cells = (0..n).map(|i| {
            CellProperties::new(self.head_start + step * i as f64, self.bottom, self.spacing * self.edge_length)
                .with_source(self.source)
        });
        let edge = EdgeProperties::new(self.spacing, self.conductivity, self.edge_length);
        Mesh::chain(cells, edge)
    }

    fn build_config(&self) -> NewtonConfig {
        let continuation = if self.strict {
            ContinuationRule::Strict
        } else {
            ContinuationRule::Literal
        };
        let mut config = NewtonConfig::new()
            .with_delta_t(self.delta_t)
            .with_sim_time(self.sim_time)
            .with_tolerance(self.tolerance)
            .with_min_iterations(self.min_iterations)
            .with_continuation(continuation)
            .with_jacobian(self.jacobian.into())
            .with_linear_solver(self.solver.into());
        if let Some(cap) = self.max_iterations {
            config = config.with_max_iterations(cap);
        }
        config
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = args.log_level.parse().unwrap_or(LevelFilter::Info);
    env_logger::Builder::new()
        .filter_level(level)
        .format_target(false)
        .init();

    let mesh = args.build_mesh()?;
    let mut driver = NewtonDriver::new(mesh, args.build_config())?;
    let summary = driver.run()?;

    log::info!(
        "Finished {} steps with {} Newton iterations using {}",
        summary.steps.len(),
        summary.total_iterations(),
        driver.solver_name()
    );

    for (i, head) in driver.heads().iter().enumerate() {
        println!("{}\t{:.9}", i, head);
    }

    Ok(())
}
