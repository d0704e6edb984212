//! Optimization pipeline: liveness → dead code → reaching definitions → propagation
//!
//! Stages run strictly in that order. Each one consumes the previous
//! stage's program and produces a new one; analyses are recomputed on the
//! program they are consumed against.

pub mod config;

pub use config::{
    ConfigError, OptConfig, PassKind, PassToggles, PropagationConfig, MAX_STABLE_ROUNDS,
};

use log::debug;

use crate::dataflow::{Liveness, ReachingDefs};
use crate::error::{CfgError, CfgResult};
use crate::ir::{PerMethod, Program};
use crate::opt::{ConstantPropagation, DeadCodeElimination, Pass, PassOutcome};

/// Errors from the optimization pipeline
#[derive(Debug, thiserror::Error)]
pub enum OptError {
    #[error("internal compiler error: {0}")]
    Internal(#[from] CfgError),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type OptResult<T> = Result<T, OptError>;

/// Counters collected across one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptStats {
    pub dead_removed: usize,
    pub uses_rewritten: usize,
    pub propagation_rounds: usize,
    /// Solver sweeps summed over all methods and runs
    pub liveness_sweeps: usize,
    pub reaching_sweeps: usize,
}

/// Pipeline output
#[derive(Debug, Clone)]
pub struct Optimized {
    pub program: Program,
    /// Liveness of the final program, when liveness is enabled
    pub liveness: Option<PerMethod<Liveness>>,
    pub stats: OptStats,
}

/// Runs the configured analyses and passes over a program
#[derive(Debug, Clone, Default)]
pub struct Optimizer {
    config: OptConfig,
}

impl Optimizer {
    /// Create an optimizer, rejecting configurations that would run a pass
    /// without the analysis it consumes.
    pub fn new(config: OptConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Optimizer { config })
    }

    pub fn config(&self) -> &OptConfig {
        &self.config
    }

    pub fn optimize(&self, program: &Program) -> OptResult<Optimized> {
        let config = &self.config;
        let mut program = program.clone();
        let mut stats = OptStats::default();

        if config.is_enabled(PassKind::Liveness) {
            let liveness = analyze_liveness(&program)?;
            stats.liveness_sweeps += liveness.iter().map(|(_, l)| l.sweeps()).sum::<usize>();

            if config.is_enabled(PassKind::DeadCode) {
                let outcome = run_pass(&DeadCodeElimination::new(&liveness), &program)?;
                stats.dead_removed += outcome.changes;
                program = outcome.program;
            }
        }

        if config.is_enabled(PassKind::ReachingDefinitions) {
            let propagate = config.is_enabled(PassKind::ConstantPropagation);
            let rounds = if propagate { config.propagation.max_rounds() } else { 1 };

            for _ in 0..rounds {
                let reaching = analyze_reaching(&program)?;
                stats.reaching_sweeps += reaching.iter().map(|(_, r)| r.sweeps()).sum::<usize>();
                if !propagate {
                    break;
                }

                let outcome = run_pass(&ConstantPropagation::new(&reaching), &program)?;
                stats.propagation_rounds += 1;
                stats.uses_rewritten += outcome.changes;
                program = outcome.program;
                if outcome.changes == 0 {
                    break;
                }
            }
        }

        let liveness = if config.is_enabled(PassKind::Liveness) {
            Some(analyze_liveness(&program)?)
        } else {
            None
        };

        debug!(
            "optimized: {} dead statements removed, {} uses rewritten in {} rounds",
            stats.dead_removed, stats.uses_rewritten, stats.propagation_rounds
        );
        Ok(Optimized { program, liveness, stats })
    }
}

/// Liveness for every method body of `program`, keeping each method's
/// class fields live across its returns and calls
pub fn analyze_liveness(program: &Program) -> CfgResult<PerMethod<Liveness>> {
    program.analyze(|method, body| {
        Liveness::compute_with_fields(body, program.fields_in_scope(method))
    })
}

/// Reaching definitions for every method body of `program`
pub fn analyze_reaching(program: &Program) -> CfgResult<PerMethod<ReachingDefs>> {
    program.analyze(|_, body| ReachingDefs::compute(body))
}

fn run_pass(pass: &dyn Pass, program: &Program) -> CfgResult<PassOutcome> {
    debug!("running {}", pass.name());
    let outcome = pass.run(program)?;
    debug!("{}: {} changes", pass.name(), outcome.changes);
    Ok(outcome)
}
