//! Optimization passes over whole programs
//!
//! Each pass consumes the facts of the analysis it depends on and produces
//! a brand-new program; the input is never mutated.

pub mod const_prop;
pub mod dead_code;

pub use const_prop::{propagate_copies, ConstantPropagation};
pub use dead_code::{eliminate_dead_code, DeadCodeElimination};

use crate::error::CfgResult;
use crate::ir::Program;

/// What a pass produced
#[derive(Debug, Clone)]
pub struct PassOutcome {
    pub program: Program,
    /// Statements removed or uses rewritten, depending on the pass
    pub changes: usize,
}

/// A program-to-program optimization pass
pub trait Pass {
    /// Name of this pass (for diagnostics)
    fn name(&self) -> &'static str;

    /// Run the pass, producing the rewritten program
    fn run(&self, program: &Program) -> CfgResult<PassOutcome>;
}
