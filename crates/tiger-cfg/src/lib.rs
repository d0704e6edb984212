//! Tiger CFG - control-flow graph IR, dataflow analyses and optimizations
//!
//! Lowered method bodies arrive as a flat token stream. This crate groups
//! them into basic blocks, runs liveness and reaching-definitions analyses
//! to a fixed point, and uses the facts for dead-code elimination and
//! constant/copy propagation.

pub mod builder;
pub mod dataflow;
pub mod dot;
pub mod error;
pub mod eval;
pub mod graph;
pub mod ir;
pub mod lower;
pub mod opt;
pub mod pipeline;
pub mod token;

pub use builder::build_body;
pub use dataflow::{Liveness, ReachingDefs};
pub use error::{CfgError, CfgResult};
pub use eval::{run_program, EvalError, Interpreter};
pub use graph::FlowGraph;
pub use lower::{lower_method, Structured};
pub use pipeline::{OptConfig, OptError, OptStats, Optimized, Optimizer, PassKind};
pub use token::{flatten, FreshNames, Token};

// Re-export IR types for convenience
pub use ir::{
    BinOp, Block, Body, Class, Dec, Label, MainMethod, Method, MethodRef, Operand, PerMethod,
    PrettyPrint, Program, RawBlock, Stm, StmId, Transfer, Type, Vtable, VtableEntry,
};
