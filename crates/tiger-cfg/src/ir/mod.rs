//! Control-flow-graph IR
//!
//! Every method body is a list of basic blocks over a statement arena.
//!
//! # Structure
//!
//! - `Program` - classes, vtables, methods and the main method
//! - `Body` - validated blocks of one method; the first block is the entry
//! - `Block` - label, statement ids, terminating `Transfer`
//! - `Stm` - one three-address statement, defining at most one variable
//! - `Operand` - integer literal, string literal, or variable

pub mod block;
pub mod operand;
pub mod pretty;
pub mod program;
pub mod stm;
pub mod transfer;
pub mod types;

pub use block::{Block, Body, RawBlock};
pub use operand::Operand;
pub use pretty::PrettyPrint;
pub use program::{Class, MainMethod, Method, MethodRef, PerMethod, Program, Vtable, VtableEntry};
pub use stm::{BinOp, Stm, StmId, UseSite};
pub use transfer::{Label, Transfer};
pub use types::{Dec, Type};
