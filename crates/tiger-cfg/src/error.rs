//! Structural errors raised while building or transforming the CFG IR

use thiserror::Error;

use crate::ir::{Label, MethodRef, StmId};
use crate::token::TokenKind;

/// Errors raised when a token stream or block list does not describe a
/// well-formed method body, or when a pass is handed facts that do not
/// belong to the body it is transforming.
///
/// Every variant is an internal compiler error: upstream lowering always
/// produces well-formed input, so hitting one of these means a bug.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CfgError {
    /// A method body with no blocks at all
    #[error("method body has no blocks")]
    EmptyBody,

    /// Every block must open with a label
    #[error("expected a label at token {position}, found {found}")]
    ExpectedLabel { position: usize, found: TokenKind },

    /// The stream ended inside a block that has no transfer
    #[error("block {0} has no terminating transfer")]
    MissingTerminator(Label),

    /// Two blocks in the same body share a label
    #[error("duplicate block label {0}")]
    DuplicateLabel(Label),

    /// A transfer names a label that no block in the body carries
    #[error("block {from} jumps to undefined label {target}")]
    UnresolvedLabel { from: Label, target: Label },

    /// A pass asked for facts about a statement the analysis never saw
    #[error("no {analysis} facts for statement {stm}")]
    MissingFacts { analysis: &'static str, stm: StmId },

    /// Per-method facts or a lookup named a body the program does not have
    #[error("no method body for {0}")]
    MissingMethod(MethodRef),
}

/// Result alias for CFG construction and transformation
pub type CfgResult<T> = Result<T, CfgError>;
