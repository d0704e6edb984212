//! Basic-block construction from a flat token stream
//!
//! Groups a method's `Label`/`Stm`/`Transfer` tokens into blocks. A block
//! that runs into the next label without a transfer gets a synthesized
//! `Goto` to that label.

use log::debug;

use crate::error::{CfgError, CfgResult};
use crate::ir::{Body, RawBlock, Transfer};
use crate::token::Token;

/// Build a method body from its token stream.
///
/// The stream must open with a label, and a transfer must be followed by a
/// label or the end of the stream. The final block must end in a transfer.
pub fn build_body(tokens: impl IntoIterator<Item = Token>) -> CfgResult<Body> {
    let mut tokens = tokens.into_iter().enumerate().peekable();
    let mut blocks = Vec::new();
    let mut synthesized = 0usize;

    while let Some((position, token)) = tokens.next() {
        // Step 1: every block opens with a label
        let label = match token {
            Token::Label(label) => label,
            other => return Err(CfgError::ExpectedLabel { position, found: other.kind() }),
        };

        // Step 2: straight-line statements up to the next label or transfer
        let mut stms = Vec::new();
        while let Some((_, Token::Stm(stm))) = tokens.next_if(|(_, t)| matches!(t, Token::Stm(_))) {
            stms.push(stm);
        }

        // Step 3: explicit transfer, or fall through to the next label
        let transfer = match tokens.next_if(|(_, t)| matches!(t, Token::Transfer(_))) {
            Some((_, Token::Transfer(transfer))) => transfer,
            _ => match tokens.peek() {
                Some((_, Token::Label(next))) => {
                    synthesized += 1;
                    Transfer::Goto(*next)
                }
                _ => return Err(CfgError::MissingTerminator(label)),
            },
        };

        blocks.push(RawBlock { label, stms, transfer });
    }

    debug!(
        "built {} blocks ({} fall-through gotos synthesized)",
        blocks.len(),
        synthesized
    );
    Body::from_blocks(blocks)
}
