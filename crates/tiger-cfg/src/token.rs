//! Flat per-method token streams
//!
//! Lowering emits a method as a flat sequence of labels, statements and
//! transfers; [`build_body`](crate::builder::build_body) groups it into blocks.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ir::{Body, Label, Stm, Transfer};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Token {
    Label(Label),
    Stm(Stm),
    Transfer(Transfer),
}

impl Token {
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::Label(_) => TokenKind::Label,
            Token::Stm(_) => TokenKind::Stm,
            Token::Transfer(_) => TokenKind::Transfer,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Label(label) => write!(f, "{}:", label),
            Token::Stm(stm) => write!(f, "{}", stm),
            Token::Transfer(transfer) => write!(f, "{}", transfer),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Label,
    Stm,
    Transfer,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Label => write!(f, "label"),
            TokenKind::Stm => write!(f, "statement"),
            TokenKind::Transfer => write!(f, "transfer"),
        }
    }
}

/// Fresh temporary and label supply for one method.
///
/// Create one per method (or [`reset`](FreshNames::reset) between methods);
/// names are only unique within the method that drew them.
#[derive(Debug, Clone)]
pub struct FreshNames {
    temp_prefix: &'static str,
    next_temp: u32,
    next_label: u32,
}

impl FreshNames {
    pub fn new() -> Self {
        Self::with_temp_prefix("x_")
    }

    /// Temporaries named `{prefix}{n}`, e.g. `v` for register-style names
    pub fn with_temp_prefix(prefix: &'static str) -> Self {
        FreshNames { temp_prefix: prefix, next_temp: 0, next_label: 0 }
    }

    /// Continue numbering labels after an existing body's
    pub fn after(body: &Body) -> Self {
        let mut names = Self::new();
        names.next_label = body.max_label() + 1;
        names
    }

    pub fn temp(&mut self) -> String {
        let name = format!("{}{}", self.temp_prefix, self.next_temp);
        self.next_temp += 1;
        name
    }

    pub fn label(&mut self) -> Label {
        let label = Label(self.next_label);
        self.next_label += 1;
        label
    }

    pub fn reset(&mut self) {
        self.next_temp = 0;
        self.next_label = 0;
    }
}

impl Default for FreshNames {
    fn default() -> Self {
        Self::new()
    }
}

/// Flatten a body back into its token stream. Building the result yields
/// an identical body.
pub fn flatten(body: &Body) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(body.stm_count() + 2 * body.block_count());
    for block in body.blocks() {
        tokens.push(Token::Label(block.label));
        tokens.extend(body.block_stms(block).map(|(_, stm)| Token::Stm(stm.clone())));
        tokens.push(Token::Transfer(block.transfer.clone()));
    }
    tokens
}
