//! Block labels and terminating transfers

use std::fmt;

use serde::{Deserialize, Serialize};

use super::operand::Operand;

/// Block label, unique within a method body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Label(pub u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L_{}", self.0)
    }
}

/// Control transfer that ends every block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transfer {
    /// Unconditional jump
    Goto(Label),
    /// Jump to `then_label` when `cond` is non-zero, else to `else_label`
    If {
        cond: Operand,
        then_label: Label,
        else_label: Label,
    },
    /// Leave the method with a value
    Return(Operand),
}

impl Transfer {
    pub fn branch(cond: impl Into<Operand>, then_label: Label, else_label: Label) -> Self {
        Transfer::If { cond: cond.into(), then_label, else_label }
    }

    /// Successor labels in edge order: `Goto` one, `If` then/else, `Return` none
    pub fn successors(&self) -> Vec<Label> {
        match self {
            Transfer::Goto(target) => vec![*target],
            Transfer::If { then_label, else_label, .. } => vec![*then_label, *else_label],
            Transfer::Return(_) => vec![],
        }
    }

    /// The operand this transfer reads, if any
    pub fn operand(&self) -> Option<&Operand> {
        match self {
            Transfer::Goto(_) => None,
            Transfer::If { cond, .. } => Some(cond),
            Transfer::Return(value) => Some(value),
        }
    }

    /// Variable read by the transfer, if any
    pub fn use_var(&self) -> Option<&str> {
        self.operand().and_then(Operand::as_var)
    }

    pub fn map_uses(&self, mut f: impl FnMut(&Operand) -> Operand) -> Transfer {
        match self {
            Transfer::Goto(target) => Transfer::Goto(*target),
            Transfer::If { cond, then_label, else_label } => Transfer::If {
                cond: f(cond),
                then_label: *then_label,
                else_label: *else_label,
            },
            Transfer::Return(value) => Transfer::Return(f(value)),
        }
    }
}

impl fmt::Display for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transfer::Goto(target) => write!(f, "goto {}", target),
            Transfer::If { cond, then_label, else_label } => {
                write!(f, "if {} then {} else {}", cond, then_label, else_label)
            }
            Transfer::Return(value) => write!(f, "return {}", value),
        }
    }
}
