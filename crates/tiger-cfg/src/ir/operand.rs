//! Statement and transfer operands

use std::fmt;

use serde::{Deserialize, Serialize};

/// An atomic operand: integer literal, string literal, or variable name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    Int(i32),
    Str(String),
    Var(String),
}

impl Operand {
    pub fn var(name: impl Into<String>) -> Self {
        Operand::Var(name.into())
    }

    pub fn str(text: impl Into<String>) -> Self {
        Operand::Str(text.into())
    }

    /// The variable name, if this operand reads one
    pub fn as_var(&self) -> Option<&str> {
        match self {
            Operand::Var(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_const(&self) -> bool {
        !matches!(self, Operand::Var(_))
    }
}

impl From<i32> for Operand {
    fn from(value: i32) -> Self {
        Operand::Int(value)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Int(n) => write!(f, "{}", n),
            Operand::Str(s) => write!(f, "{:?}", s),
            Operand::Var(name) => write!(f, "{}", name),
        }
    }
}
