//! Type tags and declarations

use std::fmt;

use serde::{Deserialize, Serialize};

/// Source-level type attached to declarations and defining statements
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Type {
    Int,
    IntArray,
    Str,
    Class(String),
}

impl Type {
    pub fn class(id: impl Into<String>) -> Self {
        Type::Class(id.into())
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::IntArray => write!(f, "int[]"),
            Type::Str => write!(f, "String"),
            Type::Class(id) => write!(f, "{}", id),
        }
    }
}

/// A typed name: method formal, local, or class field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dec {
    pub ty: Type,
    pub id: String,
}

impl Dec {
    pub fn new(ty: Type, id: impl Into<String>) -> Self {
        Dec { ty, id: id.into() }
    }
}

impl fmt::Display for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.ty, self.id)
    }
}
