//! Straight-line statements

use std::fmt;

use serde::{Deserialize, Serialize};

use super::operand::Operand;
use super::types::Type;

/// Index of a statement in its method body's arena.
///
/// Statement identity is positional: two textually identical statements in
/// the same body are still distinct definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StmId(pub u32);

impl StmId {
    pub fn new(id: u32) -> Self {
        StmId(id)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for StmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Arithmetic and comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinOp {
    Add,
    Sub,
    Times,
    And,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Times => "*",
            BinOp::And => "&&",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Eq => "==",
        }
    }

    /// Evaluate on 32-bit integers. Arithmetic wraps; comparisons and `&&`
    /// produce 1 or 0.
    pub fn eval(self, left: i32, right: i32) -> i32 {
        match self {
            BinOp::Add => left.wrapping_add(right),
            BinOp::Sub => left.wrapping_sub(right),
            BinOp::Times => left.wrapping_mul(right),
            BinOp::And => (left != 0 && right != 0) as i32,
            BinOp::Lt => (left < right) as i32,
            BinOp::Le => (left <= right) as i32,
            BinOp::Gt => (left > right) as i32,
            BinOp::Ge => (left >= right) as i32,
            BinOp::Eq => (left == right) as i32,
        }
    }
}

/// Kind of read slot offered by [`Stm::map_uses`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UseSite {
    /// Operand slot; any operand may be substituted
    Operand,
    /// Name slot (call receiver, stored-to array); only a variable fits
    Name,
}

/// A straight-line statement. Each defines at most one variable, its `dst`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stm {
    BinOp {
        dst: String,
        ty: Type,
        op: BinOp,
        left: Operand,
        right: Operand,
    },
    ArraySelect {
        dst: String,
        ty: Type,
        array: Operand,
        index: Operand,
    },
    Length {
        dst: String,
        ty: Type,
        array: Operand,
    },
    Move {
        dst: String,
        ty: Type,
        src: Operand,
    },
    NewObject {
        dst: String,
        class_id: String,
    },
    NewIntArray {
        dst: String,
        length: Operand,
    },
    InvokeVirtual {
        dst: String,
        ty: Type,
        receiver: String,
        method: String,
        args: Vec<Operand>,
    },
    AssignArray {
        array: String,
        ty: Type,
        index: Operand,
        value: Operand,
    },
    Print {
        arg: Operand,
    },
}

impl Stm {
    /// `dst = src` with an int type tag
    pub fn mov(dst: impl Into<String>, src: impl Into<Operand>) -> Self {
        Stm::Move { dst: dst.into(), ty: Type::Int, src: src.into() }
    }

    /// `dst = left op right` with an int type tag
    pub fn binop(
        dst: impl Into<String>,
        op: BinOp,
        left: impl Into<Operand>,
        right: impl Into<Operand>,
    ) -> Self {
        Stm::BinOp {
            dst: dst.into(),
            ty: Type::Int,
            op,
            left: left.into(),
            right: right.into(),
        }
    }

    pub fn print(arg: impl Into<Operand>) -> Self {
        Stm::Print { arg: arg.into() }
    }

    /// The variable this statement defines, if any
    pub fn dst(&self) -> Option<&str> {
        match self {
            Stm::BinOp { dst, .. }
            | Stm::ArraySelect { dst, .. }
            | Stm::Length { dst, .. }
            | Stm::Move { dst, .. }
            | Stm::NewObject { dst, .. }
            | Stm::NewIntArray { dst, .. }
            | Stm::InvokeVirtual { dst, .. } => Some(dst),
            Stm::AssignArray { .. } | Stm::Print { .. } => None,
        }
    }

    /// Type tag of the produced value. `AssignArray` reports the element
    /// type; `Print` produces nothing.
    pub fn ty(&self) -> Option<Type> {
        match self {
            Stm::BinOp { ty, .. }
            | Stm::ArraySelect { ty, .. }
            | Stm::Length { ty, .. }
            | Stm::Move { ty, .. }
            | Stm::InvokeVirtual { ty, .. }
            | Stm::AssignArray { ty, .. } => Some(ty.clone()),
            Stm::NewObject { class_id, .. } => Some(Type::Class(class_id.clone())),
            Stm::NewIntArray { .. } => Some(Type::IntArray),
            Stm::Print { .. } => None,
        }
    }

    /// Statements that must survive regardless of liveness
    pub fn has_side_effects(&self) -> bool {
        matches!(self, Stm::Print { .. } | Stm::InvokeVirtual { .. } | Stm::AssignArray { .. })
    }

    /// Call `f` with every variable name this statement reads, in operand order
    pub fn visit_uses<'a>(&'a self, mut f: impl FnMut(&'a str)) {
        match self {
            Stm::BinOp { left, right, .. } => {
                read(left, &mut f);
                read(right, &mut f);
            }
            Stm::ArraySelect { array, index, .. } => {
                read(array, &mut f);
                read(index, &mut f);
            }
            Stm::Length { array, .. } => read(array, &mut f),
            Stm::Move { src, .. } => read(src, &mut f),
            Stm::NewObject { .. } => {}
            Stm::NewIntArray { length, .. } => read(length, &mut f),
            Stm::InvokeVirtual { receiver, args, .. } => {
                f(receiver.as_str());
                for arg in args {
                    read(arg, &mut f);
                }
            }
            Stm::AssignArray { array, index, value, .. } => {
                f(array.as_str());
                read(index, &mut f);
                read(value, &mut f);
            }
            Stm::Print { arg } => read(arg, &mut f),
        }
    }

    pub fn uses(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.visit_uses(|name| names.push(name));
        names
    }

    /// Rebuild the statement with every read passed through `f`.
    ///
    /// Destinations are never touched. Name slots are offered to `f` as
    /// variables and keep their old name unless `f` answers with a variable.
    pub fn map_uses(&self, mut f: impl FnMut(&Operand, UseSite) -> Operand) -> Stm {
        match self {
            Stm::BinOp { dst, ty, op, left, right } => Stm::BinOp {
                dst: dst.clone(),
                ty: ty.clone(),
                op: *op,
                left: f(left, UseSite::Operand),
                right: f(right, UseSite::Operand),
            },
            Stm::ArraySelect { dst, ty, array, index } => Stm::ArraySelect {
                dst: dst.clone(),
                ty: ty.clone(),
                array: f(array, UseSite::Operand),
                index: f(index, UseSite::Operand),
            },
            Stm::Length { dst, ty, array } => Stm::Length {
                dst: dst.clone(),
                ty: ty.clone(),
                array: f(array, UseSite::Operand),
            },
            Stm::Move { dst, ty, src } => Stm::Move {
                dst: dst.clone(),
                ty: ty.clone(),
                src: f(src, UseSite::Operand),
            },
            Stm::NewObject { .. } => self.clone(),
            Stm::NewIntArray { dst, length } => Stm::NewIntArray {
                dst: dst.clone(),
                length: f(length, UseSite::Operand),
            },
            Stm::InvokeVirtual { dst, ty, receiver, method, args } => Stm::InvokeVirtual {
                dst: dst.clone(),
                ty: ty.clone(),
                receiver: rename(&mut f, receiver),
                method: method.clone(),
                args: args.iter().map(|arg| f(arg, UseSite::Operand)).collect(),
            },
            Stm::AssignArray { array, ty, index, value } => Stm::AssignArray {
                array: rename(&mut f, array),
                ty: ty.clone(),
                index: f(index, UseSite::Operand),
                value: f(value, UseSite::Operand),
            },
            Stm::Print { arg } => Stm::Print { arg: f(arg, UseSite::Operand) },
        }
    }
}

fn read<'a, F: FnMut(&'a str)>(op: &'a Operand, f: &mut F) {
    if let Operand::Var(name) = op {
        f(name.as_str());
    }
}

fn rename<F: FnMut(&Operand, UseSite) -> Operand>(f: &mut F, name: &str) -> String {
    match f(&Operand::Var(name.to_string()), UseSite::Name) {
        Operand::Var(renamed) => renamed,
        _ => name.to_string(),
    }
}

impl fmt::Display for Stm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stm::BinOp { dst, op, left, right, .. } => {
                write!(f, "{} = {} {} {}", dst, left, op.symbol(), right)
            }
            Stm::ArraySelect { dst, array, index, .. } => {
                write!(f, "{} = {}[{}]", dst, array, index)
            }
            Stm::Length { dst, array, .. } => write!(f, "{} = {}.length", dst, array),
            Stm::Move { dst, src, .. } => write!(f, "{} = {}", dst, src),
            Stm::NewObject { dst, class_id } => write!(f, "{} = new {}", dst, class_id),
            Stm::NewIntArray { dst, length } => write!(f, "{} = new int[{}]", dst, length),
            Stm::InvokeVirtual { dst, receiver, method, args, .. } => {
                write!(f, "{} = {}.{}(", dst, receiver, method)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Stm::AssignArray { array, index, value, .. } => {
                write!(f, "{}[{}] = {}", array, index, value)
            }
            Stm::Print { arg } => write!(f, "print {}", arg),
        }
    }
}
