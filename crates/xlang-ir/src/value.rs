//! Values and right-hand-side computations.

use std::fmt;

use crate::{BinOp, Constant, GlobalId, LocalId, TempId, UnOp};

/// Represents a value that can be used in computations.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Compile-time constant
    Const(Constant),
    /// Temporary value reference
    Temp(TempId),
    /// Incoming argument by position
    Param(usize),
    /// Address of a stack slot
    Local(LocalId),
    /// Address of a global variable
    Global(GlobalId),
}

impl Value {
    pub fn i32(value: i32) -> Self {
        Value::Const(Constant::I32(value))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Const(c) => write!(f, "{}", c),
            Value::Temp(id) => write!(f, "{}", id),
            Value::Param(index) => write!(f, "%arg{}", index),
            Value::Local(id) => write!(f, "{}", id),
            Value::Global(id) => write!(f, "{}", id),
        }
    }
}

/// Right-hand side of an assignment - represents a computation.
#[derive(Debug, Clone, PartialEq)]
pub enum RValue {
    /// Use a value directly
    Use(Value),
    /// Binary operation
    BinaryOp {
        op: BinOp,
        left: Value,
        right: Value,
    },
    /// Unary operation
    UnaryOp {
        op: UnOp,
        operand: Value,
    },
}

impl fmt::Display for RValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RValue::Use(value) => write!(f, "{}", value),
            RValue::BinaryOp { op, left, right } => write!(f, "{} {}, {}", op, left, right),
            RValue::UnaryOp { op, operand } => write!(f, "{} {}", op, operand),
        }
    }
}
