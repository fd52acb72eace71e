//! IR type system and related definitions.

use std::fmt;

use crate::GlobalId;

/// IR type system representing all possible types in the IR.
///
/// Pointer types nest structurally: two pointers are equal iff their
/// pointees are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IrType {
    /// No value (functions without a declared return type)
    Void,
    /// 32-bit signed integer (`Int`)
    I32,
    /// Result of a comparison; only usable as a branch condition
    Bool,
    /// Pointer to a value of the inner type
    Ptr(Box<IrType>),
}

impl IrType {
    /// Wraps this type in a pointer.
    pub fn pointer_to(self) -> IrType {
        IrType::Ptr(Box::new(self))
    }

    /// Returns the pointee if this is a pointer type.
    pub fn pointee(&self) -> Option<&IrType> {
        match self {
            IrType::Ptr(inner) => Some(inner),
            _ => None,
        }
    }

    /// Returns true if this type is a pointer type.
    pub fn is_pointer(&self) -> bool {
        matches!(self, IrType::Ptr(_))
    }

    /// Returns the size in bytes of a stored value of this type on a 64-bit target.
    pub fn size_bytes(&self) -> usize {
        match self {
            IrType::Void => 0,
            IrType::I32 => 4,
            IrType::Bool => 1,
            IrType::Ptr(_) => 8,
        }
    }
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrType::Void => write!(f, "void"),
            IrType::I32 => write!(f, "i32"),
            IrType::Bool => write!(f, "bool"),
            IrType::Ptr(inner) => write!(f, "*{}", inner),
        }
    }
}

/// Function signature describing parameter and return types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FuncSignature {
    /// Parameter types
    pub params: Vec<IrType>,
    /// Return type
    pub return_type: IrType,
}

impl fmt::Display for FuncSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param)?;
        }
        write!(f, ") -> {}", self.return_type)
    }
}

/// Compile-time constant values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    /// 32-bit signed integer constant
    I32(i32),
    /// Boolean constant
    Bool(bool),
    /// Address of a global (relocation in a global initializer)
    GlobalAddr(GlobalId),
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::I32(v) => write!(f, "{}", v),
            Constant::Bool(b) => write!(f, "{}", b),
            Constant::GlobalAddr(id) => write!(f, "&{}", id),
        }
    }
}

/// Binary operators. Arithmetic is signed and wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,

    // Signed comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinOp {
    pub fn is_comparison(&self) -> bool {
        matches!(self, BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge)
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Mul => "mul",
            BinOp::Div => "sdiv",
            BinOp::Eq => "icmp eq",
            BinOp::Ne => "icmp ne",
            BinOp::Lt => "icmp slt",
            BinOp::Le => "icmp sle",
            BinOp::Gt => "icmp sgt",
            BinOp::Ge => "icmp sge",
        };
        write!(f, "{}", s)
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnOp {
    /// Arithmetic negation (-)
    Neg,
}

impl fmt::Display for UnOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnOp::Neg => write!(f, "neg"),
        }
    }
}
