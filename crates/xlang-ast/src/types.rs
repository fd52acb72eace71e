//! Type definitions for the AST

use super::*;
use std::fmt;

/// Type expression as written in source.
///
/// Only `Int` is a known base name; any other name is kept here and rejected
/// during lowering so the error can point at the offending annotation.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    /// Base type name: `Int`
    Named(Ident),

    /// Pointer type: `*T` or `Pointer<T>`
    Pointer(Box<Node<TypeExpr>>),
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Named(name) => write!(f, "{}", name),
            TypeExpr::Pointer(pointee) => write!(f, "*{}", pointee.value),
        }
    }
}
