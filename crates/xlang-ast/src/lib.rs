//! # X AST
//!
//! Abstract Syntax Tree definitions for the X compiler.
//! The tree is produced by `xlang-parser` and consumed by the lowering in `xlang-ir`.

use std::fmt;

// =============================================================================
// Core Types (kept in lib.rs - used by all modules)
// =============================================================================

/// Source location information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub file_id: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, file_id: usize) -> Self {
        Self { start, end, file_id }
    }

    pub fn merge(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            file_id: self.file_id,
        }
    }
}

/// AST node wrapper that includes span information
#[derive(Debug, Clone, PartialEq)]
pub struct Node<T> {
    pub span: Span,
    pub value: T,
}

impl<T> Node<T> {
    pub fn new(value: T, span: Span) -> Self {
        Self { span, value }
    }
}

/// Identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident {
    pub name: String,
}

impl Ident {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

// =============================================================================
// Module Declarations
// =============================================================================

pub mod types;
pub mod expr;
pub mod stmt;
pub mod decl;
pub mod program;

pub use types::*;
pub use expr::*;
pub use stmt::*;
pub use decl::*;
pub use program::*;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_span() -> Span {
        Span::new(0, 0, 0)
    }

    #[test]
    fn test_span_merge() {
        let a = Span::new(4, 9, 0);
        let b = Span::new(1, 6, 0);
        assert_eq!(a.merge(&b), Span::new(1, 9, 0));
    }

    #[test]
    fn test_pointer_type_display() {
        let ty = TypeExpr::Pointer(Box::new(Node::new(
            TypeExpr::Pointer(Box::new(Node::new(
                TypeExpr::Named(Ident::new("Int")),
                dummy_span(),
            ))),
            dummy_span(),
        )));
        assert_eq!(ty.to_string(), "**Int");
    }

    #[test]
    fn test_binary_op() {
        assert_eq!(BinaryOp::Div.to_string(), "/");
        assert_eq!(BinaryOp::LtEq.to_string(), "<=");
        assert!(BinaryOp::NotEq.is_relational());
        assert!(!BinaryOp::Mul.is_relational());
    }

    #[test]
    fn test_function_decl() {
        let func = FunctionDecl {
            name: Node::new(Ident::new("main"), dummy_span()),
            params: vec![Param {
                name: Node::new(Ident::new("n"), dummy_span()),
                ty: Node::new(TypeExpr::Named(Ident::new("Int")), dummy_span()),
            }],
            return_type: None,
            body: Node::new(BlockStmt { stmts: vec![] }, dummy_span()),
        };

        assert_eq!(func.name.value.name, "main");
        assert_eq!(func.params.len(), 1);
        assert!(func.return_type.is_none());
    }

    #[test]
    fn test_unwrap_parens() {
        let inner = Node::new(Expr::Ident(Ident::new("x")), dummy_span());
        let expr = Expr::Paren(Box::new(Node::new(Expr::Paren(Box::new(inner)), dummy_span())));
        assert!(matches!(expr.unwrap_parens(), Expr::Ident(id) if id.name == "x"));
    }
}
