//! Lowering errors.

use thiserror::Error;
use xlang_ast::Span;

/// What went wrong while lowering. Every kind is fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LowerErrorKind {
    #[error("undeclared identifier `{name}`")]
    UndeclaredIdentifier { name: String },

    #[error("unknown type `{name}`")]
    UnknownType { name: String },

    #[error("type mismatch in {context}: expected {expected}, found {found}")]
    TypeMismatch {
        context: String,
        expected: String,
        found: String,
    },

    #[error("`{callee}` takes {expected} argument(s) but {found} were supplied")]
    ArityMismatch {
        callee: String,
        expected: usize,
        found: usize,
    },

    #[error("`{name}` is not a function")]
    NotCallable { name: String },

    #[error("unsupported lvalue: {what}")]
    UnsupportedLValue { what: String },

    #[error("function `{function}` may reach the end of its body without returning a value")]
    MissingReturn { function: String },

    #[error("`{name}` is already declared in this scope")]
    DuplicateDeclaration { name: String },

    #[error("initializer of global `{name}` is not a constant expression")]
    NonConstantInitializer { name: String },
}

impl LowerErrorKind {
    /// Stable diagnostic code for this kind.
    pub fn code(&self) -> &'static str {
        match self {
            LowerErrorKind::UndeclaredIdentifier { .. } => "E2001",
            LowerErrorKind::UnknownType { .. } => "E2002",
            LowerErrorKind::TypeMismatch { .. } => "E2003",
            LowerErrorKind::ArityMismatch { .. } => "E2004",
            LowerErrorKind::NotCallable { .. } => "E2005",
            LowerErrorKind::UnsupportedLValue { .. } => "E2006",
            LowerErrorKind::MissingReturn { .. } => "E2007",
            LowerErrorKind::DuplicateDeclaration { .. } => "E2008",
            LowerErrorKind::NonConstantInitializer { .. } => "E2009",
        }
    }

    pub(crate) fn mismatch(context: impl Into<String>, expected: impl ToString, found: impl ToString) -> Self {
        LowerErrorKind::TypeMismatch {
            context: context.into(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}

/// A lowering error with the location of the node that triggered it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct LowerError {
    pub kind: LowerErrorKind,
    pub span: Span,
}

impl LowerError {
    pub fn new(kind: LowerErrorKind, span: Span) -> Self {
        Self { kind, span }
    }
}
