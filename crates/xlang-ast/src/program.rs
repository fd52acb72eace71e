//! Compilation unit root

use super::*;

/// A parsed source file: a sequence of top-level declarations in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub items: Vec<Node<Decl>>,
    pub span: Span,
}

impl Program {
    /// Iterates over the function declarations in source order.
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDecl> {
        self.items.iter().filter_map(|item| match &item.value {
            Decl::Function(func) => Some(func),
            Decl::Var(_) => None,
        })
    }
}
