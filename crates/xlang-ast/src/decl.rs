//! Declaration definitions for the AST

use super::*;

/// Top-level declaration
#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    /// Function declaration
    Function(FunctionDecl),

    /// Global variable declaration
    Var(VarDecl),
}

/// Variable declaration: `name: Type (= init)?`
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: Node<Ident>,
    pub ty: Node<TypeExpr>,
    pub init: Option<Node<Expr>>,
}

/// Function declaration: `name(params) (-> Type)? { body }`
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Node<Ident>,
    pub params: Vec<Param>,
    /// `None` means the function returns Void
    pub return_type: Option<Node<TypeExpr>>,
    pub body: Node<BlockStmt>,
}

/// Function parameter: `name: Type`
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Node<Ident>,
    pub ty: Node<TypeExpr>,
}
