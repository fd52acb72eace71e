//! Statement definitions for the AST

use super::*;

/// Statement
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Variable declaration: name: Type = value
    VarDecl(VarDecl),

    /// Block statement: { stmts }
    Block(BlockStmt),

    /// If statement
    If {
        condition: Node<Expr>,
        then_stmt: Box<Node<Stmt>>,
        else_stmt: Option<Box<Node<Stmt>>>,
    },

    /// While statement
    While {
        condition: Node<Expr>,
        body: Box<Node<Stmt>>,
    },

    /// Return statement
    Return(Option<Node<Expr>>),

    /// Assignment: name = value
    Assign {
        target: Node<Ident>,
        value: Node<Expr>,
    },

    /// Expression statement (value discarded)
    Expr(Node<Expr>),
}

/// Block statement
#[derive(Debug, Clone, PartialEq)]
pub struct BlockStmt {
    pub stmts: Vec<Node<Stmt>>,
}
