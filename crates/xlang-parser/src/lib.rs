//! # X Parser
//!
//! Recursive descent parser for the X language.
//! Uses Pratt parsing for binary expressions with three precedence levels.

use xlang_ast::*;
use xlang_lexer::{Token, TokenKind};

// Module declarations
mod error;
mod parser;
mod expr;
mod stmt;
mod types;
mod decl;
mod helpers;

// Re-export public types
pub use error::{ParseError, ParseResult};
pub use parser::Parser;

/// Tokenizes and parses `source` in one step.
pub fn parse_source(source: &str) -> Result<Program, Vec<ParseError>> {
    let tokens = xlang_lexer::Lexer::new(source).tokenize();
    Parser::new(tokens).parse_program()
}

// =============================================================================
// Tests
// =============================================================================
