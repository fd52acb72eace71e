//! X Compiler Driver Library
//!
//! The compilation pipeline behind the `xlang` binary: lex, parse, lower to IR
//! and generate an object file. Every stage reports failures as
//! [`Diagnostic`]s carrying a stable error code and a source span, which the
//! binary renders with `ariadne`.

use thiserror::Error;
use tracing::{debug, info};

use xlang_ast::{Program, Span};
use xlang_codegen::{CodeGenerator, CodegenError};
use xlang_ir::{IrModule, LowerError, LowerOptions, Lowerer};
use xlang_lexer::{Lexer, Token, TokenKind};
use xlang_parser::{ParseError, Parser};

/// Error code for malformed tokens.
pub const LEX_ERROR: &str = "E0001";
/// Error code for syntax errors.
pub const PARSE_ERROR: &str = "E1000";
/// Error code for backend failures.
pub const CODEGEN_ERROR: &str = "E3000";

/// A compiler error ready to be shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{code}] {title}: {message}")]
pub struct Diagnostic {
    pub code: &'static str,
    pub title: &'static str,
    pub message: String,
    /// `None` when the error has no source location (backend failures).
    pub span: Option<Span>,
}

impl Diagnostic {
    fn lexical(token: &Token) -> Self {
        Self {
            code: LEX_ERROR,
            title: "Lexical error",
            message: token.value.clone(),
            span: Some(token.span),
        }
    }
}

impl From<ParseError> for Diagnostic {
    fn from(err: ParseError) -> Self {
        Self {
            code: PARSE_ERROR,
            title: "Parse error",
            message: err.message,
            span: Some(err.span),
        }
    }
}

impl From<LowerError> for Diagnostic {
    fn from(err: LowerError) -> Self {
        Self {
            code: err.kind.code(),
            title: "Semantic error",
            message: err.kind.to_string(),
            span: Some(err.span),
        }
    }
}

impl From<CodegenError> for Diagnostic {
    fn from(err: CodegenError) -> Self {
        Self {
            code: CODEGEN_ERROR,
            title: "Code generation error",
            message: err.message,
            span: None,
        }
    }
}

/// Tokenizes `source`, returning the tokens together with a diagnostic for
/// every malformed one.
pub fn lex(source: &str) -> (Vec<Token>, Vec<Diagnostic>) {
    let tokens = Lexer::new(source).tokenize();
    let errors = tokens
        .iter()
        .filter(|t| t.kind == TokenKind::Error)
        .map(Diagnostic::lexical)
        .collect();
    (tokens, errors)
}

/// Parses `source`. Lexical errors stop the pipeline before parsing.
pub fn parse(source: &str) -> Result<Program, Vec<Diagnostic>> {
    let (tokens, lex_errors) = lex(source);
    if !lex_errors.is_empty() {
        return Err(lex_errors);
    }

    let program = Parser::new(tokens)
        .parse_program()
        .map_err(|errors| errors.into_iter().map(Diagnostic::from).collect::<Vec<_>>())?;
    debug!(items = program.items.len(), "parsed program");
    Ok(program)
}

/// Parses and lowers `source` to a verified IR module.
pub fn lower(source: &str, options: LowerOptions) -> Result<IrModule, Vec<Diagnostic>> {
    let program = parse(source)?;
    let module = Lowerer::new()
        .with_options(options)
        .lower_program(&program)
        .map_err(|err| vec![Diagnostic::from(err)])?;

    module.verify().map_err(|err| {
        vec![Diagnostic {
            code: CODEGEN_ERROR,
            title: "Malformed IR",
            message: err.to_string(),
            span: None,
        }]
    })?;

    info!(
        functions = module.functions.len(),
        globals = module.globals.len(),
        "lowered module"
    );
    Ok(module)
}

/// Generates a native object file for `module`.
pub fn compile_object(module: &IrModule) -> Result<Vec<u8>, Diagnostic> {
    let codegen = CodeGenerator::new()?;
    let bytes = codegen.compile_module(module)?;
    info!(bytes = bytes.len(), "emitted object file");
    Ok(bytes)
}
