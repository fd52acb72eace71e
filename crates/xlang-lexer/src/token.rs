use xlang_ast::Span;

/// Represents the different kinds of tokens in X.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    // Keywords
    If,
    Else,
    While,
    Return,

    // Literals
    IntLiteral,

    // Identifier (type names such as `Int` and `Pointer` included)
    Identifier,

    // Operators
    Plus,              // +
    Minus,             // -
    Star,              // *
    Slash,             // /
    Eq,                // =
    EqEq,              // ==
    BangEq,            // !=
    Lt,                // <
    Gt,                // >
    LtEq,              // <=
    GtEq,              // >=
    Amp,               // &
    Arrow,             // ->

    // Delimiters
    LParen,            // (
    RParen,            // )
    LBrace,            // {
    RBrace,            // }
    Semicolon,         // ;
    Comma,             // ,
    Colon,             // :

    // Special
    Eof,
    Error,
}

impl TokenKind {
    /// Returns true if a token of this kind can begin an expression.
    pub fn starts_expression(&self) -> bool {
        matches!(
            self,
            TokenKind::IntLiteral
                | TokenKind::Identifier
                | TokenKind::LParen
                | TokenKind::Minus
                | TokenKind::Star
                | TokenKind::Amp
        )
    }
}

/// Represents a token with its kind, span, and value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub value: String,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span, value: String) -> Self {
        Self { kind, span, value }
    }
}
