use xlang_ast::Span;
use crate::token::{Token, TokenKind};

/// The lexer/tokenizer for X source text.
pub struct Lexer<'a> {
    source: &'a str,
    chars: std::str::CharIndices<'a>,
    current_pos: usize,
    current_char: Option<char>,
    file_id: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer from source code.
    pub fn new(source: &'a str) -> Self {
        Self::with_file_id(source, 0)
    }

    /// Creates a new lexer with a specific file ID.
    pub fn with_file_id(source: &'a str, file_id: usize) -> Self {
        let mut chars = source.char_indices();
        let current_char = chars.next().map(|(_, c)| c);
        Self {
            source,
            chars,
            current_pos: 0,
            current_char,
            file_id,
        }
    }

    /// Tokenizes the entire source code and returns all tokens.
    ///
    /// The last token is always `Eof`. Lexical errors are reported in-band as
    /// `TokenKind::Error` tokens whose value is the message.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    /// Gets the next token from the source.
    pub fn next_token(&mut self) -> Token {
        if let Some(error_token) = self.skip_whitespace_and_comments() {
            return error_token;
        }

        let start = self.current_pos;

        match self.current_char {
            None => Token::new(TokenKind::Eof, Span::new(start, start, self.file_id), String::new()),
            Some(ch) => match ch {
                '0'..='9' => self.read_number(),

                'a'..='z' | 'A'..='Z' | '_' => self.read_identifier_or_keyword(),

                '-' => {
                    self.advance();
                    if self.current_char == Some('>') {
                        self.advance();
                        self.token(TokenKind::Arrow, start, "->")
                    } else {
                        self.token(TokenKind::Minus, start, "-")
                    }
                }
                '=' => {
                    self.advance();
                    if self.current_char == Some('=') {
                        self.advance();
                        self.token(TokenKind::EqEq, start, "==")
                    } else {
                        self.token(TokenKind::Eq, start, "=")
                    }
                }
                '!' => {
                    self.advance();
                    if self.current_char == Some('=') {
                        self.advance();
                        self.token(TokenKind::BangEq, start, "!=")
                    } else {
                        Token::new(
                            TokenKind::Error,
                            Span::new(start, self.current_pos, self.file_id),
                            "Unexpected character: !".to_string(),
                        )
                    }
                }
                '<' => {
                    self.advance();
                    if self.current_char == Some('=') {
                        self.advance();
                        self.token(TokenKind::LtEq, start, "<=")
                    } else {
                        self.token(TokenKind::Lt, start, "<")
                    }
                }
                '>' => {
                    self.advance();
                    if self.current_char == Some('=') {
                        self.advance();
                        self.token(TokenKind::GtEq, start, ">=")
                    } else {
                        self.token(TokenKind::Gt, start, ">")
                    }
                }

                '+' => self.single(TokenKind::Plus, start, "+"),
                '*' => self.single(TokenKind::Star, start, "*"),
                '/' => self.single(TokenKind::Slash, start, "/"),
                '&' => self.single(TokenKind::Amp, start, "&"),
                '(' => self.single(TokenKind::LParen, start, "("),
                ')' => self.single(TokenKind::RParen, start, ")"),
                '{' => self.single(TokenKind::LBrace, start, "{"),
                '}' => self.single(TokenKind::RBrace, start, "}"),
                ';' => self.single(TokenKind::Semicolon, start, ";"),
                ',' => self.single(TokenKind::Comma, start, ","),
                ':' => self.single(TokenKind::Colon, start, ":"),

                _ => {
                    self.advance();
                    Token::new(
                        TokenKind::Error,
                        Span::new(start, self.current_pos, self.file_id),
                        format!("Unexpected character: {}", ch),
                    )
                }
            },
        }
    }

    // Helper methods

    fn advance(&mut self) {
        if let Some((pos, ch)) = self.chars.next() {
            self.current_pos = pos;
            self.current_char = Some(ch);
        } else {
            self.current_pos = self.source.len();
            self.current_char = None;
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.clone().next().map(|(_, c)| c)
    }

    fn token(&self, kind: TokenKind, start: usize, text: &str) -> Token {
        Token::new(kind, Span::new(start, self.current_pos, self.file_id), text.to_string())
    }

    /// Consumes one character and produces a token of the given kind.
    fn single(&mut self, kind: TokenKind, start: usize, text: &str) -> Token {
        self.advance();
        self.token(kind, start, text)
    }

    fn skip_whitespace_and_comments(&mut self) -> Option<Token> {
        loop {
            match self.current_char {
                Some(ch) if ch.is_whitespace() => {
                    self.advance();
                }
                Some('/') => {
                    if self.peek() == Some('/') {
                        self.skip_single_line_comment();
                    } else if self.peek() == Some('*') {
                        let start = self.current_pos;
                        if !self.skip_multi_line_comment() {
                            return Some(Token::new(
                                TokenKind::Error,
                                Span::new(start, self.current_pos, self.file_id),
                                "Unterminated multi-line comment".to_string(),
                            ));
                        }
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
        None
    }

    fn skip_single_line_comment(&mut self) {
        // Skip //
        self.advance();
        self.advance();

        while let Some(ch) = self.current_char {
            if ch == '\n' {
                self.advance();
                break;
            }
            self.advance();
        }
    }

    fn skip_multi_line_comment(&mut self) -> bool {
        // Skip /*
        self.advance();
        self.advance();

        while let Some(ch) = self.current_char {
            if ch == '*' && self.peek() == Some('/') {
                self.advance(); // *
                self.advance(); // /
                return true;
            }
            self.advance();
        }
        false // Unterminated
    }

    fn read_number(&mut self) -> Token {
        let start = self.current_pos;
        let mut value = String::new();

        while let Some(ch) = self.current_char {
            if ch.is_ascii_digit() {
                value.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if value.parse::<u64>().is_err() {
            return Token::new(
                TokenKind::Error,
                Span::new(start, self.current_pos, self.file_id),
                format!("Integer literal out of range: {}", value),
            );
        }

        Token::new(TokenKind::IntLiteral, Span::new(start, self.current_pos, self.file_id), value)
    }

    fn read_identifier_or_keyword(&mut self) -> Token {
        let start = self.current_pos;
        let mut value = String::new();

        while let Some(ch) = self.current_char {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                value.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let kind = match value.as_str() {
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "return" => TokenKind::Return,
            _ => TokenKind::Identifier,
        };

        Token::new(kind, Span::new(start, self.current_pos, self.file_id), value)
    }
}
