//! Helper methods and utilities

use super::*;

impl Parser {
    pub(crate) fn parse_identifier(&mut self) -> ParseResult<Node<Ident>> {
        let token = self.consume(TokenKind::Identifier)?;
        Ok(Node::new(Ident::new(token.value.clone()), token.span))
    }

    pub(crate) fn parse_function_params(&mut self) -> ParseResult<Vec<Param>> {
        let mut params = Vec::new();

        while !self.check(&TokenKind::RParen) && !self.is_at_end() {
            let name = self.parse_identifier()?;
            self.consume(TokenKind::Colon)?;
            let ty = self.parse_type()?;
            params.push(Param { name, ty });

            if !self.check(&TokenKind::RParen) {
                self.consume(TokenKind::Comma)?;
            }
        }

        Ok(params)
    }

    // =========================================================================
    // Utility Methods (Token Manipulation)
    // =========================================================================

    pub(crate) fn current_token(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    pub(crate) fn previous_token(&self) -> &Token {
        &self.tokens[(self.current.saturating_sub(1)).min(self.tokens.len() - 1)]
    }

    pub(crate) fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous_token()
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        !self.is_at_end() && &self.current_token().kind == kind
    }

    pub(crate) fn peek_kind(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.current + offset).map(|t| &t.kind)
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.current >= self.tokens.len() || self.current_token().kind == TokenKind::Eof
    }

    pub(crate) fn consume(&mut self, kind: TokenKind) -> ParseResult<&Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.error(format!("Expected {:?}, found {}", kind, self.describe_current())))
        }
    }

    pub(crate) fn consume_semicolon(&mut self) {
        if self.check(&TokenKind::Semicolon) {
            self.advance();
        }
    }

    /// Describes the current token for diagnostics; lexer errors carry their own message.
    pub(crate) fn describe_current(&self) -> String {
        let token = self.current_token();
        match token.kind {
            TokenKind::Eof => "end of file".to_string(),
            TokenKind::Error => token.value.clone(),
            _ => format!("'{}'", token.value),
        }
    }

    pub(crate) fn error(&self, message: String) -> ParseError {
        ParseError {
            message,
            span: self.current_token().span,
        }
    }

    /// Skips to the start of the next top-level declaration.
    pub(crate) fn synchronize_declaration(&mut self) {
        self.advance();

        while !self.is_at_end() {
            let at_boundary = matches!(
                self.previous_token().kind,
                TokenKind::Semicolon | TokenKind::RBrace
            );
            let starts_decl = self.check(&TokenKind::Identifier)
                && matches!(self.peek_kind(1), Some(TokenKind::LParen) | Some(TokenKind::Colon));

            if at_boundary && starts_decl {
                return;
            }

            self.advance();
        }
    }
}
