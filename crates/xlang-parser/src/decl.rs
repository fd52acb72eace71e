//! Declaration parsing

use super::*;

impl Parser {
    /// Parses `name: Type (= init)?` or `name(params) (-> Type)? { ... }`.
    pub(crate) fn parse_declaration(&mut self) -> ParseResult<Node<Decl>> {
        let start = self.current_token().span;

        let decl = match self.peek_kind(1) {
            Some(TokenKind::LParen) if self.check(&TokenKind::Identifier) => {
                Decl::Function(self.parse_function_declaration()?)
            }
            Some(TokenKind::Colon) if self.check(&TokenKind::Identifier) => {
                let var = self.parse_var_declaration()?;
                self.consume_semicolon();
                Decl::Var(var)
            }
            _ => {
                return Err(self.error(format!(
                    "Expected a function or variable declaration, found {}",
                    self.describe_current()
                )))
            }
        };

        let span = start.merge(&self.previous_token().span);
        Ok(Node::new(decl, span))
    }

    pub(crate) fn parse_function_declaration(&mut self) -> ParseResult<FunctionDecl> {
        let name = self.parse_identifier()?;

        self.consume(TokenKind::LParen)?;
        let params = self.parse_function_params()?;
        self.consume(TokenKind::RParen)?;

        let return_type = if self.check(&TokenKind::Arrow) {
            self.advance();
            Some(self.parse_type()?)
        } else {
            None
        };

        let body = self.parse_block_statement()?;

        Ok(FunctionDecl {
            name,
            params,
            return_type,
            body,
        })
    }

    pub(crate) fn parse_var_declaration(&mut self) -> ParseResult<VarDecl> {
        let name = self.parse_identifier()?;
        self.consume(TokenKind::Colon)?;
        let ty = self.parse_type()?;

        let init = if self.check(&TokenKind::Eq) {
            self.advance();
            Some(self.parse_expression()?)
        } else {
            None
        };

        Ok(VarDecl { name, ty, init })
    }
}
