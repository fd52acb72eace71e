//! Statement parsing

use super::*;

impl Parser {
    pub(crate) fn parse_statement(&mut self) -> ParseResult<Node<Stmt>> {
        let start = self.current_token().span;

        let stmt = match self.current_token().kind {
            TokenKind::LBrace => Stmt::Block(self.parse_block_statement()?.value),
            TokenKind::If => self.parse_if_statement()?,
            TokenKind::While => self.parse_while_statement()?,
            TokenKind::Return => self.parse_return_statement()?,
            TokenKind::Identifier if self.peek_kind(1) == Some(&TokenKind::Colon) => {
                Stmt::VarDecl(self.parse_var_declaration()?)
            }
            TokenKind::Identifier if self.peek_kind(1) == Some(&TokenKind::Eq) => {
                let target = self.parse_identifier()?;
                self.consume(TokenKind::Eq)?;
                let value = self.parse_expression()?;
                Stmt::Assign { target, value }
            }
            _ => Stmt::Expr(self.parse_expression()?),
        };

        let span = start.merge(&self.previous_token().span);
        self.consume_semicolon();
        Ok(Node::new(stmt, span))
    }

    pub(crate) fn parse_block_statement(&mut self) -> ParseResult<Node<BlockStmt>> {
        let start = self.current_token().span;
        self.consume(TokenKind::LBrace)?;

        let mut stmts = Vec::new();

        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            stmts.push(self.parse_statement()?);
        }

        self.consume(TokenKind::RBrace)?;
        let span = start.merge(&self.previous_token().span);

        Ok(Node::new(BlockStmt { stmts }, span))
    }

    fn parse_if_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::If)?;
        let condition = self.parse_expression()?;

        let then_stmt = Box::new(self.parse_statement()?);

        let else_stmt = if self.check(&TokenKind::Else) {
            self.advance();
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_stmt,
            else_stmt,
        })
    }

    fn parse_while_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::While)?;
        let condition = self.parse_expression()?;
        let body = Box::new(self.parse_statement()?);

        Ok(Stmt::While { condition, body })
    }

    fn parse_return_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::Return)?;

        let value = if self.current_token().kind.starts_expression() {
            Some(self.parse_expression()?)
        } else {
            None
        };

        Ok(Stmt::Return(value))
    }
}
