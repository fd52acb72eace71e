//! Expression parsing

use super::*;

/// Binding power of the prefix operators `-`, `&` and `*`.
const PREFIX_PRECEDENCE: u8 = 4;

impl Parser {
    pub(crate) fn parse_expression(&mut self) -> ParseResult<Node<Expr>> {
        self.parse_expression_with_precedence(1)
    }

    pub(crate) fn parse_expression_with_precedence(&mut self, min_precedence: u8) -> ParseResult<Node<Expr>> {
        let mut left = self.parse_prefix_expression()?;

        loop {
            let precedence = self.get_infix_precedence();

            if precedence == 0 || precedence < min_precedence {
                break;
            }

            left = self.parse_infix_expression(left)?;
        }

        Ok(left)
    }

    fn parse_prefix_expression(&mut self) -> ParseResult<Node<Expr>> {
        let start = self.current_token().span;

        let expr = match self.current_token().kind {
            TokenKind::Minus => {
                self.advance();
                let expr = Box::new(self.parse_expression_with_precedence(PREFIX_PRECEDENCE)?);
                Expr::Unary {
                    op: UnaryOp::Minus,
                    expr,
                }
            }
            TokenKind::Amp => {
                self.advance();
                Expr::AddrOf(Box::new(self.parse_expression_with_precedence(PREFIX_PRECEDENCE)?))
            }
            TokenKind::Star => {
                self.advance();
                Expr::Deref(Box::new(self.parse_expression_with_precedence(PREFIX_PRECEDENCE)?))
            }
            _ => return self.parse_primary_expression(),
        };

        let span = start.merge(&self.previous_token().span);
        Ok(Node::new(expr, span))
    }

    fn parse_infix_expression(&mut self, left: Node<Expr>) -> ParseResult<Node<Expr>> {
        let start = left.span;
        let precedence = self.get_infix_precedence();
        let op = self.parse_binary_operator()?;
        let right = Box::new(self.parse_expression_with_precedence(precedence + 1)?);

        let span = start.merge(&self.previous_token().span);
        Ok(Node::new(
            Expr::Binary {
                left: Box::new(left),
                op,
                right,
            },
            span,
        ))
    }

    fn parse_primary_expression(&mut self) -> ParseResult<Node<Expr>> {
        let start = self.current_token().span;

        let expr = match self.current_token().kind {
            TokenKind::IntLiteral => {
                let token = self.advance();
                let value = token.value.parse::<u64>().map_err(|_| ParseError {
                    message: format!("Invalid integer literal: {}", token.value),
                    span: token.span,
                })?;
                Expr::Literal(value)
            }
            TokenKind::Identifier => {
                let name = self.parse_identifier()?;
                if self.check(&TokenKind::LParen) {
                    self.advance();
                    let args = self.parse_arguments()?;
                    self.consume(TokenKind::RParen)?;
                    Expr::Call { callee: name, args }
                } else {
                    Expr::Ident(name.value)
                }
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.consume(TokenKind::RParen)?;
                Expr::Paren(Box::new(inner))
            }
            _ => return Err(self.error(format!("Expected expression, found {}", self.describe_current()))),
        };

        let span = start.merge(&self.previous_token().span);
        Ok(Node::new(expr, span))
    }

    fn parse_arguments(&mut self) -> ParseResult<Vec<Node<Expr>>> {
        let mut args = Vec::new();

        while !self.check(&TokenKind::RParen) && !self.is_at_end() {
            args.push(self.parse_expression()?);
            if !self.check(&TokenKind::RParen) {
                self.consume(TokenKind::Comma)?;
            }
        }

        Ok(args)
    }

    fn parse_binary_operator(&mut self) -> ParseResult<BinaryOp> {
        let op = match self.current_token().kind {
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Sub,
            TokenKind::Star => BinaryOp::Mul,
            TokenKind::Slash => BinaryOp::Div,
            TokenKind::EqEq => BinaryOp::Eq,
            TokenKind::BangEq => BinaryOp::NotEq,
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::LtEq => BinaryOp::LtEq,
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::GtEq => BinaryOp::GtEq,
            _ => return Err(self.error("Expected binary operator".to_string())),
        };
        self.advance();
        Ok(op)
    }

    pub(crate) fn get_infix_precedence(&self) -> u8 {
        match self.current_token().kind {
            TokenKind::EqEq
            | TokenKind::BangEq
            | TokenKind::Lt
            | TokenKind::Gt
            | TokenKind::LtEq
            | TokenKind::GtEq => 1,
            TokenKind::Plus | TokenKind::Minus => 2,
            TokenKind::Star | TokenKind::Slash => 3,
            _ => 0,
        }
    }
}
