//! Type annotation parsing

use super::*;

impl Parser {
    /// Parses `Int`, `*T`, `Pointer<T>` or any other name (rejected later).
    pub(crate) fn parse_type(&mut self) -> ParseResult<Node<TypeExpr>> {
        let start = self.current_token().span;

        let ty = match self.current_token().kind {
            TokenKind::Star => {
                self.advance();
                TypeExpr::Pointer(Box::new(self.parse_type()?))
            }
            TokenKind::Identifier
                if self.current_token().value == "Pointer" && self.peek_kind(1) == Some(&TokenKind::Lt) =>
            {
                self.advance(); // Pointer
                self.advance(); // <
                let pointee = self.parse_type()?;
                self.consume(TokenKind::Gt)?;
                TypeExpr::Pointer(Box::new(pointee))
            }
            TokenKind::Identifier => {
                let name = self.parse_identifier()?;
                TypeExpr::Named(name.value)
            }
            _ => return Err(self.error(format!("Expected type, found {}", self.describe_current()))),
        };

        let span = start.merge(&self.previous_token().span);
        Ok(Node::new(ty, span))
    }
}
