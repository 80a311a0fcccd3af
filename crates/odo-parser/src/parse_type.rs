//! Type annotation parsing.
//!
//! ```text
//! Type         = QualifiedName | FunctionType
//! FunctionType = "<" [ Type ["?"] { "," Type ["?"] } ] ":" [ Type ] ">"
//! ```

use odo_lexer::token::TokenKind;
use odo_types::ast::*;
use odo_types::Result;

use crate::parser::Parser;

impl<'src> Parser<'src> {
    pub(crate) fn parse_type(&mut self) -> Result<TypeAnnotation> {
        self.skip_newlines();
        match self.peek_kind() {
            TokenKind::Identifier(_) => self.parse_named_type(),
            TokenKind::Less => self.parse_function_type(),
            _ => Err(self.unexpected("a type")),
        }
    }

    /// `name` or `outer::Name`
    fn parse_named_type(&mut self) -> Result<TypeAnnotation> {
        let first = self.expect_identifier()?;
        let start = first.span;
        let mut path = vec![first];
        while self.eat(&TokenKind::ColonColon) {
            path.push(self.expect_identifier()?);
        }
        Ok(TypeAnnotation {
            kind: TypeAnnotationKind::Named(path),
            span: start.merge(self.previous_span()),
        })
    }

    /// `<int, double?: text>`; `<:>` takes nothing and returns nothing.
    fn parse_function_type(&mut self) -> Result<TypeAnnotation> {
        let start = self.current_span();
        self.expect(&TokenKind::Less)?;
        self.skip_newlines();

        let mut params = Vec::new();
        while !self.check_exact(&TokenKind::Colon) {
            if !params.is_empty() {
                self.expect(&TokenKind::Comma)?;
                self.skip_newlines();
            }
            let ty = self.parse_type()?;
            self.skip_newlines();
            let optional = self.eat(&TokenKind::Question);
            self.skip_newlines();
            params.push(FunctionTypeParam { ty, optional });
        }
        self.expect(&TokenKind::Colon)?;
        self.skip_newlines();

        let ret = if self.check_exact(&TokenKind::Greater) {
            None
        } else {
            let ret = self.parse_type()?;
            self.skip_newlines();
            Some(Box::new(ret))
        };
        self.expect(&TokenKind::Greater)?;

        Ok(TypeAnnotation {
            kind: TypeAnnotationKind::Function { params, ret },
            span: start.merge(self.previous_span()),
        })
    }
}
