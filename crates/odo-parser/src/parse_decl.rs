//! Declaration parsing: variables, functions, modules and enums.

use odo_lexer::token::TokenKind;
use odo_types::ast::*;
use odo_types::{Result, Span};

use crate::parser::Parser;

impl<'src> Parser<'src> {
    /// `var name [: Type] [= expr]` or `const name [: Type] [= expr]`
    ///
    /// A constant without a type annotation must be initialized.
    pub(crate) fn parse_var_decl(&mut self) -> Result<VarDecl> {
        let constant = self.advance().kind == TokenKind::Const;
        let name = self.expect_identifier()?;
        let ty = if self.eat(&TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };

        let init = if constant && ty.is_none() {
            self.expect(&TokenKind::Eq)?;
            self.skip_newlines();
            Some(self.parse_expression()?)
        } else {
            self.parse_initializer()?
        };

        Ok(VarDecl {
            name,
            ty,
            init,
            constant,
        })
    }

    /// `[= expr]`
    fn parse_initializer(&mut self) -> Result<Option<Expr>> {
        if self.eat(&TokenKind::Eq) {
            self.skip_newlines();
            Ok(Some(self.parse_expression()?))
        } else {
            Ok(None)
        }
    }

    /// `name [: Type] [= default]`
    fn parse_param(&mut self) -> Result<VarDecl> {
        let name = self.expect_identifier()?;
        let ty = if self.eat(&TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let init = self.parse_initializer()?;
        Ok(VarDecl {
            name,
            ty,
            init,
            constant: false,
        })
    }

    /// `func name(params) [: R] { body }`
    pub(crate) fn parse_func_decl(&mut self) -> Result<FuncDecl> {
        let start = self.current_span();
        self.advance(); // eat `func`
        self.skip_newlines();
        let name = self.expect_identifier()?;
        self.parse_func_rest(Some(name), start)
    }

    /// `func (params) [: R] { body }` used as an expression.
    pub(crate) fn parse_func_literal(&mut self) -> Result<FuncDecl> {
        let start = self.current_span();
        self.advance(); // eat `func`
        self.parse_func_rest(None, start)
    }

    fn parse_func_rest(&mut self, name: Option<Ident>, start: Span) -> Result<FuncDecl> {
        self.skip_newlines();
        self.expect(&TokenKind::LParen)?;
        self.skip_newlines();

        let mut params = Vec::new();
        while !self.check_exact(&TokenKind::RParen) {
            params.push(self.parse_param()?);
            self.skip_newlines();
            if !self.check_exact(&TokenKind::RParen) {
                self.expect(&TokenKind::Comma)?;
                self.skip_newlines();
            }
        }
        self.expect(&TokenKind::RParen)?;

        let ret = if self.eat(&TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        self.skip_newlines();
        let body = self.parse_block()?;

        Ok(FuncDecl {
            name,
            params,
            ret,
            body,
            span: start.merge(self.previous_span()),
        })
    }

    /// `module Name { stmts }`
    pub(crate) fn parse_module(&mut self) -> Result<ModuleDecl> {
        let start = self.current_span();
        self.advance(); // eat `module`
        self.skip_newlines();
        let name = self.expect_identifier()?;
        self.skip_newlines();
        let block = self.parse_block()?;
        Ok(ModuleDecl {
            name,
            body: block.stmts,
            span: start.merge(self.previous_span()),
        })
    }

    /// `enum Name { A B C }`, cases optionally separated by newlines, `;` or `,`.
    pub(crate) fn parse_enum(&mut self) -> Result<EnumDecl> {
        self.advance(); // eat `enum`
        self.skip_newlines();
        let name = self.expect_identifier()?;
        self.skip_newlines();
        self.expect(&TokenKind::LBrace)?;
        self.skip_separators();

        let mut cases = Vec::new();
        while !self.check_exact(&TokenKind::RBrace) {
            cases.push(self.expect_identifier()?);
            self.eat(&TokenKind::Comma);
            self.skip_separators();
        }
        self.expect(&TokenKind::RBrace)?;

        Ok(EnumDecl { name, cases })
    }
}
