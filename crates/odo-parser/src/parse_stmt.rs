//! Statement parsing.

use odo_lexer::token::TokenKind;
use odo_types::ast::*;
use odo_types::Result;

use crate::parser::Parser;

impl<'src> Parser<'src> {
    /// Statements up to a closing `}` or the end of input.
    pub(crate) fn parse_statement_list(&mut self) -> Result<Vec<Stmt>> {
        let mut stmts = Vec::new();
        self.skip_separators();
        while !self.check_exact(&TokenKind::RBrace) && !self.at_end() {
            stmts.push(self.parse_statement()?);
            self.expect_terminator()?;
        }
        Ok(stmts)
    }

    /// `{ stmts... }`
    pub(crate) fn parse_block(&mut self) -> Result<Block> {
        let start = self.current_span();
        self.expect(&TokenKind::LBrace)?;
        let stmts = self.parse_statement_list()?;
        self.expect(&TokenKind::RBrace)?;
        Ok(Block {
            stmts,
            span: start.merge(self.previous_span()),
        })
    }

    /// Parse a single statement, without its terminator.
    pub(crate) fn parse_statement(&mut self) -> Result<Stmt> {
        let start = self.current_span();
        let kind = match self.peek_kind() {
            TokenKind::Var | TokenKind::Const => StmtKind::VarDecl(self.parse_var_decl()?),
            TokenKind::If => {
                self.advance();
                StmtKind::If(self.parse_if()?)
            }
            TokenKind::LBrace => StmtKind::Block(self.parse_block()?),
            TokenKind::Loop => {
                self.advance();
                self.skip_newlines();
                StmtKind::Loop(self.parse_block()?)
            }
            TokenKind::While => {
                self.advance();
                let cond = self.parse_expression()?;
                self.skip_newlines();
                let body = self.parse_block()?;
                StmtKind::While { cond, body }
            }
            TokenKind::Forange => StmtKind::Forange(self.parse_forange()?),
            // `func (` starts an anonymous function expression.
            TokenKind::Func if !matches!(self.look_ahead_kind(1), TokenKind::LParen) => {
                StmtKind::Func(self.parse_func_decl()?.into())
            }
            TokenKind::Break => {
                self.advance();
                StmtKind::Break
            }
            TokenKind::Continue => {
                self.advance();
                StmtKind::Continue
            }
            TokenKind::Return => {
                self.advance();
                let value = if self.peek_kind().closes_statement() {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                StmtKind::Return(value)
            }
            TokenKind::Module => StmtKind::Module(self.parse_module()?.into()),
            TokenKind::Enum => StmtKind::Enum(self.parse_enum()?),
            _ => StmtKind::Expr(self.parse_expression()?),
        };
        Ok(Stmt::new(kind, start.merge(self.previous_span())))
    }

    /// `if` has been consumed: `cond { } [else if ... | else { }]`
    fn parse_if(&mut self) -> Result<IfStmt> {
        let cond = self.parse_expression()?;
        self.skip_newlines();
        let then_block = self.parse_block()?;

        let else_branch = if self.check_after_newlines(&TokenKind::Else) {
            self.advance();
            self.skip_newlines();
            if self.eat(&TokenKind::If) {
                Some(ElseBranch::ElseIf(Box::new(self.parse_if()?)))
            } else {
                Some(ElseBranch::Block(self.parse_block()?))
            }
        } else {
            None
        };

        Ok(IfStmt {
            cond,
            then_block,
            else_branch,
        })
    }

    /// `forange [(] [id] [~] : first [, second] [)] { ... }`
    fn parse_forange(&mut self) -> Result<Forange> {
        self.advance(); // eat `forange`
        let parenthesized = self.eat(&TokenKind::LParen);
        self.skip_newlines();

        let ident = match self.peek_kind() {
            TokenKind::Identifier(_) => Some(self.expect_identifier()?),
            _ => None,
        };
        self.skip_newlines();
        let reversed = self.eat(&TokenKind::Tilde);
        self.skip_newlines();
        self.expect(&TokenKind::Colon)?;
        self.skip_newlines();

        let first = self.parse_expression()?;
        let second = if self.eat(&TokenKind::Comma) {
            self.skip_newlines();
            Some(self.parse_expression()?)
        } else {
            None
        };

        if parenthesized {
            self.skip_newlines();
            self.expect(&TokenKind::RParen)?;
        }
        self.skip_newlines();
        let body = self.parse_block()?;

        Ok(Forange {
            ident,
            reversed,
            first,
            second,
            body,
        })
    }
}
