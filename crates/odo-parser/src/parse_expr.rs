//! Expression parsing with full operator precedence.
//!
//! Precedence (lowest → highest):
//! 8. `=` (assignment, only onto a variable or `a::b`)
//! 7. `? :` (ternary)
//! 6. `or`
//! 5. `and`
//! 4. `==`, `!=`
//! 3. `<`, `<=`, `>`, `>=`
//! 2. `+`, `-`
//! 1. `*`, `/`
//! 0. unary `+`, `-`, then postfix call `f(...)` and static access `a::b`

use std::cell::Cell;

use odo_lexer::token::TokenKind;
use odo_types::ast::*;
use odo_types::{ensure_sufficient_stack, OdoError, Result};

use crate::parser::Parser;

fn binary(left: Expr, op: BinOp, right: Expr) -> Expr {
    let span = left.span.merge(right.span);
    Expr::new(
        ExprKind::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
        span,
    )
}

impl<'src> Parser<'src> {
    // ══════════════════════════════════════════════════════════════════════════
    // Entry Point
    // ══════════════════════════════════════════════════════════════════════════

    /// Parse an expression, including a trailing assignment.
    pub(crate) fn parse_expression(&mut self) -> Result<Expr> {
        ensure_sufficient_stack(|| self.parse_assignment())
    }

    fn parse_assignment(&mut self) -> Result<Expr> {
        let target = self.parse_ternary()?;
        if !self.check_exact(&TokenKind::Eq) {
            return Ok(target);
        }
        if !matches!(
            target.kind,
            ExprKind::Variable(_) | ExprKind::StaticAccess { .. }
        ) {
            return Err(OdoError::syntax("Invalid assignment to non-variable.").with_span(target.span));
        }
        self.advance(); // eat `=`
        self.skip_newlines();
        let value = self.parse_expression()?;
        let span = target.span.merge(value.span);
        Ok(Expr::new(
            ExprKind::Assign {
                target: Box::new(target),
                value: Box::new(value),
            },
            span,
        ))
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Precedence Chain
    // ══════════════════════════════════════════════════════════════════════════

    /// `Ternary = Or [ "?" Or ":" Ternary ]`
    fn parse_ternary(&mut self) -> Result<Expr> {
        let cond = self.parse_or()?;
        if !self.eat(&TokenKind::Question) {
            return Ok(cond);
        }
        self.skip_newlines();
        let then_expr = self.parse_or()?;
        self.skip_newlines();
        self.expect(&TokenKind::Colon)?;
        self.skip_newlines();
        let else_expr = ensure_sufficient_stack(|| self.parse_ternary())?;
        let span = cond.span.merge(else_expr.span);
        Ok(Expr::new(
            ExprKind::Ternary {
                cond: Box::new(cond),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
                result_ty: Cell::new(None),
            },
            span,
        ))
    }

    /// `Or = And { "or" And }`
    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.eat(&TokenKind::Or) {
            self.skip_newlines();
            let right = self.parse_and()?;
            left = binary(left, BinOp::Or, right);
        }
        Ok(left)
    }

    /// `And = Equality { "and" Equality }`
    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_equality()?;
        while self.eat(&TokenKind::And) {
            self.skip_newlines();
            let right = self.parse_equality()?;
            left = binary(left, BinOp::And, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr> {
        let mut left = self.parse_relation()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::EqEq => BinOp::Eq,
                TokenKind::BangEq => BinOp::NotEq,
                _ => return Ok(left),
            };
            self.advance();
            self.skip_newlines();
            let right = self.parse_relation()?;
            left = binary(left, op, right);
        }
    }

    fn parse_relation(&mut self) -> Result<Expr> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Less => BinOp::Less,
                TokenKind::LessEq => BinOp::LessEq,
                TokenKind::Greater => BinOp::Greater,
                TokenKind::GreaterEq => BinOp::GreaterEq,
                _ => return Ok(left),
            };
            self.advance();
            self.skip_newlines();
            let right = self.parse_additive()?;
            left = binary(left, op, right);
        }
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            self.skip_newlines();
            let right = self.parse_multiplicative()?;
            left = binary(left, op, right);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                _ => return Ok(left),
            };
            self.advance();
            self.skip_newlines();
            let right = self.parse_unary()?;
            left = binary(left, op, right);
        }
    }

    /// `Unary = ("+" | "-") Unary | Postfix`
    fn parse_unary(&mut self) -> Result<Expr> {
        let op = match self.peek_kind() {
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Neg,
            _ => return self.parse_postfix(),
        };
        let start = self.advance().span;
        let operand = ensure_sufficient_stack(|| self.parse_unary())?;
        let span = start.merge(operand.span);
        Ok(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Postfix & Primary
    // ══════════════════════════════════════════════════════════════════════════

    fn parse_postfix(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek_kind() {
                TokenKind::LParen => {
                    self.advance();
                    let args = self.parse_call_args()?;
                    let span = expr.span.merge(self.previous_span());
                    expr = Expr::new(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        span,
                    );
                }
                TokenKind::ColonColon => {
                    self.advance();
                    let name = self.expect_identifier()?;
                    let span = expr.span.merge(name.span);
                    expr = Expr::new(
                        ExprKind::StaticAccess {
                            target: Box::new(expr),
                            name,
                        },
                        span,
                    );
                }
                _ => return Ok(expr),
            }
        }
    }

    /// Arguments after `(`, including the closing `)`.
    fn parse_call_args(&mut self) -> Result<Vec<Expr>> {
        let mut args = Vec::new();
        self.skip_newlines();
        while !self.check_exact(&TokenKind::RParen) {
            args.push(self.parse_expression()?);
            self.skip_newlines();
            if !self.check_exact(&TokenKind::RParen) {
                self.expect(&TokenKind::Comma)?;
                self.skip_newlines();
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let span = self.current_span();
        let kind = match self.peek_kind().clone() {
            TokenKind::IntLit(n) => ExprKind::Int(n),
            TokenKind::DoubleLit(n) => ExprKind::Double(n),
            TokenKind::TextLit(s) => ExprKind::Text(s),
            TokenKind::True => ExprKind::Bool(true),
            TokenKind::False => ExprKind::Bool(false),
            TokenKind::Identifier(name) => ExprKind::Variable(name),
            TokenKind::LParen => {
                self.advance();
                self.skip_newlines();
                let inner = self.parse_expression()?;
                self.skip_newlines();
                self.expect(&TokenKind::RParen)?;
                return Ok(Expr::new(inner.kind, span.merge(self.previous_span())));
            }
            TokenKind::Func => {
                let decl = self.parse_func_literal()?;
                let span = decl.span;
                return Ok(Expr::new(ExprKind::Func(decl.into()), span));
            }
            _ => return Err(self.unexpected("an expression")),
        };
        self.advance();
        Ok(Expr::new(kind, span))
    }
}
