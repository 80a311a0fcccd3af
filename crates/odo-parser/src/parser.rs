//! Core parser infrastructure: token cursor, terminators, expect helpers.

use odo_lexer::token::{Token, TokenKind};
use odo_lexer::Lexer;
use odo_types::ast::{Ident, Program};
use odo_types::{OdoError, Result, SourceFile, Span};

/// Lex and parse a whole source file.
pub fn parse(source_file: &SourceFile) -> Result<Program> {
    let tokens = Lexer::new(source_file).lex()?;
    Parser::new(tokens, source_file).parse_program()
}

/// The Odo parser.
///
/// Consumes a token stream produced by the lexer and builds an AST. Parsing
/// stops at the first malformed construct.
pub struct Parser<'src> {
    /// The token stream. Always ends with `Eof`.
    tokens: Vec<Token>,
    /// Current index into `tokens`.
    pos: usize,
    source_file: &'src SourceFile,
}

impl<'src> Parser<'src> {
    pub fn new(tokens: Vec<Token>, source_file: &'src SourceFile) -> Self {
        let mut tokens = tokens;
        if tokens.last().map(|t| &t.kind) != Some(&TokenKind::Eof) {
            let end = tokens.last().map_or(Span::default(), |t| t.span);
            tokens.push(Token::new(TokenKind::Eof, end));
        }
        Self {
            tokens,
            pos: 0,
            source_file,
        }
    }

    /// Parse the whole token stream as a program.
    pub fn parse_program(mut self) -> Result<Program> {
        let start = self.current_span();
        let stmts = self.parse_statement_list()?;
        if !self.at_end() {
            return Err(self.unexpected("end of input"));
        }
        let span = start.merge(self.previous_span());
        tracing::debug!(
            file = %self.source_file.name,
            statements = stmts.len(),
            "parsed program"
        );
        Ok(Program { stmts, span })
    }

    // ── Token Cursor ──────────────────────────────────────────────────────────

    pub(crate) fn peek(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.pos.min(last)]
    }

    pub(crate) fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    /// Advance the cursor by one and return the consumed token.
    pub(crate) fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    pub(crate) fn previous_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span
        } else {
            self.current_span()
        }
    }

    pub(crate) fn current_span(&self) -> Span {
        self.peek().span
    }

    pub(crate) fn at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    pub(crate) fn check_exact(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    /// If the current token matches, advance and return `true`.
    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check_exact(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Kind of the token `n` positions ahead.
    pub(crate) fn look_ahead_kind(&self, n: usize) -> &TokenKind {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + n).min(last)].kind
    }

    /// Whether the next token after any newlines is `kind`. Consumes the
    /// newlines only when it is.
    pub(crate) fn check_after_newlines(&mut self, kind: &TokenKind) -> bool {
        let saved = self.pos;
        self.skip_newlines();
        if self.check_exact(kind) {
            true
        } else {
            self.pos = saved;
            false
        }
    }

    // ── Terminators ───────────────────────────────────────────────────────────

    pub(crate) fn skip_newlines(&mut self) {
        while self.check_exact(&TokenKind::Newline) {
            self.advance();
        }
    }

    /// Skip newlines and stray semicolons between statements.
    pub(crate) fn skip_separators(&mut self) {
        while matches!(self.peek_kind(), TokenKind::Newline | TokenKind::Semicolon) {
            self.advance();
        }
    }

    /// A statement ends with `;` or a newline, or right before `}`, `)` or
    /// the end of input.
    pub(crate) fn expect_terminator(&mut self) -> Result<()> {
        match self.peek_kind() {
            TokenKind::Newline | TokenKind::Semicolon => {
                self.advance();
                self.skip_separators();
                Ok(())
            }
            kind if kind.closes_statement() => Ok(()),
            _ => Err(self.unexpected("`;` or a new line")),
        }
    }

    // ── Expect Helpers ────────────────────────────────────────────────────────

    pub(crate) fn expect(&mut self, expected: &TokenKind) -> Result<Token> {
        if self.check_exact(expected) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("`{expected}`")))
        }
    }

    pub(crate) fn expect_identifier(&mut self) -> Result<Ident> {
        match self.peek_kind().clone() {
            TokenKind::Identifier(name) => {
                let span = self.advance().span;
                Ok(Ident::new(name, span))
            }
            _ => Err(self.unexpected("an identifier")),
        }
    }

    /// `SyntaxError` naming what was expected and what was found.
    pub(crate) fn unexpected(&self, expected: &str) -> OdoError {
        let found = self.peek();
        OdoError::syntax(format!(
            "Unexpected token `{}` found at line {}. Expected {expected}.",
            found.kind, found.span.start_line
        ))
        .with_span(found.span)
    }
}
