//! Core Odo lexer: converts source text to a token stream.
//!
//! - Newlines are tokens (statement separators); other whitespace is skipped
//! - `#` starts a line comment, `#{ ... }#` is a block comment and nests
//! - Text literals use `"` or `'` with `\\ \n \r \t \' \"` escapes
//! - Stops at the first invalid character with an `InputError`

use odo_types::{OdoError, Result, SourceFile, Span};

use crate::token::{Token, TokenKind};

/// The Odo lexer.
pub struct Lexer<'src> {
    chars: Vec<char>,
    source_file: &'src SourceFile,
    /// Current index into `chars`.
    pos: usize,
    /// Current line number (1-based).
    line: u32,
    /// Current column number (1-based).
    col: u32,
}

impl<'src> Lexer<'src> {
    pub fn new(source_file: &'src SourceFile) -> Self {
        Self {
            chars: source_file.source.chars().collect(),
            source_file,
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    /// Lex the entire source. The stream always ends with [`TokenKind::Eof`].
    pub fn lex(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tracing::trace!(file = %self.source_file.name, tokens = tokens.len(), "lexed");
        Ok(tokens)
    }

    // ─────────────────────────────────────────────────────────────
    // Character-level helpers
    // ─────────────────────────────────────────────────────────────

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn span_from(&self, start_line: u32, start_col: u32) -> Span {
        Span::new(
            start_line,
            start_col,
            self.line,
            self.col.saturating_sub(1).max(1),
        )
    }

    // ─────────────────────────────────────────────────────────────
    // Whitespace & comments
    // ─────────────────────────────────────────────────────────────

    /// Skip spaces, tabs and carriage returns. Newlines are tokens.
    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch != '\n' && ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Skip a comment whose `#` is the current character.
    fn skip_comment(&mut self) -> Result<()> {
        self.advance();
        if self.peek() == Some('{') {
            self.advance();
            return self.skip_block_comment();
        }
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
        Ok(())
    }

    /// Skip the rest of a `#{ ... }#` comment, including nested ones.
    fn skip_block_comment(&mut self) -> Result<()> {
        let mut depth = 1usize;
        while depth > 0 {
            match self.advance() {
                None => return Err(OdoError::syntax("Missing end of comment `}#`.")
                    .with_span(Span::point(self.line, self.col))),
                Some('}') if self.peek() == Some('#') => {
                    self.advance();
                    depth -= 1;
                }
                Some('#') if self.peek() == Some('{') => {
                    self.advance();
                    depth += 1;
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────
    // Scanning
    // ─────────────────────────────────────────────────────────────

    fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace();
        while self.peek() == Some('#') {
            self.skip_comment()?;
            self.skip_whitespace();
        }

        let start_line = self.line;
        let start_col = self.col;
        let Some(ch) = self.advance() else {
            return Ok(Token::new(TokenKind::Eof, Span::point(start_line, start_col)));
        };

        let kind = match ch {
            '\n' => TokenKind::Newline,
            '"' | '\'' => return self.scan_text(ch, start_line, start_col),
            c if c.is_ascii_digit() => return self.scan_number(c, start_line, start_col),
            c if c.is_alphabetic() || c == '_' => {
                return Ok(self.scan_identifier(c, start_line, start_col))
            }
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            '~' => TokenKind::Tilde,
            '?' => TokenKind::Question,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            ':' if self.eat(':') => TokenKind::ColonColon,
            ':' => TokenKind::Colon,
            '=' if self.eat('=') => TokenKind::EqEq,
            '=' => TokenKind::Eq,
            '<' if self.eat('=') => TokenKind::LessEq,
            '<' => TokenKind::Less,
            '>' if self.eat('=') => TokenKind::GreaterEq,
            '>' => TokenKind::Greater,
            '!' if self.eat('=') => TokenKind::BangEq,
            other => return Err(OdoError::input(start_line, start_col, other)),
        };

        Ok(Token::new(kind, self.span_from(start_line, start_col)))
    }

    fn scan_number(&mut self, first: char, start_line: u32, start_col: u32) -> Result<Token> {
        let mut text = String::from(first);
        let mut seen_point = false;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() || (ch == '.' && !seen_point) {
                seen_point |= ch == '.';
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let span = self.span_from(start_line, start_col);
        let kind = if seen_point {
            let value = text
                .parse::<f64>()
                .map_err(|_| OdoError::syntax(format!("Invalid number `{text}`.")).with_span(span))?;
            TokenKind::DoubleLit(value)
        } else {
            let value = text.parse::<i64>().map_err(|_| {
                OdoError::syntax(format!("Integer literal `{text}` is out of range.")).with_span(span)
            })?;
            TokenKind::IntLit(value)
        };
        Ok(Token::new(kind, span))
    }

    fn scan_text(&mut self, quote: char, start_line: u32, start_col: u32) -> Result<Token> {
        let mut value = String::new();
        loop {
            match self.advance() {
                None => {
                    return Err(OdoError::syntax(format!(
                        "Text literal has no matching `{quote}`."
                    ))
                    .with_span(Span::point(start_line, start_col)))
                }
                Some(ch) if ch == quote => break,
                Some('\\') => {
                    let Some(escaped) = self.advance() else {
                        continue;
                    };
                    value.push(match escaped {
                        'n' => '\n',
                        'r' => '\r',
                        't' => '\t',
                        other => other,
                    });
                }
                Some(ch) => value.push(ch),
            }
        }
        Ok(Token::new(
            TokenKind::TextLit(value),
            self.span_from(start_line, start_col),
        ))
    }

    fn scan_identifier(&mut self, first: char, start_line: u32, start_col: u32) -> Token {
        let mut name = String::from(first);
        while let Some(ch) = self.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                name.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        let span = self.span_from(start_line, start_col);
        let kind = TokenKind::from_keyword(&name).unwrap_or(TokenKind::Identifier(name));
        Token::new(kind, span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Result<Vec<Token>> {
        let sf = SourceFile::new("test.odo", source);
        Lexer::new(&sf).lex()
    }

    #[test]
    fn test_spans_track_lines_and_columns() {
        let tokens = lex("var x\n  x = 1").unwrap();
        assert_eq!(tokens[0].span, Span::new(1, 1, 1, 3));
        assert_eq!(tokens[1].span, Span::new(1, 5, 1, 5));
        assert_eq!(tokens[3].span.start_line, 2);
        assert_eq!(tokens[3].span.start_col, 3);
    }
}
