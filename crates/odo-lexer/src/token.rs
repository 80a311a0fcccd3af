//! Token types for the Odo lexer.
//!
//! Defines [`TokenKind`] covering every lexeme of the language and
//! [`Token`], which pairs a kind with a source [`Span`].

use odo_types::Span;
use std::fmt;

/// All reserved words of the language.
pub const ALL_KEYWORDS: &[&str] = &[
    "true", "false", "and", "or", "var", "const", "if", "else", "loop", "while", "forange",
    "func", "return", "break", "continue", "module", "enum",
];

// ─────────────────────────────────────────────────────────────────────
// Token
// ─────────────────────────────────────────────────────────────────────

/// A single token produced by the Odo lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

// ─────────────────────────────────────────────────────────────────────
// TokenKind
// ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // ── Literals ─────────────────────────────────────────────
    IntLit(i64),
    DoubleLit(f64),
    TextLit(String),
    Identifier(String),

    // ── Keywords ─────────────────────────────────────────────
    True,
    False,
    And,
    Or,
    Var,
    Const,
    If,
    Else,
    Loop,
    While,
    Forange,
    Func,
    Return,
    Break,
    Continue,
    Module,
    Enum,

    // ── Operators ────────────────────────────────────────────
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `==`
    EqEq,
    /// `!=`
    BangEq,
    /// `<`
    Less,
    /// `>`
    Greater,
    /// `<=`
    LessEq,
    /// `>=`
    GreaterEq,
    /// `?`
    Question,
    /// `~` (reversed `forange`)
    Tilde,

    // ── Punctuation ──────────────────────────────────────────
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Colon,
    /// `::`
    ColonColon,
    Semicolon,
    /// `=`
    Eq,

    // ── Special ──────────────────────────────────────────────
    /// Newline (statement separator)
    Newline,
    Eof,
}

impl TokenKind {
    /// Look up a reserved word. Returns `None` for user identifiers.
    pub fn from_keyword(s: &str) -> Option<TokenKind> {
        Some(match s {
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "var" => TokenKind::Var,
            "const" => TokenKind::Const,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "loop" => TokenKind::Loop,
            "while" => TokenKind::While,
            "forange" => TokenKind::Forange,
            "func" => TokenKind::Func,
            "return" => TokenKind::Return,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "module" => TokenKind::Module,
            "enum" => TokenKind::Enum,
            _ => return None,
        })
    }

    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::True
                | TokenKind::False
                | TokenKind::And
                | TokenKind::Or
                | TokenKind::Var
                | TokenKind::Const
                | TokenKind::If
                | TokenKind::Else
                | TokenKind::Loop
                | TokenKind::While
                | TokenKind::Forange
                | TokenKind::Func
                | TokenKind::Return
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Module
                | TokenKind::Enum
        )
    }

    /// Tokens that may end a statement without a separator.
    pub fn closes_statement(&self) -> bool {
        matches!(
            self,
            TokenKind::Newline
                | TokenKind::Semicolon
                | TokenKind::RBrace
                | TokenKind::RParen
                | TokenKind::Eof
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::IntLit(n) => write!(f, "{n}"),
            TokenKind::DoubleLit(n) => write!(f, "{n:?}"),
            TokenKind::TextLit(s) => write!(f, "\"{s}\""),
            TokenKind::Identifier(s) => f.write_str(s),
            TokenKind::True => f.write_str("true"),
            TokenKind::False => f.write_str("false"),
            TokenKind::And => f.write_str("and"),
            TokenKind::Or => f.write_str("or"),
            TokenKind::Var => f.write_str("var"),
            TokenKind::Const => f.write_str("const"),
            TokenKind::If => f.write_str("if"),
            TokenKind::Else => f.write_str("else"),
            TokenKind::Loop => f.write_str("loop"),
            TokenKind::While => f.write_str("while"),
            TokenKind::Forange => f.write_str("forange"),
            TokenKind::Func => f.write_str("func"),
            TokenKind::Return => f.write_str("return"),
            TokenKind::Break => f.write_str("break"),
            TokenKind::Continue => f.write_str("continue"),
            TokenKind::Module => f.write_str("module"),
            TokenKind::Enum => f.write_str("enum"),
            TokenKind::Plus => f.write_str("+"),
            TokenKind::Minus => f.write_str("-"),
            TokenKind::Star => f.write_str("*"),
            TokenKind::Slash => f.write_str("/"),
            TokenKind::EqEq => f.write_str("=="),
            TokenKind::BangEq => f.write_str("!="),
            TokenKind::Less => f.write_str("<"),
            TokenKind::Greater => f.write_str(">"),
            TokenKind::LessEq => f.write_str("<="),
            TokenKind::GreaterEq => f.write_str(">="),
            TokenKind::Question => f.write_str("?"),
            TokenKind::Tilde => f.write_str("~"),
            TokenKind::LParen => f.write_str("("),
            TokenKind::RParen => f.write_str(")"),
            TokenKind::LBrace => f.write_str("{"),
            TokenKind::RBrace => f.write_str("}"),
            TokenKind::Comma => f.write_str(","),
            TokenKind::Colon => f.write_str(":"),
            TokenKind::ColonColon => f.write_str("::"),
            TokenKind::Semicolon => f.write_str(";"),
            TokenKind::Eq => f.write_str("="),
            TokenKind::Newline => f.write_str("newline"),
            TokenKind::Eof => f.write_str("end of input"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_keyword_recognises_all() {
        for kw in ALL_KEYWORDS {
            let kind = TokenKind::from_keyword(kw);
            assert!(kind.is_some(), "'{kw}' should be a keyword");
            assert!(kind.as_ref().is_some_and(TokenKind::is_keyword));
        }
    }

    #[test]
    fn test_display_roundtrip_keywords() {
        for kw in ALL_KEYWORDS {
            let kind = TokenKind::from_keyword(kw).unwrap();
            assert_eq!(kind.to_string(), *kw);
        }
    }

    #[test]
    fn test_identifiers_are_not_keywords() {
        for name in ["Var", "forangex", "print", "_", "int"] {
            assert_eq!(TokenKind::from_keyword(name), None, "'{name}'");
        }
    }

    #[test]
    fn test_display_literals() {
        assert_eq!(TokenKind::IntLit(42).to_string(), "42");
        assert_eq!(TokenKind::DoubleLit(2.0).to_string(), "2.0");
        assert_eq!(TokenKind::TextLit("hi".into()).to_string(), "\"hi\"");
    }
}
