use crate::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable error kind tag carried by every [`OdoError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Invalid character found while lexing.
    InputError,
    /// Malformed grammar.
    SyntaxError,
    /// Unresolved or redeclared symbol.
    NameError,
    /// Incompatible types.
    TypeError,
    /// Division by zero, call depth exceeded, native contract violated.
    RuntimeError,
    /// An expression failed to produce a required value.
    ValueError,
    /// Structural rule violation.
    SemanticError,
    /// Reserved for bounds-checked native operations.
    OutOfRangeError,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InputError => "InputError",
            Self::SyntaxError => "SyntaxError",
            Self::NameError => "NameError",
            Self::TypeError => "TypeError",
            Self::RuntimeError => "RuntimeError",
            Self::ValueError => "ValueError",
            Self::SemanticError => "SemanticError",
            Self::OutOfRangeError => "OutOfRangeError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position and character of a lexer failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidInput {
    pub line: u32,
    pub column: u32,
    pub character: char,
}

/// An error raised anywhere in the Odo pipeline.
///
/// Renders as `"<Kind>:\n\t<message>"`. Serializes to JSON so a host can
/// forward it without parsing the rendered text.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
#[error("{kind}:\n\t{message}")]
pub struct OdoError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<InvalidInput>,
}

impl OdoError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span: None,
            input: None,
        }
    }

    /// A lexer failure at `line`/`column`.
    pub fn input(line: u32, column: u32, character: char) -> Self {
        let mut err = Self::new(
            ErrorKind::InputError,
            format!("Invalid character `{character}` at line {line}, column {column}"),
        );
        err.span = Some(Span::point(line, column));
        err.input = Some(InvalidInput {
            line,
            column,
            character,
        });
        err
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SyntaxError, message)
    }

    pub fn name(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NameError, message)
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeError, message)
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RuntimeError, message)
    }

    pub fn value(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValueError, message)
    }

    pub fn semantic(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SemanticError, message)
    }

    pub fn out_of_range(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::OutOfRangeError, message)
    }

    /// Attach a location, keeping the innermost one if already set.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span.get_or_insert(span);
        self
    }

    /// The rendered `"<Kind>:\n\t<message>"` form.
    pub fn description(&self) -> String {
        self.to_string()
    }
}
