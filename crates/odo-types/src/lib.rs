//! Shared types for the Odo engine.
//!
//! This crate defines the AST node types, source spans, the error type,
//! the interned type table, the arena scope tree and the stack guard used
//! by every stage.

mod error;
mod span;
mod stack;
pub mod ast;
pub mod scope;
pub mod ty;

pub use error::{ErrorKind, InvalidInput, OdoError};
pub use scope::{AlreadyDeclared, ScopeId, ScopeSnapshot, ScopeTree, UnwindKind, UnwindSet};
pub use span::{SourceFile, Span};
pub use stack::ensure_sufficient_stack;
pub use ty::{FunctionSignature, ParamType, TypeId, TypeKind, TypeTable};

/// Result type used throughout the Odo engine.
pub type Result<T> = std::result::Result<T, OdoError>;
