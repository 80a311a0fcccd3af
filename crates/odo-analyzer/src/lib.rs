//! Odo semantic analyzer.
//!
//! Resolves names against the shared scope tree, checks types and control
//! flow, and completes forward-referenced function and module bodies before
//! anything is executed.

mod checker;
mod env;
mod native;

pub use checker::Analyzer;
pub use env::{DeferredBody, Symbol, TypeEnv};
pub use native::{Arity, NativeCall, NativeSignature, Validation};
