//! Odo tree-walking interpreter and engine.
//!
//! [`Engine`] is the embedding surface: register natives, then call
//! [`Engine::interpret`] for whole programs or [`Engine::repl`] for
//! incremental input against a persistent session.

mod config;
mod engine;
mod env;
mod evaluator;
mod native;
mod value;

pub use config::EngineConfig;
pub use engine::Engine;
pub use env::{Binding, Environment};
pub use evaluator::Interpreter;
pub use native::{NativeModule, ParamSpec};
pub use value::{NativeCallback, NativeFunction, ScriptedFunction, Value};

pub use odo_analyzer::{Arity, NativeCall, Validation};
pub use odo_types::{ErrorKind, OdoError, Result, TypeId};
