//! Native registration: typed parameter descriptions and module handles.
//!
//! Every native is registered twice, once as a static symbol for the
//! analyzer and once as a runtime binding for the interpreter, under
//! matching scopes so both passes agree on qualified names.

use std::rc::Rc;

use odo_analyzer::{Arity, NativeSignature, Validation};
use odo_types::{ParamType, Result, ScopeId, TypeId};

use crate::engine::Engine;
use crate::value::{NativeFunction, Value};

/// One parameter of a typed native function.
///
/// The `..Or` forms are optional and default to their payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamSpec {
    Any,
    Int,
    Double,
    Bool,
    Text,
    IntOr(i64),
    DoubleOr(f64),
    BoolOr(bool),
    TextOr(String),
}

impl ParamSpec {
    pub fn ty(&self) -> TypeId {
        match self {
            ParamSpec::Any => TypeId::ANY,
            ParamSpec::Int | ParamSpec::IntOr(_) => TypeId::INT,
            ParamSpec::Double | ParamSpec::DoubleOr(_) => TypeId::DOUBLE,
            ParamSpec::Bool | ParamSpec::BoolOr(_) => TypeId::BOOL,
            ParamSpec::Text | ParamSpec::TextOr(_) => TypeId::TEXT,
        }
    }

    pub fn is_optional(&self) -> bool {
        self.default_value().is_some()
    }

    pub fn default_value(&self) -> Option<Value> {
        match self {
            ParamSpec::IntOr(n) => Some(Value::Int(*n)),
            ParamSpec::DoubleOr(n) => Some(Value::Double(*n)),
            ParamSpec::BoolOr(b) => Some(Value::Bool(*b)),
            ParamSpec::TextOr(s) => Some(Value::Text(s.clone())),
            _ => None,
        }
    }

    fn param_type(&self) -> ParamType {
        ParamType {
            ty: self.ty(),
            optional: self.is_optional(),
        }
    }
}

/// Where a registration lands: the analyzer scope and its runtime twin.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Target {
    pub static_scope: ScopeId,
    pub runtime_scope: ScopeId,
}

// ══════════════════════════════════════════════════════════════════════════════
// Registration
// ══════════════════════════════════════════════════════════════════════════════

impl Engine {
    pub(crate) fn register_function<F>(
        &mut self,
        target: Target,
        name: &str,
        arity: Arity,
        validation: Option<Validation>,
        callback: F,
    ) -> Result<()>
    where
        F: Fn(&[Value]) -> Result<Value> + 'static,
    {
        self.analyzer_env.add_native(
            target.static_scope,
            NativeSignature::new(name, arity, validation),
        )?;
        let native = NativeFunction {
            name: self.runtime_env.scopes.qualified_name(target.runtime_scope, name),
            ty: TypeId::NATIVE_FUNCTION,
            arity,
            params: Vec::new(),
            callback: Rc::new(callback),
        };
        self.runtime_env
            .add_function(target.runtime_scope, name, Value::Native(Rc::new(native)))
    }

    pub(crate) fn register_typed_function<F>(
        &mut self,
        target: Target,
        name: &str,
        params: Vec<ParamSpec>,
        ret: Option<TypeId>,
        callback: F,
    ) -> Result<()>
    where
        F: Fn(&[Value]) -> Result<Value> + 'static,
    {
        let ty = self
            .types
            .function(ret, params.iter().map(ParamSpec::param_type).collect());
        self.analyzer_env
            .add_typed_native(target.static_scope, name, ty)?;
        let native = NativeFunction {
            name: self.runtime_env.scopes.qualified_name(target.runtime_scope, name),
            ty,
            arity: Arity::Exact(params.len()),
            params,
            callback: Rc::new(callback),
        };
        self.runtime_env
            .add_function(target.runtime_scope, name, Value::Native(Rc::new(native)))
    }

    pub(crate) fn register_value(&mut self, target: Target, name: &str, value: Value) -> Result<()> {
        self.analyzer_env
            .add_constant(target.static_scope, name, value.type_id())?;
        self.runtime_env.add_value(target.runtime_scope, name, value)
    }

    pub(crate) fn register_module(&mut self, target: Target, name: &str) -> Result<Target> {
        let static_scope = self.analyzer_env.add_module(target.static_scope, name)?;
        let runtime_scope = self.runtime_env.add_module(target.runtime_scope, name)?;
        Ok(Target {
            static_scope,
            runtime_scope,
        })
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// NativeModule
// ══════════════════════════════════════════════════════════════════════════════

/// Handle for registering natives inside a module.
///
/// Obtained from [`Engine::add_module`] or [`NativeModule::add_module`].
pub struct NativeModule<'e> {
    engine: &'e mut Engine,
    target: Target,
}

impl<'e> NativeModule<'e> {
    pub(crate) fn new(engine: &'e mut Engine, target: Target) -> Self {
        Self { engine, target }
    }

    /// A constant whose static type is the value's type.
    pub fn add_value(&mut self, name: &str, value: Value) -> Result<()> {
        self.engine.register_value(self.target, name, value)
    }

    /// A native checked by its arity contract and optional validation.
    pub fn add_function<F>(
        &mut self,
        name: &str,
        arity: Arity,
        validation: Option<Validation>,
        callback: F,
    ) -> Result<()>
    where
        F: Fn(&[Value]) -> Result<Value> + 'static,
    {
        self.engine
            .register_function(self.target, name, arity, validation, callback)
    }

    pub fn add_typed_function<F>(
        &mut self,
        name: &str,
        params: Vec<ParamSpec>,
        ret: TypeId,
        callback: F,
    ) -> Result<()>
    where
        F: Fn(&[Value]) -> Result<Value> + 'static,
    {
        self.engine
            .register_typed_function(self.target, name, params, Some(ret), callback)
    }

    pub fn add_void_function<F>(&mut self, name: &str, params: Vec<ParamSpec>, callback: F) -> Result<()>
    where
        F: Fn(&[Value]) -> Result<()> + 'static,
    {
        self.engine
            .register_typed_function(self.target, name, params, None, move |args: &[Value]| {
                callback(args).map(|()| Value::Null)
            })
    }

    /// A nested module.
    pub fn add_module(&mut self, name: &str) -> Result<NativeModule<'_>> {
        let target = self.engine.register_module(self.target, name)?;
        Ok(NativeModule::new(&mut *self.engine, target))
    }
}
