//! Runtime values.

use std::fmt;
use std::rc::Rc;

use odo_analyzer::Arity;
use odo_types::ast::FuncDecl;
use odo_types::{OdoError, Result, ScopeId, TypeId};

use crate::native::ParamSpec;

/// Host callback behind a native function.
pub type NativeCallback = Rc<dyn Fn(&[Value]) -> Result<Value>>;

/// A function written in Odo, closed over the scope it was defined in.
#[derive(Debug)]
pub struct ScriptedFunction {
    pub decl: Rc<FuncDecl>,
    pub ty: TypeId,
    pub captured: ScopeId,
}

impl ScriptedFunction {
    pub fn name(&self) -> &str {
        self.decl.display_name()
    }
}

/// A host function registered through the native API.
pub struct NativeFunction {
    /// Qualified name, `math::sqrt`.
    pub name: String,
    /// The native marker type, or a structural type for typed natives.
    pub ty: TypeId,
    pub arity: Arity,
    /// Typed parameters; empty for natives registered with an arity contract.
    pub params: Vec<ParamSpec>,
    pub callback: NativeCallback,
}

impl NativeFunction {
    /// Re-check the call contract at runtime.
    pub fn check_arity(&self, count: usize) -> Result<()> {
        if self.params.is_empty() {
            return self
                .arity
                .check(&self.name, count)
                .map_err(|err| OdoError::runtime(err.message));
        }
        let required = self.params.iter().filter(|p| !p.is_optional()).count();
        if count < required || count > self.params.len() {
            return Err(OdoError::runtime(format!(
                "Function `{}` takes between {required} and {} arguments, but was called with {count}.",
                self.name,
                self.params.len()
            )));
        }
        Ok(())
    }

    /// Fill missing optional arguments from their defaults and coerce every
    /// argument to its parameter type.
    pub fn prepare_args(&self, mut args: Vec<Value>) -> Vec<Value> {
        for spec in self.params.iter().skip(args.len()) {
            if let Some(default) = spec.default_value() {
                args.push(default);
            }
        }
        args.into_iter()
            .enumerate()
            .map(|(i, arg)| match self.params.get(i) {
                Some(spec) => arg.coerce(spec.ty()),
                None => arg,
            })
            .collect()
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("arity", &self.arity)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Value
// ══════════════════════════════════════════════════════════════════════════════

/// A runtime value produced by evaluation.
#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Double(f64),
    Text(String),
    Bool(bool),
    Null,
    Function(Rc<ScriptedFunction>),
    Native(Rc<NativeFunction>),
    Module { name: Rc<str>, scope: ScopeId },
    /// `name` is fully qualified: `geo::Shape::Circle`.
    EnumCase { ty: TypeId, name: Rc<str> },
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    /// Static type matching this value.
    pub fn type_id(&self) -> TypeId {
        match self {
            Value::Int(_) => TypeId::INT,
            Value::Double(_) => TypeId::DOUBLE,
            Value::Text(_) => TypeId::TEXT,
            Value::Bool(_) => TypeId::BOOL,
            Value::Null => TypeId::NULL,
            Value::Function(func) => func.ty,
            Value::Native(native) => native.ty,
            Value::Module { .. } => TypeId::ANY,
            Value::EnumCase { ty, .. } => *ty,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Double(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Convert between `int` and `double` for a slot of type `target`.
    ///
    /// Narrowing to `int` truncates toward zero.
    pub fn coerce(self, target: TypeId) -> Value {
        match (self, target) {
            (Value::Double(n), TypeId::INT) => Value::Int(n.trunc() as i64),
            (Value::Int(n), TypeId::DOUBLE) => Value::Double(n as f64),
            (value, _) => value,
        }
    }

    /// Equality as the `==` operator sees it.
    ///
    /// Numbers compare by value across `int` and `double`; functions and
    /// modules compare by identity; `null` equals only `null`.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Int(a), Value::Double(b)) | (Value::Double(b), Value::Int(a)) => {
                *a as f64 == *b
            }
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            (Value::Module { scope: a, .. }, Value::Module { scope: b, .. }) => a == b,
            (
                Value::EnumCase { ty: a, name: x },
                Value::EnumCase { ty: b, name: y },
            ) => a == b && x == y,
            _ => false,
        }
    }
}

/// Strict equality: `Int(1) != Double(1.0)`.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other) && self.loose_eq(other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Double(n) if n.is_finite() && n.fract() == 0.0 => write!(f, "{n:.1}"),
            Value::Double(n) => write!(f, "{n}"),
            Value::Text(s) => f.write_str(s),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Null => f.write_str("null"),
            Value::Function(func) => write!(f, "<func {}>", func.name()),
            Value::Native(native) => write!(f, "<native func {}>", native.name),
            Value::Module { name, .. } => write!(f, "<module {name}>"),
            Value::EnumCase { name, .. } => f.write_str(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_display() {
        assert_eq!(Value::Int(-3).to_string(), "-3");
        assert_eq!(Value::Double(2.0).to_string(), "2.0");
        assert_eq!(Value::Double(0.25).to_string(), "0.25");
        assert_eq!(Value::text("hi").to_string(), "hi");
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(
            Value::EnumCase {
                ty: TypeId::ANY,
                name: "Color::Red".into()
            }
            .to_string(),
            "Color::Red"
        );
    }

    #[test]
    fn test_coerce_truncates_toward_zero() {
        assert_eq!(Value::Double(2.9).coerce(TypeId::INT), Value::Int(2));
        assert_eq!(Value::Double(-2.9).coerce(TypeId::INT), Value::Int(-2));
        assert_eq!(Value::Int(3).coerce(TypeId::DOUBLE), Value::Double(3.0));
        assert_eq!(Value::Int(3).coerce(TypeId::ANY), Value::Int(3));
    }

    #[test]
    fn test_equality_flavours() {
        assert!(Value::Int(1).loose_eq(&Value::Double(1.0)));
        assert_ne!(Value::Int(1), Value::Double(1.0));
        assert!(!Value::Null.loose_eq(&Value::Int(0)));
        assert!(Value::Null.loose_eq(&Value::Null));
    }
}
