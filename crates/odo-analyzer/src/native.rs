//! Static side of native functions: arity contracts and validation callbacks.

use std::fmt;
use std::rc::Rc;

use odo_types::{OdoError, Result, TypeId, TypeTable};

/// How many arguments a native function accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Nothing,
    Any,
    Exact(usize),
    AtMost(usize),
}

impl Arity {
    /// `ValueError` when a call with `count` arguments breaks the contract.
    pub fn check(self, name: &str, count: usize) -> Result<()> {
        match self {
            Arity::Nothing if count > 0 => Err(OdoError::value(format!(
                "Function `{name}` takes no arguments."
            ))),
            Arity::Exact(n) if count != n => Err(OdoError::value(format!(
                "Function `{name}` takes `{n}` arguments."
            ))),
            Arity::AtMost(n) if count > n => Err(OdoError::value(format!(
                "Function `{name}` takes `{n}` arguments or less."
            ))),
            _ => Ok(()),
        }
    }
}

/// What a validation callback sees of a call site.
pub struct NativeCall<'a> {
    /// Qualified name of the called function.
    pub name: &'a str,
    /// Static type of each argument; `None` when it provides no value.
    pub args: &'a [Option<TypeId>],
    pub types: &'a TypeTable,
}

impl NativeCall<'_> {
    /// Require argument `index` to count as `expected`.
    pub fn expect_arg(&self, index: usize, expected: TypeId) -> Result<()> {
        match self.args.get(index).copied().flatten() {
            Some(ty) if self.types.counts_as(ty, expected) => Ok(()),
            _ => Err(OdoError::type_error(format!(
                "Function `{}` takes an argument of type `{}`.",
                self.name,
                self.types.display(expected)
            ))),
        }
    }

    /// Require every argument to provide a value.
    pub fn expect_values(&self) -> Result<()> {
        match self.args.iter().position(Option::is_none) {
            Some(index) => Err(OdoError::value(format!(
                "Argument {index} of `{}` does not provide a value.",
                self.name
            ))),
            None => Ok(()),
        }
    }
}

/// Checks a call's arguments and yields its static return type.
pub type Validation = Rc<dyn Fn(&NativeCall<'_>) -> Result<Option<TypeId>>>;

/// A native function registered with an arity contract.
#[derive(Clone)]
pub struct NativeSignature {
    pub name: String,
    pub arity: Arity,
    /// Without a validation the call has no static type.
    pub validation: Option<Validation>,
}

impl NativeSignature {
    pub fn new(name: impl Into<String>, arity: Arity, validation: Option<Validation>) -> Self {
        Self {
            name: name.into(),
            arity,
            validation,
        }
    }

    /// Run the arity contract and the validation for a call.
    pub fn validate(&self, name: &str, args: &[Option<TypeId>], types: &TypeTable) -> Result<Option<TypeId>> {
        self.arity.check(name, args.len())?;
        match &self.validation {
            Some(validation) => validation(&NativeCall { name, args, types }),
            None => Ok(None),
        }
    }
}

impl fmt::Debug for NativeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeSignature")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("validation", &self.validation.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_arity_messages() {
        assert_eq!(Arity::Any.check("f", 9), Ok(()));
        assert_eq!(
            Arity::Nothing.check("f", 1).map_err(|e| e.message),
            Err("Function `f` takes no arguments.".to_string())
        );
        assert_eq!(
            Arity::Exact(2).check("f", 1).map_err(|e| e.message),
            Err("Function `f` takes `2` arguments.".to_string())
        );
        assert_eq!(Arity::AtMost(2).check("f", 1), Ok(()));
        assert!(Arity::AtMost(2).check("f", 3).is_err());
    }

    #[test]
    fn test_validation_yields_return_type() {
        let types = TypeTable::new();
        let sqrt = NativeSignature::new(
            "sqrt",
            Arity::Exact(1),
            Some(Rc::new(|call: &NativeCall<'_>| -> Result<Option<TypeId>> {
                call.expect_arg(0, TypeId::DOUBLE)?;
                Ok(Some(TypeId::DOUBLE))
            })),
        );
        assert_eq!(
            sqrt.validate("sqrt", &[Some(TypeId::INT)], &types),
            Ok(Some(TypeId::DOUBLE))
        );
        let err = sqrt
            .validate("sqrt", &[Some(TypeId::TEXT)], &types)
            .unwrap_err();
        assert_eq!(err.message, "Function `sqrt` takes an argument of type `double`.");
    }
}
