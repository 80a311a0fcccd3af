//! Static symbols and the analyzer's persistent scope environment.
//!
//! [`TypeEnv`] outlives a single analysis: it holds the global scope with
//! the primitive types and every registered native, plus the REPL session
//! scope whose declarations stay visible from one `repl` call to the next.

use std::rc::Rc;

use odo_types::ast::{FuncDecl, ModuleDecl};
use odo_types::ty::PRIMITIVE_NAMES;
use odo_types::{OdoError, Result, ScopeId, ScopeSnapshot, ScopeTree, TypeId, UnwindSet};
use rustc_hash::FxHashMap;

use crate::native::NativeSignature;

// ══════════════════════════════════════════════════════════════════════════════
// Symbols
// ══════════════════════════════════════════════════════════════════════════════

/// A function body waiting to be analyzed, with its parameter scope.
#[derive(Debug, Clone)]
pub struct DeferredBody {
    pub decl: Rc<FuncDecl>,
    pub scope: ScopeId,
}

/// A name as the analyzer sees it.
#[derive(Debug, Clone)]
pub enum Symbol {
    /// A primitive type name.
    Type(TypeId),
    Var {
        ty: TypeId,
        constant: bool,
        initialized: bool,
    },
    /// A scripted function, or a native registered with typed parameters.
    Function {
        ty: TypeId,
        pending: Option<DeferredBody>,
    },
    /// A native registered with an arity contract.
    Native(Rc<NativeSignature>),
    Module {
        scope: ScopeId,
        pending: Option<Rc<ModuleDecl>>,
    },
    Enum {
        ty: TypeId,
        scope: ScopeId,
    },
    EnumCase(TypeId),
}

impl Symbol {
    /// Whether resolving this symbol still has analysis work to do.
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            Symbol::Function {
                pending: Some(_),
                ..
            } | Symbol::Module {
                pending: Some(_),
                ..
            }
        )
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// TypeEnv
// ══════════════════════════════════════════════════════════════════════════════

/// Scope tree and well-known scopes shared by every analysis of an engine.
#[derive(Debug)]
pub struct TypeEnv {
    pub(crate) scopes: ScopeTree<Symbol>,
    global: ScopeId,
    session: ScopeId,
    /// Empty parameter scope per function type, copied for each declaration.
    signature_scopes: FxHashMap<TypeId, ScopeId>,
}

impl TypeEnv {
    pub fn new() -> Self {
        let mut scopes = ScopeTree::new();
        let global = scopes.root();
        for &(name, ty) in PRIMITIVE_NAMES {
            // The root scope starts empty, so primitive names cannot collide.
            let _ = scopes.add_symbol(global, name, Symbol::Type(ty));
        }
        let session = scopes.push(Some(global), UnwindSet::NONE);
        scopes.pin(session);
        Self {
            scopes,
            global,
            session,
            signature_scopes: FxHashMap::default(),
        }
    }

    /// Scope holding primitive types and registered natives.
    pub fn global(&self) -> ScopeId {
        self.global
    }

    /// Scope that persists REPL declarations.
    pub fn session(&self) -> ScopeId {
        self.session
    }

    pub fn symbol(&self, scope: ScopeId, name: &str) -> Option<&Symbol> {
        self.scopes.get(scope, name)
    }

    /// Number of live scopes; stays flat across analyses that leave nothing behind.
    pub fn live_scopes(&self) -> usize {
        self.scopes.live_count()
    }

    pub(crate) fn signature_scope(&mut self, ty: TypeId) -> ScopeId {
        if let Some(&scope) = self.signature_scopes.get(&ty) {
            return scope;
        }
        let scope = self.scopes.push(None, UnwindSet::NONE);
        self.scopes.pin(scope);
        self.signature_scopes.insert(ty, scope);
        scope
    }

    // ── Registration ──

    pub fn add_native(&mut self, scope: ScopeId, signature: NativeSignature) -> Result<()> {
        let name = signature.name.clone();
        self.declare(scope, name, Symbol::Native(Rc::new(signature)))
    }

    /// A native whose parameters and return type are known up front.
    pub fn add_typed_native(&mut self, scope: ScopeId, name: &str, ty: TypeId) -> Result<()> {
        self.declare(scope, name, Symbol::Function { ty, pending: None })
    }

    pub fn add_constant(&mut self, scope: ScopeId, name: &str, ty: TypeId) -> Result<()> {
        self.declare(
            scope,
            name,
            Symbol::Var {
                ty,
                constant: true,
                initialized: true,
            },
        )
    }

    /// Register an empty native module and return its scope.
    pub fn add_module(&mut self, scope: ScopeId, name: &str) -> Result<ScopeId> {
        let module = self.scopes.push_labelled(Some(scope), name);
        self.scopes.pin(module);
        self.declare(
            scope,
            name,
            Symbol::Module {
                scope: module,
                pending: None,
            },
        )?;
        Ok(module)
    }

    fn declare(&mut self, scope: ScopeId, name: impl Into<String>, symbol: Symbol) -> Result<()> {
        let name = name.into();
        tracing::debug!(name = %name, "register native symbol");
        self.scopes.add_symbol(scope, name, symbol)?;
        Ok(())
    }

    // ── Session ──

    /// Declare or overwrite an initialized session variable.
    pub fn set_session_var(&mut self, name: &str, ty: TypeId) {
        let symbol = Symbol::Var {
            ty,
            constant: false,
            initialized: true,
        };
        match self.scopes.get_mut(self.session, name) {
            Some(slot) => *slot = symbol,
            None => {
                let _ = self.scopes.add_symbol(self.session, name, symbol);
            }
        }
    }

    /// Declare a session variable of type `any` that has no value yet.
    pub fn declare_session_var(&mut self, name: &str) -> Result<()> {
        self.scopes
            .add_symbol(
                self.session,
                name,
                Symbol::Var {
                    ty: TypeId::ANY,
                    constant: false,
                    initialized: false,
                },
            )
            .map_err(OdoError::from)
    }

    pub fn session_names(&self) -> Vec<String> {
        self.scopes.names(self.session)
    }

    pub fn snapshot_session(&self) -> ScopeSnapshot<Symbol> {
        self.scopes.snapshot(self.session)
    }

    /// Return the session to a snapshot, undoing declarations and
    /// in-place type changes made since.
    pub fn restore_session(&mut self, snapshot: ScopeSnapshot<Symbol>) {
        tracing::debug!(symbols = snapshot.len(), "restore analyzer session");
        self.scopes.restore(snapshot);
    }
}

impl Default for TypeEnv {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::Arity;
    use odo_types::ErrorKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_primitives_live_in_global() {
        let env = TypeEnv::new();
        assert!(matches!(
            env.symbol(env.global(), "int"),
            Some(Symbol::Type(TypeId::INT))
        ));
        assert!(env.symbol(env.global(), "null").is_none());
    }

    #[test]
    fn test_native_registration_rejects_duplicates() {
        let mut env = TypeEnv::new();
        let global = env.global();
        env.add_native(global, NativeSignature::new("print", Arity::Any, None))
            .unwrap();
        let err = env
            .add_native(global, NativeSignature::new("print", Arity::Any, None))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NameError);
    }

    #[test]
    fn test_signature_scope_is_shared_per_type() {
        let mut env = TypeEnv::new();
        let a = env.signature_scope(TypeId::NATIVE_FUNCTION);
        let b = env.signature_scope(TypeId::NATIVE_FUNCTION);
        assert_eq!(a, b);
    }

    #[test]
    fn test_restore_session_undoes_changes() {
        let mut env = TypeEnv::new();
        env.declare_session_var("_").unwrap();
        let before = env.snapshot_session();
        env.set_session_var("x", TypeId::INT);
        env.set_session_var("_", TypeId::TEXT);
        env.restore_session(before);
        assert_eq!(env.session_names(), vec!["_".to_string()]);
        assert!(matches!(
            env.symbol(env.session(), "_"),
            Some(Symbol::Var {
                ty: TypeId::ANY,
                initialized: false,
                ..
            })
        ));
    }
}
