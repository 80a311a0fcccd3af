//! Runtime bindings and the interpreter's persistent scope environment.

use std::rc::Rc;

use odo_types::ast::ModuleDecl;
use odo_types::ty::PRIMITIVE_NAMES;
use odo_types::{Result, ScopeId, ScopeSnapshot, ScopeTree, TypeId, UnwindSet};

use crate::value::Value;

/// A name as the interpreter sees it.
#[derive(Debug, Clone)]
pub enum Binding {
    Type(TypeId),
    /// A variable cell; reseated on assignment.
    Var {
        ty: TypeId,
        value: Option<Value>,
        constant: bool,
    },
    /// A scripted or native function value.
    Function(Value),
    Module {
        scope: ScopeId,
        pending: Option<Rc<ModuleDecl>>,
    },
    Enum {
        ty: TypeId,
        scope: ScopeId,
    },
    EnumCase(Value),
}

/// Scope tree shared by every run of an engine, with its global and session scopes.
#[derive(Debug)]
pub struct Environment {
    pub(crate) scopes: ScopeTree<Binding>,
    global: ScopeId,
    session: ScopeId,
}

impl Environment {
    pub fn new() -> Self {
        let mut scopes = ScopeTree::new();
        let global = scopes.root();
        for &(name, ty) in PRIMITIVE_NAMES {
            let _ = scopes.add_symbol(global, name, Binding::Type(ty));
        }
        let session = scopes.push(Some(global), UnwindSet::NONE);
        scopes.pin(session);
        Self {
            scopes,
            global,
            session,
        }
    }

    pub fn global(&self) -> ScopeId {
        self.global
    }

    pub fn session(&self) -> ScopeId {
        self.session
    }

    pub fn binding(&self, scope: ScopeId, name: &str) -> Option<&Binding> {
        self.scopes.get(scope, name)
    }

    /// Current value of a session variable.
    pub fn session_value(&self, name: &str) -> Option<&Value> {
        match self.scopes.get(self.session, name) {
            Some(Binding::Var { value, .. }) => value.as_ref(),
            _ => None,
        }
    }

    pub fn live_scopes(&self) -> usize {
        self.scopes.live_count()
    }

    // ── Registration ──

    pub fn add_value(&mut self, scope: ScopeId, name: &str, value: Value) -> Result<()> {
        let binding = Binding::Var {
            ty: value.type_id(),
            value: Some(value),
            constant: true,
        };
        self.scopes.add_symbol(scope, name, binding)?;
        Ok(())
    }

    pub fn add_function(&mut self, scope: ScopeId, name: &str, value: Value) -> Result<()> {
        self.scopes.add_symbol(scope, name, Binding::Function(value))?;
        Ok(())
    }

    pub fn add_module(&mut self, scope: ScopeId, name: &str) -> Result<ScopeId> {
        let module = self.scopes.push_labelled(Some(scope), name);
        self.scopes.pin(module);
        self.scopes.add_symbol(
            scope,
            name,
            Binding::Module {
                scope: module,
                pending: None,
            },
        )?;
        Ok(module)
    }

    // ── Session ──

    pub fn set_session_var(&mut self, name: &str, value: Value) {
        let binding = Binding::Var {
            ty: value.type_id(),
            value: Some(value),
            constant: false,
        };
        match self.scopes.get_mut(self.session, name) {
            Some(slot) => *slot = binding,
            None => {
                let _ = self.scopes.add_symbol(self.session, name, binding);
            }
        }
    }

    pub fn declare_session_var(&mut self, name: &str) -> Result<()> {
        let binding = Binding::Var {
            ty: TypeId::ANY,
            value: None,
            constant: false,
        };
        self.scopes.add_symbol(self.session, name, binding)?;
        Ok(())
    }

    pub fn session_names(&self) -> Vec<String> {
        self.scopes.names(self.session)
    }

    pub fn snapshot_session(&self) -> ScopeSnapshot<Binding> {
        self.scopes.snapshot(self.session)
    }

    /// Return the session to a snapshot, values included.
    pub fn restore_session(&mut self, snapshot: ScopeSnapshot<Binding>) {
        tracing::debug!(bindings = snapshot.len(), "restore runtime session");
        self.scopes.restore(snapshot);
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
