//! Arena-backed scope tree shared by the analyzer and the interpreter.
//!
//! Scopes are addressed by [`ScopeId`] and link to their parent by index, so
//! closures and modules can keep a scope alive by holding its id. Each pass
//! stores its own symbol type `S` in the tree; the tree knows nothing about
//! what a symbol means.
//!
//! Lookup here is purely structural. Passes that keep deferred entries on
//! their symbols resolve names through their own `resolve` wrapper, which
//! consumes a pending entry before handing the symbol out.

use rustc_hash::FxHashMap;

// ══════════════════════════════════════════════════════════════════════════════
// Identifiers
// ══════════════════════════════════════════════════════════════════════════════

/// Handle to a scope in a [`ScopeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u32);

impl ScopeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Control-flow event travelling up the scope chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnwindKind {
    Break,
    Continue,
    Return,
}

impl UnwindKind {
    fn bit(self) -> u8 {
        match self {
            Self::Break => 0b001,
            Self::Continue => 0b010,
            Self::Return => 0b100,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Break => "break",
            Self::Continue => "continue",
            Self::Return => "return",
        }
    }
}

/// Set of [`UnwindKind`]s a scope intercepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnwindSet(u8);

impl UnwindSet {
    pub const NONE: Self = Self(0);
    /// Loop bodies stop `break` and `continue`.
    pub const LOOP: Self = Self(0b011);
    /// Function bodies stop `return`.
    pub const FUNCTION: Self = Self(0b100);

    pub fn contains(self, kind: UnwindKind) -> bool {
        self.0 & kind.bit() != 0
    }
}

/// Returned by [`ScopeTree::add_symbol`] when the name is taken in that scope.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Symbol `{name}` already exists in this scope.")]
pub struct AlreadyDeclared {
    pub name: String,
}

impl From<AlreadyDeclared> for crate::OdoError {
    fn from(err: AlreadyDeclared) -> Self {
        crate::OdoError::name(err.to_string())
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Scope
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
struct Scope<S> {
    /// Module or enum name, used for qualified names.
    label: Option<String>,
    parent: Option<ScopeId>,
    symbols: FxHashMap<String, S>,
    /// Declaration order of `symbols`.
    order: Vec<String>,
    intercepts: UnwindSet,
    unwinding: Option<UnwindKind>,
    pinned: bool,
}

impl<S> Scope<S> {
    fn new(parent: Option<ScopeId>, intercepts: UnwindSet) -> Self {
        Self {
            label: None,
            parent,
            symbols: FxHashMap::default(),
            order: Vec::new(),
            intercepts,
            unwinding: None,
            pinned: false,
        }
    }
}

/// Symbols of one scope as captured by [`ScopeTree::snapshot`].
#[derive(Debug, Clone)]
pub struct ScopeSnapshot<S> {
    scope: ScopeId,
    symbols: Vec<(String, S)>,
}

impl<S> ScopeSnapshot<S> {
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// ScopeTree
// ══════════════════════════════════════════════════════════════════════════════

/// Arena of scopes. The scope created by [`ScopeTree::new`] is the root.
#[derive(Debug, Clone)]
pub struct ScopeTree<S> {
    scopes: Vec<Scope<S>>,
    free: Vec<ScopeId>,
}

impl<S> ScopeTree<S> {
    pub fn new() -> Self {
        let mut root = Scope::new(None, UnwindSet::NONE);
        root.pinned = true;
        Self {
            scopes: vec![root],
            free: Vec::new(),
        }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    fn scope(&self, id: ScopeId) -> &Scope<S> {
        &self.scopes[id.index()]
    }

    fn scope_mut(&mut self, id: ScopeId) -> &mut Scope<S> {
        &mut self.scopes[id.index()]
    }

    /// Open a new scope under `parent`, reusing a released slot if any.
    pub fn push(&mut self, parent: Option<ScopeId>, intercepts: UnwindSet) -> ScopeId {
        let scope = Scope::new(parent, intercepts);
        if let Some(id) = self.free.pop() {
            self.scopes[id.index()] = scope;
            id
        } else {
            let id = ScopeId(self.scopes.len() as u32);
            self.scopes.push(scope);
            id
        }
    }

    /// Open a labelled scope (module or enum body).
    pub fn push_labelled(
        &mut self,
        parent: Option<ScopeId>,
        label: impl Into<String>,
    ) -> ScopeId {
        let id = self.push(parent, UnwindSet::NONE);
        self.scope_mut(id).label = Some(label.into());
        id
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.scope(id).parent
    }

    pub fn set_parent(&mut self, id: ScopeId, parent: Option<ScopeId>) {
        self.scope_mut(id).parent = parent;
    }

    /// Keep `id` and all of its ancestors alive for as long as the tree
    /// lives; pinned scopes are never released or reused.
    pub fn pin(&mut self, id: ScopeId) {
        let mut current = Some(id);
        while let Some(scope) = current {
            let entry = self.scope_mut(scope);
            if entry.pinned {
                break;
            }
            entry.pinned = true;
            current = entry.parent;
        }
    }

    /// Give an unpinned scope's slot back to the arena.
    ///
    /// The caller guarantees nothing refers to `id` afterwards. Pinned scopes
    /// are left untouched.
    pub fn release(&mut self, id: ScopeId) {
        let scope = self.scope_mut(id);
        if scope.pinned {
            return;
        }
        scope.symbols.clear();
        scope.order.clear();
        self.free.push(id);
    }

    /// Number of slots currently holding a live scope.
    pub fn live_count(&self) -> usize {
        self.scopes.len() - self.free.len()
    }

    // ── Symbols ──

    /// Register `symbol` under `name` in `scope`.
    ///
    /// Fails if `scope` itself already has that name. Shadowing a name from
    /// an ancestor is allowed.
    pub fn add_symbol(
        &mut self,
        scope: ScopeId,
        name: impl Into<String>,
        symbol: S,
    ) -> Result<(), AlreadyDeclared> {
        let name = name.into();
        let entry = self.scope_mut(scope);
        if entry.symbols.contains_key(&name) {
            return Err(AlreadyDeclared { name });
        }
        entry.order.push(name.clone());
        entry.symbols.insert(name, symbol);
        Ok(())
    }

    pub fn remove_symbol(&mut self, scope: ScopeId, name: &str) -> Option<S> {
        let entry = self.scope_mut(scope);
        let removed = entry.symbols.remove(name)?;
        entry.order.retain(|n| n != name);
        Some(removed)
    }

    pub fn contains_local(&self, scope: ScopeId, name: &str) -> bool {
        self.scope(scope).symbols.contains_key(name)
    }

    /// Find `name`, walking ancestors when `search_ancestors` is set.
    ///
    /// Returns the scope that owns the symbol alongside it.
    pub fn lookup(
        &self,
        scope: ScopeId,
        name: &str,
        search_ancestors: bool,
    ) -> Option<(ScopeId, &S)> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let entry = self.scope(id);
            if let Some(symbol) = entry.symbols.get(name) {
                return Some((id, symbol));
            }
            if !search_ancestors {
                return None;
            }
            current = entry.parent;
        }
        None
    }

    pub fn get(&self, scope: ScopeId, name: &str) -> Option<&S> {
        self.scope(scope).symbols.get(name)
    }

    pub fn get_mut(&mut self, scope: ScopeId, name: &str) -> Option<&mut S> {
        self.scope_mut(scope).symbols.get_mut(name)
    }

    /// Names declared in `scope`, in declaration order.
    pub fn names(&self, scope: ScopeId) -> Vec<String> {
        self.scope(scope).order.clone()
    }

    // ── Unwinding ──

    /// Mark `scope` and its ancestors as unwinding for `kind`, stopping at
    /// the first scope (inclusive) that intercepts it.
    pub fn unwind(&mut self, scope: ScopeId, kind: UnwindKind) {
        let mut current = Some(scope);
        while let Some(id) = current {
            let entry = self.scope_mut(id);
            entry.unwinding = Some(kind);
            if entry.intercepts.contains(kind) {
                return;
            }
            current = entry.parent;
        }
    }

    pub fn unwind_status(&self, scope: ScopeId) -> Option<UnwindKind> {
        self.scope(scope).unwinding
    }

    pub fn stop_unwinding(&mut self, scope: ScopeId) {
        self.scope_mut(scope).unwinding = None;
    }

    /// Undo an [`unwind`](Self::unwind) of `kind` that passed through
    /// `scope`, up to and including the scope that intercepted it.
    pub fn cancel_unwind(&mut self, scope: ScopeId, kind: UnwindKind) {
        let mut current = Some(scope);
        while let Some(id) = current {
            let entry = self.scope_mut(id);
            if entry.unwinding == Some(kind) {
                entry.unwinding = None;
            }
            if entry.intercepts.contains(kind) {
                return;
            }
            current = entry.parent;
        }
    }

    /// Whether some scope from `scope` upward intercepts `kind`.
    ///
    /// Loop events never leave a function body: the walk for `break` and
    /// `continue` stops at the first scope that intercepts `return`.
    /// Labelled scopes (module and enum bodies) stop every event.
    pub fn can_unwind(&self, scope: ScopeId, kind: UnwindKind) -> bool {
        let mut current = Some(scope);
        while let Some(id) = current {
            let entry = self.scope(id);
            if entry.intercepts.contains(kind) {
                return true;
            }
            if entry.intercepts.contains(UnwindKind::Return) || entry.label.is_some() {
                return false;
            }
            current = entry.parent;
        }
        false
    }

    // ── Naming ──

    /// `outer::inner::name`, built from the labels of enclosing scopes.
    pub fn qualified_name(&self, scope: ScopeId, name: &str) -> String {
        let mut parts = vec![name.to_string()];
        let mut current = Some(scope);
        while let Some(id) = current {
            let entry = self.scope(id);
            if let Some(label) = &entry.label {
                parts.push(label.clone());
            }
            current = entry.parent;
        }
        parts.reverse();
        parts.join("::")
    }
}

impl<S: Clone> ScopeTree<S> {
    /// Capture every symbol of `scope` for a later [`restore`](Self::restore).
    pub fn snapshot(&self, scope: ScopeId) -> ScopeSnapshot<S> {
        let entry = self.scope(scope);
        let symbols = entry
            .order
            .iter()
            .filter_map(|name| Some((name.clone(), entry.symbols.get(name)?.clone())))
            .collect();
        ScopeSnapshot { scope, symbols }
    }

    /// Put a scope's symbols back exactly as they were captured, dropping
    /// names declared since and undoing in-place changes.
    pub fn restore(&mut self, snapshot: ScopeSnapshot<S>) {
        let entry = self.scope_mut(snapshot.scope);
        entry.symbols.clear();
        entry.order.clear();
        for (name, symbol) in snapshot.symbols {
            entry.order.push(name.clone());
            entry.symbols.insert(name, symbol);
        }
    }

    /// Structural copy of `scope`: same symbols, label and intercepts, no parent.
    pub fn copy(&mut self, scope: ScopeId) -> ScopeId {
        let source = self.scope(scope);
        let mut copy = Scope::new(None, source.intercepts);
        copy.label = source.label.clone();
        copy.symbols = source.symbols.clone();
        copy.order = source.order.clone();
        let id = self.push(None, UnwindSet::NONE);
        self.scopes[id.index()] = copy;
        id
    }
}

impl<S> Default for ScopeTree<S> {
    fn default() -> Self {
        Self::new()
    }
}
