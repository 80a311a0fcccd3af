//! Odo semantic analyzer: walks a parsed AST, resolves names and checks types.
//!
//! Entry points: [`Analyzer::analyze`] for a self-contained program and
//! [`Analyzer::analyze_session`] for REPL input.
//!
//! Every statement list is checked in two phases. Enum, module and function
//! declarations are hoisted first, so they can be referenced before the line
//! that declares them. Module and function bodies stay deferred on their
//! symbol until something resolves the name, or until the declaring list
//! ends, whichever happens first.

use std::rc::Rc;

use odo_types::ast::*;
use odo_types::{
    ensure_sufficient_stack, OdoError, ParamType, Result, ScopeId, TypeId, TypeTable, UnwindKind,
    UnwindSet,
};

use crate::env::{DeferredBody, Symbol, TypeEnv};

/// Static type of an expression; `None` when it provides no value.
type Typed = Option<TypeId>;

/// Return contract of the function body being analyzed.
#[derive(Debug, Clone, Copy)]
struct FunctionDetails {
    ret: Option<TypeId>,
    returns_value: bool,
}

enum Deferred {
    Function(DeferredBody, TypeId),
    Module(Rc<ModuleDecl>, ScopeId),
}

/// Renders `a`, `a::b::c` or `expression` for diagnostics.
fn path_name(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Variable(name) => name.clone(),
        ExprKind::StaticAccess { target, name } => format!("{}::{}", path_name(target), name.name),
        ExprKind::Func(decl) => decl.display_name().to_string(),
        _ => "expression".to_string(),
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Analyzer
// ══════════════════════════════════════════════════════════════════════════════

/// Walks a parsed [`Program`] and validates names, types and control flow.
pub struct Analyzer<'a> {
    env: &'a mut TypeEnv,
    types: &'a mut TypeTable,
    current: ScopeId,
    functions: Vec<FunctionDetails>,
}

impl<'a> Analyzer<'a> {
    pub fn new(env: &'a mut TypeEnv, types: &'a mut TypeTable) -> Self {
        let current = env.global();
        Self {
            env,
            types,
            current,
            functions: Vec::new(),
        }
    }

    /// Check a whole program in a fresh scope under the global one.
    ///
    /// Returns the static type of the last statement.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn analyze(&mut self, program: &Program) -> Result<Typed> {
        self.current = self.env.global();
        let result = self.with_scope(UnwindSet::NONE, |this| this.check_statements(&program.stmts));
        tracing::debug!(
            statements = program.stmts.len(),
            ok = result.is_ok(),
            "analysis finished"
        );
        result
    }

    /// Check REPL input directly in the session scope.
    ///
    /// On failure the session may hold changes made by `stmts`; callers
    /// undo them with [`TypeEnv::restore_session`].
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn analyze_session(&mut self, stmts: &[Stmt]) -> Result<Typed> {
        self.current = self.env.session();
        self.check_statements(stmts)
    }

    // ══════════════════════════════════════════════════════════════════════
    // Scopes
    // ══════════════════════════════════════════════════════════════════════

    /// Run `f` in a new child of the current scope, then discard it.
    fn with_scope<T>(
        &mut self,
        intercepts: UnwindSet,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let saved = self.current;
        let scope = self.env.scopes.push(Some(saved), intercepts);
        tracing::trace!(scope = scope.index(), "enter scope");
        self.current = scope;
        let result = f(self);
        self.current = saved;
        self.env.scopes.release(scope);
        result
    }

    fn unwinding(&self) -> Option<UnwindKind> {
        self.env.scopes.unwind_status(self.current)
    }

    /// Forget an unwind that only some paths through a construct take.
    fn settle_unwind(&mut self, was_unwinding: bool) {
        if was_unwinding {
            return;
        }
        if let Some(kind) = self.unwinding() {
            self.env.scopes.cancel_unwind(self.current, kind);
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Resolution
    // ══════════════════════════════════════════════════════════════════════

    /// Find `name` from the current scope upward, completing any deferred
    /// body it still carries.
    fn resolve(&mut self, name: &str) -> Result<Option<Symbol>> {
        let Some((owner, _)) = self.env.scopes.lookup(self.current, name, true) else {
            return Ok(None);
        };
        self.consume(owner, name)?;
        Ok(self.env.scopes.get(owner, name).cloned())
    }

    /// Like [`resolve`](Self::resolve), restricted to `scope` itself.
    fn resolve_in(&mut self, scope: ScopeId, name: &str) -> Result<Option<Symbol>> {
        self.consume(scope, name)?;
        Ok(self.env.scopes.get(scope, name).cloned())
    }

    /// Run the deferred body of `owner::name`, at most once.
    ///
    /// A failing body removes the symbol before the error propagates.
    fn consume(&mut self, owner: ScopeId, name: &str) -> Result<()> {
        let deferred = match self.env.scopes.get_mut(owner, name) {
            Some(Symbol::Function { ty, pending }) => {
                pending.take().map(|body| Deferred::Function(body, *ty))
            }
            Some(Symbol::Module { scope, pending }) => {
                pending.take().map(|decl| Deferred::Module(decl, *scope))
            }
            _ => None,
        };
        let Some(deferred) = deferred else {
            return Ok(());
        };
        tracing::debug!(name, "consume deferred entry");
        let result = match deferred {
            Deferred::Function(body, ty) => self.check_function_body(&body.decl, body.scope, ty),
            Deferred::Module(decl, scope) => self.check_module_body(&decl, scope),
        };
        if result.is_err() {
            self.env.scopes.remove_symbol(owner, name);
        }
        result
    }

    /// Complete every deferred entry left in `scope`, in declaration order.
    fn finish_pending(&mut self, scope: ScopeId) -> Result<()> {
        for name in self.env.scopes.names(scope) {
            let pending = self
                .env
                .scopes
                .get(scope, &name)
                .is_some_and(Symbol::is_pending);
            if pending {
                self.consume(scope, &name)?;
            }
        }
        Ok(())
    }

    /// Symbol named by a variable or `a::b` expression.
    fn lookup_path(&mut self, expr: &Expr) -> Result<Option<Symbol>> {
        match &expr.kind {
            ExprKind::Variable(name) => match self.resolve(name)? {
                Some(symbol) => Ok(Some(symbol)),
                None => Err(OdoError::name(format!(
                    "Variable called `{name}` not defined."
                ))),
            },
            ExprKind::StaticAccess { target, name } => {
                let scope = self.static_scope(target)?;
                match self.resolve_in(scope, &name.name)? {
                    Some(symbol) => Ok(Some(symbol)),
                    None => Err(OdoError::name(format!(
                        "Symbol `{}` not found in `{}`.",
                        name.name,
                        path_name(target)
                    ))
                    .with_span(name.span)),
                }
            }
            _ => Ok(None),
        }
    }

    /// Scope searched by `target::name`.
    fn static_scope(&mut self, target: &Expr) -> Result<ScopeId> {
        match self.lookup_path(target) {
            Ok(Some(Symbol::Module { scope, .. } | Symbol::Enum { scope, .. })) => Ok(scope),
            Ok(Some(_)) => Err(OdoError::name(format!(
                "Cannot access static symbol in `{}`.",
                path_name(target)
            ))),
            Ok(None) => Err(OdoError::value("Invalid static access on unknown symbol.")),
            Err(err) => Err(err),
        }
    }

    /// Static type of a symbol used as a value.
    fn symbol_value(&self, name: &str, symbol: &Symbol) -> Result<Typed> {
        match symbol {
            Symbol::Var {
                initialized: false, ..
            } => Err(OdoError::value(format!(
                "Using variable `{name}` when it hasn't been initialized."
            ))),
            Symbol::Var { ty, .. } | Symbol::Function { ty, .. } => Ok(Some(*ty)),
            Symbol::Native(_) => Ok(Some(TypeId::NATIVE_FUNCTION)),
            Symbol::EnumCase(ty) => Ok(Some(*ty)),
            Symbol::Module { .. } => Ok(None),
            Symbol::Type(_) | Symbol::Enum { .. } => Err(OdoError::value(format!(
                "Type `{name}` cannot be used as a value."
            ))),
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Types
    // ══════════════════════════════════════════════════════════════════════

    fn resolve_type(&mut self, ann: &TypeAnnotation) -> Result<TypeId> {
        self.resolve_type_inner(ann).map_err(|err| err.with_span(ann.span))
    }

    fn resolve_type_inner(&mut self, ann: &TypeAnnotation) -> Result<TypeId> {
        match &ann.kind {
            TypeAnnotationKind::Named(path) => self.resolve_named_type(path),
            TypeAnnotationKind::Function { params, ret } => {
                let mut resolved = Vec::with_capacity(params.len());
                for param in params {
                    resolved.push(ParamType {
                        ty: self.resolve_type(&param.ty)?,
                        optional: param.optional,
                    });
                }
                let ret = match ret {
                    Some(ret) => Some(self.resolve_type(ret)?),
                    None => None,
                };
                Ok(self.types.function(ret, resolved))
            }
        }
    }

    fn resolve_named_type(&mut self, path: &[Ident]) -> Result<TypeId> {
        let Some((first, rest)) = path.split_first() else {
            return Err(OdoError::syntax("Empty type name."));
        };
        let unknown = |ident: &Ident| {
            OdoError::name(format!("Unknown type `{}`.", ident.name)).with_span(ident.span)
        };
        let mut symbol = self.resolve(&first.name)?.ok_or_else(|| unknown(first))?;
        let mut shown = first.name.clone();
        for ident in rest {
            let scope = match symbol {
                Symbol::Module { scope, .. } | Symbol::Enum { scope, .. } => scope,
                _ => {
                    return Err(OdoError::name(format!(
                        "Cannot access static symbol in `{shown}`."
                    )))
                }
            };
            symbol = self.resolve_in(scope, &ident.name)?.ok_or_else(|| unknown(ident))?;
            shown = format!("{shown}::{}", ident.name);
        }
        match symbol {
            Symbol::Type(ty) | Symbol::Enum { ty, .. } => Ok(ty),
            _ => Err(OdoError::type_error(format!(
                "Symbol `{shown}` is not a valid type."
            ))),
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Statement lists & hoisting
    // ══════════════════════════════════════════════════════════════════════

    fn check_statements(&mut self, stmts: &[Stmt]) -> Result<Typed> {
        self.hoist(stmts)?;
        let mut last = None;
        let mut reported = false;
        for stmt in stmts {
            if !reported && self.unwinding().is_some() {
                tracing::debug!(line = stmt.span.start_line, "unreachable statement");
                reported = true;
            }
            last = self.check_stmt(stmt)?;
        }
        self.finish_pending(self.current)?;
        Ok(last)
    }

    /// Register enums, then modules, then function signatures.
    fn hoist(&mut self, stmts: &[Stmt]) -> Result<()> {
        for stmt in stmts {
            if let StmtKind::Enum(decl) = &stmt.kind {
                self.declare_enum(decl).map_err(|e| e.with_span(stmt.span))?;
            }
        }
        for stmt in stmts {
            if let StmtKind::Module(decl) = &stmt.kind {
                self.declare_module(decl).map_err(|e| e.with_span(stmt.span))?;
            }
        }
        for stmt in stmts {
            if let StmtKind::Func(decl) = &stmt.kind {
                self.declare_function(decl).map_err(|e| e.with_span(stmt.span))?;
            }
        }
        Ok(())
    }

    fn declare_enum(&mut self, decl: &EnumDecl) -> Result<()> {
        let qualified = self.env.scopes.qualified_name(self.current, &decl.name.name);
        let ty = self.types.enum_type(&qualified, decl.name.span);
        let scope = self.env.scopes.push_labelled(None, qualified);
        for case in &decl.cases {
            if self
                .env
                .scopes
                .add_symbol(scope, &case.name, Symbol::EnumCase(ty))
                .is_err()
            {
                self.env.scopes.release(scope);
                return Err(OdoError::name(format!(
                    "Symbol called `{}` already exists in this scope.",
                    case.name
                ))
                .with_span(case.span));
            }
        }
        if self
            .env
            .scopes
            .add_symbol(self.current, &decl.name.name, Symbol::Enum { ty, scope })
            .is_err()
        {
            self.env.scopes.release(scope);
            return Err(OdoError::name(format!(
                "Symbol called `{}` already exists in this scope.",
                decl.name.name
            ))
            .with_span(decl.name.span));
        }
        Ok(())
    }

    fn declare_module(&mut self, decl: &Rc<ModuleDecl>) -> Result<()> {
        let scope = self.env.scopes.push_labelled(Some(self.current), &decl.name.name);
        let symbol = Symbol::Module {
            scope,
            pending: Some(Rc::clone(decl)),
        };
        if self
            .env
            .scopes
            .add_symbol(self.current, &decl.name.name, symbol)
            .is_err()
        {
            self.env.scopes.release(scope);
            return Err(OdoError::name(format!(
                "Symbol called `{}` already exists in this scope.",
                decl.name.name
            ))
            .with_span(decl.name.span));
        }
        Ok(())
    }

    fn declare_function(&mut self, decl: &Rc<FuncDecl>) -> Result<()> {
        let name = decl.display_name().to_string();
        let (ty, scope) = self.function_signature(decl)?;
        let symbol = Symbol::Function {
            ty,
            pending: Some(DeferredBody {
                decl: Rc::clone(decl),
                scope,
            }),
        };
        if self.env.scopes.add_symbol(self.current, &name, symbol).is_err() {
            self.env.scopes.release(scope);
            return Err(OdoError::name(format!(
                "Function called `{name}` already exists in this scope."
            )));
        }
        Ok(())
    }

    // ══════════════════════════════════════════════════════════════════════
    // Functions & modules
    // ══════════════════════════════════════════════════════════════════════

    /// Intern the function's type and open its parameter scope.
    ///
    /// The parameter scope is a copy of the signature's template, parented
    /// to the declaring scope.
    fn function_signature(&mut self, decl: &FuncDecl) -> Result<(TypeId, ScopeId)> {
        let mut params = Vec::with_capacity(decl.params.len());
        let mut seen_optional = false;
        for param in &decl.params {
            let ty = match &param.ty {
                Some(ann) => self.resolve_type(ann)?,
                None => TypeId::ANY,
            };
            let optional = param.init.is_some();
            if seen_optional && !optional {
                return Err(OdoError::semantic(
                    "Cannot define a required parameter after an optional one.",
                )
                .with_span(param.name.span));
            }
            seen_optional |= optional;
            params.push(ParamType { ty, optional });
        }
        let ret = match &decl.ret {
            Some(ann) => Some(self.resolve_type(ann)?),
            None => None,
        };
        let ty = self.types.function(ret, params);
        let template = self.env.signature_scope(ty);
        let scope = self.env.scopes.copy(template);
        self.env.scopes.set_parent(scope, Some(self.current));
        Ok((ty, scope))
    }

    fn check_function_body(&mut self, decl: &FuncDecl, scope: ScopeId, ty: TypeId) -> Result<()> {
        let ret = self.types.signature(ty).and_then(|sig| sig.ret);
        let saved = self.current;
        self.current = scope;
        self.functions.push(FunctionDetails {
            ret,
            returns_value: false,
        });
        let result = self.check_parameters_and_body(decl, ty);
        let details = self.functions.pop();
        self.current = saved;
        self.env.scopes.release(scope);
        result?;

        let returned = details.is_some_and(|d| d.returns_value);
        if ret.is_some() && !returned {
            return Err(
                OdoError::semantic("Function ends without returning a value.").with_span(decl.span)
            );
        }
        Ok(())
    }

    fn check_parameters_and_body(&mut self, decl: &FuncDecl, ty: TypeId) -> Result<()> {
        let params = self
            .types
            .signature(ty)
            .map(|sig| sig.params.clone())
            .unwrap_or_default();
        for (param, spec) in decl.params.iter().zip(params) {
            let name = &param.name.name;
            if let Some(init) = &param.init {
                let value = self.check_expr(init)?.ok_or_else(|| {
                    OdoError::value(format!(
                        "Initial expression for declaration of `{name}` does not provide a value."
                    ))
                })?;
                if !self.types.counts_as(value, spec.ty) {
                    return Err(self.declaration_mismatch(name, spec.ty, value).with_span(init.span));
                }
            }
            let symbol = Symbol::Var {
                ty: spec.ty,
                constant: false,
                initialized: true,
            };
            if self.env.scopes.add_symbol(self.current, name, symbol).is_err() {
                return Err(OdoError::name(format!("Variable called `{name}` already exists."))
                    .with_span(param.name.span));
            }
        }
        self.with_scope(UnwindSet::FUNCTION, |this| {
            ensure_sufficient_stack(|| this.check_statements(&decl.body.stmts))
        })?;
        Ok(())
    }

    fn check_module_body(&mut self, decl: &ModuleDecl, scope: ScopeId) -> Result<()> {
        let saved = self.current;
        // A module body is never part of an enclosing function.
        let functions = std::mem::take(&mut self.functions);
        self.current = scope;
        let result = self
            .check_statements(&decl.body)
            .and_then(|_| self.check_module_initialized(scope));
        self.current = saved;
        self.functions = functions;
        result
    }

    fn check_module_initialized(&self, scope: ScopeId) -> Result<()> {
        for name in self.env.scopes.names(scope) {
            if let Some(Symbol::Var {
                initialized: false, ..
            }) = self.env.scopes.get(scope, &name)
            {
                return Err(OdoError::semantic(format!(
                    "Symbol `{name}` in module was not initialized."
                )));
            }
        }
        Ok(())
    }

    // ══════════════════════════════════════════════════════════════════════
    // Statements
    // ══════════════════════════════════════════════════════════════════════

    fn check_stmt(&mut self, stmt: &Stmt) -> Result<Typed> {
        ensure_sufficient_stack(|| self.check_stmt_inner(stmt)).map_err(|e| e.with_span(stmt.span))
    }

    fn check_stmt_inner(&mut self, stmt: &Stmt) -> Result<Typed> {
        match &stmt.kind {
            StmtKind::Expr(expr) => self.check_expr(expr),
            StmtKind::VarDecl(decl) => {
                self.check_var_decl(decl)?;
                Ok(None)
            }
            StmtKind::Block(block) => {
                self.with_scope(UnwindSet::NONE, |this| this.check_statements(&block.stmts))
            }
            StmtKind::If(stmt) => {
                let was_unwinding = self.unwinding().is_some();
                let all_paths = self.check_if(stmt)?;
                if !all_paths {
                    self.settle_unwind(was_unwinding);
                }
                Ok(None)
            }
            StmtKind::Loop(body) => {
                self.check_loop(body, |_| Ok(()))?;
                Ok(None)
            }
            StmtKind::While { cond, body } => {
                self.check_loop(body, |this| {
                    let ty = this.check_expr(cond)?;
                    if ty != Some(TypeId::BOOL) {
                        return Err(OdoError::type_error(
                            "Condition expression of while statement must be boolean.",
                        )
                        .with_span(cond.span));
                    }
                    Ok(())
                })?;
                Ok(None)
            }
            StmtKind::Forange(forange) => {
                self.check_forange(forange)?;
                Ok(None)
            }
            StmtKind::Break => self.check_jump(UnwindKind::Break),
            StmtKind::Continue => self.check_jump(UnwindKind::Continue),
            StmtKind::Return(value) => {
                self.check_return(value.as_ref())?;
                Ok(None)
            }
            // Declared while hoisting.
            StmtKind::Func(_) | StmtKind::Module(_) | StmtKind::Enum(_) => Ok(None),
        }
    }

    fn check_var_decl(&mut self, decl: &VarDecl) -> Result<()> {
        let name = &decl.name.name;
        let declared = match &decl.ty {
            Some(ann) => self.resolve_type(ann)?,
            None => TypeId::ANY,
        };
        let (ty, initialized) = match &decl.init {
            Some(init) => {
                let value = self.check_expr(init)?.ok_or_else(|| {
                    OdoError::value(format!(
                        "Initial expression for declaration of `{name}` does not provide a value."
                    ))
                    .with_span(init.span)
                })?;
                (self.adopt(declared, value).ok_or_else(|| {
                    self.declaration_mismatch(name, declared, value).with_span(init.span)
                })?, true)
            }
            None => (declared, false),
        };
        let symbol = Symbol::Var {
            ty,
            constant: decl.constant,
            initialized,
        };
        if self.env.scopes.add_symbol(self.current, name, symbol).is_err() {
            return Err(OdoError::name(format!("Variable called `{name}` already exists."))
                .with_span(decl.name.span));
        }
        Ok(())
    }

    /// Type a slot of type `slot` ends up with after receiving `value`.
    ///
    /// `any` slots take the type of their first value.
    fn adopt(&self, slot: TypeId, value: TypeId) -> Option<TypeId> {
        if slot == TypeId::ANY {
            Some(if value == TypeId::NULL { slot } else { value })
        } else if self.types.counts_as(value, slot) {
            Some(slot)
        } else {
            None
        }
    }

    fn declaration_mismatch(&self, name: &str, expected: TypeId, received: TypeId) -> OdoError {
        OdoError::type_error(format!(
            "Invalid declaration, variable `{name}` expected value of type `{}` but received `{}`.",
            self.types.display(expected),
            self.types.display(received)
        ))
    }

    /// Returns whether every branch unwinds.
    fn check_if(&mut self, stmt: &IfStmt) -> Result<bool> {
        if self.check_expr(&stmt.cond)? != Some(TypeId::BOOL) {
            return Err(OdoError::type_error("Condition of if statement must be boolean.")
                .with_span(stmt.cond.span));
        }
        let then_unwinds = self.check_branch(&stmt.then_block)?;
        let else_unwinds = match &stmt.else_branch {
            None => false,
            Some(ElseBranch::Block(block)) => self.check_branch(block)?,
            Some(ElseBranch::ElseIf(nested)) => self.check_if(nested)?,
        };
        Ok(then_unwinds && else_unwinds)
    }

    fn check_branch(&mut self, block: &Block) -> Result<bool> {
        self.with_scope(UnwindSet::NONE, |this| {
            this.check_statements(&block.stmts)?;
            Ok(this.unwinding().is_some())
        })
    }

    /// A loop scope intercepting `break`/`continue`, prepared by `setup`,
    /// around a block scope for the body.
    fn check_loop(
        &mut self,
        body: &Block,
        setup: impl FnOnce(&mut Self) -> Result<()>,
    ) -> Result<()> {
        let was_unwinding = self.unwinding().is_some();
        self.with_scope(UnwindSet::LOOP, |this| {
            setup(this)?;
            this.with_scope(UnwindSet::NONE, |this| this.check_statements(&body.stmts))
        })?;
        // The body may run zero times.
        self.settle_unwind(was_unwinding);
        Ok(())
    }

    fn check_forange(&mut self, forange: &Forange) -> Result<()> {
        for bound in std::iter::once(&forange.first).chain(forange.second.as_ref()) {
            let ty = self.check_expr(bound)?.ok_or_else(|| {
                OdoError::value("Range value in `forange` must have a type (provide value).")
                    .with_span(bound.span)
            })?;
            if !self.types.is_numeric(ty) {
                return Err(OdoError::type_error(
                    "Values defining the range of forange statement have to be numerical.",
                )
                .with_span(bound.span));
            }
        }
        self.check_loop(&forange.body, |this| {
            if let Some(ident) = &forange.ident {
                let symbol = Symbol::Var {
                    ty: TypeId::INT,
                    constant: true,
                    initialized: true,
                };
                this.env.scopes.add_symbol(this.current, &ident.name, symbol)?;
            }
            Ok(())
        })
    }

    fn check_jump(&mut self, kind: UnwindKind) -> Result<Typed> {
        if !self.env.scopes.can_unwind(self.current, kind) {
            return Err(OdoError::semantic(format!(
                "Invalid use of `{}` statement outside of loop.",
                kind.as_str()
            )));
        }
        self.env.scopes.unwind(self.current, kind);
        Ok(None)
    }

    fn check_return(&mut self, value: Option<&Expr>) -> Result<()> {
        if !self.env.scopes.can_unwind(self.current, UnwindKind::Return) {
            return Err(OdoError::semantic("Use of return statement outside of a function."));
        }
        let Some(details) = self.functions.last().copied() else {
            return Err(OdoError::semantic("Use of return statement outside of a function."));
        };
        match (value, details.ret) {
            (None, None) => {}
            (None, Some(expected)) => {
                return Err(OdoError::value(format!(
                    "Expected value of type `{}` in return.",
                    self.types.display(expected)
                )));
            }
            (Some(expr), None) => {
                if self.check_expr(expr)?.is_some() {
                    return Err(OdoError::value("Invalid return in void function.")
                        .with_span(expr.span));
                }
            }
            (Some(expr), Some(expected)) => {
                let ty = self.check_expr(expr)?.ok_or_else(|| {
                    OdoError::value("Expression in return statement doesn't provide a value.")
                        .with_span(expr.span)
                })?;
                if !self.types.counts_as(ty, expected) {
                    return Err(OdoError::type_error(format!(
                        "Returning value with invalid type. Expected `{}` but received `{}`.",
                        self.types.display(expected),
                        self.types.display(ty)
                    ))
                    .with_span(expr.span));
                }
                if let Some(top) = self.functions.last_mut() {
                    top.returns_value = true;
                }
            }
        }
        self.env.scopes.unwind(self.current, UnwindKind::Return);
        Ok(())
    }

    // ══════════════════════════════════════════════════════════════════════
    // Expressions
    // ══════════════════════════════════════════════════════════════════════

    fn check_expr(&mut self, expr: &Expr) -> Result<Typed> {
        ensure_sufficient_stack(|| self.check_expr_inner(expr)).map_err(|e| e.with_span(expr.span))
    }

    fn check_expr_inner(&mut self, expr: &Expr) -> Result<Typed> {
        match &expr.kind {
            ExprKind::Int(_) => Ok(Some(TypeId::INT)),
            ExprKind::Double(_) => Ok(Some(TypeId::DOUBLE)),
            ExprKind::Text(_) => Ok(Some(TypeId::TEXT)),
            ExprKind::Bool(_) => Ok(Some(TypeId::BOOL)),
            ExprKind::Variable(_) | ExprKind::StaticAccess { .. } => {
                match self.lookup_path(expr)? {
                    Some(symbol) => self.symbol_value(&path_name(expr), &symbol),
                    None => Ok(None),
                }
            }
            ExprKind::Unary { operand, .. } => match self.check_expr(operand)? {
                Some(ty) if self.types.is_numeric(ty) => Ok(Some(ty)),
                _ => Err(OdoError::type_error(
                    "Invalid unary operator, can only be used in numeric values.",
                )),
            },
            ExprKind::Binary { left, op, right } => self.check_binary(left, *op, right),
            ExprKind::Ternary {
                cond,
                then_expr,
                else_expr,
                result_ty,
            } => {
                if self.check_expr(cond)? != Some(TypeId::BOOL) {
                    return Err(OdoError::type_error(
                        "Condition of ternary expression must be boolean.",
                    ));
                }
                let then_ty = self.check_expr(then_expr)?.ok_or_else(|| {
                    OdoError::value("True branch in ternary operator must have a type (provide value).")
                })?;
                let else_ty = self.check_expr(else_expr)?.ok_or_else(|| {
                    OdoError::value("False branch in ternary operator must have a type (provide value).")
                })?;
                if !self.types.counts_as(then_ty, else_ty) {
                    return Err(OdoError::type_error(
                        "Both branches in ternary operator must return the same type.",
                    ));
                }
                // The false branch decides; the interpreter coerces to it.
                result_ty.set(Some(else_ty));
                Ok(Some(else_ty))
            }
            ExprKind::Call { callee, args } => self.check_call(callee, args),
            ExprKind::Assign { target, value } => {
                self.check_assign(target, value)?;
                Ok(None)
            }
            ExprKind::Func(decl) => {
                let (ty, scope) = self.function_signature(decl)?;
                self.check_function_body(decl, scope, ty)?;
                Ok(Some(ty))
            }
        }
    }

    fn check_binary(&mut self, left: &Expr, op: BinOp, right: &Expr) -> Result<Typed> {
        let lhs = self
            .check_expr(left)?
            .ok_or_else(|| OdoError::value("Left operand in binary operation has no value."))?;
        let rhs = self
            .check_expr(right)?
            .ok_or_else(|| OdoError::value("Right operand in binary operation has no value."))?;

        match op.class() {
            OpClass::Arithmetic => self.arithmetic_type(op, lhs, rhs).map(Some),
            OpClass::Logic => {
                for (side, ty) in [("Left", lhs), ("Right", rhs)] {
                    if ty != TypeId::BOOL {
                        return Err(OdoError::type_error(format!(
                            "{side} operand in logic operation `{op}` is not boolean. Has type `{}`.",
                            self.types.display(ty)
                        )));
                    }
                }
                Ok(Some(TypeId::BOOL))
            }
            OpClass::Equality => {
                if self.types.counts_as(lhs, rhs) || self.types.counts_as(rhs, lhs) {
                    Ok(Some(TypeId::BOOL))
                } else {
                    Err(OdoError::type_error(format!(
                        "Invalid equality operation `{op}`. Values have incompatible types `{}` and `{}`.",
                        self.types.display(lhs),
                        self.types.display(rhs)
                    )))
                }
            }
            OpClass::Relational => {
                if self.types.is_numeric(lhs) && self.types.is_numeric(rhs) {
                    Ok(Some(TypeId::BOOL))
                } else {
                    Err(OdoError::type_error(format!(
                        "Invalid relational operation `{op}`. Operands must be of numeric types."
                    )))
                }
            }
        }
    }

    fn arithmetic_type(&self, op: BinOp, lhs: TypeId, rhs: TypeId) -> Result<TypeId> {
        if lhs == TypeId::TEXT || rhs == TypeId::TEXT {
            return match op {
                BinOp::Add => Ok(TypeId::TEXT),
                BinOp::Mul if lhs == TypeId::INT || rhs == TypeId::INT => Ok(TypeId::TEXT),
                BinOp::Mul => Err(OdoError::type_error(
                    "Text can only be multiplied by an integer.",
                )),
                _ => Err(OdoError::semantic(format!(
                    "Invalid operation between texts `{op}`."
                ))),
            };
        }
        if !self.types.is_numeric(lhs) || !self.types.is_numeric(rhs) {
            return Err(OdoError::type_error(format!(
                "Arithmetic operation `{op}` can only be used with numeric values."
            )));
        }
        if op == BinOp::Div || lhs == TypeId::DOUBLE || rhs == TypeId::DOUBLE {
            Ok(TypeId::DOUBLE)
        } else {
            Ok(TypeId::INT)
        }
    }

    fn check_call(&mut self, callee: &Expr, args: &[Expr]) -> Result<Typed> {
        let name = path_name(callee);
        let callee_ty = match self.lookup_path(callee)? {
            Some(Symbol::Native(signature)) => {
                let arg_types = self.check_args(args)?;
                return signature.validate(&name, &arg_types, self.types);
            }
            Some(symbol) => self.symbol_value(&name, &symbol)?,
            None => self.check_expr(callee)?,
        };
        let Some(callee_ty) = callee_ty else {
            return Err(OdoError::type_error(format!(
                "Invalid function call. `{name}` is not a function."
            )));
        };
        if callee_ty == TypeId::NATIVE_FUNCTION {
            self.check_args(args)?;
            return Ok(None);
        }
        let Some(signature) = self.types.signature(callee_ty).cloned() else {
            return Err(OdoError::type_error(format!(
                "Invalid function call. Value of type `{}` is not a function.",
                self.types.display(callee_ty)
            )));
        };

        if args.len() > signature.params.len() {
            return Err(OdoError::semantic(format!(
                "Function `{name}` takes a maximum of {} arguments, but was called with {}.",
                signature.params.len(),
                args.len()
            )));
        }
        if args.len() < signature.required_count() {
            return Err(OdoError::value(format!(
                "No value for function call argument {}.",
                args.len()
            )));
        }
        for (index, (arg, param)) in args.iter().zip(&signature.params).enumerate() {
            let ty = self.check_expr(arg)?.ok_or_else(|| {
                OdoError::value(format!(
                    "Function call argument {index} does not provide a value."
                ))
                .with_span(arg.span)
            })?;
            if !self.types.counts_as(ty, param.ty) {
                return Err(OdoError::type_error(format!(
                    "Invalid type for argument {index} of function. Expected type `{}` but received `{}`.",
                    self.types.display(param.ty),
                    self.types.display(ty)
                ))
                .with_span(arg.span));
            }
        }
        Ok(signature.ret)
    }

    fn check_args(&mut self, args: &[Expr]) -> Result<Vec<Typed>> {
        args.iter().map(|arg| self.check_expr(arg)).collect()
    }

    fn check_assign(&mut self, target: &Expr, value: &Expr) -> Result<()> {
        let value_ty = self.check_expr(value)?;
        let (owner, name) = match &target.kind {
            ExprKind::Variable(name) => match self.env.scopes.lookup(self.current, name, true) {
                Some((owner, _)) => (owner, name.clone()),
                None => {
                    return Err(OdoError::name(format!(
                        "Assignment to unknown variable `{name}`."
                    )))
                }
            },
            ExprKind::StaticAccess { target: inner, name } => {
                let scope = self.static_scope(inner)?;
                if !self.env.scopes.contains_local(scope, &name.name) {
                    return Err(OdoError::name(format!(
                        "Symbol `{}` not found in `{}`.",
                        name.name,
                        path_name(inner)
                    )));
                }
                (scope, name.name.clone())
            }
            _ => return Err(OdoError::syntax("Invalid assignment to non-variable.")),
        };
        self.consume(owner, &name)?;
        let shown = path_name(target);

        let Some(Symbol::Var {
            ty,
            constant,
            initialized,
        }) = self.env.scopes.get(owner, &name).cloned()
        else {
            return Err(OdoError::semantic(format!(
                "Invalid assignment to symbol `{shown}`."
            )));
        };
        let Some(value_ty) = value_ty else {
            return Err(OdoError::semantic(format!(
                "Invalid assignment to symbol `{shown}`. Operation doesn't provide a value."
            )));
        };
        if constant && initialized {
            return Err(OdoError::semantic(format!(
                "Invalid assignment to constant `{shown}`."
            )));
        }
        let Some(new_ty) = self.adopt(ty, value_ty) else {
            return Err(OdoError::type_error(format!(
                "Invalid assignment, variable `{shown}` expected value of type `{}` but received `{}`.",
                self.types.display(ty),
                self.types.display(value_ty)
            )));
        };
        if let Some(slot) = self.env.scopes.get_mut(owner, &name) {
            *slot = Symbol::Var {
                ty: new_ty,
                constant,
                initialized: true,
            };
        }
        Ok(())
    }
}
