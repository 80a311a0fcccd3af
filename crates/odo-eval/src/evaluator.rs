//! Core statement and expression evaluator.
//!
//! Runs an AST the analyzer has already accepted, over the interpreter's own
//! scope tree. Statement lists are hoisted the same way the analyzer hoists
//! them, so forward references resolve to the same declarations. Control
//! flow travels as a [`Flow`] value returned by each statement.

use std::rc::Rc;

use odo_types::ast::*;
use odo_types::{
    ensure_sufficient_stack, OdoError, ParamType, Result, ScopeId, TypeId, TypeTable, UnwindSet,
};

use crate::config::EngineConfig;
use crate::env::{Binding, Environment};
use crate::value::{NativeFunction, ScriptedFunction, Value};

/// How a statement finished.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Flow {
    Completed(Value),
    Break,
    Continue,
    Return(Value),
}

impl Flow {
    fn into_value(self) -> Value {
        match self {
            Flow::Completed(value) | Flow::Return(value) => value,
            Flow::Break | Flow::Continue => Value::Null,
        }
    }
}

fn path_name(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Variable(name) => name.clone(),
        ExprKind::StaticAccess { target, name } => format!("{}::{}", path_name(target), name.name),
        ExprKind::Func(decl) => decl.display_name().to_string(),
        _ => "expression".to_string(),
    }
}

/// Type a variable ends up with after receiving `value`.
fn adopt(slot: TypeId, value: &Value) -> TypeId {
    if slot == TypeId::ANY && !value.is_null() {
        value.type_id()
    } else {
        slot
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Interpreter
// ══════════════════════════════════════════════════════════════════════════════

/// Tree-walking interpreter bound to an engine's runtime environment.
pub struct Interpreter<'a> {
    env: &'a mut Environment,
    types: &'a mut TypeTable,
    config: &'a EngineConfig,
    current: ScopeId,
    /// Scripted calls currently on the stack.
    depth: usize,
}

impl<'a> Interpreter<'a> {
    pub fn new(env: &'a mut Environment, types: &'a mut TypeTable, config: &'a EngineConfig) -> Self {
        let current = env.global();
        Self {
            env,
            types,
            config,
            current,
            depth: 0,
        }
    }

    /// Execute a whole program in a fresh scope under the global one.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn run(&mut self, program: &Program) -> Result<Value> {
        self.current = self.env.global();
        let flow = self.with_scope(UnwindSet::NONE, |this| this.exec_statements(&program.stmts))?;
        Ok(flow.into_value())
    }

    /// Execute REPL input directly in the session scope.
    pub fn run_session(&mut self, stmts: &[Stmt]) -> Result<Value> {
        self.current = self.env.session();
        Ok(self.exec_statements(stmts)?.into_value())
    }

    // ══════════════════════════════════════════════════════════════════════
    // Scopes
    // ══════════════════════════════════════════════════════════════════════

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

    /// Run `f` with `scope` as the current scope, leaving it alive afterwards.
    fn in_scope<T>(&mut self, scope: ScopeId, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let saved = self.current;
        self.current = scope;
        let result = f(self);
        self.current = saved;
        result
    }

    // ══════════════════════════════════════════════════════════════════════
    // Resolution
    // ══════════════════════════════════════════════════════════════════════

    /// Execute a module body the first time its name is resolved.
    fn consume(&mut self, owner: ScopeId, name: &str) -> Result<()> {
        let (scope, decl) = match self.env.scopes.get_mut(owner, name) {
            Some(Binding::Module { scope, pending }) => match pending.take() {
                Some(decl) => (*scope, decl),
                None => return Ok(()),
            },
            _ => return Ok(()),
        };
        tracing::debug!(name, "instantiate module");
        let result = self.in_scope(scope, |this| this.exec_statements(&decl.body));
        if result.is_err() {
            self.env.scopes.remove_symbol(owner, name);
        }
        result.map(|_| ())
    }

    fn finish_pending(&mut self, scope: ScopeId) -> Result<()> {
        for name in self.env.scopes.names(scope) {
            let pending = matches!(
                self.env.scopes.get(scope, &name),
                Some(Binding::Module {
                    pending: Some(_),
                    ..
                })
            );
            if pending {
                self.consume(scope, &name)?;
            }
        }
        Ok(())
    }

    /// Owning scope and name of a variable or `a::b` expression.
    fn locate(&mut self, expr: &Expr) -> Result<(ScopeId, String)> {
        let (owner, name) = match &expr.kind {
            ExprKind::Variable(name) => match self.env.scopes.lookup(self.current, name, true) {
                Some((owner, _)) => (owner, name.clone()),
                None => {
                    return Err(OdoError::name(format!(
                        "Variable called `{name}` not defined."
                    )))
                }
            },
            ExprKind::StaticAccess { target, name } => {
                let scope = self.static_scope(target)?;
                if !self.env.scopes.contains_local(scope, &name.name) {
                    return Err(OdoError::name(format!(
                        "Symbol `{}` not found in `{}`.",
                        name.name,
                        path_name(target)
                    ))
                    .with_span(name.span));
                }
                (scope, name.name.clone())
            }
            _ => return Err(OdoError::syntax("Expected a name.")),
        };
        self.consume(owner, &name)?;
        Ok((owner, name))
    }

    fn static_scope(&mut self, target: &Expr) -> Result<ScopeId> {
        if !matches!(
            target.kind,
            ExprKind::Variable(_) | ExprKind::StaticAccess { .. }
        ) {
            return Err(OdoError::value("Invalid static access on unknown symbol."));
        }
        let (owner, name) = self.locate(target)?;
        match self.env.scopes.get(owner, &name) {
            Some(Binding::Module { scope, .. } | Binding::Enum { scope, .. }) => Ok(*scope),
            _ => Err(OdoError::name(format!(
                "Cannot access static symbol in `{}`.",
                path_name(target)
            ))),
        }
    }

    /// Value named by a path expression.
    ///
    /// A scripted function read as a value may outlive the call that
    /// created it, so `escaping` pins its captured scope.
    fn load(&mut self, expr: &Expr, escaping: bool) -> Result<Value> {
        let (owner, name) = self.locate(expr)?;
        let value = match self.env.scopes.get(owner, &name) {
            Some(Binding::Var {
                value: Some(value), ..
            }) => value.clone(),
            Some(Binding::Var { value: None, .. }) => {
                return Err(OdoError::value(format!(
                    "Using variable `{}` when it hasn't been initialized.",
                    path_name(expr)
                )))
            }
            Some(Binding::Function(value) | Binding::EnumCase(value)) => value.clone(),
            Some(Binding::Module { scope, .. }) => Value::Module {
                name: name.as_str().into(),
                scope: *scope,
            },
            Some(Binding::Type(_) | Binding::Enum { .. }) => {
                return Err(OdoError::value(format!(
                    "Type `{}` cannot be used as a value.",
                    path_name(expr)
                )))
            }
            None => {
                return Err(OdoError::name(format!(
                    "Variable called `{}` not defined.",
                    path_name(expr)
                )))
            }
        };
        if escaping {
            if let Value::Function(func) = &value {
                self.env.scopes.pin(func.captured);
            }
        }
        Ok(value)
    }

    // ══════════════════════════════════════════════════════════════════════
    // Types
    // ══════════════════════════════════════════════════════════════════════

    fn resolve_type(&mut self, ann: &TypeAnnotation) -> Result<TypeId> {
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
        let unknown = |ident: &Ident| OdoError::name(format!("Unknown type `{}`.", ident.name));
        let (mut owner, _) = self
            .env
            .scopes
            .lookup(self.current, &first.name, true)
            .ok_or_else(|| unknown(first))?;
        let mut name = first.name.as_str();
        for ident in rest {
            self.consume(owner, name)?;
            owner = match self.env.scopes.get(owner, name) {
                Some(Binding::Module { scope, .. } | Binding::Enum { scope, .. }) => *scope,
                _ => {
                    return Err(OdoError::name(format!(
                        "Cannot access static symbol in `{name}`."
                    )))
                }
            };
            if !self.env.scopes.contains_local(owner, &ident.name) {
                return Err(unknown(ident));
            }
            name = ident.name.as_str();
        }
        match self.env.scopes.get(owner, name) {
            Some(Binding::Type(ty) | Binding::Enum { ty, .. }) => Ok(*ty),
            _ => Err(OdoError::type_error(format!(
                "Symbol `{name}` is not a valid type."
            ))),
        }
    }

    fn function_type(&mut self, decl: &FuncDecl) -> Result<TypeId> {
        let mut params = Vec::with_capacity(decl.params.len());
        for param in &decl.params {
            let ty = match &param.ty {
                Some(ann) => self.resolve_type(ann)?,
                None => TypeId::ANY,
            };
            params.push(ParamType {
                ty,
                optional: param.init.is_some(),
            });
        }
        let ret = match &decl.ret {
            Some(ann) => Some(self.resolve_type(ann)?),
            None => None,
        };
        Ok(self.types.function(ret, params))
    }

    /// Function value closed over the current scope.
    fn make_function(&mut self, decl: &Rc<FuncDecl>) -> Result<Value> {
        let ty = self.function_type(decl)?;
        Ok(Value::Function(Rc::new(ScriptedFunction {
            decl: Rc::clone(decl),
            ty,
            captured: self.current,
        })))
    }

    // ══════════════════════════════════════════════════════════════════════
    // Statement lists & hoisting
    // ══════════════════════════════════════════════════════════════════════

    fn exec_statements(&mut self, stmts: &[Stmt]) -> Result<Flow> {
        self.hoist(stmts)?;
        let mut last = Value::Null;
        for stmt in stmts {
            match self.exec_stmt(stmt)? {
                Flow::Completed(value) => last = value,
                flow => return Ok(flow),
            }
        }
        self.finish_pending(self.current)?;
        Ok(Flow::Completed(last))
    }

    fn hoist(&mut self, stmts: &[Stmt]) -> Result<()> {
        for stmt in stmts {
            if let StmtKind::Enum(decl) = &stmt.kind {
                self.declare_enum(decl).map_err(|e| e.with_span(stmt.span))?;
            }
        }
        for stmt in stmts {
            if let StmtKind::Module(decl) = &stmt.kind {
                let scope = self.env.scopes.push_labelled(Some(self.current), &decl.name.name);
                self.env.scopes.pin(scope);
                let binding = Binding::Module {
                    scope,
                    pending: Some(Rc::clone(decl)),
                };
                self.env
                    .scopes
                    .add_symbol(self.current, &decl.name.name, binding)
                    .map_err(|e| OdoError::from(e).with_span(stmt.span))?;
            }
        }
        for stmt in stmts {
            if let StmtKind::Func(decl) = &stmt.kind {
                let value = self.make_function(decl).map_err(|e| e.with_span(stmt.span))?;
                self.env
                    .scopes
                    .add_symbol(self.current, decl.display_name(), Binding::Function(value))
                    .map_err(|e| OdoError::from(e).with_span(stmt.span))?;
            }
        }
        Ok(())
    }

    /// Same qualified name and declaration site as the analyzer, hence the same type.
    fn declare_enum(&mut self, decl: &EnumDecl) -> Result<()> {
        let qualified = self.env.scopes.qualified_name(self.current, &decl.name.name);
        let ty = self.types.enum_type(&qualified, decl.name.span);
        let scope = self.env.scopes.push_labelled(None, qualified);
        for case in &decl.cases {
            let value = Value::EnumCase {
                ty,
                name: self.env.scopes.qualified_name(scope, &case.name).into(),
            };
            self.env
                .scopes
                .add_symbol(scope, &case.name, Binding::EnumCase(value))?;
        }
        self.env
            .scopes
            .add_symbol(self.current, &decl.name.name, Binding::Enum { ty, scope })?;
        Ok(())
    }

    // ══════════════════════════════════════════════════════════════════════
    // Statements
    // ══════════════════════════════════════════════════════════════════════

    fn exec_stmt(&mut self, stmt: &Stmt) -> Result<Flow> {
        ensure_sufficient_stack(|| self.exec_stmt_inner(stmt)).map_err(|e| e.with_span(stmt.span))
    }

    fn exec_stmt_inner(&mut self, stmt: &Stmt) -> Result<Flow> {
        match &stmt.kind {
            StmtKind::Expr(expr) => Ok(Flow::Completed(self.eval_expr(expr)?)),
            StmtKind::VarDecl(decl) => {
                self.declare_var(decl)?;
                Ok(Flow::Completed(Value::Null))
            }
            StmtKind::Block(block) => {
                self.with_scope(UnwindSet::NONE, |this| this.exec_statements(&block.stmts))
            }
            StmtKind::If(stmt) => self.exec_if(stmt),
            StmtKind::Loop(body) => self.run_loop(body, |_| Ok(()), |_| Ok(true)),
            StmtKind::While { cond, body } => {
                self.run_loop(body, |_| Ok(()), |this| this.eval_condition(cond))
            }
            StmtKind::Forange(forange) => self.exec_forange(forange),
            StmtKind::Break => Ok(Flow::Break),
            StmtKind::Continue => Ok(Flow::Continue),
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::Null,
                };
                Ok(Flow::Return(value))
            }
            // Declared while hoisting.
            StmtKind::Func(_) | StmtKind::Module(_) | StmtKind::Enum(_) => {
                Ok(Flow::Completed(Value::Null))
            }
        }
    }

    fn declare_var(&mut self, decl: &VarDecl) -> Result<()> {
        let declared = match &decl.ty {
            Some(ann) => self.resolve_type(ann)?,
            None => TypeId::ANY,
        };
        let (ty, value) = match &decl.init {
            Some(init) => {
                let value = self.eval_expr(init)?;
                let ty = adopt(declared, &value);
                (ty, Some(value.coerce(ty)))
            }
            None => (declared, None),
        };
        let binding = Binding::Var {
            ty,
            value,
            constant: decl.constant,
        };
        self.env
            .scopes
            .add_symbol(self.current, &decl.name.name, binding)?;
        Ok(())
    }

    fn exec_if(&mut self, stmt: &IfStmt) -> Result<Flow> {
        if self.eval_condition(&stmt.cond)? {
            return self.with_scope(UnwindSet::NONE, |this| {
                this.exec_statements(&stmt.then_block.stmts)
            });
        }
        match &stmt.else_branch {
            None => Ok(Flow::Completed(Value::Null)),
            Some(ElseBranch::Block(block)) => {
                self.with_scope(UnwindSet::NONE, |this| this.exec_statements(&block.stmts))
            }
            Some(ElseBranch::ElseIf(nested)) => self.exec_if(nested),
        }
    }

    fn eval_condition(&mut self, cond: &Expr) -> Result<bool> {
        self.eval_expr(cond)?.as_bool().ok_or_else(|| {
            OdoError::type_error("Condition must be boolean.").with_span(cond.span)
        })
    }

    /// Loop scope prepared by `setup`; `next` decides, in that scope,
    /// whether another iteration runs. Each iteration gets a fresh body scope.
    fn run_loop(
        &mut self,
        body: &Block,
        setup: impl FnOnce(&mut Self) -> Result<()>,
        mut next: impl FnMut(&mut Self) -> Result<bool>,
    ) -> Result<Flow> {
        self.with_scope(UnwindSet::LOOP, |this| {
            setup(this)?;
            while next(this)? {
                let flow =
                    this.with_scope(UnwindSet::NONE, |this| this.exec_statements(&body.stmts))?;
                match flow {
                    Flow::Break => break,
                    Flow::Return(value) => return Ok(Flow::Return(value)),
                    Flow::Completed(_) | Flow::Continue => {}
                }
            }
            Ok(Flow::Completed(Value::Null))
        })
    }

    fn exec_forange(&mut self, forange: &Forange) -> Result<Flow> {
        let first = self.eval_bound(&forange.first)?;
        let (lower, upper) = match &forange.second {
            Some(second) => (first, self.eval_bound(second)?),
            None => (0, first),
        };
        let count = upper.saturating_sub(lower).max(0);
        let ident = forange.ident.as_ref().map(|ident| ident.name.as_str());
        let mut step = 0;

        self.run_loop(
            &forange.body,
            |this| {
                if let Some(name) = ident {
                    let binding = Binding::Var {
                        ty: TypeId::INT,
                        value: None,
                        constant: true,
                    };
                    this.env.scopes.add_symbol(this.current, name, binding)?;
                }
                Ok(())
            },
            |this| {
                if step >= count {
                    return Ok(false);
                }
                let value = if forange.reversed {
                    upper - 1 - step
                } else {
                    lower + step
                };
                step += 1;
                if let Some(name) = ident {
                    if let Some(Binding::Var { value: slot, .. }) =
                        this.env.scopes.get_mut(this.current, name)
                    {
                        *slot = Some(Value::Int(value));
                    }
                }
                Ok(true)
            },
        )
    }

    /// Range bound truncated to an integer.
    fn eval_bound(&mut self, bound: &Expr) -> Result<i64> {
        match self.eval_expr(bound)?.as_double() {
            Some(n) => Ok(n.trunc() as i64),
            None => Err(OdoError::type_error(
                "Values defining the range of forange statement have to be numerical.",
            )
            .with_span(bound.span)),
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Expressions
    // ══════════════════════════════════════════════════════════════════════

    fn eval_expr(&mut self, expr: &Expr) -> Result<Value> {
        ensure_sufficient_stack(|| self.eval_expr_inner(expr)).map_err(|e| e.with_span(expr.span))
    }

    fn eval_expr_inner(&mut self, expr: &Expr) -> Result<Value> {
        match &expr.kind {
            ExprKind::Int(n) => Ok(Value::Int(*n)),
            ExprKind::Double(n) => Ok(Value::Double(*n)),
            ExprKind::Text(s) => Ok(Value::Text(s.clone())),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::Variable(_) | ExprKind::StaticAccess { .. } => self.load(expr, true),
            ExprKind::Unary { op, operand } => self.eval_unary(*op, operand),
            ExprKind::Binary { left, op, right } => self.eval_binary(left, *op, right),
            ExprKind::Ternary {
                cond,
                then_expr,
                else_expr,
                result_ty,
            } => {
                let value = if self.eval_condition(cond)? {
                    self.eval_expr(then_expr)?
                } else {
                    self.eval_expr(else_expr)?
                };
                Ok(match result_ty.get() {
                    Some(ty) => value.coerce(ty),
                    None => value,
                })
            }
            ExprKind::Call { callee, args } => self.eval_call(callee, args),
            ExprKind::Assign { target, value } => self.eval_assign(target, value),
            ExprKind::Func(decl) => {
                let value = self.make_function(decl)?;
                self.env.scopes.pin(self.current);
                Ok(value)
            }
        }
    }

    // ── Operators ──

    fn eval_unary(&mut self, op: UnaryOp, operand: &Expr) -> Result<Value> {
        match (op, self.eval_expr(operand)?) {
            (UnaryOp::Plus, value @ (Value::Int(_) | Value::Double(_))) => Ok(value),
            (UnaryOp::Neg, Value::Int(n)) => n
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| OdoError::runtime("Integer overflow in operation `-`.")),
            (UnaryOp::Neg, Value::Double(n)) => Ok(Value::Double(-n)),
            _ => Err(OdoError::type_error(
                "Invalid unary operator, can only be used in numeric values.",
            )),
        }
    }

    /// Both operands are always evaluated, `and`/`or` included.
    fn eval_binary(&mut self, left: &Expr, op: BinOp, right: &Expr) -> Result<Value> {
        let lhs = self.eval_expr(left)?;
        let rhs = self.eval_expr(right)?;
        match op.class() {
            OpClass::Arithmetic => eval_arith(op, lhs, rhs),
            OpClass::Logic => match (lhs.as_bool(), rhs.as_bool()) {
                (Some(a), Some(b)) => Ok(Value::Bool(if op == BinOp::And { a && b } else { a || b })),
                _ => Err(OdoError::type_error(format!(
                    "Operands of logic operation `{op}` must be boolean."
                ))),
            },
            OpClass::Equality => {
                let equal = lhs.loose_eq(&rhs);
                Ok(Value::Bool(if op == BinOp::Eq { equal } else { !equal }))
            }
            OpClass::Relational => eval_comparison(op, &lhs, &rhs),
        }
    }

    // ── Calls ──

    fn eval_call(&mut self, callee: &Expr, args: &[Expr]) -> Result<Value> {
        let target = match &callee.kind {
            ExprKind::Variable(_) | ExprKind::StaticAccess { .. } => self.load(callee, false)?,
            _ => self.eval_expr(callee)?,
        };
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval_expr(arg)?);
        }
        match target {
            Value::Function(func) => self.call_function(&func, values),
            Value::Native(native) => self.call_native(&native, values),
            _ => Err(OdoError::type_error(format!(
                "Invalid function call. `{}` is not a function.",
                path_name(callee)
            ))),
        }
    }

    fn call_function(&mut self, func: &ScriptedFunction, args: Vec<Value>) -> Result<Value> {
        if self.depth >= self.config.max_call_depth {
            return Err(OdoError::runtime("Callback depth exceeded!"));
        }
        let Some(signature) = self.types.signature(func.ty).cloned() else {
            return Err(OdoError::type_error(format!(
                "Invalid function call. `{}` is not a function.",
                func.name()
            )));
        };
        tracing::trace!(function = func.name(), depth = self.depth + 1, "call");

        // Parameters live in a scope rooted at the defining scope, not the caller's.
        let scope = self.env.scopes.push(Some(func.captured), UnwindSet::NONE);
        let saved = self.current;
        self.current = scope;
        self.depth += 1;
        let result = self.bind_and_run(func, &signature.params, args);
        self.depth -= 1;
        self.current = saved;
        self.env.scopes.release(scope);

        Ok(match (result?, signature.ret) {
            (Flow::Return(value), Some(ret)) => value.coerce(ret),
            _ => Value::Null,
        })
    }

    fn bind_and_run(
        &mut self,
        func: &ScriptedFunction,
        params: &[ParamType],
        args: Vec<Value>,
    ) -> Result<Flow> {
        let mut args = args.into_iter();
        for (param, spec) in func.decl.params.iter().zip(params) {
            let value = match (args.next(), &param.init) {
                (Some(value), _) => value,
                (None, Some(init)) => self.eval_expr(init)?,
                (None, None) => {
                    return Err(OdoError::value(format!(
                        "No value for parameter `{}` of `{}`.",
                        param.name.name,
                        func.name()
                    )))
                }
            };
            let binding = Binding::Var {
                ty: spec.ty,
                value: Some(value.coerce(spec.ty)),
                constant: false,
            };
            self.env
                .scopes
                .add_symbol(self.current, &param.name.name, binding)?;
        }
        self.with_scope(UnwindSet::FUNCTION, |this| {
            ensure_sufficient_stack(|| this.exec_statements(&func.decl.body.stmts))
        })
    }

    fn call_native(&mut self, native: &NativeFunction, args: Vec<Value>) -> Result<Value> {
        native.check_arity(args.len())?;
        let args = native.prepare_args(args);
        tracing::trace!(function = %native.name, args = args.len(), "native call");
        let result = (native.callback)(&args)?;
        Ok(match self.types.signature(native.ty).map(|sig| sig.ret) {
            Some(Some(ret)) => result.coerce(ret),
            Some(None) => Value::Null,
            None => result,
        })
    }

    // ── Assignment ──

    /// Reseat a variable cell. Assignment itself yields no value.
    fn eval_assign(&mut self, target: &Expr, value: &Expr) -> Result<Value> {
        let value = self.eval_expr(value)?;
        if !matches!(
            target.kind,
            ExprKind::Variable(_) | ExprKind::StaticAccess { .. }
        ) {
            return Err(OdoError::syntax("Invalid assignment to non-variable."));
        }
        let (owner, name) = self.locate(target)?;
        match self.env.scopes.get_mut(owner, &name) {
            Some(Binding::Var {
                ty, value: slot, ..
            }) => {
                let new_ty = adopt(*ty, &value);
                *ty = new_ty;
                *slot = Some(value.coerce(new_ty));
                Ok(Value::Null)
            }
            _ => Err(OdoError::semantic(format!(
                "Invalid assignment to symbol `{}`.",
                path_name(target)
            ))),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Operator helpers
// ══════════════════════════════════════════════════════════════════════════════

/// Longest text, in bytes, that repetition may build.
const MAX_TEXT_LEN: usize = 1 << 30;

fn numeric_pair(op: BinOp, lhs: &Value, rhs: &Value) -> Result<(f64, f64)> {
    match (lhs.as_double(), rhs.as_double()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(OdoError::type_error(format!(
            "Arithmetic operation `{op}` can only be used with numeric values."
        ))),
    }
}

fn eval_arith(op: BinOp, lhs: Value, rhs: Value) -> Result<Value> {
    if matches!(lhs, Value::Text(_)) || matches!(rhs, Value::Text(_)) {
        return eval_text(op, lhs, rhs);
    }
    if op == BinOp::Div {
        let (a, b) = numeric_pair(op, &lhs, &rhs)?;
        if b == 0.0 {
            return Err(OdoError::runtime("Attempted Division operation over zero."));
        }
        return Ok(Value::Double(a / b));
    }
    match (&lhs, &rhs) {
        (Value::Int(a), Value::Int(b)) => {
            let result = match op {
                BinOp::Add => a.checked_add(*b),
                BinOp::Sub => a.checked_sub(*b),
                _ => a.checked_mul(*b),
            };
            result
                .map(Value::Int)
                .ok_or_else(|| OdoError::runtime(format!("Integer overflow in operation `{op}`.")))
        }
        _ => {
            let (a, b) = numeric_pair(op, &lhs, &rhs)?;
            Ok(Value::Double(match op {
                BinOp::Add => a + b,
                BinOp::Sub => a - b,
                _ => a * b,
            }))
        }
    }
}

/// `+` concatenates display forms; `*` repeats text by an int count.
fn eval_text(op: BinOp, lhs: Value, rhs: Value) -> Result<Value> {
    match (op, lhs, rhs) {
        (BinOp::Add, lhs, rhs) => Ok(Value::Text(format!("{lhs}{rhs}"))),
        (BinOp::Mul, Value::Text(s), Value::Int(n)) | (BinOp::Mul, Value::Int(n), Value::Text(s)) => {
            let times = usize::try_from(n).unwrap_or(0);
            match s.len().checked_mul(times) {
                Some(len) if len <= MAX_TEXT_LEN => Ok(Value::Text(s.repeat(times))),
                _ => Err(OdoError::runtime(format!(
                    "Text repetition by `{n}` exceeds the maximum text length."
                ))),
            }
        }
        (BinOp::Mul, ..) => Err(OdoError::type_error(
            "Text can only be multiplied by an integer.",
        )),
        (op, ..) => Err(OdoError::semantic(format!(
            "Invalid operation between texts `{op}`."
        ))),
    }
}

fn eval_comparison(op: BinOp, lhs: &Value, rhs: &Value) -> Result<Value> {
    let ordering = match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        _ => match (lhs.as_double(), rhs.as_double()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => {
                return Err(OdoError::type_error(format!(
                    "Invalid relational operation `{op}`. Operands must be of numeric types."
                )))
            }
        },
    };
    let result = ordering.is_some_and(|ord| match op {
        BinOp::Less => ord.is_lt(),
        BinOp::Greater => ord.is_gt(),
        BinOp::LessEq => ord.is_le(),
        _ => ord.is_ge(),
    });
    Ok(Value::Bool(result))
}
