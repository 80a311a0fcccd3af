//! The embeddable engine: native registration, `interpret` and `repl`.

use odo_analyzer::{Analyzer, Arity, TypeEnv, Validation};
use odo_types::{Result, SourceFile, TypeId, TypeTable};

use crate::config::EngineConfig;
use crate::env::Environment;
use crate::evaluator::Interpreter;
use crate::native::{NativeModule, ParamSpec, Target};
use crate::value::Value;

/// Session variable holding the last REPL result.
const RESULT_VAR: &str = "_";

/// An Odo engine instance.
///
/// Owns the type table and both scope environments, so natives registered
/// once are visible to every later `interpret` and `repl` call.
#[derive(Debug)]
pub struct Engine {
    pub(crate) config: EngineConfig,
    pub(crate) types: TypeTable,
    pub(crate) analyzer_env: TypeEnv,
    pub(crate) runtime_env: Environment,
}

impl Engine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let mut analyzer_env = TypeEnv::new();
        let mut runtime_env = Environment::new();
        if config.repl_result_var {
            // Fresh sessions are empty, so this cannot collide.
            let _ = analyzer_env.declare_session_var(RESULT_VAR);
            let _ = runtime_env.declare_session_var(RESULT_VAR);
        }
        Self {
            config,
            types: TypeTable::new(),
            analyzer_env,
            runtime_env,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    /// Value of a REPL session variable, `_` included.
    pub fn session_value(&self, name: &str) -> Option<&Value> {
        self.runtime_env.session_value(name)
    }

    fn global_target(&self) -> Target {
        Target {
            static_scope: self.analyzer_env.global(),
            runtime_scope: self.runtime_env.global(),
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Pipeline
    // ══════════════════════════════════════════════════════════════════════

    /// Analyze and run a self-contained program.
    ///
    /// Returns the value of the last statement.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn interpret(&mut self, source: &str) -> Result<Value> {
        let program = odo_parser::parse(&SourceFile::new("<input>", source))?;
        Analyzer::new(&mut self.analyzer_env, &mut self.types).analyze(&program)?;
        let value =
            Interpreter::new(&mut self.runtime_env, &mut self.types, &self.config).run(&program)?;
        tracing::debug!(statements = program.stmts.len(), "program finished");
        Ok(value)
    }

    /// Analyze and run statements against the persistent session scope.
    ///
    /// A failing call leaves the session as it was before the call.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn repl(&mut self, source: &str) -> Result<Value> {
        let program = odo_parser::parse(&SourceFile::new("<repl>", source))?;
        let static_session = self.analyzer_env.snapshot_session();
        let runtime_session = self.runtime_env.snapshot_session();

        let analyzed =
            Analyzer::new(&mut self.analyzer_env, &mut self.types).analyze_session(&program.stmts);
        let result = match analyzed {
            Ok(_) => Interpreter::new(&mut self.runtime_env, &mut self.types, &self.config)
                .run_session(&program.stmts),
            Err(err) => Err(err),
        };
        let value = match result {
            Ok(value) => value,
            Err(err) => {
                tracing::debug!(kind = %err.kind, "repl input failed, rolling back session");
                self.analyzer_env.restore_session(static_session);
                self.runtime_env.restore_session(runtime_session);
                return Err(err);
            }
        };

        if self.config.repl_result_var && !matches!(value, Value::Null | Value::Module { .. }) {
            self.analyzer_env.set_session_var(RESULT_VAR, value.type_id());
            self.runtime_env.set_session_var(RESULT_VAR, value.clone());
        }
        Ok(value)
    }

    // ══════════════════════════════════════════════════════════════════════
    // Native registration
    // ══════════════════════════════════════════════════════════════════════

    /// Register a global native checked by an arity contract.
    ///
    /// `validation` checks argument types at analysis time and yields the
    /// call's static type; without one the call has no static value.
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
        let target = self.global_target();
        self.register_function(target, name, arity, validation, callback)
    }

    /// Register a global native with typed parameters and a return type.
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
        let target = self.global_target();
        self.register_typed_function(target, name, params, Some(ret), callback)
    }

    pub fn add_void_function<F>(&mut self, name: &str, params: Vec<ParamSpec>, callback: F) -> Result<()>
    where
        F: Fn(&[Value]) -> Result<()> + 'static,
    {
        let target = self.global_target();
        self.register_typed_function(target, name, params, None, move |args: &[Value]| {
            callback(args).map(|()| Value::Null)
        })
    }

    /// Register a global constant.
    pub fn add_value(&mut self, name: &str, value: Value) -> Result<()> {
        let target = self.global_target();
        self.register_value(target, name, value)
    }

    /// Register a native module and return a handle to fill it.
    pub fn add_module(&mut self, name: &str) -> Result<NativeModule<'_>> {
        let target = self.global_target();
        let module = self.register_module(target, name)?;
        Ok(NativeModule::new(self, module))
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
