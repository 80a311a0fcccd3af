//! Engine configuration.

use odo_types::{OdoError, Result};
use serde::{Deserialize, Serialize};

/// Tunables for an [`Engine`](crate::Engine).
///
/// Missing fields take their defaults when deserializing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Nested scripted calls allowed before `RuntimeError`.
    pub max_call_depth: usize,
    /// Keep the last REPL result in the session variable `_`.
    pub repl_result_var: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_call_depth: 600,
            repl_result_var: true,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|err| OdoError::value(format!("Invalid engine configuration: {err}")))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|err| OdoError::value(format!("Invalid engine configuration: {err}")))
    }
}
