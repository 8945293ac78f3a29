//! The embedded scripting engine: a single-threaded variable store plus
//! an expression evaluator, used for `${...}`/`$VAR` text expansion,
//! condition truthiness, and `runScript`/`evalScript` bodies.
//!
//! One `ScriptEngine` belongs to exactly one device worker; it is
//! never shared across threads, so its variable map is a plain
//! `HashMap`, not a `Mutex`-guarded one -- the same single-owner
//! reasoning `flowbench-core::flow_writer::FlowWriter` uses.

use crate::error::ScriptError;
use rhai::{Dynamic, Engine as RhaiEngine, Scope};
use serde_json::Value;
use std::collections::HashMap;

pub struct ScriptEngine {
    rhai: RhaiEngine,
    variables: HashMap<String, Value>,
    /// Set by the runner from `Driver::platform_info` before a flow
    /// starts; available to scripts as the `platform` variable and to
    /// `assertCondition`'s `platform` predicate.
    pub platform: Option<String>,
    /// The most recent `copyTextFrom` result, available to scripts as
    /// `copiedText`.
    pub copied_text: Option<String>,
    /// Directory the current flow file was loaded from; used to resolve
    /// relative `runScript`/`runFlow` file paths.
    pub flow_dir: std::path::PathBuf,
}

impl ScriptEngine {
    pub fn new(flow_dir: std::path::PathBuf) -> Self {
        let mut rhai = RhaiEngine::new();
        rhai.set_max_expr_depth(64);
        Self { rhai, variables: HashMap::new(), platform: None, copied_text: None, flow_dir }
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    pub fn get_variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn variables(&self) -> &HashMap<String, Value> {
        &self.variables
    }

    fn scope(&self) -> Scope<'static> {
        let mut scope = Scope::new();
        for (name, value) in &self.variables {
            scope.push_dynamic(name.clone(), json_to_dynamic(value));
        }
        if let Some(platform) = &self.platform {
            scope.push_constant("platform", platform.clone());
        }
        if let Some(copied) = &self.copied_text {
            scope.push_constant("copiedText", copied.clone());
        }
        scope
    }

    /// Evaluates a rhai expression body, returning its result as JSON.
    pub fn eval(&self, expr: &str) -> Result<Value, ScriptError> {
        let mut scope = self.scope();
        let result: Dynamic =
            self.rhai.eval_with_scope(&mut scope, expr).map_err(|source| ScriptError::Eval { expr: expr.to_string(), source })?;
        Ok(dynamic_to_json(result))
    }

    /// Truthiness: a boolean is used directly; any other
    /// successfully-evaluated value is truthy unless it is `()`, an empty
    /// string, the number zero, or JSON `false`/`null`.
    pub fn eval_condition(&self, script: &str) -> Result<bool, ScriptError> {
        let mut scope = self.scope();
        let result: Dynamic =
            self.rhai.eval_with_scope(&mut scope, script).map_err(|source| ScriptError::Condition { condition: script.to_string(), source })?;
        Ok(is_truthy(&dynamic_to_json(result)))
    }

    /// Runs a `runScript`/`evalScript` body against a transient overlay of
    /// this engine's variables plus a fresh `output` sink object.
    /// Only fields the script assigns onto `output` survive the call --
    /// any other top-level binding the script makes is local to this run
    /// and discarded along with the rest of the overlay. Every surviving
    /// `output` field is stringified
    /// before being written into the permanent variable store.
    pub fn run_script_body(&mut self, body: &str) -> Result<Value, ScriptError> {
        let mut scope = self.scope();
        scope.push("output", rhai::Map::new());
        let result: Dynamic =
            self.rhai.eval_with_scope(&mut scope, body).map_err(|source| ScriptError::Eval { expr: body.to_string(), source })?;
        if let Some(output) = scope.get_value::<rhai::Map>("output") {
            for (name, value) in output {
                let json = dynamic_to_json(value);
                self.variables.insert(name.to_string(), Value::String(crate::expand::stringify(&json)));
            }
        }
        Ok(dynamic_to_json(result))
    }

    pub fn resolve_path(&self, path: &str) -> std::path::PathBuf {
        let p = std::path::Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.flow_dir.join(p)
        }
    }
}

/// Truthiness rule for `EvalCondition` results: booleans are used
/// directly; numbers are truthy iff non-zero; a string is truthy only
/// when it is exactly `"true"` (case-sensitive) -- any other string,
/// including `"yes"` or the empty string, is false; `null`/`()` is false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => s == "true",
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn json_to_dynamic(value: &Value) -> Dynamic {
    match value {
        Value::Null => Dynamic::UNIT,
        Value::Bool(b) => (*b).into(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.into()
            } else {
                n.as_f64().unwrap_or(0.0).into()
            }
        }
        Value::String(s) => s.clone().into(),
        Value::Array(items) => {
            let arr: rhai::Array = items.iter().map(json_to_dynamic).collect();
            arr.into()
        }
        Value::Object(map) => {
            let mut obj = rhai::Map::new();
            for (k, v) in map {
                obj.insert(k.as_str().into(), json_to_dynamic(v));
            }
            obj.into()
        }
    }
}

fn dynamic_to_json(value: Dynamic) -> Value {
    if value.is_unit() {
        return Value::Null;
    }
    if let Some(b) = value.clone().try_cast::<bool>() {
        return Value::Bool(b);
    }
    if let Some(i) = value.clone().try_cast::<i64>() {
        return Value::Number(i.into());
    }
    if let Some(f) = value.clone().try_cast::<f64>() {
        return serde_json::Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null);
    }
    if let Some(s) = value.clone().try_cast::<rhai::ImmutableString>() {
        return Value::String(s.to_string());
    }
    if let Some(arr) = value.clone().try_cast::<rhai::Array>() {
        return Value::Array(arr.into_iter().map(dynamic_to_json).collect());
    }
    if let Some(map) = value.try_cast::<rhai::Map>() {
        let mut out = serde_json::Map::new();
        for (k, v) in map {
            out.insert(k.to_string(), dynamic_to_json(v));
        }
        return Value::Object(out);
    }
    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eval_condition_honors_truthiness_rules() {
        let engine = ScriptEngine::new(std::path::PathBuf::from("."));
        assert!(engine.eval_condition("true").unwrap());
        assert!(!engine.eval_condition("false").unwrap());
        assert!(!engine.eval_condition("0").unwrap());
        assert!(engine.eval_condition("1").unwrap());
        assert!(!engine.eval_condition("\"\"").unwrap());
        // Only the exact string "true" is truthy; any other string --
        // including a non-empty one like "yes" -- is false.
        assert!(!engine.eval_condition("\"x\"").unwrap());
        assert!(!engine.eval_condition("\"yes\"").unwrap());
        assert!(engine.eval_condition("\"true\"").unwrap());
    }

    #[test]
    fn variables_are_visible_to_eval() {
        let mut engine = ScriptEngine::new(std::path::PathBuf::from("."));
        engine.set_variable("count", Value::from(3));
        let result = engine.eval("count + 1").unwrap();
        assert_eq!(result, Value::from(4));
    }

    #[test]
    fn run_script_body_persists_output_fields_only() {
        let mut engine = ScriptEngine::new(std::path::PathBuf::from("."));
        engine.run_script_body("let total = 10; output.total = total;").unwrap();
        assert_eq!(engine.get_variable("total"), Some(&Value::from("10")));
    }

    #[test]
    fn run_script_body_does_not_leak_local_bindings() {
        let mut engine = ScriptEngine::new(std::path::PathBuf::from("."));
        engine.run_script_body("let scratch = 99;").unwrap();
        assert_eq!(engine.get_variable("scratch"), None);
    }
}
