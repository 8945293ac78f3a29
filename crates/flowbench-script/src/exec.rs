//! Execution helpers for the step kinds that exist purely to touch the
//! script engine: `defineVariables`, `assertTrue`, `assertCondition`,
//! `runScript`/`evalScript`.

use crate::engine::ScriptEngine;
use crate::error::ScriptError;
use crate::expand::expand_variables;
use flowbench_domain::AssertConditionSpec;
use serde_json::Value;
use std::collections::HashMap;

/// `defineVariables`: every value is itself run through `${...}`/`$VAR`
/// expansion before being stored, so a flow can build one variable out of
/// another.
pub fn execute_define_variables(engine: &mut ScriptEngine, env: &HashMap<String, String>) -> Result<(), ScriptError> {
    let mut expanded = Vec::with_capacity(env.len());
    for (key, value) in env {
        expanded.push((key.clone(), expand_variables(engine, value)?));
    }
    for (key, value) in expanded {
        engine.set_variable(key, Value::String(value));
    }
    Ok(())
}

pub fn execute_assert_true(engine: &ScriptEngine, script: &str) -> Result<bool, ScriptError> {
    engine.eval_condition(script)
}

/// `assertCondition`: the predicate is satisfied if every field that was
/// provided holds. `platform` compares case-insensitively against the
/// engine's own `platform`, but a *mismatch* is not a failure -- a
/// condition scoped to a platform this run isn't on succeeds (skips)
/// rather than failing the flow. `script` is evaluated for
/// truthiness; `visible`/`notVisible` are resolved by the caller (the
/// runner has the driver handle this module doesn't), so this function
/// takes their result as booleans already computed.
pub fn execute_assert_condition(
    engine: &ScriptEngine,
    condition: &AssertConditionSpec,
    visible_result: Option<bool>,
    not_visible_result: Option<bool>,
) -> Result<bool, ScriptError> {
    if let Some(platform) = &condition.platform {
        let matches = engine.platform.as_deref().map(|p| p.eq_ignore_ascii_case(platform)).unwrap_or(false);
        if !matches {
            return Ok(true);
        }
    }
    if let Some(script) = &condition.script {
        if !engine.eval_condition(script)? {
            return Ok(false);
        }
    }
    if condition.visible.is_some() && !visible_result.unwrap_or(false) {
        return Ok(false);
    }
    if condition.not_visible.is_some() && !not_visible_result.unwrap_or(false) {
        return Ok(false);
    }
    Ok(true)
}

/// Resolves a `runScript`/`runFlow` `file` reference against the
/// engine's flow directory and reads its contents, or errors if it does
/// not exist -- the fallback path for `RunScript` steps whose body is a
/// file reference rather than an inline script.
pub fn resolve_script_file(engine: &ScriptEngine, file: &str) -> Result<String, ScriptError> {
    let path = engine.resolve_path(file);
    std::fs::read_to_string(&path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ScriptError::UnresolvedFile(path.display().to_string())
        } else {
            ScriptError::Io { path: path.display().to_string(), source }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_variables_expands_values() {
        let mut engine = ScriptEngine::new(std::path::PathBuf::from("."));
        engine.set_variable("first", Value::from("Jane"));
        let mut env = HashMap::new();
        env.insert("greeting".to_string(), "Hello $first".to_string());
        execute_define_variables(&mut engine, &env).unwrap();
        assert_eq!(engine.get_variable("greeting"), Some(&Value::from("Hello Jane")));
    }

    #[test]
    fn assert_condition_requires_all_present_predicates() {
        let mut engine = ScriptEngine::new(std::path::PathBuf::from("."));
        engine.platform = Some("Android".to_string());
        let condition = AssertConditionSpec { platform: Some("android".to_string()), script: Some("true".to_string()), visible: None, not_visible: None };
        assert!(execute_assert_condition(&engine, &condition, None, None).unwrap());
    }

    #[test]
    fn assert_condition_skips_successfully_on_platform_mismatch() {
        let mut engine = ScriptEngine::new(std::path::PathBuf::from("."));
        engine.platform = Some("iOS".to_string());
        // A condition scoped to a platform this run isn't on succeeds
        // (skips) rather than failing the flow, even though the
        // condition also carries a script that would otherwise fail.
        let condition = AssertConditionSpec { platform: Some("android".to_string()), script: Some("false".to_string()), visible: None, not_visible: None };
        assert!(execute_assert_condition(&engine, &condition, None, None).unwrap());
    }
}
