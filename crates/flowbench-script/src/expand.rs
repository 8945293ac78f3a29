//! Text expansion: `${expr}` interpolation (balanced-brace scan, the
//! contents evaluated as a rhai expression) followed by bare `$NAME`
//! substitution with word-boundary rules, so `$name` inside `$namespace`
//! does not partially match.

use crate::engine::ScriptEngine;
use crate::error::ScriptError;
use serde_json::Value;

/// Expands every `${...}` and `$NAME` occurrence in `text` against the
/// engine's current variables, returning the fully-substituted string.
pub fn expand_variables(engine: &ScriptEngine, text: &str) -> Result<String, ScriptError> {
    let after_braces = expand_brace_expressions(engine, text)?;
    Ok(expand_bare_dollar_vars(engine, &after_braces))
}

fn expand_brace_expressions(engine: &ScriptEngine, text: &str) -> Result<String, ScriptError> {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    let mut last_copied = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' && i + 1 < bytes.len() && bytes[i + 1] == b'{' {
            let expr_start = i + 2;
            let mut depth = 1usize;
            let mut j = expr_start;
            while j < bytes.len() && depth > 0 {
                match bytes[j] {
                    b'{' => depth += 1,
                    b'}' => depth -= 1,
                    _ => {}
                }
                if depth == 0 {
                    break;
                }
                j += 1;
            }
            if depth != 0 {
                // No matching close brace: per spec, an unbalanced `${...`
                // is left literal rather than treated as an error. Leave
                // this `${` untouched and keep scanning after it in case a
                // later, well-formed `${...}` still appears in the tail.
                i += 2;
                continue;
            }
            out.push_str(&text[last_copied..i]);
            let expr = &text[expr_start..j];
            let value = engine.eval(expr)?;
            out.push_str(&stringify(&value));
            i = j + 1;
            last_copied = i;
        } else {
            i += 1;
        }
    }
    out.push_str(&text[last_copied..]);
    Ok(out)
}

/// Substitutes `$NAME` (NAME = ascii letters/digits/underscore, not
/// starting with a digit) for the variable's stringified value, as long
/// as the character immediately before the `$` is not itself an
/// identifier character -- so `a$b` does not treat `$b` as a reference
/// growing out of `a`, but `($b)` or a leading `$b` does.
fn expand_bare_dollar_vars(engine: &ScriptEngine, text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let is_boundary = i == 0 || !is_ident_char(chars[i - 1]);
        if chars[i] == '$' && is_boundary && i + 1 < chars.len() && is_ident_start(chars[i + 1]) {
            let start = i + 1;
            let mut end = start;
            while end < chars.len() && is_ident_char(chars[end]) {
                end += 1;
            }
            let name: String = chars[start..end].iter().collect();
            if let Some(value) = engine.get_variable(&name) {
                out.push_str(&stringify(value));
            } else {
                out.push('$');
                out.push_str(&name);
            }
            i = end;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Canonical stringification used both for text expansion and for
/// storing a `RunScript` step's `output` in the report store: plain
/// strings pass through unquoted, everything else becomes its JSON text.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
