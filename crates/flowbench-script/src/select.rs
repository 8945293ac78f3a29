//! Expands every text-bearing field of a `Selector` tree -- including its
//! relative-selector children -- against the engine's variables, then
//! normalizes the result. This is the one place the script engine reaches
//! into `flowbench-domain`'s recursive selector shape.

use crate::engine::ScriptEngine;
use crate::error::ScriptError;
use crate::expand::expand_variables;
use flowbench_domain::Selector;

pub fn expand_selector(engine: &ScriptEngine, selector: &Selector) -> Result<Selector, ScriptError> {
    let mut out = selector.clone();
    expand_text_fields(engine, &mut out)?;

    if let Some(child) = &selector.child_of {
        out.child_of = Some(Box::new(expand_selector(engine, child)?));
    }
    if let Some(child) = &selector.below {
        out.below = Some(Box::new(expand_selector(engine, child)?));
    }
    if let Some(child) = &selector.above {
        out.above = Some(Box::new(expand_selector(engine, child)?));
    }
    if let Some(child) = &selector.left_of {
        out.left_of = Some(Box::new(expand_selector(engine, child)?));
    }
    if let Some(child) = &selector.right_of {
        out.right_of = Some(Box::new(expand_selector(engine, child)?));
    }
    if let Some(child) = &selector.contains_child {
        out.contains_child = Some(Box::new(expand_selector(engine, child)?));
    }
    out.contains_descendants =
        selector.contains_descendants.iter().map(|d| expand_selector(engine, d)).collect::<Result<Vec<_>, _>>()?;

    Ok(out)
}

fn expand_text_fields(engine: &ScriptEngine, selector: &mut Selector) -> Result<(), ScriptError> {
    if let Some(id) = &selector.id {
        selector.id = Some(expand_variables(engine, id)?);
    }
    if let Some(text) = &selector.text {
        selector.text = Some(expand_variables(engine, text)?);
    }
    if let Some(css) = &selector.css {
        selector.css = Some(expand_variables(engine, css)?);
    }
    if let Some(point) = &selector.point {
        selector.point = Some(expand_variables(engine, point)?);
    }
    if let Some(start) = &selector.start {
        selector.start = Some(expand_variables(engine, start)?);
    }
    if let Some(end) = &selector.end {
        selector.end = Some(expand_variables(engine, end)?);
    }
    if let Some(label) = &selector.label {
        selector.label = Some(expand_variables(engine, label)?);
    }
    Ok(())
}
