use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to evaluate expression {expr:?}: {source}")]
    Eval { expr: String, #[source] source: Box<rhai::EvalAltResult> },
    #[error("failed to parse condition {condition:?}: {source}")]
    Condition { condition: String, #[source] source: Box<rhai::EvalAltResult> },
    #[error("variable {0} is not defined")]
    UndefinedVariable(String),
    #[error("could not resolve script file {0}")]
    UnresolvedFile(String),
    #[error("io error reading {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },
}
