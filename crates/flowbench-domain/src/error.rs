use thiserror::Error;

/// Errors raised while validating a parsed flow before it reaches the
/// skeleton builder or the runner. Flow-file parsing itself is out of
/// scope; this only covers shape invariants the schema itself can check.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum DomainError {
    #[error("flow has no steps")]
    EmptyFlow,
    #[error("assertCondition step has no predicate (script/visible/notVisible/platform)")]
    EmptyAssertCondition,
    #[error("selector has no id, text, or css value")]
    EmptySelector,
}
