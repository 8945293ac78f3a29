//! Flow and step schema shared by every other crate in the workspace.
//!
//! This crate has no execution logic: it defines the closed step union,
//! selectors, and flow configuration that `flowbench-core` builds
//! skeletons from, `flowbench-script` expands, and `flowbench-runner`
//! executes.

pub mod error;
pub mod selector;
pub mod step;

pub use error::DomainError;
pub use selector::{NormalizedSelector, Selector, SelectorType};
pub use step::{AssertConditionSpec, Direction, Flow, FlowConfig, Step, StepKind};
