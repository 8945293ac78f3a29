//! JUnit XML and HTML report emitters: pure functions over the
//! documents `flowbench-core` already wrote to disk. This crate never
//! executes a flow and never mutates the report store -- it only reads.

pub mod error;
pub mod html;
pub mod junit;

pub use error::ReportError;
pub use html::render_html;
pub use junit::render_junit;
