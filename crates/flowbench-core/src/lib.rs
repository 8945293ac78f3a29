//! The incremental report store: index/flow-detail document shapes,
//! atomic writes, the debounced index writer, the per-flow detail writer,
//! skeleton construction, and crash recovery.
//!
//! This crate knows nothing about how a flow is actually executed --
//! that's `flowbench-runner`. It only knows how to persist the run's
//! progress as it happens and how to read it back, live or after a
//! crash.

pub mod atomic;
pub mod config;
pub mod consumer;
pub mod errors;
pub mod flow_writer;
pub mod index_writer;
pub mod model;
pub mod params;
pub mod skeleton;

pub use config::StoreConfig;
pub use consumer::{poll, read_flow_detail, read_index, recover, ConsumerCursor, PollResult};
pub use errors::StoreError;
pub use flow_writer::FlowWriter;
pub use index_writer::IndexWriter;
pub use params::command_params;
pub use skeleton::{build_skeleton, Skeleton, SkeletonInput};
