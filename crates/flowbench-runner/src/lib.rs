//! Flow execution: a single-flow runner that drives one flow's
//! steps against one device, and a parallel dispatcher that fans a
//! whole run out across a fixed pool of device workers.

pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod flow_runner;
pub mod step_exec;

pub use config::{DispatcherConfig, RunnerConfig};
pub use dispatcher::{dispatch, DeviceSlot, DispatchInput, FlowResult, RunResult};
pub use errors::RunnerError;
pub use flow_runner::{run_flow, run_flow_with_retries, FlowLoader, FlowRunOutcome};
