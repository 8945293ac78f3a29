pub mod detail;
pub mod index;
pub mod status;

pub use detail::{Artifacts, Attempt, CapturedElement, Command, CommandError, CommandParams, FlowDetail};
pub use index::{AppRecord, AttemptRecord, DeviceRecord, FlowEntry, IndexDocument, RunnerInfo, Summary};
pub use status::Status;
