//! C5: per-flow detail document writer. One `FlowWriter` owns exactly one
//! flow's file; the single device worker running that flow is its only
//! caller, so no internal locking is needed here (contrast `IndexWriter`,
//! shared across the whole run).

use crate::atomic::write_json_atomic;
use crate::errors::StoreError;
use crate::model::{Attempt, Command, FlowDetail, Status};
use chrono::Utc;
use std::path::PathBuf;

pub struct FlowWriter {
    path: PathBuf,
    detail: FlowDetail,
    /// The command list a fresh attempt starts from: either the skeleton's
    /// pre-populated `pending` commands (when `detail` already carries one)
    /// or empty, in which case callers build commands themselves via
    /// `append_command`.
    template: Vec<Command>,
}

impl FlowWriter {
    pub fn new(path: PathBuf, detail: FlowDetail) -> Self {
        let template = detail.attempts.first().map(|a| a.commands.clone()).unwrap_or_default();
        Self { path, detail, template }
    }

    /// Starts attempt `index`. If the skeleton already seeded a `pending`
    /// attempt with this same index (the common case: the first attempt of
    /// a freshly built run), that attempt is promoted to `running` in
    /// place, keeping its pre-built commands. Otherwise (a retry, or a
    /// writer built without a skeleton-seeded attempt) a fresh attempt is
    /// pushed, reusing the same command template so every attempt's
    /// commands line up by position with the flow's step list.
    pub fn start_attempt(&mut self, index: u32) -> Result<(), StoreError> {
        let now = Utc::now();
        if let Some(last) = self.detail.attempts.last_mut() {
            if last.status == Status::Pending && last.index == index {
                last.status = Status::Running;
                last.started_at = Some(now);
                return self.flush();
            }
        }
        self.detail.attempts.push(Attempt { index, status: Status::Running, started_at: Some(now), ended_at: None, commands: self.template.clone() });
        self.flush()
    }

    pub fn append_command(&mut self, command: Command) -> Result<(), StoreError> {
        let attempt = self.detail.attempts.last_mut().expect("append_command called before start_attempt");
        attempt.commands.push(command);
        self.flush()
    }

    /// Replaces the command at `index` in the current attempt's top-level
    /// list (used as a step completes and its terminal status/duration/
    /// sub-commands become known).
    pub fn update_command(&mut self, index: usize, command: Command) -> Result<(), StoreError> {
        let attempt = self.detail.attempts.last_mut().expect("update_command called before start_attempt");
        if let Some(slot) = attempt.commands.get_mut(index) {
            *slot = command;
        }
        self.flush()
    }

    pub fn end_attempt(&mut self, status: Status) -> Result<(), StoreError> {
        let attempt = self.detail.attempts.last_mut().expect("end_attempt called before start_attempt");
        attempt.status = status;
        attempt.ended_at = Some(Utc::now());
        self.flush()
    }

    pub fn detail(&self) -> &FlowDetail {
        &self.detail
    }

    /// Preserves the current detail document under a sibling
    /// `<flow-id>.attempt-<index>.json` path before a retry starts another
    /// attempt and keeps writing to the live file. Returns the
    /// relative-to-parent file name so callers can record it on the index
    /// side without knowing this writer's own path layout.
    pub fn snapshot_attempt(&self, attempt_index: u32) -> Result<String, StoreError> {
        let file_name = self.path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        let snapshot_path = self.path.with_file_name(format!("{file_name}.attempt-{attempt_index}.json"));
        write_json_atomic(&snapshot_path, "flow-detail-attempt", &self.detail)?;
        Ok(snapshot_path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default())
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        self.detail.update_seq += 1;
        write_json_atomic(&self.path, "flow-detail", &self.detail)
    }
}
