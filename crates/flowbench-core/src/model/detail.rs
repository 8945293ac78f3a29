//! The per-flow detail document: one file per flow, holding the full
//! command tree for every attempt. See §3 and §4.5/§4.6.

use super::status::Status;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedElement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifacts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_element: Option<CapturedElement>,
}

/// The fixed param projection a command carries alongside its type string:
/// a selector summary, literal text, a scroll/swipe direction, and/or an
/// effective timeout, filled by whichever of these a given step type
/// actually has (see `crate::params::command_params`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl CommandParams {
    pub fn is_empty(&self) -> bool {
        self.selector.is_none() && self.text.is_none() && self.direction.is_none() && self.timeout_ms.is_none()
    }
}

/// One executed step, as recorded in a flow's detail document. `id` is
/// stable across re-reads of the same attempt (`cmd-NNN`, matching its
/// `index` in the attempt's flat command list); `sub_commands` holds the
/// nested command tree produced by `runFlow`/`runScript`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub id: String,
    #[serde(default)]
    pub index: u32,
    pub step_type: String,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "CommandParams::is_empty")]
    pub params: CommandParams,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CommandError>,
    #[serde(default, skip_serializing_if = "Artifacts::is_empty")]
    pub artifacts: Artifacts,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_commands: Vec<Command>,
}

impl Artifacts {
    fn is_empty(&self) -> bool {
        self.screenshot_path.is_none() && self.captured_element.is_none()
    }
}

impl Command {
    pub fn pending(id: impl Into<String>, step_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            index: 0,
            step_type: step_type.into(),
            status: Status::Pending,
            label: None,
            params: CommandParams::default(),
            started_at: None,
            ended_at: None,
            duration_ms: None,
            error: None,
            artifacts: Artifacts::default(),
            sub_commands: Vec::new(),
        }
    }

    pub fn with_index(mut self, index: u32) -> Self {
        self.index = index;
        self
    }

    pub fn with_params(mut self, params: CommandParams) -> Self {
        self.params = params;
        self
    }

    pub fn start(&mut self, at: DateTime<Utc>) {
        self.status = Status::Running;
        self.started_at = Some(at);
    }

    pub fn finish(&mut self, status: Status, at: DateTime<Utc>) {
        self.status = status;
        self.ended_at = Some(at);
        if let Some(started) = self.started_at {
            self.duration_ms = Some((at - started).num_milliseconds().max(0) as u64);
        }
    }

    /// Walks `sub_commands` depth-first to find the deepest command
    /// currently in a failed state, used by the JUnit emitter to surface
    /// the most specific failure message.
    pub fn deepest_failure(&self) -> Option<&Command> {
        for child in &self.sub_commands {
            if let Some(found) = child.deepest_failure() {
                return Some(found);
            }
        }
        if self.status == Status::Failed {
            Some(self)
        } else {
            None
        }
    }
}

/// Tracks one execution attempt of a flow: every retry of a flow gets its
/// own `Attempt`, appended to `FlowDetail::attempts` in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    pub index: u32,
    pub status: Status,
    /// `None` for an attempt the skeleton builder seeded with `pending`
    /// commands before the flow actually started running.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowDetail {
    pub flow_id: String,
    pub name: String,
    pub source_path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    pub attempts: Vec<Attempt>,
    pub update_seq: u64,
}

impl FlowDetail {
    pub fn current_attempt(&self) -> Option<&Attempt> {
        self.attempts.last()
    }

    pub fn current_attempt_mut(&mut self) -> Option<&mut Attempt> {
        self.attempts.last_mut()
    }

    pub fn overall_status(&self) -> Status {
        self.current_attempt().map(|a| a.status).unwrap_or(Status::Pending)
    }
}
