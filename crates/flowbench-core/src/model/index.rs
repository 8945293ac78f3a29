//! The run-level index document: one per run, updated in place as flows
//! progress. See §3 for the wire shape and §4.3/§4.4 for write timing.

use super::status::Status;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerInfo {
    pub name: String,
    pub version: String,
}

/// Aggregate pass/fail/skip counts, recomputed from `flows` on every
/// index write (never stored independently of it).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
    pub pending: u32,
    pub running: u32,
}

impl Summary {
    pub fn from_statuses(statuses: impl IntoIterator<Item = Status>) -> Self {
        let mut s = Summary::default();
        for status in statuses {
            s.total += 1;
            match status {
                Status::Passed => s.passed += 1,
                Status::Failed => s.failed += 1,
                Status::Skipped => s.skipped += 1,
                Status::Pending => s.pending += 1,
                Status::Running => s.running += 1,
            }
        }
        s
    }
}

/// One completed retry attempt's outcome, as recorded on the index side by
/// `IndexWriter::record_attempt`. The full per-step detail for an
/// attempt lives in the flow's detail document; this is just enough for a
/// consumer to show retry history without re-reading that file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub index: u32,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Relative path to the snapshot file this attempt's detail document
    /// was preserved under before the next retry overwrote the live file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowEntry {
    /// Stable numeric position in the run's flow list; `id` is derived
    /// from it (`flow-NNN`, three-digit zero-padded, Property 1).
    #[serde(default)]
    pub index: u32,
    pub id: String,
    pub name: String,
    /// Source flow file this entry was built from.
    pub source_path: String,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Relative path (from the run's output directory) to this flow's
    /// detail document.
    pub detail_path: String,
    /// Relative path (from the run's output directory) to this flow's
    /// asset directory (screenshots etc., written by the driver).
    pub assets_path: String,
    /// Bumped every time this entry's detail document changes; consumers
    /// use it to decide whether to re-fetch the detail document.
    pub update_seq: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// This flow's own command counters (total/passed/failed/skipped/
    /// running/pending), mirroring `IndexDocument.summary`'s shape but
    /// scoped to this flow's commands rather than the run's flows.
    #[serde(default)]
    pub commands: Summary,
    /// Set once the flow reaches a terminal failed status, either by a
    /// failing command or by crash-recovery inference ("Flow interrupted").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Number of attempts recorded so far for this flow (1 after the
    /// first attempt finishes, bumped by every `record_attempt` call).
    #[serde(default, skip_serializing_if = "is_zero")]
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attempt_history: Vec<AttemptRecord>,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDocument {
    pub run_id: String,
    pub status: Status,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    pub summary: Summary,
    pub flows: Vec<FlowEntry>,
    pub devices: Vec<DeviceRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<AppRecord>,
    pub runner: RunnerInfo,
    /// Monotonically increasing across the whole document; bumped on
    /// every write, independent of any single flow's `update_seq`.
    pub global_seq: u64,
}

impl IndexDocument {
    pub fn recompute_summary(&mut self) {
        self.summary = Summary::from_statuses(self.flows.iter().map(|f| f.status));
        self.status = Status::aggregate(self.flows.iter().map(|f| f.status));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(status: Status) -> FlowEntry {
        FlowEntry {
            index: 0,
            id: "flow-000".into(),
            name: "flow".into(),
            source_path: "flow.yaml".into(),
            status,
            tags: vec![],
            detail_path: "flows/flow-000.json".into(),
            assets_path: "assets/flow-000".into(),
            update_seq: 1,
            device_id: None,
            duration_ms: None,
            commands: Summary::default(),
            error: None,
            attempts: 0,
            attempt_history: vec![],
        }
    }

    #[test]
    fn recompute_summary_matches_aggregate() {
        let mut doc = IndexDocument {
            run_id: "r1".into(),
            status: Status::Pending,
            started_at: Utc::now(),
            ended_at: None,
            duration_ms: None,
            summary: Summary::default(),
            flows: vec![entry(Status::Passed), entry(Status::Failed)],
            devices: vec![],
            app: None,
            runner: RunnerInfo { name: "flowbench".into(), version: "0.1.0".into() },
            global_seq: 0,
        };
        doc.recompute_summary();
        assert_eq!(doc.status, Status::Failed);
        assert_eq!(doc.summary.total, 2);
        assert_eq!(doc.summary.passed, 1);
        assert_eq!(doc.summary.failed, 1);
    }
}
