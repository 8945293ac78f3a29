//! C9: reading a run's documents as an outside consumer (a UI, a second
//! process) rather than as the writer. `poll` tells the caller which
//! flows changed since the last call without re-reading everything, and
//! `recover` turns a crash-interrupted run's on-disk state back into a
//! terminal one.

use crate::errors::StoreError;
use crate::model::{FlowDetail, IndexDocument, Status};
use std::path::Path;

#[derive(Debug, Clone, Copy, Default)]
pub struct ConsumerCursor {
    pub last_global_seq: u64,
}

#[derive(Debug, Clone)]
pub struct PollResult {
    pub index: IndexDocument,
    /// Ids of flows whose `FlowEntry.update_seq` moved since the cursor
    /// was last advanced via this same `poll` call's previous run. The
    /// caller is responsible for re-fetching those flows' detail
    /// documents; this module does not cache per-flow sequence numbers
    /// across calls.
    pub changed_flow_ids: Vec<String>,
}

pub fn read_index(path: &Path) -> Result<IndexDocument, StoreError> {
    let bytes = std::fs::read(path).map_err(|source| StoreError::Io { path: path.display().to_string(), source })?;
    serde_json::from_slice(&bytes).map_err(|source| StoreError::Serialize { what: "index", path: path.display().to_string(), source })
}

pub fn read_flow_detail(path: &Path) -> Result<FlowDetail, StoreError> {
    let bytes = std::fs::read(path).map_err(|source| StoreError::Io { path: path.display().to_string(), source })?;
    serde_json::from_slice(&bytes).map_err(|source| StoreError::Serialize { what: "flow-detail", path: path.display().to_string(), source })
}

/// Polls the index at `index_path`, comparing each flow's `update_seq`
/// against `previous` (the index snapshot from the caller's last poll, if
/// any) to decide which flows changed.
pub fn poll(index_path: &Path, previous: Option<&IndexDocument>, _cursor: &mut ConsumerCursor) -> Result<PollResult, StoreError> {
    let index = read_index(index_path)?;
    let changed_flow_ids = match previous {
        None => index.flows.iter().map(|f| f.id.clone()).collect(),
        Some(prev) => index
            .flows
            .iter()
            .filter(|f| prev.flows.iter().find(|p| p.id == f.id).map(|p| p.update_seq).unwrap_or(0) != f.update_seq)
            .map(|f| f.id.clone())
            .collect(),
    };
    Ok(PollResult { index, changed_flow_ids })
}

/// Recovers a run directory left behind by a process that crashed
/// mid-run. A flow still `Pending` never started and is left alone — the
/// next run of this same output directory will pick it up fresh. A flow
/// still `Running` did not get to record its own terminal outcome, so its
/// detail file is consulted to infer one: any command `Failed` means the
/// flow is `Failed`; all commands `Passed` means the flow recovered
/// cleanly and is `Passed`; anything else (a command still `Running`/
/// `Pending`, or a detail file that can't be read at all) means the flow
/// is `Failed` with a fixed "Flow interrupted" error. The overall run
/// status is then recomputed from the repaired flow list and both
/// documents are rewritten to disk.
pub fn recover(output_dir: &Path) -> Result<IndexDocument, StoreError> {
    let index_path = output_dir.join("report.json");
    let mut index = read_index(&index_path)?;

    for entry in &mut index.flows {
        if entry.status != Status::Running {
            continue;
        }

        let detail_path = output_dir.join(&entry.detail_path);
        let inferred = match read_flow_detail(&detail_path) {
            Ok(mut detail) => {
                let (status, interrupted) = infer_recovered_status(&detail);
                if let Some(attempt) = detail.current_attempt_mut() {
                    attempt.status = status;
                    attempt.ended_at = attempt.ended_at.or_else(|| Some(chrono::Utc::now()));
                    if interrupted {
                        mark_interrupted(&mut attempt.commands);
                    }
                }
                detail.update_seq += 1;
                let _ = crate::atomic::write_json_atomic(&detail_path, "flow-detail", &detail);
                (status, interrupted)
            }
            Err(_) => (Status::Failed, true),
        };

        entry.status = inferred.0;
        entry.error = if inferred.1 { Some("Flow interrupted".to_string()) } else { entry.error.take() };
        entry.update_seq += 1;
    }

    index.recompute_summary();
    index.ended_at = index.ended_at.or_else(|| Some(chrono::Utc::now()));
    // §4.8/S5: recovery bumps the index's own `updateSeq` exactly once,
    // independent of how many individual flows it repaired.
    index.global_seq += 1;
    crate::atomic::write_json_atomic(&index_path, "index", &index)?;
    Ok(index)
}

/// Infers a terminal status for a flow still `Running` from its current
/// attempt's top-level commands, and whether that inference counts as an
/// interruption (as opposed to a clean pass that merely never got to
/// record its own terminal status). Returns `(Failed, true)` when there
/// are no commands to look at at all.
fn infer_recovered_status(detail: &FlowDetail) -> (Status, bool) {
    let Some(attempt) = detail.attempts.last() else {
        return (Status::Failed, true);
    };
    if attempt.commands.is_empty() {
        return (Status::Failed, true);
    }
    if attempt.commands.iter().any(|c| c.status == Status::Failed) {
        (Status::Failed, true)
    } else if attempt.commands.iter().all(|c| c.status == Status::Passed) {
        (Status::Passed, false)
    } else {
        (Status::Failed, true)
    }
}

fn mark_interrupted(commands: &mut [crate::model::Command]) {
    for cmd in commands.iter_mut() {
        if cmd.status == Status::Running || cmd.status == Status::Pending {
            cmd.status = Status::Failed;
            cmd.error = Some(crate::model::CommandError { message: "Flow interrupted".to_string(), category: Some("Interrupted".to_string()) });
        }
        mark_interrupted(&mut cmd.sub_commands);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attempt, FlowEntry, RunnerInfo, Summary};
    use chrono::Utc;

    fn write_fixture(dir: &Path) {
        let entry = FlowEntry {
            index: 0,
            id: "f1".into(),
            name: "flow".into(),
            source_path: "f1.yaml".into(),
            status: Status::Running,
            tags: vec![],
            detail_path: "flows/f1.json".into(),
            assets_path: "assets/f1".into(),
            update_seq: 3,
            device_id: None,
            duration_ms: None,
            commands: Summary::default(),
            error: None,
            attempts: 0,
            attempt_history: vec![],
        };
        let index = IndexDocument {
            run_id: "r1".into(),
            status: Status::Running,
            started_at: Utc::now(),
            ended_at: None,
            duration_ms: None,
            summary: Summary::from_statuses([Status::Running]),
            flows: vec![entry],
            devices: vec![],
            app: None,
            runner: RunnerInfo { name: "flowbench".into(), version: "0.1.0".into() },
            global_seq: 3,
        };
        crate::atomic::write_json_atomic(&dir.join("report.json"), "index", &index).unwrap();

        let mut cmd = crate::model::Command::pending("c1", "tapOn");
        cmd.status = Status::Running;
        let detail = FlowDetail {
            flow_id: "f1".into(),
            name: "flow".into(),
            source_path: "f1.yaml".into(),
            tags: vec![],
            device_id: None,
            attempts: vec![Attempt { index: 1, status: Status::Running, started_at: Utc::now(), ended_at: None, commands: vec![cmd] }],
            update_seq: 2,
        };
        crate::atomic::write_json_atomic(&dir.join("flows/f1.json"), "flow-detail", &detail).unwrap();
    }

    #[test]
    fn recover_turns_running_into_failed() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());

        let index = recover(dir.path()).unwrap();
        assert_eq!(index.flows[0].status, Status::Failed);
        assert_eq!(index.status, Status::Failed);

        let detail = read_flow_detail(&dir.path().join("flows/f1.json")).unwrap();
        assert_eq!(detail.attempts[0].status, Status::Failed);
        assert_eq!(detail.attempts[0].commands[0].status, Status::Failed);
        assert_eq!(detail.attempts[0].commands[0].error.as_ref().unwrap().message, "Flow interrupted");
    }

    #[test]
    fn poll_reports_only_changed_flows() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        let mut cursor = ConsumerCursor::default();
        let first = poll(&dir.path().join("report.json"), None, &mut cursor).unwrap();
        assert_eq!(first.changed_flow_ids, vec!["f1".to_string()]);

        let second = poll(&dir.path().join("report.json"), Some(&first.index), &mut cursor).unwrap();
        assert!(second.changed_flow_ids.is_empty());
    }
}
