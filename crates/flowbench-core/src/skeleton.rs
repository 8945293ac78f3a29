//! Builds the initial index document and per-flow detail documents before
//! any flow has started running. Every flow the dispatcher intends
//! to run -- after tag filtering -- must appear here with status
//! `Pending`, so readers polling the index mid-run see the whole run's
//! shape from the first write.

use crate::model::{AppRecord, Attempt, Command, DeviceRecord, FlowDetail, FlowEntry, IndexDocument, RunnerInfo, Status, Summary};
use crate::params::command_params;
use chrono::Utc;
use flowbench_domain::Flow;

pub struct SkeletonInput<'a> {
    pub run_id: String,
    pub flows: &'a [(Flow, String)],
    pub devices: Vec<DeviceRecord>,
    pub app: Option<AppRecord>,
    pub runner: RunnerInfo,
}

pub struct Skeleton {
    pub index: IndexDocument,
    pub details: Vec<FlowDetail>,
}

/// Builds the flat, top-level `pending` command list for `flow`: one
/// `cmd-NNN` entry per step, with `params` filled via the fixed mapping
///. Nested `runFlow`/`runScript` children are unknown until the
/// referenced flow is actually loaded at run time, so they are not
/// represented here -- only the command their parent step becomes is.
fn command_templates(flow: &Flow) -> Vec<Command> {
    flow.steps
        .iter()
        .enumerate()
        .map(|(i, step)| {
            let mut cmd = Command::pending(format!("cmd-{i:03}"), step.kind.type_name()).with_index(i as u32).with_params(command_params(&step.kind, step.timeout_ms));
            cmd.label = step.label.clone();
            cmd
        })
        .collect()
}

/// Builds an `IndexDocument` with one `Pending` `FlowEntry` per input flow,
/// plus a matching `FlowDetail` for each, pre-populated with every
/// top-level command in `pending` state. `flows` pairs each
/// parsed flow with the device id it has been assigned to run on; the
/// entry's stable `index` is its position in this list.
pub fn build_skeleton(input: SkeletonInput) -> Skeleton {
    let mut entries = Vec::with_capacity(input.flows.len());
    let mut details = Vec::with_capacity(input.flows.len());

    for (i, (flow, device_id)) in input.flows.iter().enumerate() {
        let flow_id = format!("flow-{i:03}");
        let detail_path = format!("flows/{flow_id}.json");
        let assets_path = format!("assets/{flow_id}");
        let templates = command_templates(flow);
        let commands_summary = Summary::from_statuses(templates.iter().map(|c| c.status));
        entries.push(FlowEntry {
            index: i as u32,
            id: flow_id.clone(),
            name: flow.display_name(),
            source_path: flow.source_path.clone(),
            status: Status::Pending,
            tags: flow.config.tags.clone(),
            detail_path,
            assets_path,
            update_seq: 0,
            device_id: Some(device_id.clone()),
            duration_ms: None,
            commands: commands_summary,
            error: None,
            attempts: 0,
            attempt_history: Vec::new(),
        });
        details.push(FlowDetail {
            flow_id,
            name: flow.display_name(),
            source_path: flow.source_path.clone(),
            tags: flow.config.tags.clone(),
            device_id: Some(device_id.clone()),
            attempts: vec![Attempt { index: 1, status: Status::Pending, started_at: None, ended_at: None, commands: templates }],
            update_seq: 0,
        });
    }

    let mut index = IndexDocument {
        run_id: input.run_id,
        status: Status::Pending,
        started_at: Utc::now(),
        ended_at: None,
        duration_ms: None,
        summary: Summary::default(),
        flows: entries,
        devices: input.devices,
        app: input.app,
        runner: input.runner,
        global_seq: 0,
    };
    index.recompute_summary();

    Skeleton { index, details }
}
