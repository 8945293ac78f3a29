//! C7: runs one flow, attempt by attempt, against one device. Owns the
//! `FlowWriter` for its flow and reports flow-level status changes to the
//! shared `IndexWriter`. A single `FlowRunner` never touches another
//! flow's files or another worker's driver/script-engine -- that
//! separation is what lets C8 run many of these concurrently with only
//! the index document shared.

use crate::config::RunnerConfig;
use crate::errors::RunnerError;
use crate::step_exec::{execute_condition, execute_step};
use chrono::Utc;
use flowbench_core::model::{AttemptRecord, Command, Status, Summary};
use flowbench_core::{FlowWriter, IndexWriter};
use flowbench_domain::{Flow, Step, StepKind};
use flowbench_driver::Driver;
use flowbench_script::ScriptEngine;

/// Resolves a `runFlow`'s `file` reference to an already-parsed `Flow`.
/// Parsing flow files from disk is outside this crate's scope; callers
/// (typically `flowbench-cli` or the root binary) supply a loader backed
/// by whatever flow-file format they use.
pub trait FlowLoader {
    fn load(&self, path: &str) -> Option<Flow>;
}

pub struct FlowRunOutcome {
    pub status: Status,
    pub commands: Vec<Command>,
}

/// Runs `flow`'s steps as attempt number `attempt_index` (1-based),
/// writing every command to `flow_writer` as it completes and the flow's
/// aggregate status to `index` once the attempt ends.
pub fn run_flow(
    flow_id: &str,
    flow: &Flow,
    attempt_index: u32,
    flow_writer: &mut FlowWriter,
    index: &IndexWriter,
    engine: &mut ScriptEngine,
    driver: &mut dyn Driver,
    loader: &dyn FlowLoader,
    config: &RunnerConfig,
) -> Result<FlowRunOutcome, RunnerError> {
    flow_writer.start_attempt(attempt_index)?;
    // A skeleton-seeded attempt already carries one `pending` command per
    // step; a writer built without one (e.g. a bare unit test) has
    // none, and this runner falls back to building + appending them itself.
    let has_template = flow_writer.detail().current_attempt().map(|a| a.commands.len() == flow.steps.len() && !a.commands.is_empty()).unwrap_or(false);

    for (key, value) in &flow.config.env {
        engine.set_variable(key.clone(), serde_json::Value::String(value.clone()));
    }

    let mut stopped_early = false;
    let mut commands = Vec::with_capacity(flow.steps.len());

    // Move the flow into `Running` with its initial (all-pending) command
    // summary before the first step executes, so a consumer polling the
    // index mid-flow sees progress rather than a stale `Pending` entry
    // (§1, §4.6).
    index.update_flow(flow_id, Status::Running, None, None, Some(commands_summary(&commands, flow.steps.len())))?;

    for (i, step) in flow.steps.iter().enumerate() {
        let base_cmd = |flow_writer: &FlowWriter| -> Command {
            if has_template {
                flow_writer.detail().current_attempt().expect("checked has_template").commands[i].clone()
            } else {
                let mut cmd = Command::pending(format!("cmd-{i:03}"), step.kind.type_name()).with_index(i as u32).with_params(flowbench_core::command_params(&step.kind, step.timeout_ms));
                cmd.label = step.label.clone();
                cmd
            }
        };

        if stopped_early {
            let mut cmd = base_cmd(flow_writer);
            cmd.status = Status::Skipped;
            if has_template {
                flow_writer.update_command(i, cmd.clone())?;
            } else {
                flow_writer.append_command(cmd.clone())?;
            }
            commands.push(cmd);
            index.update_flow(flow_id, Status::Running, None, None, Some(commands_summary(&commands, flow.steps.len())))?;
            continue;
        }

        let mut cmd = base_cmd(flow_writer);
        cmd.start(Utc::now());
        if has_template {
            flow_writer.update_command(i, cmd.clone())?;
        } else {
            flow_writer.append_command(cmd.clone())?;
        }

        let outcome = run_one_step(step, engine, driver, loader, config)?;

        cmd.sub_commands = outcome.sub_commands;
        cmd.artifacts = outcome.artifacts;
        cmd.error = outcome.error;
        let final_status = if outcome.skipped { Status::Skipped } else if outcome.passed { Status::Passed } else { Status::Failed };
        cmd.finish(final_status, Utc::now());
        flow_writer.update_command(i, cmd.clone())?;
        commands.push(cmd);
        index.update_flow(flow_id, Status::Running, None, None, Some(commands_summary(&commands, flow.steps.len())))?;

        if final_status == Status::Failed && config.stop_on_failure {
            stopped_early = true;
        }
    }

    let overall = Status::aggregate(commands.iter().map(|c| c.status));
    flow_writer.end_attempt(overall)?;
    let error = commands.iter().find_map(|c| c.deepest_failure()).and_then(|c| c.error.as_ref()).map(|e| e.message.clone());
    index.update_flow(flow_id, overall, None, error, Some(commands_summary(&commands, flow.steps.len())))?;

    Ok(FlowRunOutcome { status: overall, commands })
}

/// This flow's command counters with every already-executed command's
/// real status plus every not-yet-reached step still `Pending`, so the
/// total always equals `total` regardless of how far execution has
/// progressed.
fn commands_summary(commands: &[Command], total: usize) -> Summary {
    let remaining = total.saturating_sub(commands.len());
    Summary::from_statuses(commands.iter().map(|c| c.status).chain(std::iter::repeat(Status::Pending).take(remaining)))
}

/// Runs `flow` against `driver`, retrying up to `config.max_attempts`
/// times while an attempt fails, recording every attempt's outcome to the
/// index via `record_attempt`. Only the last attempt's
/// status is ever reported as the flow's own terminal status -- intermediate
/// failed attempts still flow through `run_flow`'s own `update_flow` call,
/// but get superseded the moment the next attempt starts.
pub fn run_flow_with_retries(
    flow_id: &str,
    flow: &Flow,
    flow_writer: &mut FlowWriter,
    index: &IndexWriter,
    engine: &mut ScriptEngine,
    driver: &mut dyn Driver,
    loader: &dyn FlowLoader,
    config: &RunnerConfig,
) -> Result<FlowRunOutcome, RunnerError> {
    let max_attempts = config.max_attempts.max(1);
    let mut last_outcome = None;

    for attempt_index in 1..=max_attempts {
        let outcome = run_flow(flow_id, flow, attempt_index, flow_writer, index, engine, driver, loader, config)?;

        let duration_ms = flow_writer
            .detail()
            .current_attempt()
            .and_then(|a| a.started_at.zip(a.ended_at))
            .map(|(start, end)| (end - start).num_milliseconds().max(0) as u64);
        let error = outcome.commands.iter().find_map(|c| c.deepest_failure()).and_then(|c| c.error.as_ref()).map(|e| e.message.clone());
        let done = outcome.status != Status::Failed || attempt_index == max_attempts;

        // Preserve this attempt's full detail under its own file before the
        // next attempt starts overwriting the live detail document.
        let attempt_path = if !done { Some(format!("flows/{}", flow_writer.snapshot_attempt(attempt_index)?)) } else { None };

        index.record_attempt(flow_id, AttemptRecord { index: attempt_index, status: outcome.status, duration_ms, error, attempt_path })?;

        last_outcome = Some(outcome);
        if done {
            break;
        }
    }

    Ok(last_outcome.expect("loop runs at least once since max_attempts is clamped to >= 1"))
}

struct StepRunOutcome {
    passed: bool,
    skipped: bool,
    error: Option<flowbench_core::model::CommandError>,
    artifacts: flowbench_core::model::Artifacts,
    sub_commands: Vec<Command>,
}

fn run_one_step(
    step: &Step,
    engine: &mut ScriptEngine,
    driver: &mut dyn Driver,
    loader: &dyn FlowLoader,
    config: &RunnerConfig,
) -> Result<StepRunOutcome, RunnerError> {
    if let StepKind::RunFlow { file, condition } = &step.kind {
        if let Some(condition) = condition {
            if !execute_condition(condition, engine, driver, config)?.passed {
                return Ok(StepRunOutcome { passed: true, skipped: true, error: None, artifacts: Default::default(), sub_commands: Vec::new() });
            }
        }
        let Some(path) = file else {
            return Ok(StepRunOutcome { passed: true, skipped: false, error: None, artifacts: Default::default(), sub_commands: Vec::new() });
        };
        let Some(nested_flow) = loader.load(path) else {
            return Ok(StepRunOutcome {
                passed: false,
                skipped: false,
                error: Some(flowbench_core::model::CommandError { message: format!("could not load flow file {path}"), category: Some("ActionError".to_string()) }),
                artifacts: Default::default(),
                sub_commands: Vec::new(),
            });
        };

        let mut sub_commands = Vec::with_capacity(nested_flow.steps.len());
        let mut all_passed = true;
        let mut stopped_early = false;
        for (j, nested_step) in nested_flow.steps.iter().enumerate() {
            if stopped_early {
                let mut cmd = Command::pending(format!("cmd-{j:03}"), nested_step.kind.type_name())
                    .with_index(j as u32)
                    .with_params(flowbench_core::command_params(&nested_step.kind, nested_step.timeout_ms));
                cmd.status = Status::Skipped;
                sub_commands.push(cmd);
                continue;
            }
            let mut cmd = Command::pending(format!("cmd-{j:03}"), nested_step.kind.type_name())
                .with_index(j as u32)
                .with_params(flowbench_core::command_params(&nested_step.kind, nested_step.timeout_ms));
            cmd.label = nested_step.label.clone();
            cmd.start(Utc::now());
            let nested_outcome = run_one_step(nested_step, engine, driver, loader, config)?;
            cmd.sub_commands = nested_outcome.sub_commands;
            cmd.artifacts = nested_outcome.artifacts;
            cmd.error = nested_outcome.error;
            let status = if nested_outcome.skipped { Status::Skipped } else if nested_outcome.passed { Status::Passed } else { Status::Failed };
            cmd.finish(status, Utc::now());
            if status == Status::Failed {
                all_passed = false;
                if config.stop_on_failure {
                    stopped_early = true;
                }
            }
            sub_commands.push(cmd);
        }

        return Ok(StepRunOutcome { passed: all_passed, skipped: false, error: None, artifacts: Default::default(), sub_commands });
    }

    let outcome = execute_step(&step.kind, engine, driver, config)?;
    Ok(StepRunOutcome { passed: outcome.passed, skipped: outcome.skipped, error: outcome.error, artifacts: outcome.artifacts, sub_commands: Vec::new() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowbench_core::model::{FlowDetail, RunnerInfo, Summary};
    use flowbench_core::model::{FlowEntry, IndexDocument};
    use flowbench_core::StoreConfig;
    use flowbench_domain::{FlowConfig, Step};
    use flowbench_driver::MockDriver;

    struct NoOpLoader;
    impl FlowLoader for NoOpLoader {
        fn load(&self, _path: &str) -> Option<Flow> {
            None
        }
    }

    fn sample_flow() -> Flow {
        Flow {
            config: FlowConfig::default(),
            source_path: "sample.yaml".into(),
            steps: vec![Step::new(StepKind::Back), Step::new(StepKind::HideKeyboard)],
        }
    }

    #[test]
    fn runs_every_step_and_marks_flow_passed() {
        let dir = tempfile::tempdir().unwrap();
        let index_doc = IndexDocument {
            run_id: "r1".into(),
            status: Status::Pending,
            started_at: Utc::now(),
            ended_at: None,
            duration_ms: None,
            summary: Summary::default(),
            flows: vec![FlowEntry { index: 0, id: "f1".into(), name: "flow".into(), source_path: "sample.yaml".into(), status: Status::Pending, tags: vec![], detail_path: "flows/f1.json".into(), assets_path: "assets/f1".into(), update_seq: 0, device_id: None, duration_ms: None, commands: Summary::default(), error: None, attempts: 0, attempt_history: vec![] }],
            devices: vec![],
            app: None,
            runner: RunnerInfo { name: "flowbench".into(), version: "0.1.0".into() },
            global_seq: 0,
        };
        let index = IndexWriter::start(dir.path().join("report.json"), index_doc, &StoreConfig::default()).unwrap();
        let detail = FlowDetail { flow_id: "f1".into(), name: "flow".into(), source_path: "sample.yaml".into(), tags: vec![], device_id: None, attempts: vec![], update_seq: 0 };
        let mut flow_writer = FlowWriter::new(dir.path().join("flows/f1.json"), detail);
        let mut engine = ScriptEngine::new(dir.path().to_path_buf());
        let mut driver = MockDriver::new("device-1", "android");
        let loader = NoOpLoader;
        let config = RunnerConfig::default();

        let outcome = run_flow("f1", &sample_flow(), 1, &mut flow_writer, &index, &mut engine, &mut driver, &loader, &config).unwrap();
        assert_eq!(outcome.status, Status::Passed);
        assert_eq!(outcome.commands.len(), 2);
        assert_eq!(index.flow_entry("f1").unwrap().status, Status::Passed);
        index.close().unwrap();
    }

    #[test]
    fn stop_on_failure_skips_remaining_steps() {
        let dir = tempfile::tempdir().unwrap();
        let index_doc = IndexDocument {
            run_id: "r1".into(),
            status: Status::Pending,
            started_at: Utc::now(),
            ended_at: None,
            duration_ms: None,
            summary: Summary::default(),
            flows: vec![FlowEntry { index: 0, id: "f1".into(), name: "flow".into(), source_path: "sample.yaml".into(), status: Status::Pending, tags: vec![], detail_path: "flows/f1.json".into(), assets_path: "assets/f1".into(), update_seq: 0, device_id: None, duration_ms: None, commands: Summary::default(), error: None, attempts: 0, attempt_history: vec![] }],
            devices: vec![],
            app: None,
            runner: RunnerInfo { name: "flowbench".into(), version: "0.1.0".into() },
            global_seq: 0,
        };
        let index = IndexWriter::start(dir.path().join("report.json"), index_doc, &StoreConfig::default()).unwrap();
        let detail = FlowDetail { flow_id: "f1".into(), name: "flow".into(), source_path: "sample.yaml".into(), tags: vec![], device_id: None, attempts: vec![], update_seq: 0 };
        let mut flow_writer = FlowWriter::new(dir.path().join("flows/f1.json"), detail);
        let mut engine = ScriptEngine::new(dir.path().to_path_buf());
        let mut driver = MockDriver::new("device-1", "android");
        driver.fail_on.insert("back");
        let loader = NoOpLoader;
        let config = RunnerConfig::default();

        let flow = Flow { config: FlowConfig::default(), source_path: "sample.yaml".into(), steps: vec![Step::new(StepKind::Back), Step::new(StepKind::HideKeyboard)] };
        let outcome = run_flow("f1", &flow, 1, &mut flow_writer, &index, &mut engine, &mut driver, &loader, &config).unwrap();
        assert_eq!(outcome.status, Status::Failed);
        assert_eq!(outcome.commands[1].status, Status::Skipped);
        index.close().unwrap();
    }

    #[test]
    fn retries_until_max_attempts_then_reports_failed() {
        let dir = tempfile::tempdir().unwrap();
        let index_doc = IndexDocument {
            run_id: "r1".into(),
            status: Status::Pending,
            started_at: Utc::now(),
            ended_at: None,
            duration_ms: None,
            summary: Summary::default(),
            flows: vec![FlowEntry { index: 0, id: "f1".into(), name: "flow".into(), source_path: "sample.yaml".into(), status: Status::Pending, tags: vec![], detail_path: "flows/f1.json".into(), assets_path: "assets/f1".into(), update_seq: 0, device_id: None, duration_ms: None, commands: Summary::default(), error: None, attempts: 0, attempt_history: vec![] }],
            devices: vec![],
            app: None,
            runner: RunnerInfo { name: "flowbench".into(), version: "0.1.0".into() },
            global_seq: 0,
        };
        let index = IndexWriter::start(dir.path().join("report.json"), index_doc, &StoreConfig::default()).unwrap();
        let detail = FlowDetail { flow_id: "f1".into(), name: "flow".into(), source_path: "sample.yaml".into(), tags: vec![], device_id: None, attempts: vec![], update_seq: 0 };
        let mut flow_writer = FlowWriter::new(dir.path().join("flows/f1.json"), detail);
        let mut engine = ScriptEngine::new(dir.path().to_path_buf());
        let mut driver = MockDriver::new("device-1", "android");
        driver.fail_on.insert("back");
        let loader = NoOpLoader;
        let config = RunnerConfig { max_attempts: 3, ..RunnerConfig::default() };

        let flow = Flow { config: FlowConfig::default(), source_path: "sample.yaml".into(), steps: vec![Step::new(StepKind::Back)] };
        let outcome = run_flow_with_retries("f1", &flow, &mut flow_writer, &index, &mut engine, &mut driver, &loader, &config).unwrap();

        assert_eq!(outcome.status, Status::Failed);
        assert_eq!(flow_writer.detail().attempts.len(), 3);
        let entry = index.flow_entry("f1").unwrap();
        assert_eq!(entry.attempts, 3);
        assert!(entry.attempt_history.iter().all(|a| a.status == Status::Failed));
        index.close().unwrap();
    }

    #[test]
    fn retries_stop_as_soon_as_an_attempt_passes() {
        let dir = tempfile::tempdir().unwrap();
        let index_doc = IndexDocument {
            run_id: "r1".into(),
            status: Status::Pending,
            started_at: Utc::now(),
            ended_at: None,
            duration_ms: None,
            summary: Summary::default(),
            flows: vec![FlowEntry { index: 0, id: "f1".into(), name: "flow".into(), source_path: "sample.yaml".into(), status: Status::Pending, tags: vec![], detail_path: "flows/f1.json".into(), assets_path: "assets/f1".into(), update_seq: 0, device_id: None, duration_ms: None, commands: Summary::default(), error: None, attempts: 0, attempt_history: vec![] }],
            devices: vec![],
            app: None,
            runner: RunnerInfo { name: "flowbench".into(), version: "0.1.0".into() },
            global_seq: 0,
        };
        let index = IndexWriter::start(dir.path().join("report.json"), index_doc, &StoreConfig::default()).unwrap();
        let detail = FlowDetail { flow_id: "f1".into(), name: "flow".into(), source_path: "sample.yaml".into(), tags: vec![], device_id: None, attempts: vec![], update_seq: 0 };
        let mut flow_writer = FlowWriter::new(dir.path().join("flows/f1.json"), detail);
        let mut engine = ScriptEngine::new(dir.path().to_path_buf());
        let mut driver = MockDriver::new("device-1", "android");
        let loader = NoOpLoader;
        let config = RunnerConfig { max_attempts: 3, ..RunnerConfig::default() };

        let outcome = run_flow_with_retries("f1", &sample_flow(), &mut flow_writer, &index, &mut engine, &mut driver, &loader, &config).unwrap();

        assert_eq!(outcome.status, Status::Passed);
        assert_eq!(flow_writer.detail().attempts.len(), 1);
        assert_eq!(index.flow_entry("f1").unwrap().attempts, 1);
    }
}
