//! flowbench: runs a list of flow files across one or more simulated mobile
//! devices and writes an incrementally-updated report,
//! then derives a JUnit XML and an HTML report from it.
//!
//! Flow-file parsing, real device drivers, and full CLI argument parsing
//! are all out of scope for the core -- this binary is the thin
//! wiring layer around them: flows are read as the wire-format JSON
//! `flowbench_domain::Flow` already serializes to/from, and devices are
//! backed by `flowbench-driver`'s mock/logging drivers rather than a real
//! automation backend.

mod config;

use config::EnvDefaults;
use flowbench_core::model::{AppRecord, DeviceRecord, RunnerInfo};
use flowbench_domain::Flow;
use flowbench_driver::{Driver, LoggingDriver, MockDriver};
use flowbench_report::{render_html, render_junit};
use flowbench_runner::{dispatch, DeviceSlot, DispatchInput, DispatcherConfig, FlowLoader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

struct Args {
    flow_paths: Vec<PathBuf>,
    output_dir: PathBuf,
    device: Option<String>,
    platform: Option<String>,
    workers: usize,
    max_attempts: u32,
    include_tags: Vec<String>,
    exclude_tags: Vec<String>,
    dry_run: bool,
}

fn parse_args(defaults: &EnvDefaults) -> Result<Args, anyhow::Error> {
    let mut flow_paths = Vec::new();
    let mut output_dir = PathBuf::from("flowbench-report");
    let mut device = defaults.device.clone();
    let mut platform = defaults.platform.clone();
    let mut workers = 1usize;
    let mut max_attempts = 1u32;
    let mut include_tags = Vec::new();
    let mut exclude_tags = Vec::new();
    let mut dry_run = false;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--output" => output_dir = PathBuf::from(args.next().ok_or_else(|| anyhow::anyhow!("--output requires a path"))?),
            "--device" => device = Some(args.next().ok_or_else(|| anyhow::anyhow!("--device requires a value"))?),
            "--platform" => platform = Some(args.next().ok_or_else(|| anyhow::anyhow!("--platform requires a value"))?),
            "--workers" => workers = args.next().ok_or_else(|| anyhow::anyhow!("--workers requires a value"))?.parse()?,
            "--max-attempts" => max_attempts = args.next().ok_or_else(|| anyhow::anyhow!("--max-attempts requires a value"))?.parse()?,
            "--tag" => include_tags.push(args.next().ok_or_else(|| anyhow::anyhow!("--tag requires a value"))?),
            "--exclude-tag" => exclude_tags.push(args.next().ok_or_else(|| anyhow::anyhow!("--exclude-tag requires a value"))?),
            "--dry-run" => dry_run = true,
            other => flow_paths.push(PathBuf::from(other)),
        }
    }

    if flow_paths.is_empty() {
        anyhow::bail!("no flow files given (pass one or more paths to JSON-encoded flows)");
    }

    Ok(Args { flow_paths, output_dir, device, platform, workers, max_attempts, include_tags, exclude_tags, dry_run })
}

/// Resolves a `runFlow` step's `file` reference by reading and
/// deserializing it the same way the top-level flow list was read,
/// relative to the referencing flow's own directory.
struct JsonFileFlowLoader {
    base_dir: PathBuf,
}

impl FlowLoader for JsonFileFlowLoader {
    fn load(&self, path: &str) -> Option<Flow> {
        let full = self.base_dir.join(path);
        let bytes = std::fs::read(&full).map_err(|err| log::warn!("could not read nested flow {}: {err}", full.display())).ok()?;
        serde_json::from_slice(&bytes).map_err(|err| log::warn!("could not parse nested flow {}: {err}", full.display())).ok()
    }
}

fn load_flow(path: &Path) -> Result<Flow, anyhow::Error> {
    let bytes = std::fs::read(path).map_err(|err| anyhow::anyhow!("reading flow file {}: {err}", path.display()))?;
    let flow: Flow = serde_json::from_slice(&bytes).map_err(|err| anyhow::anyhow!("parsing flow file {}: {err}", path.display()))?;
    Ok(flow)
}

fn make_driver(device_id: String, platform: String, dry_run: bool) -> Box<dyn Fn() -> Box<dyn Driver> + Send + Sync> {
    if dry_run {
        Box::new(move || Box::new(LoggingDriver::new(device_id.clone(), platform.clone())) as Box<dyn Driver>)
    } else {
        Box::new(move || Box::new(MockDriver::new(device_id.clone(), platform.clone())) as Box<dyn Driver>)
    }
}

fn main() -> Result<(), anyhow::Error> {
    env_logger::init();
    let defaults = EnvDefaults::load();
    let args = parse_args(&defaults)?;

    let flows: Vec<Flow> = args.flow_paths.iter().map(|p| load_flow(p)).collect::<Result<_, _>>()?;

    let platform = args.platform.clone().unwrap_or_else(|| "android".to_string());
    let device_base = args.device.clone().unwrap_or_else(|| "device".to_string());
    let devices: Vec<DeviceSlot> = (0..args.workers.max(1))
        .map(|i| {
            let device_id = if args.workers <= 1 { device_base.clone() } else { format!("{device_base}-{i}") };
            DeviceSlot {
                device: DeviceRecord { id: device_id.clone(), platform: Some(platform.clone()), name: None },
                make_driver: make_driver(device_id, platform.clone(), args.dry_run),
                cleanup: None,
            }
        })
        .collect();

    let base_dir = args.flow_paths[0].parent().map(|p| p.to_path_buf()).unwrap_or_default();
    let loader = Arc::new(JsonFileFlowLoader { base_dir });

    let config = DispatcherConfig {
        runner: flowbench_runner::RunnerConfig { max_attempts: args.max_attempts.max(1), ..Default::default() },
        worker_count: args.workers.max(1),
        debounce: Duration::from_millis(100),
        cleanup_drain: Duration::from_millis(100),
        include_tags: args.include_tags.clone(),
        exclude_tags: args.exclude_tags.clone(),
    };

    std::fs::create_dir_all(&args.output_dir)?;
    let run = dispatch(
        &args.output_dir,
        DispatchInput {
            run_id: uuid::Uuid::new_v4().to_string(),
            flows,
            devices,
            app: None::<AppRecord>,
            runner_info: RunnerInfo { name: "flowbench".to_string(), version: env!("CARGO_PKG_VERSION").to_string() },
            loader,
            config: &config,
        },
    )?;

    log::info!("run {} finished: {:?} ({} flows)", run.run_id, run.status, run.flow_results.len());

    let index = flowbench_core::read_index(&args.output_dir.join("report.json"))?;
    let details: Vec<_> = index
        .flows
        .iter()
        .filter_map(|entry| flowbench_core::read_flow_detail(&args.output_dir.join(&entry.detail_path)).ok())
        .collect();

    let junit_xml = render_junit(&index, &details);
    std::fs::write(args.output_dir.join("junit-report.xml"), junit_xml)?;

    let assets_dir = args.output_dir.join("assets");
    let html = render_html(&index, &details, assets_dir.is_dir().then_some(assets_dir.as_path()))?;
    std::fs::write(args.output_dir.join("report.html"), html)?;

    println!("report written to {}", args.output_dir.display());
    for flow in &run.flow_results {
        println!("  - {}: {:?}", flow.name, flow.status);
    }

    if run.status == flowbench_core::model::Status::Failed {
        std::process::exit(1);
    }
    Ok(())
}
