//! flowbench-cli: a small demonstration binary for the flowbench engine.
//!
//! This runs one hand-built flow against a mock device and prints the
//! result. For the real CLI entry point -- flow files, device/platform
//! configuration, JUnit/HTML output -- see the root binary.

use flowbench_domain::{Flow, FlowConfig, Selector, Step, StepKind};
use flowbench_driver::MockDriver;
use flowbench_runner::{dispatch, DeviceSlot, DispatchInput, DispatcherConfig, FlowLoader};
use std::sync::Arc;

struct NoOpLoader;
impl FlowLoader for NoOpLoader {
    fn load(&self, _path: &str) -> Option<Flow> {
        None
    }
}

fn demo_flow() -> Flow {
    Flow {
        config: FlowConfig { name: Some("demo flow".into()), ..Default::default() },
        source_path: "demo.yaml".into(),
        steps: vec![
            Step::new(StepKind::LaunchApp { app_id: Some("com.example.app".into()), clear_state: false }),
            Step::new(StepKind::TapOn { selector: Selector { id: Some("login_button".into()), ..Default::default() } }),
            Step::new(StepKind::Back),
        ],
    }
}

fn main() {
    println!("flowbench-cli");
    println!("=============");

    let dir = std::env::temp_dir().join("flowbench-cli-demo");
    let devices = vec![DeviceSlot {
        device: flowbench_core::model::DeviceRecord { id: "device-1".into(), platform: Some("android".into()), name: None },
        make_driver: Box::new(|| Box::new(MockDriver::new("device-1", "android"))),
        cleanup: None,
    }];
    let config = DispatcherConfig::default();

    let result = dispatch(
        &dir,
        DispatchInput {
            run_id: "demo-run".into(),
            flows: vec![demo_flow()],
            devices,
            app: None,
            runner_info: flowbench_core::model::RunnerInfo { name: "flowbench".into(), version: env!("CARGO_PKG_VERSION").into() },
            loader: Arc::new(NoOpLoader),
            config: &config,
        },
    );

    match result {
        Ok(run) => {
            println!("run {} finished: {:?}", run.run_id, run.status);
            for flow in &run.flow_results {
                println!("  - {}: {:?}", flow.name, flow.status);
            }
            println!("report written to {}", dir.display());
        }
        Err(err) => {
            println!("dispatch failed: {err}");
        }
    }
}
