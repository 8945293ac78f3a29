//! C8: the parallel flow dispatcher. Builds the skeleton, starts the
//! index writer, then hands flows to a fixed pool of device workers
//! through a bounded work queue. Each worker owns its own driver and
//! script engine for the whole run; the only state shared across workers
//! is the `IndexWriter` (internally synchronized) and the results vector
//! (one `Mutex`-guarded slot per flow, written exactly once by the
//! worker that ran it).

use crate::config::DispatcherConfig;
use crate::errors::RunnerError;
use crate::flow_runner::{run_flow_with_retries, FlowLoader};
use flowbench_core::model::{AppRecord, DeviceRecord, FlowDetail, RunnerInfo, Status};
use flowbench_core::{build_skeleton, IndexWriter, SkeletonInput, StoreConfig};
use flowbench_domain::Flow;
use flowbench_driver::Driver;
use flowbench_script::ScriptEngine;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// One device slot available to the dispatcher: a stable id plus a
/// factory for a fresh `Driver` instance, since a driver typically owns a
/// live connection and cannot be shared across threads or reused once a
/// worker's queue of flows is exhausted.
pub struct DeviceSlot {
    pub device: DeviceRecord,
    pub make_driver: Box<dyn Fn() -> Box<dyn Driver> + Send + Sync>,
    /// Released resources (e.g. a real automation session) once this
    /// slot's worker has drained its queue. Invoked synchronously, once,
    /// in device order, after every worker has joined and before the
    /// cleanup-drain sleep. `None` for drivers with nothing to
    /// release, such as the in-memory mock/logging ones.
    pub cleanup: Option<Box<dyn Fn() + Send + Sync>>,
}

pub struct DispatchInput<'a> {
    pub run_id: String,
    pub flows: Vec<Flow>,
    pub devices: Vec<DeviceSlot>,
    pub app: Option<AppRecord>,
    pub runner_info: RunnerInfo,
    pub loader: Arc<dyn FlowLoader + Send + Sync>,
    pub config: &'a DispatcherConfig,
}

#[derive(Debug, Clone)]
pub struct FlowResult {
    pub flow_id: String,
    pub name: String,
    pub status: Status,
}

pub struct RunResult {
    pub run_id: String,
    pub status: Status,
    pub duration: Duration,
    pub flow_results: Vec<FlowResult>,
}

struct WorkItem {
    flow: Flow,
    flow_id: String,
    /// This flow's stable position in the input list, per §4.7 ("flow
    /// execution order within the result array matches input order").
    /// Workers pull items off the queue in no particular order, but each
    /// writes its outcome to this slot of the shared `results` vector,
    /// so the final order reflects the flows as given, not completion order.
    flow_index: usize,
    detail: FlowDetail,
    detail_path: PathBuf,
}

/// Runs every flow in `input.flows` (after tag filtering) across
/// `input.devices.len()` worker threads, writing the run's progress to
/// `output_dir` as it happens, and returns once every flow has a terminal
/// status and the index document has been closed.
pub fn dispatch(output_dir: &std::path::Path, input: DispatchInput) -> Result<RunResult, RunnerError> {
    if input.devices.is_empty() {
        return Err(RunnerError::NoDevices);
    }
    if input.config.worker_count == 0 {
        return Err(RunnerError::NoWorkers);
    }

    let start = Instant::now();
    let filtered: Vec<Flow> = input.flows.into_iter().filter(|f| f.matches_tags(&input.config.include_tags, &input.config.exclude_tags)).collect();

    let device_records: Vec<DeviceRecord> = input.devices.iter().map(|d| d.device.clone()).collect();
    let device_count = input.devices.len();
    let flow_device_pairs: Vec<(Flow, String)> =
        filtered.iter().enumerate().map(|(i, f)| (f.clone(), device_records[i % device_count].id.clone())).collect();

    let skeleton = build_skeleton(SkeletonInput {
        run_id: input.run_id.clone(),
        flows: &flow_device_pairs,
        devices: device_records,
        app: input.app,
        runner: input.runner_info,
    });

    let flow_entries = skeleton.index.flows.clone();
    let store_config = StoreConfig::default().with_debounce(input.config.debounce);
    let index = Arc::new(IndexWriter::start(output_dir.join("report.json"), skeleton.index, &store_config)?);

    let flow_count = flow_entries.len();
    let work_items: Vec<WorkItem> = flow_entries
        .iter()
        .zip(skeleton.details.into_iter())
        .zip(flow_device_pairs.into_iter())
        .map(|((entry, detail), (flow, _device_id))| WorkItem {
            flow,
            flow_id: entry.id.clone(),
            flow_index: entry.index as usize,
            detail_path: output_dir.join(&entry.detail_path),
            detail,
        })
        .collect();

    let (sender, receiver) = crossbeam_channel::bounded::<WorkItem>(work_items.len().max(1));
    for item in work_items {
        sender.send(item).expect("queue just created, cannot be disconnected");
    }
    drop(sender);

    // One slot per flow, indexed by its stable input position -- not
    // appended in completion order -- so the returned `flow_results`
    // preserves input order per §4.7/§5 regardless of which worker
    // finishes which flow first.
    let results: Arc<Mutex<Vec<Option<FlowResult>>>> = Arc::new(Mutex::new(vec![None; flow_count]));
    let worker_count = input.config.worker_count.min(device_count.max(1));
    let mut handles = Vec::with_capacity(worker_count);

    for worker_index in 0..worker_count {
        let receiver = receiver.clone();
        let index = Arc::clone(&index);
        let results = Arc::clone(&results);
        let loader = Arc::clone(&input.loader);
        let config = input.config.runner.clone();
        let make_driver = &input.devices[worker_index % device_count].make_driver;
        let mut driver = make_driver();
        let platform = driver.platform_info();

        let handle = std::thread::Builder::new()
            .name(format!("flowbench-worker-{worker_index}"))
            .spawn(move || {
                log::debug!("worker {worker_index} starting on device {}", platform.device_id);
                while let Ok(item) = receiver.recv() {
                    log::debug!("worker {worker_index} picked up flow {}", item.flow_id);
                    let mut flow_writer = flowbench_core::FlowWriter::new(item.detail_path, item.detail);
                    let mut engine = ScriptEngine::new(std::path::PathBuf::from(&item.flow.source_path).parent().map(|p| p.to_path_buf()).unwrap_or_default());
                    engine.platform = Some(platform.platform.clone());

                    // Panics inside a worker must not take down the whole
                    // dispatch run: the worker converts them into a single
                    // failed flow and keeps draining its queue.
                    let flow_id = item.flow_id.clone();
                    let flow = &item.flow;
                    let driver_ref = driver.as_mut();
                    let run_result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                        run_flow_with_retries(&flow_id, flow, &mut flow_writer, &index, &mut engine, driver_ref, loader.as_ref(), &config)
                    }));
                    let status = match run_result {
                        Ok(Ok(outcome)) => outcome.status,
                        Ok(Err(err)) => {
                            log::error!("flow {} failed to run: {err}", item.flow_id);
                            let _ = index.update_flow(&item.flow_id, Status::Failed, None, Some(err.to_string()), None);
                            Status::Failed
                        }
                        Err(panic) => {
                            let message = panic
                                .downcast_ref::<&str>()
                                .map(|s| s.to_string())
                                .or_else(|| panic.downcast_ref::<String>().cloned())
                                .unwrap_or_else(|| "worker panicked".to_string());
                            log::error!("flow {} panicked: {message}", item.flow_id);
                            let _ = index.update_flow(&item.flow_id, Status::Failed, None, Some(message), None);
                            Status::Failed
                        }
                    };
                    log::debug!("worker {worker_index} finished flow {} as {status:?}", item.flow_id);
                    let name = item.flow.display_name();
                    results.lock().expect("results mutex poisoned")[item.flow_index] = Some(FlowResult { flow_id: item.flow_id, name, status });
                }
                log::debug!("worker {worker_index} draining done");
            })
            .expect("failed to spawn worker thread");
        handles.push(handle);
    }

    for handle in handles {
        let _ = handle.join();
    }

    // Cleanup closures run synchronously, in dispatcher (device) order,
    // after every worker has joined and before the drain sleep.
    for slot in &input.devices {
        if let Some(cleanup) = &slot.cleanup {
            log::debug!("running cleanup for device {}", slot.device.id);
            cleanup();
        }
    }
    std::thread::sleep(input.config.cleanup_drain);

    index.end()?;
    let index = Arc::try_unwrap(index).unwrap_or_else(|arc| panic!("{} outstanding references to the index writer after worker join", Arc::strong_count(&arc)));
    index.close()?;

    // Every queued item ran exactly once (§4.7), so every slot is filled;
    // `flatten` only matters if a future cancellation path leaves some
    // flows un-run, in which case they're simply omitted here rather than
    // panicking.
    let flow_results: Vec<FlowResult> = Arc::try_unwrap(results).expect("all workers joined").into_inner().expect("results mutex poisoned").into_iter().flatten().collect();
    let status = Status::aggregate(flow_results.iter().map(|f| f.status));

    Ok(RunResult { run_id: input.run_id, status, duration: start.elapsed(), flow_results })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowbench_domain::{FlowConfig, Step, StepKind};
    use flowbench_driver::MockDriver;

    struct NoOpLoader;
    impl FlowLoader for NoOpLoader {
        fn load(&self, _path: &str) -> Option<Flow> {
            None
        }
    }

    fn flow(name: &str) -> Flow {
        Flow { config: FlowConfig { name: Some(name.into()), ..Default::default() }, source_path: format!("{name}.yaml"), steps: vec![Step::new(StepKind::Back)] }
    }

    #[test]
    fn dispatches_across_two_workers_and_closes_run() {
        let dir = tempfile::tempdir().unwrap();
        let devices = vec![
            DeviceSlot { device: DeviceRecord { id: "d1".into(), platform: Some("android".into()), name: None }, make_driver: Box::new(|| Box::new(MockDriver::new("d1", "android"))), cleanup: None },
            DeviceSlot { device: DeviceRecord { id: "d2".into(), platform: Some("android".into()), name: None }, make_driver: Box::new(|| Box::new(MockDriver::new("d2", "android"))), cleanup: None },
        ];
        let mut config = DispatcherConfig::default();
        config.worker_count = 2;
        config.cleanup_drain = Duration::from_millis(5);

        let result = dispatch(
            dir.path(),
            DispatchInput {
                run_id: "run-1".into(),
                flows: vec![flow("a"), flow("b"), flow("c")],
                devices,
                app: None,
                runner_info: RunnerInfo { name: "flowbench".into(), version: "0.1.0".into() },
                loader: Arc::new(NoOpLoader),
                config: &config,
            },
        )
        .unwrap();

        assert_eq!(result.flow_results.len(), 3);
        assert_eq!(result.status, Status::Passed);

        let index: flowbench_core::model::IndexDocument = serde_json::from_slice(&std::fs::read(dir.path().join("report.json")).unwrap()).unwrap();
        assert!(index.ended_at.is_some());
        assert_eq!(index.flows.len(), 3);
    }

    #[test]
    fn rejects_zero_workers() {
        let dir = tempfile::tempdir().unwrap();
        let devices = vec![DeviceSlot { device: DeviceRecord { id: "d1".into(), platform: None, name: None }, make_driver: Box::new(|| Box::new(MockDriver::new("d1", "android"))), cleanup: None }];
        let mut config = DispatcherConfig::default();
        config.worker_count = 0;
        let err = dispatch(
            dir.path(),
            DispatchInput { run_id: "run-1".into(), flows: vec![flow("a")], devices, app: None, runner_info: RunnerInfo { name: "flowbench".into(), version: "0.1.0".into() }, loader: Arc::new(NoOpLoader), config: &config },
        )
        .unwrap_err();
        assert!(matches!(err, RunnerError::NoWorkers));
    }
}
