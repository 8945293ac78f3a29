//! C4: the debounced, crash-safe writer for the run-level index document.
//!
//! Every mutation (`start`, `update_flow`, `record_attempt`) updates the
//! in-memory document immediately and under a single mutex, so readers of
//! `snapshot()` always see a consistent view. Whether that update also
//! hits disk right away depends on status: non-terminal updates coalesce
//! into a single write per debounce window; a flow reaching a
//! terminal status, or the writer itself being closed, always flushes
//! synchronously before the call returns.
//!
//! The coalescing is driven by a dedicated background thread rather than
//! a timer per call, so N updates arriving within one debounce window
//! produce exactly one write, not N throttled ones.

use crate::atomic::write_json_atomic;
use crate::config::StoreConfig;
use crate::errors::StoreError;
use crate::model::{AttemptRecord, FlowEntry, IndexDocument, Status, Summary};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

struct Shared {
    doc: Mutex<IndexDocument>,
    dirty: AtomicBool,
    path: PathBuf,
}

impl Shared {
    fn flush(&self) -> Result<(), StoreError> {
        let doc = self.doc.lock().expect("index mutex poisoned");
        write_json_atomic(&self.path, "index", &*doc)?;
        self.dirty.store(false, Ordering::SeqCst);
        Ok(())
    }
}

pub struct IndexWriter {
    shared: Arc<Shared>,
    closer: Option<mpsc::Sender<()>>,
    flusher: Option<JoinHandle<()>>,
}

impl IndexWriter {
    /// Writes the initial skeleton synchronously and starts the
    /// background debounce thread. `path` is the index document's final
    /// location (e.g. `<output_dir>/report.json`).
    pub fn start(path: PathBuf, initial: IndexDocument, config: &StoreConfig) -> Result<Self, StoreError> {
        let shared = Arc::new(Shared { doc: Mutex::new(initial), dirty: AtomicBool::new(false), path });
        shared.flush()?;

        let (tx, rx) = mpsc::channel::<()>();
        let debounce = config.debounce;
        let flusher_shared = Arc::clone(&shared);
        let flusher = std::thread::spawn(move || loop {
            match rx.recv_timeout(debounce) {
                Ok(()) => continue,
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    if flusher_shared.dirty.load(Ordering::SeqCst) {
                        let _ = flusher_shared.flush();
                    }
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    if flusher_shared.dirty.load(Ordering::SeqCst) {
                        let _ = flusher_shared.flush();
                    }
                    return;
                }
            }
        });

        Ok(Self { shared, closer: Some(tx), flusher: Some(flusher) })
    }

    /// Mutates the document via `f`, bumps `global_seq`, then either
    /// flushes immediately (`terminal` is true -- the flow this call just
    /// touched reached a terminal status, per §4.3/Property 5, regardless
    /// of whether the *run* as a whole is still running) or marks the
    /// document dirty for the background thread to pick up within one
    /// debounce window.
    fn apply(&self, terminal: bool, f: impl FnOnce(&mut IndexDocument)) -> Result<(), StoreError> {
        {
            let mut doc = self.shared.doc.lock().expect("index mutex poisoned");
            f(&mut doc);
            doc.global_seq += 1;
            doc.recompute_summary();
        }
        if terminal {
            self.shared.flush()
        } else {
            self.shared.dirty.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Updates one flow entry's status, duration, error, and command
    /// summary. Flushes synchronously before returning when `status`
    /// itself is terminal (Property 5); a non-terminal status (e.g. the
    /// flow just started `Running`, or its command summary advanced
    /// mid-flow) only marks the document dirty for the debounce window.
    pub fn update_flow(&self, flow_id: &str, status: Status, duration_ms: Option<u64>, error: Option<String>, commands: Option<Summary>) -> Result<(), StoreError> {
        let mut found = false;
        self.apply(status.is_terminal(), |doc| {
            if let Some(entry) = doc.flows.iter_mut().find(|f| f.id == flow_id) {
                entry.status = status;
                if duration_ms.is_some() {
                    entry.duration_ms = duration_ms;
                }
                if error.is_some() {
                    entry.error = error.clone();
                }
                if let Some(commands) = commands {
                    entry.commands = commands;
                }
                entry.update_seq += 1;
                found = true;
            }
        })?;
        if !found {
            return Err(StoreError::UnknownFlow(flow_id.to_string()));
        }
        Ok(())
    }

    /// Appends one completed attempt's outcome to a flow's retry history
    /// and bumps its `attempts` counter. Called once per
    /// finished attempt, including the final one, so `attempts` always
    /// equals `attempt_history.len()`. Does not itself mark the flow
    /// terminal -- the caller still follows up with `update_flow` once the
    /// retry loop has decided it is done.
    pub fn record_attempt(&self, flow_id: &str, record: AttemptRecord) -> Result<(), StoreError> {
        let mut found = false;
        self.apply(false, |doc| {
            if let Some(entry) = doc.flows.iter_mut().find(|f| f.id == flow_id) {
                entry.attempts += 1;
                entry.attempt_history.push(record.clone());
                entry.update_seq += 1;
                found = true;
            }
        })?;
        if !found {
            return Err(StoreError::UnknownFlow(flow_id.to_string()));
        }
        Ok(())
    }

    pub fn snapshot(&self) -> IndexDocument {
        self.shared.doc.lock().expect("index mutex poisoned").clone()
    }

    pub fn flow_entry(&self, flow_id: &str) -> Option<FlowEntry> {
        self.shared.doc.lock().expect("index mutex poisoned").flows.iter().find(|f| f.id == flow_id).cloned()
    }

    /// Marks the run ended, flushes synchronously, and stops the
    /// background thread. Idempotent double-close is avoided by the
    /// caller: `end` consumes `&self` logically once via the dispatcher's
    /// single call site.
    pub fn end(&self) -> Result<(), StoreError> {
        self.apply(false, |doc| {
            doc.ended_at = Some(chrono::Utc::now());
            doc.duration_ms = Some((doc.ended_at.unwrap() - doc.started_at).num_milliseconds().max(0) as u64);
        })?;
        self.shared.flush()
    }

    pub fn close(mut self) -> Result<(), StoreError> {
        self.shared.flush()?;
        if let Some(closer) = self.closer.take() {
            drop(closer);
        }
        if let Some(handle) = self.flusher.take() {
            let _ = handle.join();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RunnerInfo, Summary};

    fn doc() -> IndexDocument {
        IndexDocument {
            run_id: "r1".into(),
            status: Status::Pending,
            started_at: chrono::Utc::now(),
            ended_at: None,
            duration_ms: None,
            summary: Summary::default(),
            flows: vec![FlowEntry {
                index: 0,
                id: "flow-000".into(),
                name: "flow".into(),
                source_path: "flow.yaml".into(),
                status: Status::Pending,
                tags: vec![],
                detail_path: "flows/flow-000.json".into(),
                assets_path: "assets/flow-000".into(),
                update_seq: 0,
                device_id: None,
                duration_ms: None,
                commands: Summary::default(),
                error: None,
                attempts: 0,
                attempt_history: vec![],
            }],
            devices: vec![],
            app: None,
            runner: RunnerInfo { name: "flowbench".into(), version: "0.1.0".into() },
            global_seq: 0,
        }
    }

    #[test]
    fn terminal_update_flushes_synchronously() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let config = StoreConfig::default();
        let writer = IndexWriter::start(path.clone(), doc(), &config).unwrap();
        writer.update_flow("flow-000", Status::Passed, Some(42), None, None).unwrap();

        let on_disk: IndexDocument = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(on_disk.flows[0].status, Status::Passed);
        writer.close().unwrap();
    }

    #[test]
    fn unknown_flow_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let config = StoreConfig::default();
        let writer = IndexWriter::start(path, doc(), &config).unwrap();
        assert!(matches!(writer.update_flow("missing", Status::Passed, None, None, None), Err(StoreError::UnknownFlow(_))));
        writer.close().unwrap();
    }

    #[test]
    fn record_attempt_appends_history_and_bumps_counter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let config = StoreConfig::default();
        let writer = IndexWriter::start(path, doc(), &config).unwrap();

        writer
            .record_attempt(
                "flow-000",
                AttemptRecord { index: 1, status: Status::Failed, duration_ms: Some(10), error: Some("boom".into()), attempt_path: Some("flows/flow-000.attempt-1.json".into()) },
            )
            .unwrap();
        writer.record_attempt("flow-000", AttemptRecord { index: 2, status: Status::Passed, duration_ms: Some(5), error: None, attempt_path: None }).unwrap();

        let entry = writer.flow_entry("flow-000").unwrap();
        assert_eq!(entry.attempts, 2);
        assert_eq!(entry.attempt_history.len(), 2);
        assert_eq!(entry.attempt_history[0].status, Status::Failed);
        assert_eq!(entry.attempt_history[1].status, Status::Passed);
        writer.close().unwrap();
    }

    #[test]
    fn record_attempt_unknown_flow_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let config = StoreConfig::default();
        let writer = IndexWriter::start(path, doc(), &config).unwrap();
        let result = writer.record_attempt("missing", AttemptRecord { index: 1, status: Status::Failed, duration_ms: None, error: None, attempt_path: None });
        assert!(matches!(result, Err(StoreError::UnknownFlow(_))));
        writer.close().unwrap();
    }
}
