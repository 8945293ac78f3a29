//! HTML report emitter (C10, §4.9). Produces a single self-contained file:
//! the run's index and flow-detail documents inlined as one JSON blob, plus
//! (optionally) each referenced screenshot re-encoded as a base64 data URI
//! so the file has no external dependencies. The HTML/CSS/JS shell itself
//! is intentionally minimal -- the template itself is treated as an
//! external collaborator; this module only produces the data contract
//! feeding it.

use crate::error::ReportError;
use base64::Engine;
use flowbench_core::model::{FlowDetail, IndexDocument};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct ReportData<'a> {
    index: &'a IndexDocument,
    flows: &'a [FlowDetail],
    screenshots: std::collections::BTreeMap<String, String>,
}

/// Renders `index` and its flows' detail documents as a single HTML
/// document. When `assets_dir` is `Some`, every `screenshot_path` found in
/// any command's artifacts is read relative to it and embedded as a
/// `data:image/png;base64,...` URI; when `None`, the JSON blob carries the
/// relative paths unembedded and the shell is expected to resolve them
/// itself (e.g. when serving the report directory over HTTP).
pub fn render_html(index: &IndexDocument, details: &[FlowDetail], assets_dir: Option<&Path>) -> Result<String, ReportError> {
    let mut screenshots = std::collections::BTreeMap::new();
    if let Some(assets_dir) = assets_dir {
        for detail in details {
            for attempt in &detail.attempts {
                collect_screenshots(&attempt.commands, assets_dir, &mut screenshots)?;
            }
        }
    }

    let data = ReportData { index, flows: details, screenshots };
    let blob = serde_json::to_string(&data).map_err(|source| ReportError::Parse { what: "report-data", path: "<in-memory>".to_string(), source })?;

    Ok(format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>flowbench report: {run_id}</title>\n</head>\n<body>\n<div id=\"root\" data-status=\"{status:?}\"></div>\n<script id=\"flowbench-report-data\" type=\"application/json\">{blob}</script>\n</body>\n</html>\n",
        run_id = escape_html(&index.run_id),
        status = index.status,
        blob = blob,
    ))
}

fn collect_screenshots(
    commands: &[flowbench_core::model::Command],
    assets_dir: &Path,
    out: &mut std::collections::BTreeMap<String, String>,
) -> Result<(), ReportError> {
    for cmd in commands {
        if let Some(rel) = &cmd.artifacts.screenshot_path {
            if !out.contains_key(rel) {
                let full = assets_dir.join(rel);
                let bytes = std::fs::read(&full).map_err(|source| ReportError::Asset { path: full.display().to_string(), source })?;
                out.insert(rel.clone(), base64::engine::general_purpose::STANDARD.encode(bytes));
            }
        }
        collect_screenshots(&cmd.sub_commands, assets_dir, out)?;
    }
    Ok(())
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowbench_core::model::{Artifacts, Attempt, Command, DeviceRecord, FlowEntry, RunnerInfo, Status, Summary};
    use chrono::Utc;

    fn index() -> IndexDocument {
        IndexDocument {
            run_id: "run-1".into(),
            status: Status::Passed,
            started_at: Utc::now(),
            ended_at: Some(Utc::now()),
            duration_ms: Some(10),
            summary: Summary::from_statuses([Status::Passed]),
            flows: vec![FlowEntry {
                index: 0,
                id: "f1".into(),
                name: "flow".into(),
                source_path: "f1.yaml".into(),
                status: Status::Passed,
                tags: vec![],
                detail_path: "flows/f1.json".into(),
                assets_path: "assets/f1".into(),
                update_seq: 1,
                device_id: None,
                duration_ms: Some(10),
                commands: Summary::default(),
                error: None,
                attempts: 0,
                attempt_history: vec![],
            }],
            devices: vec![DeviceRecord { id: "d1".into(), platform: None, name: None }],
            app: None,
            runner: RunnerInfo { name: "flowbench".into(), version: "0.1.0".into() },
            global_seq: 1,
        }
    }

    #[test]
    fn renders_self_contained_document_with_inline_json() {
        let html = render_html(&index(), &[], None).unwrap();
        assert!(html.contains("<!DOCTYPE html>"));
        assert!(html.contains("\"run_id\":\"run-1\""));
    }

    #[test]
    fn embeds_screenshots_as_base64_when_assets_dir_given() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("flow-000")).unwrap();
        std::fs::write(dir.path().join("flow-000/shot.png"), b"not-really-a-png").unwrap();

        let mut cmd = Command::pending("c1", "tapOn");
        cmd.artifacts = Artifacts { screenshot_path: Some("flow-000/shot.png".into()), captured_element: None };
        let detail = FlowDetail {
            flow_id: "f1".into(),
            name: "flow".into(),
            source_path: "f1.yaml".into(),
            tags: vec![],
            device_id: None,
            attempts: vec![Attempt { index: 1, status: Status::Passed, started_at: Utc::now(), ended_at: Some(Utc::now()), commands: vec![cmd] }],
            update_seq: 1,
        };

        let html = render_html(&index(), &[detail], Some(dir.path())).unwrap();
        assert!(html.contains("flow-000/shot.png"));
        assert!(html.contains(&base64::engine::general_purpose::STANDARD.encode(b"not-really-a-png")));
    }
}
