//! JUnit XML emitter (C10, §4.9, S6). A pure function over the index and
//! flow-detail documents a run already wrote to disk -- no knowledge of how
//! those documents got there.

use flowbench_core::model::{Command, FlowDetail, FlowEntry, IndexDocument, Status};

/// Renders `index` (plus each flow's detail document, looked up by
/// `FlowEntry.id`) as a single `<testsuites>` document with one
/// `<testsuite>` and one `<testcase>` per flow.
pub fn render_junit(index: &IndexDocument, details: &[FlowDetail]) -> String {
    let suite_time = index
        .ended_at
        .map(|end| (end - index.started_at).num_milliseconds().max(0) as f64 / 1000.0)
        .unwrap_or(0.0);

    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str(&format!(
        "<testsuites name=\"{}\" tests=\"{}\" failures=\"{}\" time=\"{:.3}\">\n",
        escape_xml(&index.run_id),
        index.summary.total,
        index.summary.failed,
        suite_time
    ));
    xml.push_str(&format!(
        "  <testsuite name=\"{}\" tests=\"{}\" failures=\"{}\" time=\"{:.3}\">\n",
        escape_xml(&index.runner.name),
        index.summary.total,
        index.summary.failed,
        suite_time
    ));

    for entry in &index.flows {
        let detail = details.iter().find(|d| d.flow_id == entry.id);
        xml.push_str(&render_testcase(entry, detail, index));
    }

    xml.push_str("  </testsuite>\n");
    xml.push_str("</testsuites>\n");
    xml
}

fn render_testcase(entry: &FlowEntry, detail: Option<&FlowDetail>, index: &IndexDocument) -> String {
    let time = entry.duration_ms.map(|ms| ms as f64 / 1000.0).unwrap_or(0.0);
    let mut out = String::new();
    out.push_str(&format!(
        "    <testcase name=\"{}\" classname=\"flowbench.flow\" time=\"{:.3}\">\n",
        escape_xml(&entry.name),
        time
    ));

    let device_id = entry.device_id.as_deref().or(index.devices.first().map(|d| d.id.as_str()));
    if let Some(device_id) = device_id {
        out.push_str("      <properties>\n");
        out.push_str(&format!("        <property name=\"device\" value=\"{}\" />\n", escape_xml(device_id)));
        out.push_str("      </properties>\n");
    }

    match entry.status {
        Status::Failed => {
            let failing = detail.and_then(|d| d.current_attempt()).and_then(|a| deepest_failure(&a.commands));
            let (failure_type, message) = match failing {
                Some(cmd) => (failure_category(&cmd.step_type), cmd.error.as_ref().map(|e| e.message.clone()).unwrap_or_else(|| "flow failed".to_string())),
                None => ("TestError", "flow failed".to_string()),
            };
            let label = failing.and_then(|c| c.label.clone()).unwrap_or_else(|| message.clone());
            out.push_str(&format!(
                "      <failure type=\"{}\" message=\"{}\">{}</failure>\n",
                failure_type,
                escape_xml(&message),
                escape_xml(&label)
            ));
        }
        Status::Skipped => out.push_str("      <skipped />\n"),
        _ => {}
    }

    out.push_str("    </testcase>\n");
    out
}

/// Finds the deepest failed command among a flow's top-level commands,
/// descending into `subCommands` first.
fn deepest_failure(commands: &[Command]) -> Option<&Command> {
    commands.iter().find_map(|c| c.deepest_failure())
}

/// Maps a failed command's step type to the JUnit failure category the
/// spec fixes. Unmapped step types fall back to `TestError`.
fn failure_category(step_type: &str) -> &'static str {
    match step_type {
        "assertVisible" | "assertNotVisible" => "AssertionError",
        "tapOn" | "doubleTapOn" | "longPressOn" => "ElementInteractionError",
        "inputText" | "eraseText" => "InputError",
        "launchApp" | "stopApp" => "AppLifecycleError",
        "runFlow" | "runScript" => "SubflowError",
        "scroll" | "swipe" | "scrollUntilVisible" => "ScrollError",
        _ => "TestError",
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;").replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowbench_core::model::{Attempt, CommandError, DeviceRecord, RunnerInfo, Summary};
    use chrono::Utc;

    fn base_index(status: Status) -> IndexDocument {
        let entry = FlowEntry {
            index: 0,
            id: "f1".into(),
            name: "Login flow".into(),
            source_path: "f1.yaml".into(),
            status,
            tags: vec![],
            detail_path: "flows/f1.json".into(),
            assets_path: "assets/f1".into(),
            update_seq: 1,
            device_id: None,
            duration_ms: Some(1500),
            commands: Summary::default(),
            error: None,
            attempts: 0,
            attempt_history: vec![],
        };
        IndexDocument {
            run_id: "run-1".into(),
            status,
            started_at: Utc::now(),
            ended_at: Some(Utc::now()),
            duration_ms: Some(1500),
            summary: Summary::from_statuses([status]),
            flows: vec![entry],
            devices: vec![DeviceRecord { id: "device-1".into(), platform: Some("android".into()), name: None }],
            app: None,
            runner: RunnerInfo { name: "flowbench".into(), version: "0.1.0".into() },
            global_seq: 1,
        }
    }

    #[test]
    fn passing_flow_has_no_failure_element() {
        let index = base_index(Status::Passed);
        let xml = render_junit(&index, &[]);
        assert!(xml.contains("<testcase name=\"Login flow\""));
        assert!(!xml.contains("<failure"));
    }

    #[test]
    fn failed_assert_visible_maps_to_assertion_error_and_escapes_xml() {
        let index = base_index(Status::Failed);
        let mut cmd = Command::pending("c1", "assertVisible");
        cmd.label = Some("Verify <Welcome> & \"ready\"".into());
        cmd.status = Status::Failed;
        cmd.error = Some(CommandError { message: "element not found".into(), category: None });
        let detail = FlowDetail {
            flow_id: "f1".into(),
            name: "Login flow".into(),
            source_path: "login.yaml".into(),
            tags: vec![],
            device_id: None,
            attempts: vec![Attempt { index: 1, status: Status::Failed, started_at: Utc::now(), ended_at: Some(Utc::now()), commands: vec![cmd] }],
            update_seq: 2,
        };

        let xml = render_junit(&index, &[detail]);
        assert!(xml.contains("type=\"AssertionError\""));
        assert!(xml.contains("&lt;Welcome&gt; &amp; &quot;ready&quot;"));
    }

    #[test]
    fn deepest_failure_descends_into_sub_commands() {
        let index = base_index(Status::Failed);
        let mut inner = Command::pending("c2", "tapOn");
        inner.status = Status::Failed;
        inner.error = Some(CommandError { message: "not tappable".into(), category: None });
        let mut outer = Command::pending("c1", "runFlow");
        outer.status = Status::Failed;
        outer.sub_commands.push(inner);
        let detail = FlowDetail {
            flow_id: "f1".into(),
            name: "Login flow".into(),
            source_path: "login.yaml".into(),
            tags: vec![],
            device_id: None,
            attempts: vec![Attempt { index: 1, status: Status::Failed, started_at: Utc::now(), ended_at: Some(Utc::now()), commands: vec![outer] }],
            update_seq: 2,
        };

        let xml = render_junit(&index, &[detail]);
        assert!(xml.contains("type=\"ElementInteractionError\""));
        assert!(xml.contains("not tappable"));
    }
}
