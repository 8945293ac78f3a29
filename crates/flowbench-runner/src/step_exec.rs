//! Executes one already-expanded step against a driver and a script
//! engine, producing the outcome a `Command` records. This is the
//! innermost layer `flow_runner` drives; it knows nothing about attempts,
//! the report store, or other steps.

use crate::config::RunnerConfig;
use crate::errors::RunnerError;
use flowbench_core::model::{Artifacts, CommandError};
use flowbench_domain::{AssertConditionSpec, StepKind};
use flowbench_driver::{driver_step_for, Driver, DriverStep, ExecuteResult};
use flowbench_script::{execute_assert_condition, execute_assert_true, execute_define_variables, expand_selector, expand_variables, resolve_script_file, ScriptEngine};

pub struct StepOutcome {
    pub passed: bool,
    /// `Some` only for steps that can legitimately resolve to "skip" --
    /// currently just `unsupported`.
    pub skipped: bool,
    pub error: Option<CommandError>,
    pub artifacts: Artifacts,
    pub copied_text: Option<String>,
}

impl StepOutcome {
    fn ok() -> Self {
        Self { passed: true, skipped: false, error: None, artifacts: Artifacts::default(), copied_text: None }
    }

    fn fail(message: impl Into<String>, category: &str) -> Self {
        Self {
            passed: false,
            skipped: false,
            error: Some(CommandError { message: message.into(), category: Some(category.to_string()) }),
            artifacts: Artifacts::default(),
            copied_text: None,
        }
    }

    fn skip(message: impl Into<String>) -> Self {
        Self { passed: true, skipped: true, error: Some(CommandError { message: message.into(), category: Some("Unsupported".to_string()) }), artifacts: Artifacts::default(), copied_text: None }
    }
}

fn from_execute_result(result: ExecuteResult, category: &str) -> StepOutcome {
    if result.success {
        StepOutcome { passed: true, skipped: false, error: None, artifacts: result.to_artifacts(), copied_text: result.copied_text }
    } else {
        StepOutcome {
            passed: false,
            skipped: false,
            error: Some(CommandError { message: result.error_message.unwrap_or_else(|| "step failed".to_string()), category: Some(category.to_string()) }),
            artifacts: result.to_artifacts(),
            copied_text: result.copied_text,
        }
    }
}

trait ToArtifacts {
    fn to_artifacts(&self) -> Artifacts;
}

impl ToArtifacts for ExecuteResult {
    fn to_artifacts(&self) -> Artifacts {
        Artifacts { screenshot_path: self.screenshot_path.clone(), captured_element: self.captured_element.clone() }
    }
}

pub fn execute_step(
    kind: &StepKind,
    engine: &mut ScriptEngine,
    driver: &mut dyn Driver,
    config: &RunnerConfig,
) -> Result<StepOutcome, RunnerError> {
    match kind {
        StepKind::TapOn { selector } | StepKind::DoubleTapOn { selector } | StepKind::LongPressOn { selector } => {
            let expanded = expand_selector(engine, selector)?;
            let normalized = expanded.normalize()?;
            let driver_step = match kind {
                StepKind::TapOn { .. } => DriverStep::TapOn { selector: normalized },
                StepKind::DoubleTapOn { .. } => DriverStep::DoubleTapOn { selector: normalized },
                _ => DriverStep::LongPressOn { selector: normalized },
            };
            let result = driver.execute(&driver_step, config.default_step_timeout)?;
            Ok(from_execute_result(result, "AssertionError"))
        }
        StepKind::InputText { text, selector } => {
            let text = expand_variables(engine, text)?;
            let selector = match selector {
                Some(sel) => Some(expand_selector(engine, sel)?.normalize()?),
                None => None,
            };
            let result = driver.execute(&DriverStep::InputText { text, selector }, config.default_step_timeout)?;
            Ok(from_execute_result(result, "ActionError"))
        }
        StepKind::Swipe { direction, selector } => {
            let selector = match selector {
                Some(sel) => Some(expand_selector(engine, sel)?.normalize()?),
                None => None,
            };
            let result = driver.execute(&DriverStep::Swipe { direction: *direction, selector }, config.default_step_timeout)?;
            Ok(from_execute_result(result, "ActionError"))
        }
        StepKind::ScrollUntilVisible { selector, direction } => {
            let selector = expand_selector(engine, selector)?.normalize()?;
            let result = driver.execute(&DriverStep::ScrollUntilVisible { selector, direction: *direction }, config.default_step_timeout)?;
            Ok(from_execute_result(result, "AssertionError"))
        }
        StepKind::WaitUntil { visible, script } => {
            if let Some(selector) = visible {
                let normalized = expand_selector(engine, selector)?.normalize()?;
                let result = driver.execute(&DriverStep::CheckVisible { selector: normalized }, config.default_step_timeout)?;
                Ok(from_execute_result(result, "AssertionError"))
            } else if let Some(script) = script {
                let ok = execute_assert_true(engine, script)?;
                Ok(if ok { StepOutcome::ok() } else { StepOutcome::fail("waitUntil condition did not become true", "AssertionError") })
            } else {
                Ok(StepOutcome::ok())
            }
        }
        StepKind::CopyTextFrom { selector } => {
            let normalized = expand_selector(engine, selector)?.normalize()?;
            let result = driver.execute(&DriverStep::CopyTextFrom { selector: normalized }, config.default_step_timeout)?;
            if let Some(text) = &result.copied_text {
                engine.copied_text = Some(text.clone());
            }
            Ok(from_execute_result(result, "ActionError"))
        }
        StepKind::AssertVisible { selector } => {
            let normalized = expand_selector(engine, selector)?.normalize()?;
            let result = driver.execute(&DriverStep::CheckVisible { selector: normalized }, config.default_step_timeout)?;
            Ok(from_execute_result(result, "AssertionError"))
        }
        StepKind::AssertNotVisible { selector } => {
            let normalized = expand_selector(engine, selector)?.normalize()?;
            let result = driver.execute(&DriverStep::CheckNotVisible { selector: normalized }, config.default_step_timeout)?;
            Ok(from_execute_result(result, "AssertionError"))
        }
        StepKind::AssertTrue { script } => {
            let expanded = expand_variables(engine, script)?;
            let ok = execute_assert_true(engine, &expanded)?;
            Ok(if ok { StepOutcome::ok() } else { StepOutcome::fail(format!("assertTrue failed: {script}"), "AssertionError") })
        }
        StepKind::AssertCondition { condition } => execute_condition(condition, engine, driver, config),
        StepKind::DefineVariables { env } => {
            execute_define_variables(engine, env)?;
            Ok(StepOutcome::ok())
        }
        StepKind::EvalScript { body } => {
            engine.run_script_body(body)?;
            Ok(StepOutcome::ok())
        }
        StepKind::RunScript { body } => {
            let body = if body.trim_start().starts_with("file:") {
                resolve_script_file(engine, body.trim_start().trim_start_matches("file:").trim())?
            } else {
                body.clone()
            };
            engine.run_script_body(&body)?;
            Ok(StepOutcome::ok())
        }
        StepKind::RunFlow { .. } => {
            unreachable!("StepKind::RunFlow is handled by the caller (flow_runner), which needs to build sub-commands")
        }
        StepKind::Unsupported { reason } => {
            Ok(StepOutcome::skip(reason.clone().unwrap_or_else(|| "step is not supported on this platform".to_string())))
        }
        StepKind::LaunchApp { .. }
        | StepKind::StopApp { .. }
        | StepKind::KillApp { .. }
        | StepKind::ClearState
        | StepKind::OpenLink { .. }
        | StepKind::EraseText
        | StepKind::PressKey { .. }
        | StepKind::Back
        | StepKind::HideKeyboard
        | StepKind::Scroll { .. } => {
            let driver_step = driver_step_for(kind).expect("handled variant must map to a DriverStep");
            let result = driver.execute(&driver_step, config.default_step_timeout)?;
            Ok(from_execute_result(result, "ActionError"))
        }
    }
}

pub(crate) fn execute_condition(
    condition: &AssertConditionSpec,
    engine: &mut ScriptEngine,
    driver: &mut dyn Driver,
    config: &RunnerConfig,
) -> Result<StepOutcome, RunnerError> {
    let visible_result = match &condition.visible {
        Some(selector) => {
            let normalized = expand_selector(engine, selector)?.normalize()?;
            Some(driver.execute(&DriverStep::CheckVisible { selector: normalized }, config.default_step_timeout)?.success)
        }
        None => None,
    };
    let not_visible_result = match &condition.not_visible {
        Some(selector) => {
            let normalized = expand_selector(engine, selector)?.normalize()?;
            Some(driver.execute(&DriverStep::CheckNotVisible { selector: normalized }, config.default_step_timeout)?.success)
        }
        None => None,
    };
    let satisfied = execute_assert_condition(engine, condition, visible_result, not_visible_result)?;
    if satisfied {
        Ok(StepOutcome::ok())
    } else {
        Ok(StepOutcome::fail("assertCondition predicate was not satisfied", "AssertionError"))
    }
}
