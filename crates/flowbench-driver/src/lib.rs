//! The `Driver` trait: the one seam between a flow runner and whatever
//! actually runs the step (a real device over its automation protocol, a
//! simulator, or -- for tests -- `MockDriver`).
//!
//! Generalizes a crate-of-concrete-step-implementations-behind-a-trait
//! shape (one trait, one closed `DriverStep` enum) rather than one impl
//! per step, since the step union here is already closed and a single
//! device handles every step kind.

pub mod error;
pub mod logging;
pub mod mock;

pub use error::DriverError;
pub use logging::LoggingDriver;
pub use mock::MockDriver;

use flowbench_core::model::CapturedElement;
use flowbench_domain::{Direction, NormalizedSelector, StepKind};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformInfo {
    pub platform: String,
    pub device_id: String,
    pub app_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecuteResult {
    pub success: bool,
    pub error_message: Option<String>,
    pub screenshot_path: Option<String>,
    pub captured_element: Option<CapturedElement>,
    /// Present only for steps that test for element presence
    /// (`assertVisible`/`assertNotVisible`/`waitUntil`/the `visible`/
    /// `notVisible` predicates of `assertCondition`): whether the
    /// selector currently matches an on-screen element.
    pub element_found: Option<bool>,
    /// Present only for `copyTextFrom`.
    pub copied_text: Option<String>,
}

impl ExecuteResult {
    pub fn ok() -> Self {
        Self { success: true, ..Default::default() }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self { success: false, error_message: Some(message.into()), ..Default::default() }
    }
}

/// One already-normalized step, ready for a driver to act on: selectors
/// have been expanded and normalized, text has had `${...}`/`$VAR`
/// substitution applied, by the time the runner builds this.
#[derive(Debug, Clone)]
pub enum DriverStep {
    LaunchApp { app_id: Option<String>, clear_state: bool },
    StopApp { app_id: Option<String> },
    KillApp { app_id: Option<String> },
    ClearState,
    OpenLink { link: String },
    TapOn { selector: NormalizedSelector },
    DoubleTapOn { selector: NormalizedSelector },
    LongPressOn { selector: NormalizedSelector },
    InputText { text: String, selector: Option<NormalizedSelector> },
    EraseText,
    PressKey { key: String },
    Back,
    HideKeyboard,
    Swipe { direction: Direction, selector: Option<NormalizedSelector> },
    Scroll { direction: Option<Direction> },
    ScrollUntilVisible { selector: NormalizedSelector, direction: Option<Direction> },
    CheckVisible { selector: NormalizedSelector },
    CheckNotVisible { selector: NormalizedSelector },
    CopyTextFrom { selector: NormalizedSelector },
}

impl DriverStep {
    pub fn type_name(&self) -> &'static str {
        match self {
            DriverStep::LaunchApp { .. } => "launchApp",
            DriverStep::StopApp { .. } => "stopApp",
            DriverStep::KillApp { .. } => "killApp",
            DriverStep::ClearState => "clearState",
            DriverStep::OpenLink { .. } => "openLink",
            DriverStep::TapOn { .. } => "tapOn",
            DriverStep::DoubleTapOn { .. } => "doubleTapOn",
            DriverStep::LongPressOn { .. } => "longPressOn",
            DriverStep::InputText { .. } => "inputText",
            DriverStep::EraseText => "eraseText",
            DriverStep::PressKey { .. } => "pressKey",
            DriverStep::Back => "back",
            DriverStep::HideKeyboard => "hideKeyboard",
            DriverStep::Swipe { .. } => "swipe",
            DriverStep::Scroll { .. } => "scroll",
            DriverStep::ScrollUntilVisible { .. } => "scrollUntilVisible",
            DriverStep::CheckVisible { .. } => "assertVisible",
            DriverStep::CheckNotVisible { .. } => "assertNotVisible",
            DriverStep::CopyTextFrom { .. } => "copyTextFrom",
        }
    }
}

/// Maps a domain step to the driver-level step it executes as, for the
/// step kinds a driver handles directly. Steps the runner itself
/// resolves (selectors, scripts, nested flows) return `None` here and
/// are translated to `DriverStep` variants with their selector already
/// filled in by the caller instead (see `flowbench-runner`).
pub fn driver_step_for(kind: &StepKind) -> Option<DriverStep> {
    Some(match kind {
            StepKind::LaunchApp { app_id, clear_state } => DriverStep::LaunchApp { app_id: app_id.clone(), clear_state: *clear_state },
            StepKind::StopApp { app_id } => DriverStep::StopApp { app_id: app_id.clone() },
            StepKind::KillApp { app_id } => DriverStep::KillApp { app_id: app_id.clone() },
            StepKind::ClearState => DriverStep::ClearState,
            StepKind::OpenLink { link } => DriverStep::OpenLink { link: link.clone() },
            StepKind::Back => DriverStep::Back,
            StepKind::HideKeyboard => DriverStep::HideKeyboard,
            StepKind::EraseText => DriverStep::EraseText,
            StepKind::PressKey { key } => DriverStep::PressKey { key: key.clone() },
            StepKind::Scroll { direction } => DriverStep::Scroll { direction: *direction },
            _ => return None,
        })
    }
}

/// A driver executes one already-resolved step and reports the outcome.
/// Implementations own the connection to an actual device or simulator;
/// the runner holds one driver per worker and never shares it
/// across threads.
pub trait Driver: Send {
    fn platform_info(&self) -> PlatformInfo;

    fn execute(&mut self, step: &DriverStep, timeout: Duration) -> Result<ExecuteResult, DriverError>;
}
