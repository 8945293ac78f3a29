//! The closed set of step variants a flow may contain, plus the
//! `Flow`/`FlowConfig` shapes that carry them.
//!
//! The skeleton builder, the step expander, and the runner all dispatch on
//! [`StepKind`] with an exhaustive match; adding a new variant is a
//! compile error everywhere it matters until all three are updated.

use crate::error::DomainError;
use crate::selector::Selector;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssertConditionSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<Selector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_visible: Option<Selector>,
}

impl AssertConditionSpec {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.platform.is_none() && self.script.is_none() && self.visible.is_none() && self.not_visible.is_none() {
            return Err(DomainError::EmptyAssertCondition);
        }
        Ok(())
    }
}

/// The closed union of step variants. Every variant's string name (used in
/// `Command.step_type` and the JUnit failure-category mapping) is returned
/// by [`StepKind::type_name`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stepType", rename_all = "camelCase")]
pub enum StepKind {
    LaunchApp { #[serde(default, skip_serializing_if = "Option::is_none")] app_id: Option<String>, #[serde(default)] clear_state: bool },
    StopApp { #[serde(default, skip_serializing_if = "Option::is_none")] app_id: Option<String> },
    KillApp { #[serde(default, skip_serializing_if = "Option::is_none")] app_id: Option<String> },
    ClearState,
    OpenLink { link: String },
    TapOn { selector: Selector },
    DoubleTapOn { selector: Selector },
    LongPressOn { selector: Selector },
    InputText { text: String, #[serde(default, skip_serializing_if = "Option::is_none")] selector: Option<Selector> },
    EraseText,
    PressKey { key: String },
    Back,
    HideKeyboard,
    Swipe { direction: Direction, #[serde(default, skip_serializing_if = "Option::is_none")] selector: Option<Selector> },
    Scroll { #[serde(default, skip_serializing_if = "Option::is_none")] direction: Option<Direction> },
    ScrollUntilVisible { selector: Selector, #[serde(default, skip_serializing_if = "Option::is_none")] direction: Option<Direction> },
    WaitUntil { #[serde(default, skip_serializing_if = "Option::is_none")] visible: Option<Selector>, #[serde(default, skip_serializing_if = "Option::is_none")] script: Option<String> },
    CopyTextFrom { selector: Selector },
    AssertVisible { selector: Selector },
    AssertNotVisible { selector: Selector },
    AssertTrue { script: String },
    AssertCondition { condition: AssertConditionSpec },
    DefineVariables { env: HashMap<String, String> },
    RunScript { body: String },
    EvalScript { body: String },
    RunFlow { #[serde(default, skip_serializing_if = "Option::is_none")] file: Option<String>, #[serde(default, skip_serializing_if = "Option::is_none")] condition: Option<AssertConditionSpec> },
    Unsupported { #[serde(default, skip_serializing_if = "Option::is_none")] reason: Option<String> },
}

impl StepKind {
    /// Stable wire name, matching the `type string` field of the on-disk
    /// command shape and the JUnit failure-category table.
    pub fn type_name(&self) -> &'static str {
        match self {
            StepKind::LaunchApp { .. } => "launchApp",
            StepKind::StopApp { .. } => "stopApp",
            StepKind::KillApp { .. } => "killApp",
            StepKind::ClearState => "clearState",
            StepKind::OpenLink { .. } => "openLink",
            StepKind::TapOn { .. } => "tapOn",
            StepKind::DoubleTapOn { .. } => "doubleTapOn",
            StepKind::LongPressOn { .. } => "longPressOn",
            StepKind::InputText { .. } => "inputText",
            StepKind::EraseText => "eraseText",
            StepKind::PressKey { .. } => "pressKey",
            StepKind::Back => "back",
            StepKind::HideKeyboard => "hideKeyboard",
            StepKind::Swipe { .. } => "swipe",
            StepKind::Scroll { .. } => "scroll",
            StepKind::ScrollUntilVisible { .. } => "scrollUntilVisible",
            StepKind::WaitUntil { .. } => "waitUntil",
            StepKind::CopyTextFrom { .. } => "copyTextFrom",
            StepKind::AssertVisible { .. } => "assertVisible",
            StepKind::AssertNotVisible { .. } => "assertNotVisible",
            StepKind::AssertTrue { .. } => "assertTrue",
            StepKind::AssertCondition { .. } => "assertCondition",
            StepKind::DefineVariables { .. } => "defineVariables",
            StepKind::RunScript { .. } => "runScript",
            StepKind::EvalScript { .. } => "evalScript",
            StepKind::RunFlow { .. } => "runFlow",
            StepKind::Unsupported { .. } => "unsupported",
        }
    }
}

/// One entry of a flow's step list: the variant plus the optional
/// per-step timeout every step carries regardless of kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(flatten)]
    pub kind: StepKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Human label carried through from the flow file, if the author gave
    /// one (surfaces as `Command.label`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Step {
    pub fn new(kind: StepKind) -> Self {
        Self { kind, timeout_ms: None, label: None }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = Some(ms);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    #[serde(default)]
    pub config: FlowConfig,
    pub source_path: String,
    pub steps: Vec<Step>,
}

impl Flow {
    /// Display name: the flow's own configured name, else the source
    /// file's basename minus extension.
    pub fn display_name(&self) -> String {
        if let Some(name) = self.config.name.as_deref().filter(|s| !s.is_empty()) {
            return name.to_string();
        }
        let path = std::path::Path::new(&self.source_path);
        path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| self.source_path.clone())
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.steps.is_empty() {
            return Err(DomainError::EmptyFlow);
        }
        for step in &self.steps {
            if let StepKind::AssertCondition { condition } = &step.kind {
                condition.validate()?;
            }
        }
        Ok(())
    }

    /// True if `tags` (when non-empty) intersects the flow's own tags, and
    /// `exclude_tags` does not. Used by the dispatcher to filter the flow
    /// list before the skeleton is built.
    pub fn matches_tags(&self, include: &[String], exclude: &[String]) -> bool {
        if !include.is_empty() && !self.config.tags.iter().any(|t| include.contains(t)) {
            return false;
        }
        if self.config.tags.iter().any(|t| exclude.contains(t)) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_falls_back_to_basename() {
        let flow = Flow { config: FlowConfig::default(), source_path: "/flows/login_test.yaml".into(), steps: vec![Step::new(StepKind::Back)] };
        assert_eq!(flow.display_name(), "login_test");
    }

    #[test]
    fn display_name_prefers_configured_name() {
        let flow = Flow {
            config: FlowConfig { name: Some("Login flow".into()), ..Default::default() },
            source_path: "/flows/login_test.yaml".into(),
            steps: vec![Step::new(StepKind::Back)],
        };
        assert_eq!(flow.display_name(), "Login flow");
    }

    #[test]
    fn empty_flow_fails_validation() {
        let flow = Flow { config: FlowConfig::default(), source_path: "x.yaml".into(), steps: vec![] };
        assert_eq!(flow.validate(), Err(DomainError::EmptyFlow));
    }

    #[test]
    fn tag_filtering() {
        let flow = Flow {
            config: FlowConfig { tags: vec!["smoke".into()], ..Default::default() },
            source_path: "x.yaml".into(),
            steps: vec![Step::new(StepKind::Back)],
        };
        assert!(flow.matches_tags(&[], &[]));
        assert!(flow.matches_tags(&["smoke".into()], &[]));
        assert!(!flow.matches_tags(&["regression".into()], &[]));
        assert!(!flow.matches_tags(&[], &["smoke".into()]));
    }
}
