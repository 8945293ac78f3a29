//! Fixed step-type-to-`CommandParams` mapping shared by the skeleton
//! builder and the single-flow runner, so a freshly built
//! pending command and the one the runner executes against describe the
//! same step the same way.

use crate::model::CommandParams;
use flowbench_domain::{Direction, Selector, StepKind};

fn describe_selector(selector: &Selector) -> String {
    if let Some(id) = selector.id.as_deref().filter(|s| !s.is_empty()) {
        return format!("id={id}");
    }
    if let Some(text) = selector.text.as_deref().filter(|s| !s.is_empty()) {
        return format!("text={text}");
    }
    if let Some(css) = selector.css.as_deref().filter(|s| !s.is_empty()) {
        return format!("css={css}");
    }
    "relative".to_string()
}

fn direction_name(direction: Direction) -> &'static str {
    match direction {
        Direction::Up => "up",
        Direction::Down => "down",
        Direction::Left => "left",
        Direction::Right => "right",
    }
}

/// Fixed mapping: tapOn/assertVisible/etc. -> selector; inputText -> text
/// (+ selector); swipe/scroll/scrollUntilVisible -> direction (+ selector
/// for scrollUntilVisible); any step carrying a timeout -> timeout.
/// Steps with nothing to extract return an all-`None` (empty) params.
pub fn command_params(kind: &StepKind, timeout_ms: Option<u64>) -> CommandParams {
    let mut params = CommandParams { timeout_ms, ..Default::default() };
    match kind {
        StepKind::TapOn { selector }
        | StepKind::DoubleTapOn { selector }
        | StepKind::LongPressOn { selector }
        | StepKind::CopyTextFrom { selector }
        | StepKind::AssertVisible { selector }
        | StepKind::AssertNotVisible { selector } => {
            params.selector = Some(describe_selector(selector));
        }
        StepKind::ScrollUntilVisible { selector, direction } => {
            params.selector = Some(describe_selector(selector));
            params.direction = direction.map(direction_name).map(str::to_string);
        }
        StepKind::InputText { text, selector } => {
            params.text = Some(text.clone());
            params.selector = selector.as_ref().map(describe_selector);
        }
        StepKind::Swipe { direction, selector } => {
            params.direction = Some(direction_name(*direction).to_string());
            params.selector = selector.as_ref().map(describe_selector);
        }
        StepKind::Scroll { direction } => {
            params.direction = direction.map(direction_name).map(str::to_string);
        }
        StepKind::WaitUntil { visible, .. } => {
            params.selector = visible.as_ref().map(describe_selector);
        }
        _ => {}
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tap_on_extracts_selector_only() {
        let params = command_params(&StepKind::TapOn { selector: Selector::by_id("login_button") }, None);
        assert_eq!(params.selector.as_deref(), Some("id=login_button"));
        assert!(params.text.is_none());
        assert!(params.direction.is_none());
    }

    #[test]
    fn input_text_extracts_text_and_selector() {
        let params = command_params(&StepKind::InputText { text: "hello".into(), selector: Some(Selector::by_id("field")) }, None);
        assert_eq!(params.text.as_deref(), Some("hello"));
        assert_eq!(params.selector.as_deref(), Some("id=field"));
    }

    #[test]
    fn swipe_extracts_direction() {
        let params = command_params(&StepKind::Swipe { direction: Direction::Up, selector: None }, None);
        assert_eq!(params.direction.as_deref(), Some("up"));
    }

    #[test]
    fn timeout_always_carried() {
        let params = command_params(&StepKind::Back, Some(5000));
        assert_eq!(params.timeout_ms, Some(5000));
        assert!(params.selector.is_none());
    }

    #[test]
    fn steps_with_no_params_are_empty() {
        let params = command_params(&StepKind::Back, None);
        assert!(params.is_empty());
    }
}
