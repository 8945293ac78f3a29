//! A deterministic in-process driver for tests and the CLI demo: no real
//! device is involved, every selector "matches" unless its value is on an
//! explicit deny-list, and every action succeeds unless `fail_on`
//! names its step type.

use crate::{DriverError, DriverStep, ExecuteResult, PlatformInfo};
use std::collections::HashSet;
use std::time::Duration;

pub struct MockDriver {
    platform: PlatformInfo,
    /// Selector values that should report as not-found.
    pub missing_selectors: HashSet<String>,
    /// Step type names that should report as failed.
    pub fail_on: HashSet<&'static str>,
    pub executed: Vec<String>,
}

impl MockDriver {
    pub fn new(device_id: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            platform: PlatformInfo { platform: platform.into(), device_id: device_id.into(), app_id: None },
            missing_selectors: HashSet::new(),
            fail_on: HashSet::new(),
            executed: Vec::new(),
        }
    }
}

impl crate::Driver for MockDriver {
    fn platform_info(&self) -> PlatformInfo {
        self.platform.clone()
    }

    fn execute(&mut self, step: &DriverStep, _timeout: Duration) -> Result<ExecuteResult, DriverError> {
        self.executed.push(step.type_name().to_string());

        if self.fail_on.contains(step.type_name()) {
            return Ok(ExecuteResult::failure(format!("mock driver configured to fail {}", step.type_name())));
        }

        match step {
            DriverStep::TapOn { selector } | DriverStep::DoubleTapOn { selector } | DriverStep::LongPressOn { selector } => {
                if self.missing_selectors.contains(&selector.value) {
                    return Ok(ExecuteResult { success: false, element_found: Some(false), error_message: Some(format!("element not found: {}", selector.value)), ..Default::default() });
                }
                Ok(ExecuteResult { element_found: Some(true), ..ExecuteResult::ok() })
            }
            DriverStep::CheckVisible { selector } => {
                let found = !self.missing_selectors.contains(&selector.value);
                Ok(ExecuteResult { success: found, element_found: Some(found), ..Default::default() })
            }
            DriverStep::CheckNotVisible { selector } => {
                let found = !self.missing_selectors.contains(&selector.value);
                Ok(ExecuteResult { success: !found, element_found: Some(found), ..Default::default() })
            }
            DriverStep::CopyTextFrom { selector } => {
                if self.missing_selectors.contains(&selector.value) {
                    return Ok(ExecuteResult::failure(format!("element not found: {}", selector.value)));
                }
                Ok(ExecuteResult { copied_text: Some(format!("text-of-{}", selector.value)), ..ExecuteResult::ok() })
            }
            _ => Ok(ExecuteResult::ok()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Driver;
    use flowbench_domain::{NormalizedSelector, SelectorType};

    #[test]
    fn reports_missing_selector() {
        let mut driver = MockDriver::new("device-1", "android");
        driver.missing_selectors.insert("login_button".to_string());
        let selector = NormalizedSelector { kind: SelectorType::Id, value: "login_button".to_string(), optional: false };
        let result = driver.execute(&DriverStep::TapOn { selector }, Duration::from_secs(1)).unwrap();
        assert!(!result.success);
        assert_eq!(result.element_found, Some(false));
    }

    #[test]
    fn configured_failure_short_circuits() {
        let mut driver = MockDriver::new("device-1", "android");
        driver.fail_on.insert("back");
        let result = driver.execute(&DriverStep::Back, Duration::from_secs(1)).unwrap();
        assert!(!result.success);
    }
}
