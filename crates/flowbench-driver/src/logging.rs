//! A driver that performs no device interaction at all: every step
//! succeeds and is logged at `info`. Useful for dry runs -- validating a
//! flow's shape and the report store's plumbing without a device attached.

use crate::{DriverError, DriverStep, ExecuteResult, PlatformInfo};
use std::time::Duration;

pub struct LoggingDriver {
    platform: PlatformInfo,
}

impl LoggingDriver {
    pub fn new(device_id: impl Into<String>, platform: impl Into<String>) -> Self {
        Self { platform: PlatformInfo { platform: platform.into(), device_id: device_id.into(), app_id: None } }
    }
}

impl crate::Driver for LoggingDriver {
    fn platform_info(&self) -> PlatformInfo {
        self.platform.clone()
    }

    fn execute(&mut self, step: &DriverStep, _timeout: Duration) -> Result<ExecuteResult, DriverError> {
        log::info!("[{}] dry-run step: {}", self.platform.device_id, step.type_name());
        Ok(ExecuteResult::ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Driver;

    #[test]
    fn every_step_succeeds() {
        let mut driver = LoggingDriver::new("device-1", "android");
        let result = driver.execute(&DriverStep::Back, Duration::from_secs(1)).unwrap();
        assert!(result.success);
    }
}
