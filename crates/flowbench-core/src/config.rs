//! Report-store tuning knobs. No field requires an environment variable
//! to be set -- every field has a sane default and is only overridden by
//! whoever constructs a `StoreConfig`.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Coalescing window for non-terminal index/flow-detail writes.
    /// Terminal-status updates and `End()`/`Close()` always flush
    /// synchronously regardless of this value.
    pub debounce: Duration,
    pub output_dir: std::path::PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { debounce: Duration::from_millis(100), output_dir: std::path::PathBuf::from("./flowbench-output") }
    }
}

impl StoreConfig {
    pub fn with_output_dir(mut self, dir: impl Into<std::path::PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}
