use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub default_step_timeout: Duration,
    pub stop_on_failure: bool,
    /// Maximum number of attempts made at a flow before it is recorded
    /// terminal. `1` means no retries -- a failed flow is reported failed
    /// after its first attempt.
    pub max_attempts: u32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self { default_step_timeout: Duration::from_secs(10), stop_on_failure: true, max_attempts: 1 }
    }
}

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub runner: RunnerConfig,
    pub worker_count: usize,
    /// Coalescing window the index writer uses for non-terminal updates.
    pub debounce: Duration,
    /// Sleep after every worker thread has joined and before `End()` is
    /// called on the index writer, letting any last debounced write settle.
    pub cleanup_drain: Duration,
    pub include_tags: Vec<String>,
    pub exclude_tags: Vec<String>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            runner: RunnerConfig::default(),
            worker_count: 1,
            debounce: Duration::from_millis(100),
            cleanup_drain: Duration::from_millis(100),
            include_tags: Vec::new(),
            exclude_tags: Vec::new(),
        }
    }
}
