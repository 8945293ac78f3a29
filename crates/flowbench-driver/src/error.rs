use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("step timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("device unreachable: {0}")]
    DeviceUnreachable(String),
    #[error("driver does not support step {0}")]
    Unsupported(&'static str),
}
