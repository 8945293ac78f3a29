use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("no workers available: worker_count must be at least 1")]
    NoWorkers,
    #[error("no devices were provided to run against")]
    NoDevices,
    #[error(transparent)]
    Store(#[from] flowbench_core::StoreError),
    #[error(transparent)]
    Script(#[from] flowbench_script::ScriptError),
    #[error(transparent)]
    Driver(#[from] flowbench_driver::DriverError),
    #[error(transparent)]
    Domain(#[from] flowbench_domain::DomainError),
}
