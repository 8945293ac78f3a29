use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error writing {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },
    #[error("failed to serialize {what} for {path}: {source}")]
    Serialize { what: &'static str, path: String, #[source] source: serde_json::Error },
    #[error("flow {0} not found in this run's index")]
    UnknownFlow(String),
    #[error("attempted to write to a store that has already been closed")]
    StoreClosed,
    #[error("internal: {0}")]
    Internal(String),
}
