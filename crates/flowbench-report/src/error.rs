use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("io error reading {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },
    #[error("failed to parse {what} at {path}: {source}")]
    Parse { what: &'static str, path: String, #[source] source: serde_json::Error },
    #[error("failed to read screenshot asset {path}: {source}")]
    Asset { path: String, #[source] source: std::io::Error },
}
