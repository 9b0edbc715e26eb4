use thiserror::Error;

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid delivery transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Cannot approve record with score {score:.2} below threshold {threshold:.2}")]
    ApprovalBelowThreshold { score: f64, threshold: f64 },

    #[error("Unknown category code: {0}")]
    UnknownCategory(String),

    #[error("Daily request quota of {limit} exhausted for provider {provider}")]
    QuotaExhausted { provider: String, limit: u64 },

    #[error("Job {job} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        job: String,
        attempts: u32,
        last_error: String,
    },
}

pub type Result<T> = std::result::Result<T, DirectoryError>;
