use thiserror::Error;

#[derive(Debug, Error)]
pub enum PubwatchError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ledger format error: {0}")]
    Ledger(#[from] csv::Error),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Artifact retrieval failed: {0}")]
    Artifact(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Security policy violation: {0}")]
    Security(String),
}

pub type Result<T> = std::result::Result<T, PubwatchError>;
