use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Replay error at line {line}: {reason}")]
    Replay { line: usize, reason: String },

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
