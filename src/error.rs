use thiserror::Error;

#[derive(Error, Debug)]
pub enum VeritorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Stage output not found: {0}")]
    StageOutputNotFound(String),

    #[error("Unexpected stage output: expected {expected}, got {actual}")]
    UnexpectedStageOutput { expected: String, actual: String },

    #[error("Generation stage failed: {0}")]
    Generation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, VeritorError>;
