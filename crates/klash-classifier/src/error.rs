use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Claude CLI error: {0}")]
    Cli(String),

    #[error("Classifier response parse error: {0}")]
    Parse(String),

    #[error("Classification timed out after {0} seconds")]
    Timeout(u64),

    #[error("Classifier unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid judgment: {0}")]
    InvalidJudgment(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
