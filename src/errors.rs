use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("invalid operand: {0}")]
    InvalidOperand(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Serde JSON: {0}")]
    Json(#[from] serde_json::Error),
}
