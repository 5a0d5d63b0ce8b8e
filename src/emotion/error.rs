//! 感情分類器用エラー型

use thiserror::Error;

/// 感情分類エラー型
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Classifier returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid classifier response: {0}")]
    InvalidResponse(String),

    #[error("Classifier unavailable: {0}")]
    Unavailable(String),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}
