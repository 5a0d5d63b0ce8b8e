//! クレート共通のエラー型

use thiserror::Error;

use crate::compliance::ValidationError;
use crate::emotion::ClassifierError;

/// voiceup全体のエラー型
#[derive(Debug, Error)]
pub enum VoiceupError {
    /// 入力データの検証エラー（クライアント側の問題）
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// 感情分類器のエラー（モデル未起動など）
    #[error("Emotion classifier failed: {0}")]
    Classifier(#[from] ClassifierError),

    /// データベースエラー
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// 指定IDのレコードが存在しない
    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: i64 },

    /// 集計対象のデータが1件もない
    #[error("No analysis data available")]
    NoData,

    /// 設定エラー
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// JSONシリアライズ/デシリアライズエラー
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// その他のエラー
    #[error(transparent)]
    General(#[from] anyhow::Error),
}

impl VoiceupError {
    /// レコード未検出エラーを作成
    pub fn not_found(resource: &'static str, id: i64) -> Self {
        Self::NotFound { resource, id }
    }

    /// クライアント起因のエラーかどうか
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NotFound { .. } | Self::NoData)
    }
}

/// voiceup全体のResult型
pub type VoiceupResult<T> = Result<T, VoiceupError>;
