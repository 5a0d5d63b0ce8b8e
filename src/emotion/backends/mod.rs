//! 感情分類バックエンド実装

pub mod huggingface;
pub mod static_backend;

use async_trait::async_trait;

use super::error::ClassifierError;
use super::EmotionSummary;

pub use huggingface::HuggingFaceBackend;
pub use static_backend::StaticBackend;

/// 感情分類器トレイト
///
/// 空文字列や空白のみのテキストに対してはモデルを呼ばず、空の結果を返すこと。
#[async_trait]
pub trait EmotionClassifier: Send + Sync {
    /// テキストの感情分布を取得
    async fn classify(&self, text: &str) -> Result<EmotionSummary, ClassifierError>;

    /// 接続テスト
    async fn test_connection(&self) -> Result<bool, ClassifierError>;

    /// バックエンド名を取得
    fn name(&self) -> &'static str;
}
