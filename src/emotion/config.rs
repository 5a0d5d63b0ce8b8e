//! 感情分類器の設定構造体

use serde::{Deserialize, Serialize};

use super::EmotionScore;

/// 分類器バックエンドの種類
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierBackendType {
    /// Hugging Face互換の推論エンドポイント
    #[default]
    HuggingFace,
    /// 固定の分布を返す（オフライン用）
    Static,
}

impl std::fmt::Display for ClassifierBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassifierBackendType::HuggingFace => write!(f, "Hugging Face"),
            ClassifierBackendType::Static => write!(f, "static"),
        }
    }
}

/// 推論エンドポイント設定
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HuggingFaceConfig {
    /// text-classificationパイプラインのURL
    pub endpoint: String,
    /// Bearerトークン（Noneなら送らない）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    /// リクエストタイムアウト（秒）
    pub timeout_secs: u64,
}

/// 既定のモデル（7ラベルの英語感情分類）
pub const DEFAULT_ENDPOINT: &str =
    "https://api-inference.huggingface.co/models/j-hartmann/emotion-english-distilroberta-base";

fn default_timeout_secs() -> u64 {
    30
}

impl Default for HuggingFaceConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// 固定分布バックエンド設定
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticClassifierConfig {
    pub emotions: Vec<EmotionScore>,
}

impl Default for StaticClassifierConfig {
    fn default() -> Self {
        Self {
            emotions: vec![
                EmotionScore::new("neutral", 0.6),
                EmotionScore::new("joy", 0.15),
                EmotionScore::new("sadness", 0.1),
                EmotionScore::new("anger", 0.05),
                EmotionScore::new("surprise", 0.04),
                EmotionScore::new("fear", 0.03),
                EmotionScore::new("disgust", 0.03),
            ],
        }
    }
}

/// 感情分類器設定
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// 使用するバックエンド
    #[serde(default)]
    pub backend: ClassifierBackendType,
    #[serde(default)]
    pub huggingface: HuggingFaceConfig,
    #[serde(default, rename = "static")]
    pub static_scores: StaticClassifierConfig,
}
