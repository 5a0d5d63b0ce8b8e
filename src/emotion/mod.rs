//! 感情分類
//!
//! 分類そのものは外部の学習済みモデルに委譲する。このモジュールは分類結果の型、
//! 分類器トレイト、および設定からのバックエンド生成を提供する。

pub mod backends;
pub mod config;
pub mod error;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use backends::{EmotionClassifier, HuggingFaceBackend, StaticBackend};
pub use config::{ClassifierBackendType, ClassifierConfig, HuggingFaceConfig, StaticClassifierConfig};
pub use error::ClassifierError;

/// ラベルとスコアの組
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionScore {
    pub label: String,
    pub score: f64,
}

impl EmotionScore {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// 分類器が返した感情分布（順序を保持したまま保存する）
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EmotionSummary {
    #[serde(default)]
    pub emotions: Vec<EmotionScore>,
}

impl EmotionSummary {
    pub fn new(emotions: Vec<EmotionScore>) -> Self {
        Self { emotions }
    }

    pub fn is_empty(&self) -> bool {
        self.emotions.is_empty()
    }

    /// 最もスコアの高い感情（同点の場合は先に現れたもの）
    pub fn top(&self) -> Option<&EmotionScore> {
        self.emotions.iter().fold(None, |best, current| match best {
            Some(best) if best.score >= current.score => Some(best),
            _ => Some(current),
        })
    }

    pub fn score_of(&self, label: &str) -> Option<f64> {
        self.emotions
            .iter()
            .find(|emotion| emotion.label == label)
            .map(|emotion| emotion.score)
    }

    /// すべてのスコアが[0, 1]の有限値であることを確認
    pub fn validate(&self) -> Result<(), ClassifierError> {
        for emotion in &self.emotions {
            if !emotion.score.is_finite() || !(0.0..=1.0).contains(&emotion.score) {
                return Err(ClassifierError::InvalidResponse(format!(
                    "score for '{}' is out of range: {}",
                    emotion.label, emotion.score
                )));
            }
        }
        Ok(())
    }
}

/// 上位1件の感情（スコアは小数点以下4桁に丸める）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopEmotion {
    pub emotion: String,
    pub score: f64,
}

impl TopEmotion {
    pub fn from_summary(summary: &EmotionSummary) -> Option<Self> {
        summary.top().map(|top| Self {
            emotion: top.label.clone(),
            score: (top.score * 10_000.0).round() / 10_000.0,
        })
    }
}

/// 設定から分類器を生成
pub fn build_classifier(
    config: &ClassifierConfig,
) -> Result<Arc<dyn EmotionClassifier>, ClassifierError> {
    let classifier: Arc<dyn EmotionClassifier> = match config.backend {
        ClassifierBackendType::HuggingFace => {
            Arc::new(HuggingFaceBackend::new(config.huggingface.clone())?)
        }
        ClassifierBackendType::Static => Arc::new(StaticBackend::from_config(&config.static_scores)?),
    };

    tracing::info!("🧠 Emotion classifier backend: {}", classifier.name());
    Ok(classifier)
}
