//! 固定分布バックエンド実装

use async_trait::async_trait;

use super::EmotionClassifier;
use crate::emotion::config::StaticClassifierConfig;
use crate::emotion::error::ClassifierError;
use crate::emotion::{EmotionScore, EmotionSummary};

/// どのテキストにも同じ分布を返すバックエンド
///
/// モデルなしでシード投入やテストを行うために使う。
#[derive(Debug, Clone)]
pub struct StaticBackend {
    summary: EmotionSummary,
}

impl StaticBackend {
    pub fn new(emotions: Vec<EmotionScore>) -> Self {
        Self {
            summary: EmotionSummary::new(emotions),
        }
    }

    pub fn from_config(config: &StaticClassifierConfig) -> Result<Self, ClassifierError> {
        let backend = Self::new(config.emotions.clone());
        backend.summary.validate()?;
        Ok(backend)
    }
}

impl Default for StaticBackend {
    fn default() -> Self {
        Self::new(StaticClassifierConfig::default().emotions)
    }
}

#[async_trait]
impl EmotionClassifier for StaticBackend {
    async fn classify(&self, text: &str) -> Result<EmotionSummary, ClassifierError> {
        if text.trim().is_empty() {
            return Ok(EmotionSummary::default());
        }
        Ok(self.summary.clone())
    }

    async fn test_connection(&self) -> Result<bool, ClassifierError> {
        Ok(true)
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
