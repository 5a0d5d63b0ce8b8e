//! Hugging Face推論エンドポイントバックエンド実装

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::EmotionClassifier;
use crate::emotion::config::HuggingFaceConfig;
use crate::emotion::error::ClassifierError;
use crate::emotion::{EmotionScore, EmotionSummary};

/// text-classificationパイプラインのレスポンス
///
/// 単一入力でも`[[...]]`で返すサーバーと`[...]`で返すサーバーがある。
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Nested(Vec<Vec<EmotionScore>>),
    Flat(Vec<EmotionScore>),
}

impl InferenceResponse {
    fn into_summary(self) -> EmotionSummary {
        match self {
            InferenceResponse::Nested(batches) => batches
                .into_iter()
                .next()
                .map(EmotionSummary::new)
                .unwrap_or_default(),
            InferenceResponse::Flat(scores) => EmotionSummary::new(scores),
        }
    }
}

/// Hugging Faceバックエンド
pub struct HuggingFaceBackend {
    config: HuggingFaceConfig,
    client: reqwest::Client,
}

impl HuggingFaceBackend {
    /// 新しいインスタンスを作成
    pub fn new(config: HuggingFaceConfig) -> Result<Self, ClassifierError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    /// 推論リクエストを送信してレスポンス本文を取得
    async fn request_inference(&self, text: &str) -> Result<String, ClassifierError> {
        let body = serde_json::json!({
            "inputs": text,
            "parameters": { "top_k": null },
        });

        let mut request = self.client.post(&self.config.endpoint).json(&body);
        if let Some(token) = &self.config.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ClassifierError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }
}

/// レスポンス本文を感情分布に変換
fn parse_inference_body(body: &str) -> Result<EmotionSummary, ClassifierError> {
    let response: InferenceResponse = serde_json::from_str(body)?;
    let summary = response.into_summary();
    summary.validate()?;
    Ok(summary)
}

#[async_trait]
impl EmotionClassifier for HuggingFaceBackend {
    async fn classify(&self, text: &str) -> Result<EmotionSummary, ClassifierError> {
        if text.trim().is_empty() {
            return Ok(EmotionSummary::default());
        }

        tracing::debug!(
            endpoint = %self.config.endpoint,
            text_length = text.len(),
            "🧠 Sending text to emotion classifier"
        );

        let body = self.request_inference(text).await?;
        let summary = parse_inference_body(&body)?;

        tracing::debug!(labels = summary.emotions.len(), "✅ Emotion classification finished");
        Ok(summary)
    }

    async fn test_connection(&self) -> Result<bool, ClassifierError> {
        match self.classify("hello").await {
            Ok(summary) => {
                tracing::info!(
                    "✅ 感情分類器に接続しました: {} ({} labels)",
                    self.config.endpoint,
                    summary.emotions.len()
                );
                Ok(!summary.is_empty())
            }
            Err(ClassifierError::Status { status, .. }) => {
                tracing::warn!("⚠️ 感情分類器の接続確認に失敗: ステータス {}", status);
                Ok(false)
            }
            Err(e) => {
                tracing::error!("❌ 感情分類器に接続できません: {}", e);
                Err(ClassifierError::Unavailable(e.to_string()))
            }
        }
    }

    fn name(&self) -> &'static str {
        "Hugging Face"
    }
}
