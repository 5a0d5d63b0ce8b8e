use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::compliance::{ComplianceRules, ComplianceSummary, Message, MessageRecord};
use crate::emotion::EmotionSummary;

/// 会話モデル
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conversation {
    pub id: i64,
    pub created_at: DateTime<Utc>,
}

/// 保存済みメッセージモデル
///
/// 送信者は保存時の文字列のまま保持し、評価前に検証する。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredMessage {
    pub id: i64,
    pub conversation_id: i64,
    pub sender: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl StoredMessage {
    /// 評価用の未検証レコードに変換
    pub fn to_record(&self) -> MessageRecord {
        MessageRecord {
            sender: Some(self.sender.clone()),
            text: Some(self.text.clone()),
            timestamp: Some(self.timestamp),
        }
    }
}

/// 分析結果モデル
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    pub id: i64,
    pub conversation_id: i64,
    pub emotion_summary: EmotionSummary,
    pub compliance_summary: ComplianceRules,
    pub overall_compliance_score: u8,
    pub analyzed_at: DateTime<Utc>,
}

/// 一覧表示用の分析概要
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisOverview {
    pub emotion_summary: Option<EmotionSummary>,
    pub compliance_score: Option<u8>,
}

/// 会話一覧の1行
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationOverview {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub message_count: i64,
    pub analysis: AnalysisOverview,
}

/// 感情集計用のレコード（会話作成日時と感情分布）
#[derive(Debug, Clone, PartialEq)]
pub struct EmotionRecord {
    pub conversation_created_at: DateTime<Utc>,
    pub emotion_summary: EmotionSummary,
}

/// 保存前に分類と評価を済ませた会話
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedConversation {
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub message_spacing: Duration,
    pub emotion_summary: EmotionSummary,
    pub compliance: ComplianceSummary,
    pub analyzed_at: DateTime<Utc>,
}

impl AnalysisResult {
    /// 保存済みのルール判定とスコアを評価結果として取得
    pub fn compliance(&self) -> ComplianceSummary {
        ComplianceSummary {
            rules: self.compliance_summary,
            score: self.overall_compliance_score,
        }
    }
}
