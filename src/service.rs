//! 会話分析サービス
//!
//! データベース、感情分類器、コンプライアンス評価をつなぐ。HTTPハンドラーとCLIの
//! 両方から使われる。データベース操作はブロッキングスレッドで実行し、
//! ロックは分類器の呼び出し中には保持しない。

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::analytics::{ComplianceAnalytics, EmotionAnalytics};
use crate::compliance::{
    evaluate, validate_transcript, ComplianceRules, ComplianceSummary, Message, MessageRecord,
    ValidationError,
};
use crate::database::{
    AnalysisResult, AnalyzedConversation, ConversationOverview, StoredMessage, VoiceupDatabase,
};
use crate::emotion::{ClassifierError, EmotionClassifier, EmotionSummary, TopEmotion};
use crate::errors::{VoiceupError, VoiceupResult};

/// 取り込み時にタイムスタンプのないメッセージへ割り当てる間隔
const INGEST_MESSAGE_SPACING_SECS: i64 = 1;

/// 会話分析の結果ペイロード
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationAnalysis {
    pub emotion_summary: EmotionSummary,
    pub compliance_summary: ComplianceRules,
    pub overall_compliance_score: u8,
}

impl From<&AnalysisResult> for ConversationAnalysis {
    fn from(result: &AnalysisResult) -> Self {
        Self {
            emotion_summary: result.emotion_summary.clone(),
            compliance_summary: result.compliance_summary,
            overall_compliance_score: result.overall_compliance_score,
        }
    }
}

/// メッセージと分析結果を含む会話詳細
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationDetail {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub messages: Vec<StoredMessage>,
    pub analysis: Option<ConversationAnalysis>,
}

/// 会話分析サービス
#[derive(Clone)]
pub struct AnalysisService {
    database: Arc<Mutex<VoiceupDatabase>>,
    classifier: Arc<dyn EmotionClassifier>,
    compliance_threshold: u8,
}

impl AnalysisService {
    pub fn new(
        database: VoiceupDatabase,
        classifier: Arc<dyn EmotionClassifier>,
        compliance_threshold: u8,
    ) -> Self {
        Self {
            database: Arc::new(Mutex::new(database)),
            classifier,
            compliance_threshold,
        }
    }

    pub fn classifier_name(&self) -> &'static str {
        self.classifier.name()
    }

    /// データベース操作をブロッキングスレッドで実行
    ///
    /// rusqliteの呼び出しとロック待ちでtokioのワーカースレッドを止めない。
    async fn with_database<T, F>(&self, operation: F) -> VoiceupResult<T>
    where
        F: FnOnce(&mut VoiceupDatabase) -> VoiceupResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let database = Arc::clone(&self.database);
        tokio::task::spawn_blocking(move || {
            let mut db = database.lock();
            operation(&mut db)
        })
        .await
        .map_err(|e| VoiceupError::General(anyhow::Error::new(e).context("Database task failed")))?
    }

    /// 分類器の疎通確認
    pub async fn check_classifier(&self) -> VoiceupResult<bool> {
        Ok(self.classifier.test_connection().await?)
    }

    /// テキストの感情分布を取得
    pub async fn analyze_text(&self, text: &str) -> VoiceupResult<EmotionSummary> {
        if text.trim().is_empty() {
            return Err(ValidationError::EmptyText.into());
        }

        Ok(self.classifier.classify(text).await?)
    }

    /// 最もスコアの高い感情を取得
    pub async fn predict_top_emotion(&self, text: &str) -> VoiceupResult<TopEmotion> {
        let summary = self.analyze_text(text).await?;
        TopEmotion::from_summary(&summary).ok_or_else(|| {
            ClassifierError::InvalidResponse("classifier returned no labels".to_string()).into()
        })
    }

    /// 会話全体のテキストを連結して感情分布を取得
    pub async fn classify_transcript(&self, messages: &[Message]) -> VoiceupResult<EmotionSummary> {
        let all_text = messages
            .iter()
            .map(|message| message.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        Ok(self.classifier.classify(&all_text).await?)
    }

    /// 未検証レコードから会話を作成
    ///
    /// 1件でも不正なレコードがあれば何も保存しない。
    pub async fn ingest_conversation(
        &self,
        records: &[MessageRecord],
    ) -> VoiceupResult<ConversationDetail> {
        let messages = validate_transcript(records)?;
        let conversation_id = self
            .store_conversation(
                messages,
                Utc::now(),
                Duration::seconds(INGEST_MESSAGE_SPACING_SECS),
            )
            .await?;
        self.get_conversation_detail(conversation_id).await
    }

    /// 検証済みメッセージを会話として保存
    pub async fn store_conversation(
        &self,
        messages: Vec<Message>,
        created_at: DateTime<Utc>,
        spacing: Duration,
    ) -> VoiceupResult<i64> {
        self.with_database(move |db| {
            db.create_conversation_with_messages(&messages, created_at, spacing)
        })
        .await
    }

    /// 分析済みの会話を1トランザクションで保存
    pub async fn store_analyzed_conversations(
        &self,
        conversations: Vec<AnalyzedConversation>,
        replace_existing: bool,
    ) -> VoiceupResult<Vec<i64>> {
        self.with_database(move |db| {
            db.store_analyzed_conversations(&conversations, replace_existing)
        })
        .await
    }

    /// 会話を分析して結果を保存（既存の結果は上書き）
    pub async fn analyze_conversation(
        &self,
        conversation_id: i64,
    ) -> VoiceupResult<ConversationAnalysis> {
        let stored = self.get_conversation_messages(conversation_id).await?;

        let records: Vec<MessageRecord> = stored.iter().map(StoredMessage::to_record).collect();
        let messages = validate_transcript(&records)?;
        let compliance: ComplianceSummary = evaluate(&messages);
        let emotion_summary = self.classify_transcript(&messages).await?;

        let result = self
            .with_database(move |db| {
                db.upsert_analysis_result(conversation_id, &emotion_summary, &compliance, Utc::now())
            })
            .await?;

        tracing::info!(
            conversation_id = conversation_id,
            score = result.overall_compliance_score,
            violations = ?result.compliance_summary.violations(),
            "📊 Conversation analyzed"
        );

        Ok(ConversationAnalysis::from(&result))
    }

    /// 会話一覧
    pub async fn list_conversations(&self) -> VoiceupResult<Vec<ConversationOverview>> {
        self.with_database(|db| db.list_conversations()).await
    }

    /// 会話詳細
    pub async fn get_conversation_detail(
        &self,
        conversation_id: i64,
    ) -> VoiceupResult<ConversationDetail> {
        self.with_database(move |db| {
            let conversation = db
                .get_conversation(conversation_id)?
                .ok_or_else(|| VoiceupError::not_found("conversation", conversation_id))?;
            let messages = db.get_conversation_messages(conversation_id)?;
            let analysis = db
                .get_conversation_analysis(conversation_id)?
                .as_ref()
                .map(ConversationAnalysis::from);

            Ok(ConversationDetail {
                id: conversation.id,
                created_at: conversation.created_at,
                messages,
                analysis,
            })
        })
        .await
    }

    /// 会話のメッセージ一覧（タイムスタンプ順）
    pub async fn get_conversation_messages(
        &self,
        conversation_id: i64,
    ) -> VoiceupResult<Vec<StoredMessage>> {
        self.with_database(move |db| {
            db.get_conversation(conversation_id)?
                .ok_or_else(|| VoiceupError::not_found("conversation", conversation_id))?;
            db.get_conversation_messages(conversation_id)
        })
        .await
    }

    pub async fn get_message(&self, message_id: i64) -> VoiceupResult<StoredMessage> {
        self.with_database(move |db| {
            db.get_message(message_id)?
                .ok_or_else(|| VoiceupError::not_found("message", message_id))
        })
        .await
    }

    pub async fn get_analysis(&self, analysis_id: i64) -> VoiceupResult<AnalysisResult> {
        self.with_database(move |db| {
            db.get_analysis(analysis_id)?
                .ok_or_else(|| VoiceupError::not_found("analysis", analysis_id))
        })
        .await
    }

    pub async fn get_conversation_analysis(
        &self,
        conversation_id: i64,
    ) -> VoiceupResult<AnalysisResult> {
        self.with_database(move |db| {
            db.get_conversation_analysis(conversation_id)?
                .ok_or_else(|| VoiceupError::not_found("analysis for conversation", conversation_id))
        })
        .await
    }

    /// コンプライアンス集計
    pub async fn compliance_analytics(&self) -> VoiceupResult<ComplianceAnalytics> {
        let results: Vec<ComplianceSummary> = self
            .with_database(|db| db.list_analysis_results())
            .await?
            .iter()
            .map(AnalysisResult::compliance)
            .collect();

        ComplianceAnalytics::from_results(&results, self.compliance_threshold)
            .ok_or(VoiceupError::NoData)
    }

    /// 感情集計
    pub async fn emotion_analytics(&self) -> VoiceupResult<EmotionAnalytics> {
        let records = self.with_database(|db| db.list_emotion_records()).await?;
        Ok(EmotionAnalytics::from_records(&records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::Sender;
    use crate::emotion::{EmotionScore, StaticBackend};

    fn service() -> AnalysisService {
        let db = VoiceupDatabase::new_in_memory().unwrap();
        let classifier = Arc::new(StaticBackend::new(vec![
            EmotionScore::new("joy", 0.75),
            EmotionScore::new("neutral", 0.25),
        ]));
        AnalysisService::new(db, classifier, 80)
    }

    #[tokio::test]
    async fn test_analyze_text_rejects_blank() {
        let err = service().analyze_text("  ").await.unwrap_err();
        assert!(matches!(err, VoiceupError::Validation(ValidationError::EmptyText)));
    }

    #[tokio::test]
    async fn test_predict_top_emotion() {
        let top = service().predict_top_emotion("I love it").await.unwrap();
        assert_eq!(top.emotion, "joy");
        assert_eq!(top.score, 0.75);
    }

    #[tokio::test]
    async fn test_analyze_unknown_conversation() {
        let err = service().analyze_conversation(404).await.unwrap_err();
        assert!(matches!(err, VoiceupError::NotFound { id: 404, .. }));
    }

    #[tokio::test]
    async fn test_analyze_conversation_is_idempotent() {
        let service = service();
        let detail = service
            .ingest_conversation(&[
                MessageRecord::new("agent", "Hello Sarah!"),
                MessageRecord::new("customer", "Internet is down"),
                MessageRecord::new("agent", "Sorry! It's working again."),
            ])
            .await
            .unwrap();
        assert!(detail.analysis.is_none());

        let first = service.analyze_conversation(detail.id).await.unwrap();
        let second = service.analyze_conversation(detail.id).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.overall_compliance_score, 100);

        let detail = service.get_conversation_detail(detail.id).await.unwrap();
        assert_eq!(detail.analysis, Some(first));
        assert_eq!(
            service.compliance_analytics().await.unwrap().total_conversations,
            1
        );
    }

    #[tokio::test]
    async fn test_ingest_rejects_malformed_records() {
        let service = service();
        let err = service
            .ingest_conversation(&[MessageRecord {
                sender: Some("agent".to_string()),
                text: None,
                timestamp: None,
            }])
            .await
            .unwrap_err();

        assert!(matches!(err, VoiceupError::Validation(_)));
        assert!(service.list_conversations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stored_invalid_sender_fails_analysis() {
        let service = service();
        let conversation_id = {
            let mut db = service.database.lock();
            let id = db.create_conversation(Utc::now()).unwrap();
            db.connection
                .execute(
                    "INSERT INTO messages (conversation_id, sender, text, timestamp) VALUES (?1, 'bot', 'hi', ?2)",
                    rusqlite::params![id, Utc::now()],
                )
                .unwrap();
            id
        };

        let err = service.analyze_conversation(conversation_id).await.unwrap_err();
        assert!(matches!(
            err,
            VoiceupError::Validation(ValidationError::UnknownSender { .. })
        ));
        assert!(service.get_conversation_analysis(conversation_id).await.is_err());
    }

    #[tokio::test]
    async fn test_compliance_analytics_without_data() {
        let service = service();
        assert!(matches!(
            service.compliance_analytics().await,
            Err(VoiceupError::NoData)
        ));
        assert_eq!(
            service.emotion_analytics().await.unwrap().total_conversations,
            0
        );
    }

    #[tokio::test]
    async fn test_store_conversation_spacing() {
        let service = service();
        let start = Utc::now();
        let id = service
            .store_conversation(
                vec![
                    Message::new(Sender::Agent, "Hi"),
                    Message::new(Sender::Customer, "Hello"),
                ],
                start,
                Duration::minutes(2),
            )
            .await
            .unwrap();

        let messages = service.get_conversation_messages(id).await.unwrap();
        assert_eq!(messages[1].timestamp - messages[0].timestamp, Duration::minutes(2));
    }

    #[tokio::test]
    async fn test_classify_transcript_joins_messages() {
        let summary = service()
            .classify_transcript(&[
                Message::new(Sender::Agent, "Hi"),
                Message::new(Sender::Customer, "Thanks"),
            ])
            .await
            .unwrap();
        assert_eq!(summary.emotions[0].label, "joy");
    }

    #[tokio::test]
    async fn test_panicked_database_task_is_reported() {
        let service = service();
        let err = service
            .with_database(|_db| -> VoiceupResult<()> { panic!("connection lost") })
            .await
            .unwrap_err();

        assert!(matches!(err, VoiceupError::General(_)));
        assert!(!err.is_client_error());
        // parking_lotのMutexはパニックで汚染されない
        assert!(service.list_conversations().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_database_calls() {
        let service = service();
        let mut handles = Vec::new();
        for i in 0..8 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                let records = [
                    MessageRecord::new("agent", format!("Hello customer {}", i)),
                    MessageRecord::new("customer", "Thanks"),
                ];
                let detail = service.ingest_conversation(&records).await?;
                service.analyze_conversation(detail.id).await
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let (conversations, analytics) =
            tokio::join!(service.list_conversations(), service.compliance_analytics());
        assert_eq!(conversations.unwrap().len(), 8);
        assert_eq!(analytics.unwrap().total_conversations, 8);
    }
}
