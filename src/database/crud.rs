use chrono::{DateTime, Duration, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;

use super::{
    AnalysisOverview, AnalysisResult, AnalyzedConversation, Conversation, ConversationOverview,
    EmotionRecord, StoredMessage, VoiceupDatabase,
};
use crate::compliance::{ComplianceSummary, Message};
use crate::emotion::EmotionSummary;
use crate::errors::VoiceupResult;

const ANALYSIS_COLUMNS: &str = "id, conversation_id, emotion_summary, compliance_summary, \
                                overall_compliance_score, analyzed_at";

impl VoiceupDatabase {
    /// 新しい会話を作成
    pub fn create_conversation(&mut self, created_at: DateTime<Utc>) -> VoiceupResult<i64> {
        self.connection.execute(
            "INSERT INTO conversations (created_at) VALUES (?1)",
            params![created_at],
        )?;

        let conversation_id = self.connection.last_insert_rowid();
        tracing::info!("Created new conversation: {}", conversation_id);
        Ok(conversation_id)
    }

    /// メッセージを保存
    pub fn insert_message(
        &mut self,
        conversation_id: i64,
        message: &Message,
        timestamp: DateTime<Utc>,
    ) -> VoiceupResult<i64> {
        let message_id = self
            .connection
            .prepare(
                "INSERT INTO messages (conversation_id, sender, text, timestamp)
                 VALUES (?1, ?2, ?3, ?4)",
            )?
            .insert(params![
                conversation_id,
                message.sender.as_str(),
                message.text,
                timestamp,
            ])?;

        Ok(message_id)
    }

    /// 会話とメッセージを1トランザクションで保存
    ///
    /// タイムスタンプのないメッセージには`created_at`から`spacing`ずつずらした時刻を割り当てる。
    pub fn create_conversation_with_messages(
        &mut self,
        messages: &[Message],
        created_at: DateTime<Utc>,
        spacing: Duration,
    ) -> VoiceupResult<i64> {
        let tx = self.connection.transaction()?;
        let conversation_id = insert_conversation_rows(&tx, messages, created_at, spacing)?;
        tx.commit()?;

        tracing::info!(
            conversation_id = conversation_id,
            message_count = messages.len(),
            "💾 Stored conversation"
        );
        Ok(conversation_id)
    }

    /// 会話を取得
    pub fn get_conversation(&self, conversation_id: i64) -> VoiceupResult<Option<Conversation>> {
        let conversation = self
            .connection
            .query_row(
                "SELECT id, created_at FROM conversations WHERE id = ?1",
                params![conversation_id],
                |row| {
                    Ok(Conversation {
                        id: row.get("id")?,
                        created_at: row.get("created_at")?,
                    })
                },
            )
            .optional()?;

        Ok(conversation)
    }

    /// 会話一覧を取得（メッセージ数と分析概要付き）
    pub fn list_conversations(&self) -> VoiceupResult<Vec<ConversationOverview>> {
        let mut stmt = self.connection.prepare(
            "SELECT c.id, c.created_at,
                    (SELECT COUNT(*) FROM messages m WHERE m.conversation_id = c.id) AS message_count,
                    a.emotion_summary, a.overall_compliance_score
             FROM conversations c
             LEFT JOIN analysis_results a ON a.conversation_id = c.id
             ORDER BY c.id",
        )?;

        let overview_iter = stmt.query_map([], |row| {
            let emotion_json: Option<String> = row.get("emotion_summary")?;
            let emotion_summary = match emotion_json {
                Some(json) => Some(parse_json::<EmotionSummary>(&json, 3)?),
                None => None,
            };

            Ok(ConversationOverview {
                id: row.get("id")?,
                created_at: row.get("created_at")?,
                message_count: row.get("message_count")?,
                analysis: AnalysisOverview {
                    emotion_summary,
                    compliance_score: row.get("overall_compliance_score")?,
                },
            })
        })?;

        let mut overviews = Vec::new();
        for overview in overview_iter {
            overviews.push(overview?);
        }

        Ok(overviews)
    }

    /// 会話のメッセージをタイムスタンプ順に取得
    pub fn get_conversation_messages(
        &self,
        conversation_id: i64,
    ) -> VoiceupResult<Vec<StoredMessage>> {
        let mut stmt = self.connection.prepare(
            "SELECT id, conversation_id, sender, text, timestamp FROM messages
             WHERE conversation_id = ?1
             ORDER BY timestamp ASC, id ASC",
        )?;

        let message_iter = stmt.query_map(params![conversation_id], Self::row_to_message)?;

        let mut messages = Vec::new();
        for message in message_iter {
            messages.push(message?);
        }

        Ok(messages)
    }

    /// メッセージを1件取得
    pub fn get_message(&self, message_id: i64) -> VoiceupResult<Option<StoredMessage>> {
        let message = self
            .connection
            .query_row(
                "SELECT id, conversation_id, sender, text, timestamp FROM messages WHERE id = ?1",
                params![message_id],
                Self::row_to_message,
            )
            .optional()?;

        Ok(message)
    }

    /// 分析結果を作成または更新
    pub fn upsert_analysis_result(
        &mut self,
        conversation_id: i64,
        emotion_summary: &EmotionSummary,
        compliance: &ComplianceSummary,
        analyzed_at: DateTime<Utc>,
    ) -> VoiceupResult<AnalysisResult> {
        write_analysis(
            &self.connection,
            conversation_id,
            emotion_summary,
            compliance,
            analyzed_at,
        )?;

        let result = self
            .get_conversation_analysis(conversation_id)?
            .ok_or(rusqlite::Error::QueryReturnedNoRows)?;

        tracing::debug!(
            conversation_id = conversation_id,
            analysis_id = result.id,
            score = result.overall_compliance_score,
            "💾 Analysis result stored"
        );
        Ok(result)
    }

    /// 分析済みの会話をまとめて保存
    ///
    /// すべての会話・メッセージ・分析結果を1トランザクションで書き込む。
    /// `replace_existing`が真の場合は同じトランザクション内で既存の会話を削除する。
    /// 途中で失敗した場合は何も変更されない。
    pub fn store_analyzed_conversations(
        &mut self,
        conversations: &[AnalyzedConversation],
        replace_existing: bool,
    ) -> VoiceupResult<Vec<i64>> {
        let tx = self.connection.transaction()?;

        let removed = if replace_existing {
            tx.execute("DELETE FROM conversations", [])?
        } else {
            0
        };

        let mut conversation_ids = Vec::with_capacity(conversations.len());
        for conversation in conversations {
            let conversation_id = insert_conversation_rows(
                &tx,
                &conversation.messages,
                conversation.created_at,
                conversation.message_spacing,
            )?;
            write_analysis(
                &tx,
                conversation_id,
                &conversation.emotion_summary,
                &conversation.compliance,
                conversation.analyzed_at,
            )?;
            conversation_ids.push(conversation_id);
        }

        tx.commit()?;

        tracing::info!(
            removed = removed,
            stored = conversation_ids.len(),
            "💾 Stored analyzed conversations"
        );
        Ok(conversation_ids)
    }

    /// 分析結果をIDで取得
    pub fn get_analysis(&self, analysis_id: i64) -> VoiceupResult<Option<AnalysisResult>> {
        let sql = format!("SELECT {} FROM analysis_results WHERE id = ?1", ANALYSIS_COLUMNS);
        let result = self
            .connection
            .query_row(&sql, params![analysis_id], Self::row_to_analysis)
            .optional()?;

        Ok(result)
    }

    /// 会話の分析結果を取得
    pub fn get_conversation_analysis(
        &self,
        conversation_id: i64,
    ) -> VoiceupResult<Option<AnalysisResult>> {
        let sql = format!(
            "SELECT {} FROM analysis_results WHERE conversation_id = ?1",
            ANALYSIS_COLUMNS
        );
        let result = self
            .connection
            .query_row(&sql, params![conversation_id], Self::row_to_analysis)
            .optional()?;

        Ok(result)
    }

    /// すべての分析結果を取得
    pub fn list_analysis_results(&self) -> VoiceupResult<Vec<AnalysisResult>> {
        let sql = format!("SELECT {} FROM analysis_results ORDER BY id", ANALYSIS_COLUMNS);
        let mut stmt = self.connection.prepare(&sql)?;
        let result_iter = stmt.query_map([], Self::row_to_analysis)?;

        let mut results = Vec::new();
        for result in result_iter {
            results.push(result?);
        }

        Ok(results)
    }

    /// 感情集計用に会話作成日時と感情分布を取得
    pub fn list_emotion_records(&self) -> VoiceupResult<Vec<EmotionRecord>> {
        let mut stmt = self.connection.prepare(
            "SELECT c.created_at, a.emotion_summary
             FROM analysis_results a
             INNER JOIN conversations c ON c.id = a.conversation_id
             ORDER BY c.created_at ASC, c.id ASC",
        )?;

        let record_iter = stmt.query_map([], |row| {
            Ok(EmotionRecord {
                conversation_created_at: row.get(0)?,
                emotion_summary: parse_json(&row.get::<_, String>(1)?, 1)?,
            })
        })?;

        let mut records = Vec::new();
        for record in record_iter {
            records.push(record?);
        }

        Ok(records)
    }

    /// データベースの行をメッセージに変換
    fn row_to_message(row: &Row) -> rusqlite::Result<StoredMessage> {
        Ok(StoredMessage {
            id: row.get("id")?,
            conversation_id: row.get("conversation_id")?,
            sender: row.get("sender")?,
            text: row.get("text")?,
            timestamp: row.get("timestamp")?,
        })
    }

    /// データベースの行を分析結果に変換
    fn row_to_analysis(row: &Row) -> rusqlite::Result<AnalysisResult> {
        Ok(AnalysisResult {
            id: row.get("id")?,
            conversation_id: row.get("conversation_id")?,
            emotion_summary: parse_json(&row.get::<_, String>("emotion_summary")?, 2)?,
            compliance_summary: parse_json(&row.get::<_, String>("compliance_summary")?, 3)?,
            overall_compliance_score: row.get("overall_compliance_score")?,
            analyzed_at: row.get("analyzed_at")?,
        })
    }
}

/// 会話とメッセージの行を挿入し、会話IDを返す
///
/// タイムスタンプのないメッセージには直前の時刻から`spacing`ずらした時刻を割り当てる。
fn insert_conversation_rows(
    conn: &Connection,
    messages: &[Message],
    created_at: DateTime<Utc>,
    spacing: Duration,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO conversations (created_at) VALUES (?1)",
        params![created_at],
    )?;
    let conversation_id = conn.last_insert_rowid();

    let mut stmt = conn.prepare(
        "INSERT INTO messages (conversation_id, sender, text, timestamp)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    let mut fallback = created_at;
    for message in messages {
        let timestamp = message.timestamp.unwrap_or(fallback);
        stmt.execute(params![
            conversation_id,
            message.sender.as_str(),
            message.text,
            timestamp,
        ])?;
        fallback = timestamp + spacing;
    }

    Ok(conversation_id)
}

/// 分析結果を挿入（会話ごとに1件、既存の結果は上書き）
fn write_analysis(
    conn: &Connection,
    conversation_id: i64,
    emotion_summary: &EmotionSummary,
    compliance: &ComplianceSummary,
    analyzed_at: DateTime<Utc>,
) -> VoiceupResult<()> {
    let emotion_json = serde_json::to_string(emotion_summary)?;
    let compliance_json = serde_json::to_string(&compliance.rules)?;

    conn.execute(
        "INSERT INTO analysis_results
         (conversation_id, emotion_summary, compliance_summary, overall_compliance_score, analyzed_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(conversation_id) DO UPDATE SET
             emotion_summary = excluded.emotion_summary,
             compliance_summary = excluded.compliance_summary,
             overall_compliance_score = excluded.overall_compliance_score,
             analyzed_at = excluded.analyzed_at",
        params![
            conversation_id,
            emotion_json,
            compliance_json,
            compliance.score,
            analyzed_at,
        ],
    )?;

    Ok(())
}

/// JSON列を構造体にデコード
fn parse_json<T: DeserializeOwned>(json: &str, column: usize) -> rusqlite::Result<T> {
    serde_json::from_str(json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::{evaluate, Sender};
    use crate::emotion::EmotionScore;
    use anyhow::Result;

    fn sample_messages() -> Vec<Message> {
        vec![
            Message::new(Sender::Agent, "Hello Mike, welcome!"),
            Message::new(Sender::Customer, "My router is broken"),
            Message::new(Sender::Agent, "Sorry to hear that. It's fixed now."),
        ]
    }

    #[test]
    fn test_database_creation() -> Result<()> {
        let db = VoiceupDatabase::new_in_memory()?;
        assert_eq!(db.schema_version, 1);
        Ok(())
    }

    #[test]
    fn test_conversation_with_messages() -> Result<()> {
        let mut db = VoiceupDatabase::new_in_memory()?;
        let created_at = Utc::now();

        let conversation_id = db.create_conversation_with_messages(
            &sample_messages(),
            created_at,
            Duration::minutes(2),
        )?;

        let conversation = db.get_conversation(conversation_id)?.unwrap();
        assert_eq!(conversation.id, conversation_id);

        let messages = db.get_conversation_messages(conversation_id)?;
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].sender, "agent");
        assert_eq!(messages[1].text, "My router is broken");
        assert_eq!(messages[2].timestamp - messages[0].timestamp, Duration::minutes(4));

        let message = db.get_message(messages[1].id)?.unwrap();
        assert_eq!(message, messages[1]);
        assert!(db.get_message(9999)?.is_none());

        Ok(())
    }

    #[test]
    fn test_messages_ordered_by_timestamp() -> Result<()> {
        let mut db = VoiceupDatabase::new_in_memory()?;
        let now = Utc::now();
        let conversation_id = db.create_conversation(now)?;

        db.insert_message(
            conversation_id,
            &Message::new(Sender::Customer, "second"),
            now + Duration::seconds(10),
        )?;
        db.insert_message(conversation_id, &Message::new(Sender::Agent, "first"), now)?;

        let texts: Vec<String> = db
            .get_conversation_messages(conversation_id)?
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, vec!["first", "second"]);
        Ok(())
    }

    #[test]
    fn test_upsert_analysis_result_overwrites() -> Result<()> {
        let mut db = VoiceupDatabase::new_in_memory()?;
        let conversation_id = db.create_conversation_with_messages(
            &sample_messages(),
            Utc::now(),
            Duration::minutes(2),
        )?;

        let compliance = evaluate(&sample_messages());
        let first = db.upsert_analysis_result(
            conversation_id,
            &EmotionSummary::new(vec![EmotionScore::new("anger", 0.8)]),
            &compliance,
            Utc::now(),
        )?;

        let second = db.upsert_analysis_result(
            conversation_id,
            &EmotionSummary::new(vec![EmotionScore::new("joy", 0.9)]),
            &compliance,
            Utc::now(),
        )?;

        assert_eq!(first.id, second.id);
        assert_eq!(second.emotion_summary.emotions[0].label, "joy");
        assert_eq!(second.compliance_summary, compliance.rules);
        assert_eq!(second.overall_compliance_score, compliance.score);
        assert_eq!(db.list_analysis_results()?.len(), 1);
        assert_eq!(db.get_analysis(second.id)?, Some(second));

        Ok(())
    }

    #[test]
    fn test_list_conversations_overview() -> Result<()> {
        let mut db = VoiceupDatabase::new_in_memory()?;
        let analyzed = db.create_conversation_with_messages(
            &sample_messages(),
            Utc::now(),
            Duration::minutes(2),
        )?;
        let pending = db.create_conversation(Utc::now())?;

        db.upsert_analysis_result(
            analyzed,
            &EmotionSummary::new(vec![EmotionScore::new("neutral", 0.7)]),
            &evaluate(&sample_messages()),
            Utc::now(),
        )?;

        let overviews = db.list_conversations()?;
        assert_eq!(overviews.len(), 2);
        assert_eq!(overviews[0].message_count, 3);
        assert_eq!(overviews[0].analysis.compliance_score, Some(100));
        assert!(overviews[0].analysis.emotion_summary.is_some());
        assert_eq!(overviews[1].id, pending);
        assert_eq!(overviews[1].message_count, 0);
        assert!(overviews[1].analysis.compliance_score.is_none());

        assert_eq!(db.list_emotion_records()?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_replace_existing_cascades() -> Result<()> {
        let mut db = VoiceupDatabase::new_in_memory()?;
        let conversation_id = db.create_conversation_with_messages(
            &sample_messages(),
            Utc::now(),
            Duration::minutes(2),
        )?;
        db.upsert_analysis_result(
            conversation_id,
            &EmotionSummary::default(),
            &evaluate(&[]),
            Utc::now(),
        )?;

        assert!(db.store_analyzed_conversations(&[], true)?.is_empty());
        assert!(db.get_conversation(conversation_id)?.is_none());
        assert!(db.get_conversation_messages(conversation_id)?.is_empty());
        assert!(db.list_analysis_results()?.is_empty());
        Ok(())
    }

    fn analyzed(messages: Vec<Message>) -> AnalyzedConversation {
        let compliance = evaluate(&messages);
        AnalyzedConversation {
            messages,
            created_at: Utc::now(),
            message_spacing: Duration::minutes(2),
            emotion_summary: EmotionSummary::new(vec![EmotionScore::new("neutral", 1.0)]),
            compliance,
            analyzed_at: Utc::now(),
        }
    }

    #[test]
    fn test_store_analyzed_conversations_replaces_existing() -> Result<()> {
        let mut db = VoiceupDatabase::new_in_memory()?;
        let old = db.create_conversation_with_messages(
            &sample_messages(),
            Utc::now(),
            Duration::minutes(2),
        )?;

        let ids = db.store_analyzed_conversations(
            &[analyzed(sample_messages()), analyzed(sample_messages())],
            true,
        )?;

        assert_eq!(ids.len(), 2);
        assert!(db.get_conversation(old)?.is_none());
        let overviews = db.list_conversations()?;
        assert_eq!(overviews.len(), 2);
        assert!(overviews
            .iter()
            .all(|c| c.message_count == 3 && c.analysis.compliance_score == Some(100)));

        let messages = db.get_conversation_messages(ids[1])?;
        assert_eq!(messages[2].timestamp - messages[0].timestamp, Duration::minutes(4));
        Ok(())
    }

    #[test]
    fn test_store_analyzed_conversations_rolls_back_on_failure() -> Result<()> {
        let mut db = VoiceupDatabase::new_in_memory()?;
        let existing = db.create_conversation_with_messages(
            &sample_messages(),
            Utc::now(),
            Duration::minutes(2),
        )?;
        // 分析結果の書き込みだけを失敗させる
        db.connection.execute_batch("DROP TABLE analysis_results")?;

        let result = db.store_analyzed_conversations(&[analyzed(sample_messages())], true);

        assert!(result.is_err());
        assert!(db.get_conversation(existing)?.is_some());
        assert_eq!(db.get_conversation_messages(existing)?.len(), 3);
        let count: i64 =
            db.connection
                .query_row("SELECT COUNT(*) FROM conversations", [], |row| row.get(0))?;
        assert_eq!(count, 1);
        Ok(())
    }
}
