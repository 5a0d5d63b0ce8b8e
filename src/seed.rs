//! デモ用会話データの投入

use chrono::{Duration, Utc};

use crate::compliance::{evaluate, Message, Sender};
use crate::database::AnalyzedConversation;
use crate::errors::VoiceupResult;
use crate::service::AnalysisService;

/// デモ会話のメッセージ間隔
pub const SEED_MESSAGE_SPACING_MINUTES: i64 = 2;

const DEMO_CONVERSATIONS: &[&[(Sender, &str)]] = &[
    &[
        (Sender::Agent, "Hi Alex! Welcome to VoiceUp Support. How can I help you?"),
        (Sender::Customer, "My internet keeps disconnecting and it's really frustrating!"),
        (Sender::Agent, "I'm so sorry for the inconvenience, Alex. Let me check this for you."),
        (Sender::Customer, "Thanks, I hope it gets fixed soon."),
        (Sender::Agent, "I have reset your connection. Could you please check now?"),
        (Sender::Customer, "Yes, it's working now. Thank you!"),
    ],
    &[
        (Sender::Agent, "Hello, how can I assist you today?"),
        (Sender::Customer, "My router is showing a red light and no internet."),
        (Sender::Agent, "No worries, our routers usually fix themselves in a few minutes."),
        (Sender::Customer, "Are you sure? This has been happening for an hour."),
        (Sender::Agent, "Guaranteed it will be fine soon!"),
    ],
    &[
        (Sender::Agent, "Hello Sarah! Welcome to VoiceUp support. How may I assist you today?"),
        (Sender::Customer, "Hi, my internet speed is very slow lately."),
        (Sender::Agent, "I understand this must be frustrating, Sarah. Let me run a speed test."),
        (Sender::Customer, "Thank you, please check."),
        (Sender::Agent, "I've optimized your connection settings. Can you try now?"),
        (Sender::Customer, "Much better now, thank you!"),
        (Sender::Agent, "Wonderful! Is there anything else I can help you with, Sarah?"),
    ],
    &[
        (Sender::Agent, "What do you want?"),
        (Sender::Customer, "Is this how you greet customers? I'm having network issues."),
        (Sender::Agent, "Our network never has issues, must be your device."),
        (Sender::Customer, "This is terrible service!"),
        (Sender::Agent, "Try restarting your router."),
    ],
    &[
        (Sender::Agent, "Hello! How can I help you today?"),
        (Sender::Customer, "Hi, I'm John. My Wi-Fi keeps dropping."),
        (Sender::Agent, "Let me check that for you."),
        (Sender::Customer, "It's really annoying!"),
        (Sender::Agent, "I understand your frustration. I've reset your connection."),
        (Sender::Customer, "Is it fixed now?"),
        (Sender::Agent, "Yes, it should work better now."),
    ],
];

/// 良好・不良・混在のコンプライアンスを含むデモ会話
pub fn demo_conversations() -> Vec<Vec<Message>> {
    DEMO_CONVERSATIONS
        .iter()
        .map(|conversation| {
            conversation
                .iter()
                .map(|(sender, text)| Message::new(*sender, *text))
                .collect()
        })
        .collect()
}

/// デモ会話を分析して保存する
///
/// 5件すべての分類と評価を先に済ませ、`reset`による既存会話の削除と挿入を
/// 1トランザクションで行う。失敗した場合はデータベースを変更しない。作成した会話IDを返す。
pub async fn seed_database(service: &AnalysisService, reset: bool) -> VoiceupResult<Vec<i64>> {
    let spacing = Duration::minutes(SEED_MESSAGE_SPACING_MINUTES);

    let mut analyzed = Vec::with_capacity(DEMO_CONVERSATIONS.len());
    for messages in demo_conversations() {
        let compliance = evaluate(&messages);
        let emotion_summary = service.classify_transcript(&messages).await?;
        tracing::debug!(score = compliance.score, "🌱 Demo conversation analyzed");

        let now = Utc::now();
        analyzed.push(AnalyzedConversation {
            messages,
            created_at: now,
            message_spacing: spacing,
            emotion_summary,
            compliance,
            analyzed_at: now,
        });
    }

    let conversation_ids = service.store_analyzed_conversations(analyzed, reset).await?;

    tracing::info!(
        "✅ Seeded {} demo conversations using {} classifier",
        conversation_ids.len(),
        service.classifier_name()
    );
    Ok(conversation_ids)
}
