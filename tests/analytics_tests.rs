//! 集計処理の統合テスト

use chrono::{Duration, TimeZone, Utc};
use std::sync::Arc;
use voiceup::{
    evaluate, AnalysisService, ComplianceAnalytics, ComplianceRule, ComplianceRules,
    ComplianceSummary, EmotionScore, Message, Sender, StaticBackend, VoiceupDatabase,
    COMPLIANCE_THRESHOLD,
};

fn summary(score: u8) -> ComplianceSummary {
    ComplianceSummary {
        rules: ComplianceRules {
            greeting: score >= 20,
            personalization: score >= 40,
            apology: score >= 60,
            resolution: score >= 80,
            no_unsupported_claims: score >= 100,
        },
        score,
    }
}

#[test]
fn test_compliance_rate_and_average() {
    let results: Vec<ComplianceSummary> = [100, 20, 85, 40].into_iter().map(summary).collect();
    let analytics = ComplianceAnalytics::from_results(&results, COMPLIANCE_THRESHOLD).unwrap();

    assert_eq!(analytics.compliance_rate, 50.0);
    assert_eq!(analytics.average_score, 61.25);
    assert_eq!(analytics.total_conversations, 4);
    assert_eq!(analytics.compliant_conversations, 2);
    assert_eq!(analytics.scores, vec![100, 20, 85, 40]);
}

#[test]
fn test_rule_violation_counts() {
    let results = vec![
        evaluate(&[Message::new(Sender::Agent, "Hello, it will always work")]),
        evaluate(&[Message::new(Sender::Agent, "Hi Mike, sorry, it's fixed")]),
        evaluate(&[]),
    ];
    let analytics = ComplianceAnalytics::from_results(&results, COMPLIANCE_THRESHOLD).unwrap();

    assert_eq!(analytics.rule_violations[&ComplianceRule::Greeting], 1);
    assert_eq!(analytics.rule_violations[&ComplianceRule::Personalization], 2);
    assert_eq!(analytics.rule_violations[&ComplianceRule::Apology], 2);
    assert_eq!(analytics.rule_violations[&ComplianceRule::Resolution], 2);
    assert_eq!(analytics.rule_violations[&ComplianceRule::NoUnsupportedClaims], 1);
}

#[test]
fn test_custom_threshold() {
    let results: Vec<ComplianceSummary> = [100, 20, 85, 40].into_iter().map(summary).collect();
    let analytics = ComplianceAnalytics::from_results(&results, 40).unwrap();
    assert_eq!(analytics.compliance_rate, 75.0);
}

#[tokio::test]
async fn test_emotion_trend_from_stored_analyses() {
    let database = VoiceupDatabase::new_in_memory().unwrap();
    let classifier = Arc::new(StaticBackend::new(vec![
        EmotionScore::new("joy", 0.5),
        EmotionScore::new("anger", 0.25),
    ]));
    let service = AnalysisService::new(database, classifier, COMPLIANCE_THRESHOLD);

    let day_one = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
    let day_two = Utc.with_ymd_and_hms(2024, 5, 2, 23, 30, 0).unwrap();
    let transcript = vec![
        Message::new(Sender::Agent, "Hello John"),
        Message::new(Sender::Customer, "My phone is broken"),
    ];

    for created_at in [day_one, day_one + Duration::hours(3), day_two] {
        let id = service
            .store_conversation(transcript.clone(), created_at, Duration::minutes(2))
            .await
            .unwrap();
        service.analyze_conversation(id).await.unwrap();
    }

    let analytics = service.emotion_analytics().await.unwrap();
    assert_eq!(analytics.total_conversations, 3);
    assert_eq!(analytics.distribution["joy"], 1.5);
    assert_eq!(analytics.distribution["anger"], 0.75);

    assert_eq!(analytics.trend.len(), 2);
    assert_eq!(
        analytics.trend[0].emotions,
        vec![EmotionScore::new("joy", 1.0), EmotionScore::new("anger", 0.5)]
    );
    assert_eq!(analytics.trend[1].date, day_two.date_naive());

    let compliance = service.compliance_analytics().await.unwrap();
    assert_eq!(compliance.scores, vec![60, 60, 60]);
    assert_eq!(compliance.compliance_rate, 0.0);
}
