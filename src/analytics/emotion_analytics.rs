use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::database::EmotionRecord;
use crate::emotion::EmotionScore;

/// 日別の感情トレンド
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmotionTrendPoint {
    /// 会話作成日（UTC）
    pub date: NaiveDate,
    /// その日に作成された会話のラベル別スコア合計
    pub emotions: Vec<EmotionScore>,
}

/// 感情集計結果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EmotionAnalytics {
    /// ラベル別スコア合計
    pub distribution: BTreeMap<String, f64>,
    /// 日付順のトレンド
    pub trend: Vec<EmotionTrendPoint>,
    pub total_conversations: usize,
}

impl EmotionAnalytics {
    /// 感情分布を加算集計（減衰・重み付けなし）
    pub fn from_records(records: &[EmotionRecord]) -> Self {
        let mut distribution: BTreeMap<String, f64> = BTreeMap::new();
        let mut daily: BTreeMap<NaiveDate, Vec<EmotionScore>> = BTreeMap::new();

        for record in records {
            let date = record.conversation_created_at.date_naive();
            let day = daily.entry(date).or_default();

            for emotion in &record.emotion_summary.emotions {
                *distribution.entry(emotion.label.clone()).or_insert(0.0) += emotion.score;
                accumulate(day, emotion);
            }
        }

        let trend = daily
            .into_iter()
            .map(|(date, emotions)| EmotionTrendPoint { date, emotions })
            .collect();

        Self {
            distribution,
            trend,
            total_conversations: records.len(),
        }
    }
}

/// 同じラベルがあれば加算、なければ末尾に追加（初出順を保持）
fn accumulate(scores: &mut Vec<EmotionScore>, emotion: &EmotionScore) {
    match scores.iter_mut().find(|s| s.label == emotion.label) {
        Some(existing) => existing.score += emotion.score,
        None => scores.push(emotion.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::EmotionSummary;
    use chrono::{TimeZone, Utc};

    fn record(day: u32, hour: u32, emotions: &[(&str, f64)]) -> EmotionRecord {
        EmotionRecord {
            conversation_created_at: Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap(),
            emotion_summary: EmotionSummary::new(
                emotions
                    .iter()
                    .map(|(label, score)| EmotionScore::new(*label, *score))
                    .collect(),
            ),
        }
    }

    #[test]
    fn test_empty_records() {
        let analytics = EmotionAnalytics::from_records(&[]);
        assert_eq!(analytics, EmotionAnalytics::default());
    }

    #[test]
    fn test_distribution_sums_scores() {
        let records = vec![
            record(1, 9, &[("joy", 0.5), ("anger", 0.25)]),
            record(2, 9, &[("joy", 0.25), ("fear", 0.125)]),
        ];
        let analytics = EmotionAnalytics::from_records(&records);

        assert_eq!(analytics.distribution["joy"], 0.75);
        assert_eq!(analytics.distribution["anger"], 0.25);
        assert_eq!(analytics.distribution["fear"], 0.125);
        assert_eq!(analytics.total_conversations, 2);
    }

    #[test]
    fn test_trend_groups_by_creation_date() {
        let records = vec![
            record(5, 18, &[("sadness", 0.5)]),
            record(3, 8, &[("joy", 0.5), ("neutral", 0.25)]),
            record(3, 20, &[("neutral", 0.5), ("joy", 0.25)]),
        ];
        let analytics = EmotionAnalytics::from_records(&records);

        assert_eq!(analytics.trend.len(), 2);
        assert_eq!(analytics.trend[0].date, NaiveDate::from_ymd_opt(2024, 3, 3).unwrap());
        assert_eq!(
            analytics.trend[0].emotions,
            vec![EmotionScore::new("joy", 0.75), EmotionScore::new("neutral", 0.75)]
        );
        assert_eq!(analytics.trend[1].date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());

        let json = serde_json::to_value(&analytics).unwrap();
        assert_eq!(json["trend"][0]["date"], "2024-03-03");
    }
}
