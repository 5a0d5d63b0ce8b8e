use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::compliance::{ComplianceRule, ComplianceSummary};

/// この値以上のスコアを準拠とみなす
pub const COMPLIANCE_THRESHOLD: u8 = 80;

/// コンプライアンス集計結果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComplianceAnalytics {
    /// 準拠した会話の割合（%、小数点以下2桁）
    pub compliance_rate: f64,
    /// 平均スコア（小数点以下2桁）
    pub average_score: f64,
    /// 集計対象の会話数
    pub total_conversations: usize,
    /// 準拠した会話数
    pub compliant_conversations: usize,
    /// ルールごとの違反件数（違反なしのルールも0で含む）
    pub rule_violations: BTreeMap<ComplianceRule, usize>,
    /// 各会話のスコア
    pub scores: Vec<u8>,
}

impl ComplianceAnalytics {
    /// 評価結果を集計
    ///
    /// 結果が1件もない場合は`None`を返す。
    pub fn from_results(results: &[ComplianceSummary], threshold: u8) -> Option<Self> {
        if results.is_empty() {
            return None;
        }

        let total = results.len();
        let scores: Vec<u8> = results.iter().map(|result| result.score).collect();
        let compliant = scores.iter().filter(|score| **score >= threshold).count();
        let score_sum: u64 = scores.iter().map(|score| u64::from(*score)).sum();

        let mut rule_violations: BTreeMap<ComplianceRule, usize> =
            ComplianceRule::ALL.iter().map(|rule| (*rule, 0)).collect();
        for result in results {
            for rule in result.rules.violations() {
                *rule_violations.entry(rule).or_insert(0) += 1;
            }
        }

        Some(Self {
            compliance_rate: round2(compliant as f64 / total as f64 * 100.0),
            average_score: round2(score_sum as f64 / total as f64),
            total_conversations: total,
            compliant_conversations: compliant,
            rule_violations,
            scores,
        })
    }
}

/// 小数点以下2桁に丸める
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
