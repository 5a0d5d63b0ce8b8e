//! コンプライアンス評価とスコア計算

use serde::{Deserialize, Serialize};

use super::rules::{ComplianceRule, ComplianceRules};
use super::transcript::{validate_transcript, Message, MessageRecord, ValidationError};

/// 評価結果（ルール判定とスコア）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceSummary {
    pub rules: ComplianceRules,
    /// 0〜100の整数スコア
    pub score: u8,
}

impl ComplianceSummary {
    /// ルール判定からスコアを導出して作成
    pub fn from_rules(rules: ComplianceRules) -> Self {
        let score = percentage_score(rules.passed_count(), ComplianceRule::ALL.len());
        Self { rules, score }
    }
}

/// 会話をコンプライアンスルールで評価
///
/// 入力を読むだけの純粋関数。空の会話では`no_unsupported_claims`のみ真になり、
/// スコアは0になる。
pub fn evaluate(messages: &[Message]) -> ComplianceSummary {
    ComplianceSummary::from_rules(ComplianceRules::check_all(messages))
}

/// 未検証レコードを検証してから評価
///
/// 送信者または本文が欠けたレコードがあれば評価せずにエラーを返す。
pub fn evaluate_records(records: &[MessageRecord]) -> Result<ComplianceSummary, ValidationError> {
    let messages = validate_transcript(records)?;
    Ok(evaluate(&messages))
}

/// `passed / total`を百分率の整数に丸める
///
/// 正確な有理数値に対して四捨五入（0.5は切り上げ）を行う。浮動小数点は使わない。
/// `total`が0の場合は0を返す。
pub fn percentage_score(passed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let passed = passed.min(total);
    ((200 * passed + total) / (2 * total)) as u8
}
