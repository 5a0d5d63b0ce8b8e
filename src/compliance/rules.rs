//! コンプライアンスルール定義

use serde::{Deserialize, Serialize};

use super::transcript::Message;

/// 挨拶として認めるキーワード（小文字で比較）
pub const GREETING_KEYWORDS: &[&str] = &["hi", "hello", "welcome"];

/// 顧客名リスト（大文字小文字を区別して比較）
pub const CUSTOMER_NAMES: &[&str] = &["Alex", "John", "Sarah", "Mike"];

/// 謝罪キーワード
pub const APOLOGY_KEYWORDS: &[&str] = &["sorry"];

/// 解決報告キーワード
pub const RESOLUTION_KEYWORDS: &[&str] = &["fixed", "resolved", "working", "solved"];

/// 根拠のない断言として禁止されるフレーズ
pub const UNSUPPORTED_CLAIM_PHRASES: &[&str] = &["guarantee", "always", "never fails", "forever"];

/// コンプライアンスルールの識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceRule {
    Greeting,
    Personalization,
    Apology,
    Resolution,
    NoUnsupportedClaims,
}

impl ComplianceRule {
    /// 評価順のすべてのルール
    pub const ALL: [ComplianceRule; 5] = [
        ComplianceRule::Greeting,
        ComplianceRule::Personalization,
        ComplianceRule::Apology,
        ComplianceRule::Resolution,
        ComplianceRule::NoUnsupportedClaims,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceRule::Greeting => "greeting",
            ComplianceRule::Personalization => "personalization",
            ComplianceRule::Apology => "apology",
            ComplianceRule::Resolution => "resolution",
            ComplianceRule::NoUnsupportedClaims => "no_unsupported_claims",
        }
    }

    /// ルールを会話に適用
    pub fn check(&self, messages: &[Message]) -> bool {
        match self {
            ComplianceRule::Greeting => messages.first().is_some_and(|first| {
                first.is_agent() && contains_any_ignore_case(&first.text, GREETING_KEYWORDS)
            }),
            ComplianceRule::Personalization => {
                any_agent_message(messages, |text| contains_any(text, CUSTOMER_NAMES))
            }
            ComplianceRule::Apology => any_agent_message(messages, |text| {
                contains_any_ignore_case(text, APOLOGY_KEYWORDS)
            }),
            ComplianceRule::Resolution => any_agent_message(messages, |text| {
                contains_any_ignore_case(text, RESOLUTION_KEYWORDS)
            }),
            ComplianceRule::NoUnsupportedClaims => !any_agent_message(messages, |text| {
                contains_any_ignore_case(text, UNSUPPORTED_CLAIM_PHRASES)
            }),
        }
    }
}

impl std::fmt::Display for ComplianceRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ルールごとの判定結果
///
/// JSONでは`{"greeting": true, ...}`のオブジェクトになる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceRules {
    pub greeting: bool,
    pub personalization: bool,
    pub apology: bool,
    pub resolution: bool,
    pub no_unsupported_claims: bool,
}

impl ComplianceRules {
    /// 会話にすべてのルールを適用
    pub fn check_all(messages: &[Message]) -> Self {
        Self {
            greeting: ComplianceRule::Greeting.check(messages),
            personalization: ComplianceRule::Personalization.check(messages),
            apology: ComplianceRule::Apology.check(messages),
            resolution: ComplianceRule::Resolution.check(messages),
            no_unsupported_claims: ComplianceRule::NoUnsupportedClaims.check(messages),
        }
    }

    pub fn get(&self, rule: ComplianceRule) -> bool {
        match rule {
            ComplianceRule::Greeting => self.greeting,
            ComplianceRule::Personalization => self.personalization,
            ComplianceRule::Apology => self.apology,
            ComplianceRule::Resolution => self.resolution,
            ComplianceRule::NoUnsupportedClaims => self.no_unsupported_claims,
        }
    }

    /// (ルール, 判定) をルール定義順に列挙
    pub fn iter(&self) -> impl Iterator<Item = (ComplianceRule, bool)> + '_ {
        ComplianceRule::ALL.iter().map(move |rule| (*rule, self.get(*rule)))
    }

    /// 満たしたルール数
    pub fn passed_count(&self) -> usize {
        self.iter().filter(|(_, passed)| *passed).count()
    }

    /// 違反したルールの一覧
    pub fn violations(&self) -> Vec<ComplianceRule> {
        self.iter()
            .filter(|(_, passed)| !*passed)
            .map(|(rule, _)| rule)
            .collect()
    }
}

fn any_agent_message<F>(messages: &[Message], predicate: F) -> bool
where
    F: Fn(&str) -> bool,
{
    messages
        .iter()
        .filter(|message| message.is_agent())
        .any(|message| predicate(&message.text))
}

/// キーワードは小文字で定義されている前提
fn contains_any_ignore_case(text: &str, keywords: &[&str]) -> bool {
    let lowered = text.to_lowercase();
    keywords.iter().any(|keyword| lowered.contains(keyword))
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| text.contains(keyword))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::Sender;

    fn agent(text: &str) -> Message {
        Message::new(Sender::Agent, text)
    }

    fn customer(text: &str) -> Message {
        Message::new(Sender::Customer, text)
    }

    #[test]
    fn test_greeting_only_checks_first_message() {
        assert!(ComplianceRule::Greeting.check(&[agent("Welcome to support")]));
        assert!(!ComplianceRule::Greeting.check(&[customer("hello?"), agent("Hello!")]));
        assert!(!ComplianceRule::Greeting.check(&[agent("What do you want?"), agent("hello")]));
    }

    #[test]
    fn test_greeting_is_substring_match() {
        // "this" contains "hi"
        assert!(ComplianceRule::Greeting.check(&[agent("Is this the right account?")]));
    }

    #[test]
    fn test_personalization_is_case_sensitive() {
        assert!(ComplianceRule::Personalization.check(&[agent("Thanks, Sarah.")]));
        assert!(!ComplianceRule::Personalization.check(&[agent("thanks, sarah.")]));
        assert!(!ComplianceRule::Personalization.check(&[customer("I'm John")]));
    }

    #[test]
    fn test_apology_and_resolution_ignore_case() {
        let messages = [agent("SORRY about that"), agent("It is RESOLVED now")];
        assert!(ComplianceRule::Apology.check(&messages));
        assert!(ComplianceRule::Resolution.check(&messages));
    }

    #[test]
    fn test_customer_messages_are_ignored() {
        let messages = [customer("sorry, is it fixed? I guarantee it's broken")];
        assert!(!ComplianceRule::Apology.check(&messages));
        assert!(!ComplianceRule::Resolution.check(&messages));
        assert!(ComplianceRule::NoUnsupportedClaims.check(&messages));
    }

    #[test]
    fn test_unsupported_claims() {
        assert!(!ComplianceRule::NoUnsupportedClaims.check(&[agent("This NEVER FAILS")]));
        assert!(!ComplianceRule::NoUnsupportedClaims.check(&[agent("We are always online")]));
        assert!(ComplianceRule::NoUnsupportedClaims.check(&[agent("It never has issues")]));
    }

    #[test]
    fn test_rules_iteration_order_and_violations() {
        let rules = ComplianceRules {
            greeting: true,
            personalization: false,
            apology: true,
            resolution: false,
            no_unsupported_claims: true,
        };

        let names: Vec<&str> = rules.iter().map(|(rule, _)| rule.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "greeting",
                "personalization",
                "apology",
                "resolution",
                "no_unsupported_claims"
            ]
        );
        assert_eq!(rules.passed_count(), 3);
        assert_eq!(
            rules.violations(),
            vec![ComplianceRule::Personalization, ComplianceRule::Resolution]
        );
    }

    #[test]
    fn test_rules_serialize_as_object() {
        let rules = ComplianceRules::check_all(&[]);
        let json = serde_json::to_value(rules).unwrap();
        assert_eq!(json["greeting"], false);
        assert_eq!(json["no_unsupported_claims"], true);
    }
}
