//! Transcript data types and input validation.
//!
//! Raw message records arrive from HTTP payloads, transcript files and the
//! database with loosely typed fields. They are converted into [`Message`]
//! values before any rule is evaluated; a record missing its sender or text
//! is rejected with a [`ValidationError`] instead of being skipped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while validating transcript input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing on a message record
    #[error("Missing required field '{field}' in message #{index}")]
    MissingField { index: usize, field: &'static str },

    /// The sender is neither `agent` nor `customer`
    #[error("Unknown sender '{sender}' in message #{index} (expected 'agent' or 'customer')")]
    UnknownSender { index: usize, sender: String },

    /// Text payload for the classifier is missing or blank
    #[error("No text provided")]
    EmptyText,
}

impl ValidationError {
    /// Create a missing field error
    pub fn missing_field(index: usize, field: &'static str) -> Self {
        Self::MissingField { index, field }
    }

    /// Create an unknown sender error
    pub fn unknown_sender(index: usize, sender: impl Into<String>) -> Self {
        Self::UnknownSender {
            index,
            sender: sender.into(),
        }
    }
}

/// メッセージ送信者
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Agent,
    Customer,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::Agent => "agent",
            Sender::Customer => "customer",
        }
    }

    /// 文字列から送信者をパース（大文字小文字は区別しない）
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("agent") {
            Some(Sender::Agent)
        } else if raw.eq_ignore_ascii_case("customer") {
            Some(Sender::Customer)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 検証済みのメッセージ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub sender: Sender,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Message {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            sender,
            text: text.into(),
            timestamp: None,
        }
    }

    /// エージェントの発言かどうか
    pub fn is_agent(&self) -> bool {
        self.sender == Sender::Agent
    }
}

/// 未検証のメッセージレコード（JSONペイロードやファイル入力の形）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl MessageRecord {
    pub fn new(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            sender: Some(sender.into()),
            text: Some(text.into()),
            timestamp: None,
        }
    }

    /// レコードを検証して[`Message`]に変換
    ///
    /// `index`はエラーメッセージで位置を示すために使う。
    pub fn validate(&self, index: usize) -> Result<Message, ValidationError> {
        let raw_sender = self
            .sender
            .as_deref()
            .ok_or_else(|| ValidationError::missing_field(index, "sender"))?;
        let sender = Sender::parse(raw_sender)
            .ok_or_else(|| ValidationError::unknown_sender(index, raw_sender))?;
        let text = self
            .text
            .clone()
            .ok_or_else(|| ValidationError::missing_field(index, "text"))?;

        Ok(Message {
            sender,
            text,
            timestamp: self.timestamp,
        })
    }
}

/// レコード列をまとめて検証（最初の不正レコードで失敗する）
pub fn validate_transcript(records: &[MessageRecord]) -> Result<Vec<Message>, ValidationError> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| record.validate(index))
        .collect()
}
