//! Message model and derived session views
//!
//! `ChatMessage` is the wire shape shared by the relay and the transcript
//! store, so its JSON field names are load-bearing and pinned with serde
//! renames.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Customer,
    Agent,
}

/// A single chat message
///
/// Messages are append-only; `is_read` is the only field ever mutated after
/// creation, and only via a full-transcript rewrite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub sender: Sender,
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(default)]
    pub is_read: bool,
    /// Marks agent-role messages synthesized by the auto-reply engine.
    /// Omitted on the wire when false.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_auto_reply: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl ChatMessage {
    fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            message: text.into(),
            timestamp: OffsetDateTime::now_utc(),
            is_read: false,
            is_auto_reply: false,
        }
    }

    /// Build a customer-authored message
    pub fn customer(text: impl Into<String>) -> Self {
        Self::new(Sender::Customer, text)
    }

    /// Build an agent-authored message
    pub fn agent(text: impl Into<String>) -> Self {
        Self::new(Sender::Agent, text)
    }

    /// Build a synthesized agent message (auto-reply engine output)
    pub fn auto_reply(text: impl Into<String>) -> Self {
        let mut message = Self::new(Sender::Agent, text);
        message.is_auto_reply = true;
        message
    }
}

/// Agent-facing derived view of one session's transcript
///
/// Recomputed on demand by scanning transcripts; never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub last_message_text: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_message_timestamp: Option<OffsetDateTime>,
    pub unread_count: usize,
}

impl SessionSummary {
    /// Derive a summary from a transcript
    ///
    /// The unread count is the agent worklist view: customer-authored
    /// messages not yet marked read.
    pub fn from_transcript(session_id: impl Into<String>, messages: &[ChatMessage]) -> Self {
        let last = messages.last();
        Self {
            session_id: session_id.into(),
            last_message_text: last.map(|m| m.message.clone()).unwrap_or_default(),
            last_message_timestamp: last.map(|m| m.timestamp),
            unread_count: messages
                .iter()
                .filter(|m| m.sender == Sender::Customer && !m.is_read)
                .count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_wire_shape() {
        let mut message = ChatMessage::customer("Hoa còn tươi không?");
        message.is_read = false;

        let json: serde_json::Value = serde_json::to_value(&message).unwrap();
        assert!(json.get("id").is_some());
        assert_eq!(json["sender"], "customer");
        assert_eq!(json["message"], "Hoa còn tươi không?");
        assert!(json["timestamp"].as_str().unwrap().contains('T'));
        assert_eq!(json["isRead"], false);
        // isAutoReply is optional on the wire and omitted when false
        assert!(json.get("isAutoReply").is_none());
    }

    #[test]
    fn test_auto_reply_flag_serialized() {
        let message = ChatMessage::auto_reply("Shop sẽ phản hồi ngay ạ.");
        let json: serde_json::Value = serde_json::to_value(&message).unwrap();
        assert_eq!(json["sender"], "agent");
        assert_eq!(json["isAutoReply"], true);
    }

    #[test]
    fn test_message_roundtrip_defaults() {
        // A payload without the optional fields still deserializes
        let json = r#"{
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "sender": "agent",
            "message": "hi",
            "timestamp": "2025-01-15T08:30:00Z"
        }"#;
        let message: ChatMessage = serde_json::from_str(json).unwrap();
        assert!(!message.is_read);
        assert!(!message.is_auto_reply);
    }

    #[test]
    fn test_summary_from_transcript() {
        let mut first = ChatMessage::customer("Chào shop");
        first.is_read = true;
        let second = ChatMessage::agent("Chào bạn!");
        let third = ChatMessage::customer("Đặt hoa thế nào?");

        let summary = SessionSummary::from_transcript("session-1", &[first, second, third.clone()]);
        assert_eq!(summary.session_id, "session-1");
        assert_eq!(summary.last_message_text, "Đặt hoa thế nào?");
        assert_eq!(summary.last_message_timestamp, Some(third.timestamp));
        // Only the unread customer message counts toward the worklist
        assert_eq!(summary.unread_count, 1);
    }

    #[test]
    fn test_summary_of_empty_transcript() {
        let summary = SessionSummary::from_transcript("session-2", &[]);
        assert_eq!(summary.last_message_text, "");
        assert!(summary.last_message_timestamp.is_none());
        assert_eq!(summary.unread_count, 0);
    }
}
