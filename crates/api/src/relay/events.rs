//! Relay event types and serialization
//!
//! Event names are kebab-case on the wire (`join-session`, `new-message`),
//! with camelCase payload fields to match the message contract.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use florachat_shared::ChatMessage;

// =============================================================================
// Client-to-Server Events
// =============================================================================

/// Events sent from client to relay
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// Join the room for a session
    JoinSession { session_id: String },

    /// Leave the room for a session
    LeaveSession { session_id: String },

    /// Broadcast a message to everyone in the session's room
    SendMessage {
        session_id: String,
        message: ChatMessage,
    },

    /// Heartbeat ping to keep the connection alive
    Ping,
}

// =============================================================================
// Server-to-Client Events
// =============================================================================

/// Events sent from relay to client
#[derive(Debug, Serialize, Clone)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// New message broadcast to a session room
    NewMessage {
        session_id: String,
        message: ChatMessage,
    },

    /// Connection acknowledged
    Connected { connection_id: Uuid },

    /// Heartbeat response
    Pong,

    /// Error message
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_event_deserialization() {
        let json = r#"{"type":"join-session","sessionId":"session-guest-1-abc"}"#;
        let event: ClientEvent = serde_json::from_str(json).unwrap();
        match event {
            ClientEvent::JoinSession { session_id } => {
                assert_eq!(session_id, "session-guest-1-abc");
            }
            _ => panic!("Expected JoinSession event"),
        }
    }

    #[test]
    fn test_send_message_carries_wire_shape() {
        let json = r#"{
            "type": "send-message",
            "sessionId": "session-guest-1-abc",
            "message": {
                "id": "550e8400-e29b-41d4-a716-446655440000",
                "sender": "customer",
                "message": "Phí ship như thế nào?",
                "timestamp": "2025-01-15T08:30:00Z",
                "isRead": false
            }
        }"#;
        let event: ClientEvent = serde_json::from_str(json).unwrap();
        match event {
            ClientEvent::SendMessage { message, .. } => {
                assert_eq!(message.message, "Phí ship như thế nào?");
            }
            _ => panic!("Expected SendMessage event"),
        }
    }

    #[test]
    fn test_server_event_serialization() {
        let event = ServerEvent::Pong;
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"pong"}"#);
    }

    #[test]
    fn test_new_message_event_tag() {
        let event = ServerEvent::NewMessage {
            session_id: "s1".to_string(),
            message: ChatMessage::agent("chào bạn"),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"new-message""#));
        assert!(json.contains(r#""sessionId":"s1""#));
    }
}
