//! Relay connections
//!
//! One `Connection` per open WebSocket. The joined-session set is the
//! authoritative record of which rooms the connection belongs to; disconnect
//! cleanup walks it instead of scanning every room.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use super::events::ServerEvent;

/// An open relay connection and the session rooms it has joined
#[derive(Debug)]
pub struct Connection {
    pub id: Uuid,

    /// Outbound event channel; the socket task drains the other end
    pub sender: mpsc::UnboundedSender<ServerEvent>,

    joined: Arc<RwLock<HashSet<String>>>,
}

impl Connection {
    pub fn new(sender: mpsc::UnboundedSender<ServerEvent>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            joined: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    /// Queue an event for this connection; errors mean the socket task is gone
    #[allow(clippy::result_large_err)] // SendError carries the undelivered event
    pub fn send(&self, event: ServerEvent) -> Result<(), mpsc::error::SendError<ServerEvent>> {
        self.sender.send(event)
    }

    /// Record that this connection joined a session room
    pub async fn subscribe(&self, session_id: &str) {
        let mut joined = self.joined.write().await;
        if joined.insert(session_id.to_string()) {
            tracing::debug!(
                connection_id = %self.id,
                session_id = %session_id,
                "Connection subscribed to session"
            );
        }
    }

    /// Record that this connection left a session room
    pub async fn unsubscribe(&self, session_id: &str) {
        let mut joined = self.joined.write().await;
        if joined.remove(session_id) {
            tracing::debug!(
                connection_id = %self.id,
                session_id = %session_id,
                "Connection unsubscribed from session"
            );
        }
    }

    pub async fn is_subscribed(&self, session_id: &str) -> bool {
        self.joined.read().await.contains(session_id)
    }

    /// Snapshot of every session room this connection is in
    pub async fn joined_sessions(&self) -> Vec<String> {
        self.joined.read().await.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscription_lifecycle() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let conn = Connection::new(tx);

        assert!(!conn.is_subscribed("s1").await);
        conn.subscribe("s1").await;
        assert!(conn.is_subscribed("s1").await);
        conn.unsubscribe("s1").await;
        assert!(!conn.is_subscribed("s1").await);
    }

    #[tokio::test]
    async fn test_joined_sessions_snapshot() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let conn = Connection::new(tx);

        conn.subscribe("s1").await;
        conn.subscribe("s2").await;
        conn.subscribe("s2").await; // Rejoining is idempotent

        let mut joined = conn.joined_sessions().await;
        joined.sort();
        assert_eq!(joined, vec!["s1", "s2"]);
    }
}
