//! Real-time relay integration
//!
//! The relay is a publish/subscribe channel grouping parties by room, where
//! room identity equals session identifier. `LocalRelay` is the in-process
//! implementation used by tests and co-hosted deployments; the hosted
//! WebSocket relay lives in the api crate.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock};

use florachat_shared::{ChatMessage, ChatResult};

/// Receiving half of a room subscription
pub struct RelaySubscription {
    receiver: mpsc::UnboundedReceiver<ChatMessage>,
}

impl RelaySubscription {
    pub fn new(receiver: mpsc::UnboundedReceiver<ChatMessage>) -> Self {
        Self { receiver }
    }

    /// Wait for the next message broadcast to the room
    pub async fn recv(&mut self) -> Option<ChatMessage> {
        self.receiver.recv().await
    }

    /// Non-blocking poll, for draining between UI ticks
    pub fn try_recv(&mut self) -> Option<ChatMessage> {
        self.receiver.try_recv().ok()
    }
}

/// Publish/subscribe transport keyed by session id
#[async_trait]
pub trait Relay: Send + Sync {
    /// Join the room for one session
    async fn subscribe(&self, session_id: &str) -> ChatResult<RelaySubscription>;

    /// Broadcast a message to every subscriber of the session's room
    ///
    /// Delivery is independent of persistence; receivers deduplicate by
    /// message id.
    async fn publish(&self, session_id: &str, message: &ChatMessage) -> ChatResult<()>;
}

/// In-process relay: a room table of subscriber channels
#[derive(Default)]
pub struct LocalRelay {
    rooms: Arc<RwLock<HashMap<String, Vec<mpsc::UnboundedSender<ChatMessage>>>>>,
}

impl LocalRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscribers in a session's room
    pub async fn room_size(&self, session_id: &str) -> usize {
        let rooms = self.rooms.read().await;
        rooms.get(session_id).map(|v| v.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Relay for LocalRelay {
    async fn subscribe(&self, session_id: &str) -> ChatResult<RelaySubscription> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut rooms = self.rooms.write().await;
        let subscribers = rooms.entry(session_id.to_string()).or_default();
        subscribers.push(tx);

        tracing::debug!(
            session_id = %session_id,
            room_size = subscribers.len(),
            "Subscriber joined session room"
        );
        Ok(RelaySubscription::new(rx))
    }

    async fn publish(&self, session_id: &str, message: &ChatMessage) -> ChatResult<()> {
        let mut rooms = self.rooms.write().await;
        let Some(subscribers) = rooms.get_mut(session_id) else {
            tracing::debug!(session_id = %session_id, "No subscribers for session room");
            return Ok(());
        };

        // Dropped receivers are pruned as they are discovered
        let before = subscribers.len();
        subscribers.retain(|tx| tx.send(message.clone()).is_ok());
        let failed = before - subscribers.len();

        tracing::debug!(
            session_id = %session_id,
            message_id = %message.id,
            recipients = subscribers.len(),
            failed = failed,
            "Broadcast message to session room"
        );

        if subscribers.is_empty() {
            rooms.remove(session_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_reaches_all_subscribers() {
        let relay = LocalRelay::new();
        let mut sub1 = relay.subscribe("s1").await.unwrap();
        let mut sub2 = relay.subscribe("s1").await.unwrap();

        let message = ChatMessage::customer("xin chào");
        relay.publish("s1", &message).await.unwrap();

        assert_eq!(sub1.recv().await.unwrap().id, message.id);
        assert_eq!(sub2.recv().await.unwrap().id, message.id);
    }

    #[tokio::test]
    async fn test_rooms_are_isolated() {
        let relay = LocalRelay::new();
        let mut sub1 = relay.subscribe("s1").await.unwrap();
        let _sub2 = relay.subscribe("s2").await.unwrap();

        relay.publish("s2", &ChatMessage::agent("chào bạn")).await.unwrap();
        assert!(sub1.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_dropped_subscribers_are_pruned() {
        let relay = LocalRelay::new();
        let sub = relay.subscribe("s1").await.unwrap();
        drop(sub);

        relay.publish("s1", &ChatMessage::agent("hi")).await.unwrap();
        assert_eq!(relay.room_size("s1").await, 0);
    }

    #[tokio::test]
    async fn test_publish_without_room_is_harmless() {
        let relay = LocalRelay::new();
        relay.publish("ghost", &ChatMessage::agent("hi")).await.unwrap();
    }
}
