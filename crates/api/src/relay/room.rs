//! Session rooms
//!
//! A room is the set of connections following one conversation; room identity
//! equals session identifier. Broadcasting to a room with no members is a
//! no-op, matching the relay's fire-and-forget contract.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use super::connection::Connection;
use super::events::ServerEvent;

/// Tracks which connections belong to which session room
pub struct RoomManager {
    rooms: Arc<RwLock<HashMap<String, Vec<Arc<Connection>>>>>,
}

impl RoomManager {
    pub fn new() -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Put a connection into a session's room
    pub async fn join(&self, session_id: &str, conn: Arc<Connection>) {
        let mut rooms = self.rooms.write().await;
        let members = rooms.entry(session_id.to_string()).or_default();
        members.push(Arc::clone(&conn));

        tracing::debug!(
            session_id = %session_id,
            connection_id = %conn.id,
            room_size = members.len(),
            "Joined session room"
        );
    }

    /// Take a connection out of a session's room; the last member leaving
    /// drops the room
    pub async fn leave(&self, session_id: &str, connection_id: &Uuid) {
        let mut rooms = self.rooms.write().await;
        let Some(members) = rooms.get_mut(session_id) else {
            return;
        };
        members.retain(|c| c.id != *connection_id);

        if members.is_empty() {
            rooms.remove(session_id);
            tracing::debug!(session_id = %session_id, "Session room emptied");
        } else {
            tracing::debug!(
                session_id = %session_id,
                connection_id = %connection_id,
                room_size = members.len(),
                "Left session room"
            );
        }
    }

    /// Fan an event out to every member of a session's room
    ///
    /// Members whose channel has closed are skipped; disconnect cleanup reaps
    /// them.
    pub async fn broadcast(&self, session_id: &str, event: ServerEvent) {
        let rooms = self.rooms.read().await;
        let Some(members) = rooms.get(session_id) else {
            tracing::debug!(session_id = %session_id, "Broadcast to session without a room");
            return;
        };

        let mut delivered = 0;
        let mut closed = 0;
        for member in members {
            if member.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                closed += 1;
            }
        }

        tracing::debug!(
            session_id = %session_id,
            delivered = delivered,
            closed = closed,
            "Broadcast to session room"
        );
    }

    /// Current member count of a session's room
    pub async fn room_size(&self, session_id: &str) -> usize {
        let rooms = self.rooms.read().await;
        rooms.get(session_id).map(|v| v.len()).unwrap_or(0)
    }

    /// Number of rooms with at least one member
    pub async fn room_count(&self) -> usize {
        let rooms = self.rooms.read().await;
        rooms.len()
    }
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn member() -> (Arc<Connection>, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Connection::new(tx)), rx)
    }

    #[tokio::test]
    async fn test_join_then_leave_drops_empty_room() {
        let rooms = RoomManager::new();
        let (conn, _rx) = member();

        rooms.join("s1", Arc::clone(&conn)).await;
        assert_eq!(rooms.room_size("s1").await, 1);
        assert_eq!(rooms.room_count().await, 1);

        rooms.leave("s1", &conn.id).await;
        assert_eq!(rooms.room_size("s1").await, 0);
        assert_eq!(rooms.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_member() {
        let rooms = RoomManager::new();
        let (conn1, mut rx1) = member();
        let (conn2, mut rx2) = member();
        rooms.join("s1", conn1).await;
        rooms.join("s1", conn2).await;

        rooms.broadcast("s1", ServerEvent::Pong).await;

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_broadcast_skips_other_rooms() {
        let rooms = RoomManager::new();
        let (conn1, mut rx1) = member();
        let (conn2, mut rx2) = member();
        rooms.join("s1", conn1).await;
        rooms.join("s2", conn2).await;

        rooms.broadcast("s1", ServerEvent::Pong).await;

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_without_room_is_a_noop() {
        let rooms = RoomManager::new();
        rooms.broadcast("ghost", ServerEvent::Pong).await;
    }
}
