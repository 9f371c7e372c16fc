//! Relay connection registry
//!
//! Holds every open connection plus the room table, shared across handler
//! tasks through the app state.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use super::connection::Connection;
use super::room::RoomManager;

/// Connection registry and room table for the hosted relay
#[derive(Clone)]
pub struct WebSocketState {
    connections: Arc<RwLock<HashMap<Uuid, Arc<Connection>>>>,
    pub rooms: Arc<RoomManager>,
}

impl WebSocketState {
    pub fn new() -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
            rooms: Arc::new(RoomManager::new()),
        }
    }

    /// Register a freshly upgraded connection
    pub async fn add_connection(&self, conn: Connection) -> Arc<Connection> {
        let conn = Arc::new(conn);
        let mut connections = self.connections.write().await;
        connections.insert(conn.id, Arc::clone(&conn));

        tracing::info!(
            connection_id = %conn.id,
            total_connections = connections.len(),
            "Relay connection opened"
        );
        conn
    }

    /// Drop a connection and leave every room it had joined
    pub async fn remove_connection(&self, connection_id: &Uuid) {
        let conn = {
            let mut connections = self.connections.write().await;
            connections.remove(connection_id)
        };
        let Some(conn) = conn else {
            return;
        };

        for session_id in conn.joined_sessions().await {
            self.rooms.leave(&session_id, connection_id).await;
        }

        let remaining_connections = self.connection_count().await;
        tracing::info!(
            connection_id = %connection_id,
            remaining_connections = remaining_connections,
            "Relay connection closed"
        );
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Snapshot for the health endpoint
    pub async fn get_stats(&self) -> RelayStats {
        RelayStats {
            active_connections: self.connection_count().await,
            active_rooms: self.rooms.room_count().await,
        }
    }
}

impl Default for WebSocketState {
    fn default() -> Self {
        Self::new()
    }
}

/// Live connection and room counts
#[derive(Debug, Clone, serde::Serialize)]
pub struct RelayStats {
    pub active_connections: usize,
    pub active_rooms: usize,
}
