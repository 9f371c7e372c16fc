//! Transcript store implementations
//!
//! A transcript is the ordered message history for one session, addressed by
//! the `chat-` key convention. Appends are atomic single-message pushes;
//! the full-transcript rewrite exists only for the read-marking pass.

use std::collections::HashMap;

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, AsyncIter, Client};
use tokio::sync::RwLock;

use crate::error::{ChatError, ChatResult};
use crate::types::ChatMessage;

/// Prefix shared by every transcript key in the store
pub const SESSION_KEY_PREFIX: &str = "chat-";

/// Derive the store key for a session
pub fn session_key(session_id: &str) -> String {
    format!("{SESSION_KEY_PREFIX}{session_id}")
}

/// Recover the session id from a store key, if it follows the convention
pub fn session_id_from_key(key: &str) -> Option<&str> {
    key.strip_prefix(SESSION_KEY_PREFIX)
}

/// Persistence surface for session transcripts
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Load the full transcript. An absent session yields an empty list.
    async fn load(&self, session_id: &str) -> ChatResult<Vec<ChatMessage>>;

    /// Append one message to the end of the transcript.
    async fn append(&self, session_id: &str, message: &ChatMessage) -> ChatResult<()>;

    /// Replace the whole transcript. An empty slice removes the stored value.
    async fn rewrite(&self, session_id: &str, messages: &[ChatMessage]) -> ChatResult<()>;

    /// Remove the transcript entirely. Returns whether anything was stored.
    async fn delete(&self, session_id: &str) -> ChatResult<bool>;

    /// Enumerate every session id with a stored transcript.
    async fn list_session_ids(&self) -> ChatResult<Vec<String>>;

    /// Cheap connectivity check for health probes.
    async fn ping(&self) -> ChatResult<()>;
}

/// Rewrite every message in a transcript as read
///
/// Used when a party opens or focuses a conversation. A missing transcript is
/// left untouched.
pub async fn mark_all_read(store: &dyn TranscriptStore, session_id: &str) -> ChatResult<()> {
    let mut messages = store.load(session_id).await?;
    if messages.is_empty() {
        return Ok(());
    }
    for message in &mut messages {
        message.is_read = true;
    }
    store.rewrite(session_id, &messages).await
}

// =============================================================================
// In-memory store
// =============================================================================

/// In-memory transcript store used by tests and in-process deployments
#[derive(Default)]
pub struct MemoryStore {
    transcripts: RwLock<HashMap<String, Vec<ChatMessage>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TranscriptStore for MemoryStore {
    async fn load(&self, session_id: &str) -> ChatResult<Vec<ChatMessage>> {
        let transcripts = self.transcripts.read().await;
        Ok(transcripts.get(session_id).cloned().unwrap_or_default())
    }

    async fn append(&self, session_id: &str, message: &ChatMessage) -> ChatResult<()> {
        let mut transcripts = self.transcripts.write().await;
        transcripts
            .entry(session_id.to_string())
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn rewrite(&self, session_id: &str, messages: &[ChatMessage]) -> ChatResult<()> {
        let mut transcripts = self.transcripts.write().await;
        if messages.is_empty() {
            transcripts.remove(session_id);
        } else {
            transcripts.insert(session_id.to_string(), messages.to_vec());
        }
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> ChatResult<bool> {
        let mut transcripts = self.transcripts.write().await;
        Ok(transcripts.remove(session_id).is_some())
    }

    async fn list_session_ids(&self) -> ChatResult<Vec<String>> {
        let transcripts = self.transcripts.read().await;
        let mut ids: Vec<String> = transcripts.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    async fn ping(&self) -> ChatResult<()> {
        Ok(())
    }
}

// =============================================================================
// Redis store
// =============================================================================

/// Redis-backed transcript store
///
/// Each transcript is a redis list under its `chat-` key, one JSON-encoded
/// message per entry. Appends go through RPUSH, so concurrent senders cannot
/// lose each other's messages.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to redis and hand back a store backed by a managed connection
    pub async fn connect(redis_url: &str) -> ChatResult<Self> {
        let client = Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        tracing::info!("Connected to redis transcript store");
        Ok(Self { conn })
    }
}

#[async_trait]
impl TranscriptStore for RedisStore {
    async fn load(&self, session_id: &str) -> ChatResult<Vec<ChatMessage>> {
        let mut conn = self.conn.clone();
        let raw: Vec<String> = conn.lrange(session_key(session_id), 0, -1).await?;
        raw.iter()
            .map(|entry| serde_json::from_str(entry).map_err(ChatError::from))
            .collect()
    }

    async fn append(&self, session_id: &str, message: &ChatMessage) -> ChatResult<()> {
        let mut conn = self.conn.clone();
        let payload = serde_json::to_string(message)?;
        let _: i64 = conn.rpush(session_key(session_id), payload).await?;
        Ok(())
    }

    async fn rewrite(&self, session_id: &str, messages: &[ChatMessage]) -> ChatResult<()> {
        let key = session_key(session_id);
        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.del(&key).ignore();
        for message in messages {
            pipe.rpush(&key, serde_json::to_string(message)?).ignore();
        }

        let mut conn = self.conn.clone();
        pipe.query_async::<()>(&mut conn).await?;
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> ChatResult<bool> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.del(session_key(session_id)).await?;
        Ok(removed > 0)
    }

    async fn list_session_ids(&self) -> ChatResult<Vec<String>> {
        let mut conn = self.conn.clone();
        let pattern = format!("{SESSION_KEY_PREFIX}*");

        let mut ids = Vec::new();
        {
            let mut keys: AsyncIter<'_, String> = conn.scan_match(pattern).await?;
            while let Some(key) = keys.next_item().await {
                if let Some(id) = session_id_from_key(&key) {
                    ids.push(id.to_string());
                }
            }
        }

        // SCAN may return a key more than once
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    async fn ping(&self) -> ChatResult<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
