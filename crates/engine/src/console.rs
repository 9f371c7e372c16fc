//! Agent console controller
//!
//! The support operator's worklist across every known session, plus the
//! currently open conversation. Summaries are derived by scanning stored
//! transcripts; nothing agent-side is persisted beyond the transcripts
//! themselves.

use std::sync::Arc;

use florachat_shared::{
    mark_all_read, ChatError, ChatMessage, ChatResult, SessionSummary, TranscriptStore,
};

use crate::relay::{Relay, RelaySubscription};

/// Scan every stored transcript and derive the worklist, most recent first
pub async fn session_summaries(store: &dyn TranscriptStore) -> ChatResult<Vec<SessionSummary>> {
    let mut summaries = Vec::new();
    for session_id in store.list_session_ids().await? {
        let messages = store.load(&session_id).await?;
        summaries.push(SessionSummary::from_transcript(session_id, &messages));
    }
    summaries.sort_by(|a, b| b.last_message_timestamp.cmp(&a.last_message_timestamp));
    Ok(summaries)
}

/// The support operator's console
pub struct AgentConsole {
    store: Arc<dyn TranscriptStore>,
    relay: Arc<dyn Relay>,
    open_session: Option<String>,
    messages: Vec<ChatMessage>,
}

impl AgentConsole {
    pub fn new(store: Arc<dyn TranscriptStore>, relay: Arc<dyn Relay>) -> Self {
        Self {
            store,
            relay,
            open_session: None,
            messages: Vec::new(),
        }
    }

    pub fn open_session_id(&self) -> Option<&str> {
        self.open_session.as_deref()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// The agent worklist, sorted by last activity
    pub async fn list_sessions(&self) -> ChatResult<Vec<SessionSummary>> {
        session_summaries(self.store.as_ref()).await
    }

    /// Open one conversation: load it, mark everything read, join its room
    pub async fn open_session(&mut self, session_id: &str) -> ChatResult<RelaySubscription> {
        let mut messages = self.store.load(session_id).await?;
        for message in &mut messages {
            message.is_read = true;
        }
        mark_all_read(self.store.as_ref(), session_id).await?;

        let subscription = self.relay.subscribe(session_id).await?;
        self.open_session = Some(session_id.to_string());
        self.messages = messages;
        Ok(subscription)
    }

    /// Send an agent-role reply into the open conversation
    ///
    /// The local view updates optimistically; persistence or relay errors
    /// surface to the caller without rolling it back.
    pub async fn send_reply(&mut self, text: impl Into<String>) -> ChatResult<ChatMessage> {
        let session_id = self
            .open_session
            .clone()
            .ok_or_else(|| ChatError::SessionNotFound("no open session".into()))?;

        let message = ChatMessage::agent(text);
        self.messages.push(message.clone());

        self.store.append(&session_id, &message).await?;
        self.relay.publish(&session_id, &message).await?;
        Ok(message)
    }

    /// Handle a relay-delivered message for the open conversation; duplicates
    /// by id are dropped
    pub fn handle_incoming(&mut self, message: ChatMessage) -> bool {
        if self.messages.iter().any(|m| m.id == message.id) {
            return false;
        }
        self.messages.push(message);
        true
    }

    /// Remove a session's transcript outright
    ///
    /// Clears the console view when it targets the open conversation.
    /// Returns whether anything was stored; confirmation is the caller's
    /// concern.
    pub async fn delete_session(&mut self, session_id: &str) -> ChatResult<bool> {
        let removed = self.store.delete(session_id).await?;
        if self.open_session.as_deref() == Some(session_id) {
            self.open_session = None;
            self.messages.clear();
        }
        Ok(removed)
    }
}
