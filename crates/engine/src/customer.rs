//! Customer endpoint controller
//!
//! Owns the widget-side conversation state: the optimistic local message
//! list, read tracking, per-message delivery status, and the auto-reply
//! engine. Persistence and relay failures never roll back what the customer
//! already sees.

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use florachat_shared::{mark_all_read, ChatMessage, ChatResult, Sender, TranscriptStore};

use crate::autoreply::{AutoReplyConfig, AutoReplyEngine, EngineState, WELCOME_TEXT};
use crate::identity::{resolve_session_id, CustomerIdentity, SessionCache};
use crate::relay::{Relay, RelaySubscription};

/// Local delivery state of an own send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    Pending,
    Confirmed,
    Failed,
}

/// One browser tab's side of a conversation
pub struct CustomerChat {
    session_id: String,
    store: Arc<dyn TranscriptStore>,
    relay: Arc<dyn Relay>,
    engine: AutoReplyEngine,
    messages: Vec<ChatMessage>,
    delivery: HashMap<Uuid, DeliveryStatus>,
    panel_open: bool,
    unread_badge: usize,
    welcome_pending: bool,
}

impl CustomerChat {
    /// Resolve the session, load (or synthesize) the transcript, and join the
    /// relay room. Returns the controller and its room subscription.
    pub async fn connect(
        store: Arc<dyn TranscriptStore>,
        relay: Arc<dyn Relay>,
        cache: &dyn SessionCache,
        identity: &CustomerIdentity,
        config: AutoReplyConfig,
    ) -> ChatResult<(Self, RelaySubscription)> {
        let session_id = resolve_session_id(cache, identity);

        let stored = match store.load(&session_id).await {
            Ok(messages) => messages,
            Err(e) => {
                tracing::warn!(error = %e, session_id = %session_id, "Failed to load transcript");
                Vec::new()
            }
        };

        // An absent transcript is a valid empty state: greet instead of erroring
        let welcome_pending = stored.is_empty();
        let messages = if stored.is_empty() {
            vec![ChatMessage::agent(WELCOME_TEXT)]
        } else {
            stored
        };

        let unread_badge = messages
            .iter()
            .filter(|m| m.sender == Sender::Agent && !m.is_read)
            .count();

        let subscription = relay.subscribe(&session_id).await?;
        let engine = AutoReplyEngine::new(
            session_id.clone(),
            Arc::clone(&store),
            Arc::clone(&relay),
            config,
        );

        Ok((
            Self {
                session_id,
                store,
                relay,
                engine,
                messages,
                delivery: HashMap::new(),
                panel_open: false,
                unread_badge,
                welcome_pending,
            },
            subscription,
        ))
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Unread agent messages, shown as the closed-panel badge
    pub fn unread_count(&self) -> usize {
        self.unread_badge
    }

    pub fn is_open(&self) -> bool {
        self.panel_open
    }

    pub fn delivery_status(&self, id: Uuid) -> Option<DeliveryStatus> {
        self.delivery.get(&id).copied()
    }

    pub fn auto_reply_state(&self) -> EngineState {
        self.engine.state()
    }

    /// Open the panel: clear the badge, mark the transcript read, and resume
    /// the delayed countdown if the customer is still the last speaker
    pub async fn open(&mut self) {
        self.panel_open = true;
        self.unread_badge = 0;

        for message in &mut self.messages {
            message.is_read = true;
        }
        if let Err(e) = mark_all_read(self.store.as_ref(), &self.session_id).await {
            tracing::warn!(error = %e, session_id = %self.session_id, "Failed to persist read state");
        }

        let tail_is_customer = self
            .messages
            .last()
            .map(|m| m.sender == Sender::Customer)
            .unwrap_or(false);
        if tail_is_customer {
            self.engine.schedule_delayed_reply();
        }
    }

    pub fn close(&mut self) {
        self.panel_open = false;
    }

    /// Send a customer message
    ///
    /// The local view updates first; persistence and broadcast follow, and
    /// their outcome lands in the per-message delivery status. Returns the
    /// message id for tracking.
    pub async fn send(&mut self, text: impl Into<String>) -> Uuid {
        let message = ChatMessage::customer(text);
        let id = message.id;

        self.messages.push(message.clone());
        self.delivery.insert(id, DeliveryStatus::Pending);

        let status = self.deliver(&message).await;
        self.delivery.insert(id, status);

        self.engine.handle_customer_send(&message.message);
        id
    }

    /// Retry a failed send; returns the refreshed status, None for unknown ids
    pub async fn retry(&mut self, id: Uuid) -> Option<DeliveryStatus> {
        match self.delivery.get(&id) {
            Some(DeliveryStatus::Failed) => {}
            other => return other.copied(),
        }

        let message = self.messages.iter().find(|m| m.id == id)?.clone();
        let status = self.deliver(&message).await;
        self.delivery.insert(id, status);
        Some(status)
    }

    /// Handle a relay-delivered message; duplicates by id are dropped
    pub fn handle_incoming(&mut self, message: ChatMessage) -> bool {
        if self.messages.iter().any(|m| m.id == message.id) {
            return false;
        }

        if message.sender == Sender::Agent {
            if !self.panel_open {
                self.unread_badge += 1;
            }
            self.engine.handle_agent_message(&message);
        }

        self.messages.push(message);
        true
    }

    /// Tear down the endpoint; pending auto-reply countdowns die with it
    pub fn teardown(&self) {
        self.engine.cancel_all();
    }

    async fn deliver(&mut self, message: &ChatMessage) -> DeliveryStatus {
        // A transcript born empty gets its greeting persisted ahead of the
        // first real message, so the agent console sees what the customer saw
        if self.welcome_pending {
            let welcome = self.messages.first().cloned();
            if let Some(welcome) = welcome.filter(|m| m.sender == Sender::Agent) {
                match self.store.append(&self.session_id, &welcome).await {
                    Ok(()) => self.welcome_pending = false,
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            session_id = %self.session_id,
                            "Failed to persist welcome message"
                        );
                    }
                }
            } else {
                self.welcome_pending = false;
            }
        }

        let mut status = DeliveryStatus::Confirmed;
        if let Err(e) = self.store.append(&self.session_id, message).await {
            tracing::warn!(error = %e, session_id = %self.session_id, "Failed to persist message");
            status = DeliveryStatus::Failed;
        }
        if let Err(e) = self.relay.publish(&self.session_id, message).await {
            tracing::warn!(error = %e, session_id = %self.session_id, "Failed to publish message");
            status = DeliveryStatus::Failed;
        }
        status
    }
}
