//! Server-hosted auto-reply responder
//!
//! Drives one auto-reply engine per active session from relay traffic, so
//! delayed acknowledgements and instant Q&A answers go out even when no
//! widget-side engine is running. The hosted responder treats the chat panel
//! as always open.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use florachat_engine::{AutoReplyConfig, AutoReplyEngine, Relay, RelaySubscription};
use florachat_shared::{ChatMessage, ChatResult, Sender, TranscriptStore};

use crate::relay::{Connection, RoomManager, ServerEvent};

enum ResponderCommand {
    Observe {
        session_id: String,
        message: ChatMessage,
    },
    Forget {
        session_id: String,
    },
}

/// Handle to the responder task
#[derive(Clone)]
pub struct AutoReplyResponder {
    tx: mpsc::UnboundedSender<ResponderCommand>,
}

impl AutoReplyResponder {
    /// Spawn the responder task
    pub fn spawn(
        store: Arc<dyn TranscriptStore>,
        relay: Arc<dyn Relay>,
        config: AutoReplyConfig,
    ) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut engines: HashMap<String, AutoReplyEngine> = HashMap::new();

            while let Some(command) = rx.recv().await {
                match command {
                    ResponderCommand::Observe {
                        session_id,
                        message,
                    } => {
                        let engine = engines.entry(session_id.clone()).or_insert_with(|| {
                            AutoReplyEngine::new(
                                session_id.clone(),
                                Arc::clone(&store),
                                Arc::clone(&relay),
                                config.clone(),
                            )
                        });

                        match message.sender {
                            Sender::Customer => engine.handle_customer_send(&message.message),
                            Sender::Agent => engine.handle_agent_message(&message),
                        }
                    }
                    ResponderCommand::Forget { session_id } => {
                        // Dropping the engine cancels its pending countdowns
                        engines.remove(&session_id);
                    }
                }
            }
        });

        Self { tx }
    }

    /// Feed one relay-observed message into the responder
    pub fn observe(&self, session_id: &str, message: &ChatMessage) {
        let _ = self.tx.send(ResponderCommand::Observe {
            session_id: session_id.to_string(),
            message: message.clone(),
        });
    }

    /// Drop the engine for a deleted session
    pub fn forget(&self, session_id: &str) {
        let _ = self.tx.send(ResponderCommand::Forget {
            session_id: session_id.to_string(),
        });
    }
}

/// Bridges the engine's relay abstraction onto the hosted room manager
pub struct RoomRelay {
    rooms: Arc<RoomManager>,
}

impl RoomRelay {
    pub fn new(rooms: Arc<RoomManager>) -> Self {
        Self { rooms }
    }
}

#[async_trait]
impl Relay for RoomRelay {
    async fn subscribe(&self, session_id: &str) -> ChatResult<RelaySubscription> {
        // Attach an internal connection to the room and forward its
        // new-message traffic into the subscription channel
        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ServerEvent>();
        let conn = Arc::new(Connection::new(event_tx));
        conn.subscribe(session_id).await;
        self.rooms.join(session_id, Arc::clone(&conn)).await;

        let (message_tx, message_rx) = mpsc::unbounded_channel();
        let rooms = Arc::clone(&self.rooms);
        let room_id = session_id.to_string();
        tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                if let ServerEvent::NewMessage { message, .. } = event {
                    if message_tx.send(message).is_err() {
                        break; // Subscription dropped
                    }
                }
            }
            rooms.leave(&room_id, &conn.id).await;
        });

        Ok(RelaySubscription::new(message_rx))
    }

    async fn publish(&self, session_id: &str, message: &ChatMessage) -> ChatResult<()> {
        self.rooms
            .broadcast(
                session_id,
                ServerEvent::NewMessage {
                    session_id: session_id.to_string(),
                    message: message.clone(),
                },
            )
            .await;
        Ok(())
    }
}
