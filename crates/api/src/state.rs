//! Shared application state

use std::sync::Arc;

use florachat_engine::Relay;
use florachat_shared::TranscriptStore;

use crate::config::Config;
use crate::relay::WebSocketState;
use crate::responder::{AutoReplyResponder, RoomRelay};

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    /// Transcript store backing the REST surface and the responder
    pub store: Arc<dyn TranscriptStore>,

    /// Relay connections and session rooms
    pub ws: WebSocketState,

    /// Server-side auto-reply engine driver, when enabled
    pub responder: Option<AutoReplyResponder>,
}

impl AppState {
    /// Build the application state; spawns the responder task when enabled.
    /// Must be called from within the runtime.
    pub fn new(config: Config, store: Arc<dyn TranscriptStore>) -> Self {
        let ws = WebSocketState::new();

        let responder = if config.auto_reply_enabled {
            let relay: Arc<dyn Relay> = Arc::new(RoomRelay::new(Arc::clone(&ws.rooms)));
            Some(AutoReplyResponder::spawn(
                Arc::clone(&store),
                relay,
                config.auto_reply(),
            ))
        } else {
            None
        };

        Self {
            config: Arc::new(config),
            store,
            ws,
            responder,
        }
    }
}
