//! WebSocket handler for Axum
//!
//! Handles WebSocket connections and routes relay events. The relay carries
//! no authentication layer; any subscriber to a room receives all traffic
//! for it.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{stream::StreamExt, SinkExt};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::state::AppState;

use super::{
    connection::Connection,
    events::{ClientEvent, ServerEvent},
};

/// WebSocket handler - upgrades HTTP connection to WebSocket
pub async fn ws_handler(ws: WebSocketUpgrade, State(app_state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, app_state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    // Create channel for sending events to this connection
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    let conn = app_state.ws.add_connection(Connection::new(tx)).await;
    let connection_id = conn.id;

    // Send connection acknowledgment
    let _ = conn.send(ServerEvent::Connected { connection_id });

    // Forward queued server events onto the socket until either side hangs up
    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => {
                    if sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!(error = ?e, "Failed to serialize relay event");
                }
            }
        }
    });

    // Inbound loop: parse and dispatch client events
    while let Some(msg) = receiver.next().await {
        if let Ok(msg) = msg {
            match msg {
                Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                    Ok(event) => {
                        handle_client_event(event, Arc::clone(&conn), &app_state).await;
                    }
                    Err(e) => {
                        tracing::warn!(
                            error = ?e,
                            message = %text,
                            "Failed to parse client event"
                        );
                        let _ = conn.send(ServerEvent::Error {
                            message: "Invalid event format".to_string(),
                        });
                    }
                },
                Message::Close(_) => {
                    tracing::info!(connection_id = %connection_id, "WebSocket close frame received");
                    break;
                }
                Message::Ping(_) | Message::Pong(_) => {
                    // The transport answers these on its own
                }
                _ => {} // Ignore binary messages
            }
        }
    }

    tracing::info!(connection_id = %connection_id, "WebSocket connection closing");
    app_state.ws.remove_connection(&connection_id).await;
    send_task.abort();
}

/// Handle client event
async fn handle_client_event(event: ClientEvent, conn: Arc<Connection>, app_state: &AppState) {
    use ClientEvent::*;

    match event {
        JoinSession { session_id } => {
            // Rejoining a session the connection is already in is a no-op
            if !conn.is_subscribed(&session_id).await {
                conn.subscribe(&session_id).await;
                app_state.ws.rooms.join(&session_id, Arc::clone(&conn)).await;
            }
        }

        LeaveSession { session_id } => {
            conn.unsubscribe(&session_id).await;
            app_state.ws.rooms.leave(&session_id, &conn.id).await;
        }

        SendMessage {
            session_id,
            message,
        } => {
            // The relay only broadcasts; the sender persists through the REST
            // surface on its own. The responder watches the same traffic to
            // drive per-session auto replies.
            if let Some(responder) = &app_state.responder {
                responder.observe(&session_id, &message);
            }

            app_state
                .ws
                .rooms
                .broadcast(
                    &session_id,
                    ServerEvent::NewMessage {
                        session_id: session_id.clone(),
                        message,
                    },
                )
                .await;
        }

        Ping => {
            let _ = conn.send(ServerEvent::Pong);
        }
    }
}
