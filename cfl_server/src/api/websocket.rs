//! WebSocket handler for live draft events.
//!
//! # Connection Flow
//!
//! 1. Client connects via `GET /ws/drafts/{league_id}`
//! 2. Server subscribes the connection to the league's draft actor; the first
//!    frame is the current `on_the_clock` event
//! 3. Every [`DraftEvent`] for the league is pushed as a JSON text frame
//! 4. The socket closes when the draft completes or the client disconnects
//!
//! # Client Messages
//!
//! - `{"type": "ping"}` answered with `{"type": "pong"}`
//! - `{"type": "snapshot"}` answered with the current draft snapshot
//!
//! # Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:6969/ws/drafts/1');
//!
//! ws.onmessage = (event) => {
//!   const data = JSON.parse(event.data);
//!   if (data.type === "on_the_clock") {
//!     startCountdown(data.team_id, data.deadline);
//!   }
//! };
//! ```

use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    response::{IntoResponse, Response},
};
use cfl_draft::draft::{DraftEvent, DraftSnapshot, LeagueId};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::AppState;
use super::drafts::{ErrorResponse, error_code, status_for};
use crate::metrics;

/// Events buffered per connection before the actor starts dropping them
const SUBSCRIBER_BUFFER: usize = 64;

/// Client messages received via WebSocket
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    Ping,
    Snapshot,
}

/// Response messages sent to client
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerResponse {
    Pong,
    Snapshot { snapshot: Box<DraftSnapshot> },
    Error { message: String },
}

/// Upgrade to a WebSocket streaming the league's draft events.
///
/// The subscription is registered before the upgrade, so a league without a
/// running draft gets a plain HTTP error instead of an empty socket.
pub async fn websocket_handler(
    Path(league_id): Path<LeagueId>,
    State(state): State<AppState>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let subscriber_id = Uuid::new_v4();
    let (event_tx, event_rx) = mpsc::channel(SUBSCRIBER_BUFFER);

    if let Err(e) = state
        .draft_manager
        .subscribe(league_id, subscriber_id, event_tx)
        .await
    {
        let body = ErrorResponse {
            error: e.client_message(),
            code: error_code(&e).to_string(),
        };
        return (status_for(&e), axum::Json(body)).into_response();
    }

    match ws {
        Ok(ws) => ws.on_upgrade(move |socket| {
            handle_socket(socket, league_id, subscriber_id, event_rx, state)
        }),
        Err(rejection) => {
            state
                .draft_manager
                .unsubscribe(league_id, subscriber_id)
                .await;
            rejection.into_response()
        }
    }
}

async fn handle_socket(
    socket: WebSocket,
    league_id: LeagueId,
    subscriber_id: Uuid,
    mut event_rx: mpsc::Receiver<DraftEvent>,
    state: AppState,
) {
    let (mut sender, mut receiver) = socket.split();
    metrics::websocket_connected();
    tracing::info!(league_id = league_id, subscriber = %subscriber_id, "WebSocket connected");

    let (response_tx, mut response_rx) = mpsc::channel::<String>(16);

    let mut send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                event = event_rx.recv() => {
                    // actor dropped the subscriber: draft finished or closed
                    let Some(event) = event else { break };
                    let json = match serde_json::to_string(&event) {
                        Ok(j) => j,
                        Err(e) => {
                            tracing::error!("Failed to serialize draft event: {}", e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        return;
                    }
                    if matches!(event, DraftEvent::DraftCompleted { .. }) {
                        break;
                    }
                }
                Some(response_json) = response_rx.recv() => {
                    if sender.send(Message::Text(response_json.into())).await.is_err() {
                        return;
                    }
                }
            }
        }
        let _ = sender.send(Message::Close(None)).await;
    });

    loop {
        tokio::select! {
            _ = &mut send_task => break,
            msg = receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    let response = match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(client_msg) => {
                            handle_client_message(client_msg, league_id, &state).await
                        }
                        Err(e) => {
                            tracing::debug!("Failed to parse client message: {}", e);
                            ServerResponse::Error {
                                message: "Invalid message format".to_string(),
                            }
                        }
                    };

                    if let Ok(json) = serde_json::to_string(&response)
                        && response_tx.send(json).await.is_err()
                    {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    tracing::warn!(league_id = league_id, "WebSocket error: {}", e);
                    break;
                }
                Some(Ok(_)) => {}
            },
        }
    }

    send_task.abort();
    state
        .draft_manager
        .unsubscribe(league_id, subscriber_id)
        .await;
    metrics::websocket_disconnected();
    tracing::info!(league_id = league_id, subscriber = %subscriber_id, "WebSocket disconnected");
}

async fn handle_client_message(
    msg: ClientMessage,
    league_id: LeagueId,
    state: &AppState,
) -> ServerResponse {
    match msg {
        ClientMessage::Ping => ServerResponse::Pong,
        ClientMessage::Snapshot => match state.draft_manager.draft_state(league_id).await {
            Ok(snapshot) => ServerResponse::Snapshot {
                snapshot: Box::new(snapshot),
            },
            Err(e) => ServerResponse::Error {
                message: e.client_message(),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_parsing() {
        assert!(matches!(
            serde_json::from_str::<ClientMessage>(r#"{"type":"ping"}"#),
            Ok(ClientMessage::Ping)
        ));
        assert!(matches!(
            serde_json::from_str::<ClientMessage>(r#"{"type":"snapshot"}"#),
            Ok(ClientMessage::Snapshot)
        ));
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"pick"}"#).is_err());
    }

    #[test]
    fn test_server_response_shape() {
        let json = serde_json::to_string(&ServerResponse::Pong).unwrap();
        assert_eq!(json, r#"{"type":"pong"}"#);
    }
}
