use std::time::Duration;

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use nr_core::Event;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::authenticate;
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiQuery;
use crate::AppState;

const PING_INTERVAL: Duration = Duration::from_secs(25);

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

/// `GET /ws?token=...` upgrades to a socket that relays the user's events.
/// The token is checked before the upgrade handshake.
pub async fn ws_handler(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<WsParams>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> ApiResult<Response> {
    let token = params
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("missing token".to_string()))?;
    let user = authenticate(&state, &token).await?;
    let ws = ws.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let rx = state.events.subscribe(user.id);
    info!("🔌 Socket connected for {}", user.email);
    let hub = state.events.clone();
    Ok(ws.on_upgrade(move |socket| async move {
        relay(socket, rx, user.id).await;
        hub.release(user.id);
    }))
}

fn frame(event: &Event) -> Option<Message> {
    serde_json::to_string(event).ok().map(Message::Text)
}

/// Owns `rx` so the subscription is gone by the time the caller releases the room.
async fn relay(socket: WebSocket, mut rx: broadcast::Receiver<Event>, user_id: Uuid) {
    let (mut sender, mut receiver) = socket.split();
    let hello = Event::new("connected", json!({ "userId": user_id }));
    if let Some(message) = frame(&hello) {
        if sender.send(message).await.is_err() {
            return;
        }
    }

    let mut ping = tokio::time::interval(PING_INTERVAL);
    ping.tick().await;

    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Ok(event) => {
                    let Some(message) = frame(&event) else { continue };
                    if sender.send(message).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Socket for {} lagged, skipped {} event(s)", user_id, skipped);
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
            _ = ping.tick() => {
                if sender.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }
    debug!("Socket closed for {}", user_id);
}
